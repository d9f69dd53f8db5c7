//! 输入解析工具

use anyhow::{Context, Result};

/// 解析逗号分隔的数值列表，例如 `10,-10,0,5`
///
/// 数量必须等于 `expected`。越界角度不在这里处理，由控制器钳位。
pub fn parse_list(input: &str, expected: usize) -> Result<Vec<f64>> {
    let values: Vec<f64> = input
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("无法解析数值列表: {:?}", input))?;

    if values.len() != expected {
        anyhow::bail!("需要 {} 个值，得到 {} 个", expected, values.len());
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        anyhow::bail!("数值必须是有限数: {}", bad);
    }
    Ok(values)
}
