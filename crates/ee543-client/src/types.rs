//! 关节向量类型
//!
//! 关节数 N 在运行时由配置决定（默认 4，最多 `MAX_JOINTS`），
//! 因此使用 `SmallVec` 而不是定长数组，常见尺寸不会分配堆内存。

use ee543_protocol::MAX_JOINTS;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::ops::{Index, IndexMut};

/// 按关节索引的向量
///
/// # 示例
///
/// ```
/// use ee543_client::JointVector;
///
/// let pose = JointVector::from([10.0, -10.0, 0.0, 5.0]);
/// assert_eq!(pose.len(), 4);
/// assert_eq!(pose[1], -10.0);
///
/// let doubled = pose.map(|x| x * 2.0);
/// assert_eq!(doubled[0], 20.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointVec<T> {
    data: SmallVec<[T; MAX_JOINTS]>,
}

/// 关节角度（度）
pub type JointVector = JointVec<f64>;

/// 关节速度（度/秒）
pub type SpeedVector = JointVec<f64>;

impl<T> JointVec<T> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    /// 对每个关节应用函数
    pub fn map<U, F>(&self, f: F) -> JointVec<U>
    where
        F: FnMut(&T) -> U,
    {
        JointVec {
            data: self.data.iter().map(f).collect(),
        }
    }

    /// 与另一个向量逐关节组合
    ///
    /// 长度不同时按较短者截断；调用方负责先检查维度。
    pub fn map_with<U, R, F>(&self, other: &JointVec<U>, mut f: F) -> JointVec<R>
    where
        F: FnMut(&T, &U) -> R,
    {
        JointVec {
            data: self.data.iter().zip(other.data.iter()).map(|(a, b)| f(a, b)).collect(),
        }
    }
}

impl<T: Clone> JointVec<T> {
    /// 所有关节取同一值
    pub fn splat(value: T, len: usize) -> Self {
        Self {
            data: SmallVec::from_elem(value, len),
        }
    }
}

impl JointVec<f64> {
    /// N 个零
    pub fn zeros(len: usize) -> Self {
        Self::splat(0.0, len)
    }

    /// 逐关节最大绝对偏差
    pub fn max_abs_diff(&self, other: &Self) -> f64 {
        self.iter()
            .zip(other.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

impl<T> Index<usize> for JointVec<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

impl<T> IndexMut<usize> for JointVec<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl<T, const N: usize> From<[T; N]> for JointVec<T> {
    fn from(values: [T; N]) -> Self {
        Self {
            data: values.into_iter().collect(),
        }
    }
}

impl<T> From<Vec<T>> for JointVec<T> {
    fn from(values: Vec<T>) -> Self {
        Self {
            data: values.into_iter().collect(),
        }
    }
}

impl<T: Clone> From<&[T]> for JointVec<T> {
    fn from(values: &[T]) -> Self {
        Self {
            data: SmallVec::from(values),
        }
    }
}

impl<T> FromIterator<T> for JointVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl<T> IntoIterator for JointVec<T> {
    type Item = T;
    type IntoIter = smallvec::IntoIter<[T; MAX_JOINTS]>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a JointVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<T: std::fmt::Display> std::fmt::Display for JointVec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            value.fmt(f)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction() {
        let a = JointVector::from([1.0, 2.0, 3.0]);
        let b = JointVector::from(vec![1.0, 2.0, 3.0]);
        let c = JointVector::from(&[1.0, 2.0, 3.0][..]);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(JointVector::zeros(4).as_slice(), &[0.0; 4]);
    }

    #[test]
    fn test_index_mut() {
        let mut pose = JointVector::zeros(4);
        pose[2] = 45.0;
        assert_eq!(pose[2], 45.0);
        for value in pose.iter_mut() {
            *value += 1.0;
        }
        assert_eq!(pose.as_slice(), &[1.0, 1.0, 46.0, 1.0]);
    }

    #[test]
    fn test_map_with() {
        let a = JointVector::from([1.0, 2.0]);
        let b = JointVector::from([10.0, 20.0]);
        let sum = a.map_with(&b, |x, y| x + y);
        assert_eq!(sum.as_slice(), &[11.0, 22.0]);
    }

    #[test]
    fn test_max_abs_diff() {
        let a = JointVector::from([0.0, 5.0, -3.0]);
        let b = JointVector::from([0.5, 5.0, 1.0]);
        assert_eq!(a.max_abs_diff(&b), 4.0);
    }

    #[test]
    fn test_display() {
        let pose = JointVector::from([1.5, -2.0]);
        assert_eq!(pose.to_string(), "[1.5, -2]");
    }
}
