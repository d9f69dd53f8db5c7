//! 列出串口

use anyhow::Result;
use ee543_serial::available_ports;

pub fn execute() -> Result<()> {
    let ports = available_ports()?;
    if ports.is_empty() {
        println!("(未发现串口)");
        return Ok(());
    }
    for port in ports {
        println!("{}", port);
    }
    Ok(())
}
