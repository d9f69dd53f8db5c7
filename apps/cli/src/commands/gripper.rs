//! 夹爪命令

use clap::Subcommand;

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GripperCommand {
    /// 张开夹爪
    Open,
    /// 闭合夹爪
    Close,
}
