//! 命令定义和实现

pub mod config;
pub mod gripper;
pub mod r#move;
pub mod ports;
pub mod state;

pub use config::ConfigCommand;
pub use gripper::GripperCommand;
pub use r#move::MoveCommand;
