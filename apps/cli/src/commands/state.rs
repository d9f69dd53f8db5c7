//! 状态命令
//!
//! 下位机不回传位置：控制器启动时假定机械臂在回零位姿、夹爪张开，
//! 这里显示的就是这个假定状态，以及各关节对应的脉宽。

use crate::GlobalArgs;
use crate::commands::config::resolve;
use anyhow::Result;
use ee543_client::RobotState;

pub fn execute(global: &GlobalArgs, json: bool) -> Result<()> {
    let config = resolve(global)?;
    let state = RobotState::new(config.homing_pose());

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!("关节位姿（启动时假定）:");
    for (i, (angle, limits)) in state
        .joint_poses
        .iter()
        .zip(config.joint_limits().iter())
        .enumerate()
    {
        println!(
            "  J{}: {:>7.2}°  (pulse {})",
            i + 1,
            angle,
            limits.angle_to_pulse(*angle)
        );
    }
    println!("夹爪: {}", if state.gripper_closed { "闭合" } else { "张开" });
    Ok(())
}
