//! Ramp Planner - 恒速斜坡规划
//!
//! 每个关节以自己的速度朝目标匀速移动，每个控制周期前进固定步长：
//!
//! ```text
//! step[i] = sign(goal[i] - start[i]) * speed[i] / control_rate_hz
//! next[i] = clamp(current[i] + step[i], between start[i] and goal[i])
//! ```
//!
//! 钳位到 `[start, goal]` 区间保证不会越过目标，即使速度不能整除距离。
//! 到位判定：所有关节 `|pose - goal| <= tolerance`。
//!
//! # 示例
//!
//! ```rust
//! use ee543_client::control::RampPlanner;
//! use ee543_client::{JointVector, SpeedVector};
//! use ee543_protocol::ServoLimits;
//!
//! let start = JointVector::from([0.0, 0.0]);
//! let goal = JointVector::from([10.0, -10.0]);
//! let speed = SpeedVector::from([80.0, 80.0]);
//! let limits = [ServoLimits::mg996r(); 2];
//!
//! let planner = RampPlanner::new(&start, &goal, &speed, 30.0, &limits).unwrap();
//! let poses: Vec<JointVector> = planner.poses(0.01).collect();
//! assert_eq!(poses.len(), 4);
//! assert_eq!(poses.last().unwrap().as_slice(), &[10.0, -10.0]);
//! ```

use crate::ControlError;
use crate::types::{JointVector, SpeedVector};
use ee543_protocol::ServoLimits;
use tracing::warn;

/// 恒速斜坡规划器
///
/// 规划器本身不保存“当前位姿”：控制器只在帧被应答后才提交位姿，
/// 被丢弃的周期会用同一个当前位姿重新计算出同一个候选点。
#[derive(Debug, Clone)]
pub struct RampPlanner {
    start: JointVector,
    /// 钳位后的有效目标
    goal: JointVector,
    /// 每周期带符号步长（度）
    step: JointVector,
}

impl RampPlanner {
    /// 创建规划器
    ///
    /// # 参数
    ///
    /// - `start`: 起始位姿（当前指令位姿）
    /// - `goal`: 目标位姿，超出限位的分量被钳位
    /// - `speed`: 各关节速度（度/秒）
    /// - `control_rate_hz`: 控制频率
    /// - `limits`: 各关节限位
    ///
    /// 速度非正、非有限，或步长小到加到位姿上不产生变化的关节视为“不运动”：
    /// 其有效目标改为起始位姿。
    ///
    /// # 错误
    ///
    /// - `ControlError::DimensionMismatch`: 任一向量长度与 `start` 不同
    /// - `ControlError::Config`: `control_rate_hz` 不是正数
    pub fn new(
        start: &JointVector,
        goal: &JointVector,
        speed: &SpeedVector,
        control_rate_hz: f64,
        limits: &[ServoLimits],
    ) -> Result<Self, ControlError> {
        let n = start.len();
        for actual in [goal.len(), speed.len(), limits.len()] {
            if actual != n {
                return Err(ControlError::DimensionMismatch {
                    expected: n,
                    actual,
                });
            }
        }
        if !control_rate_hz.is_finite() || control_rate_hz <= 0.0 {
            return Err(ControlError::Config(crate::ConfigError::Invalid(format!(
                "control_rate_hz must be positive, got {}",
                control_rate_hz
            ))));
        }

        let mut effective_goal = JointVector::zeros(n);
        let mut step = JointVector::zeros(n);

        for i in 0..n {
            let target = limits[i].clamp_angle(goal[i]);
            let delta = target - start[i];
            let increment = speed[i] / control_rate_hz;

            if delta == 0.0 {
                effective_goal[i] = target;
                continue;
            }
            if !increment.is_finite() || increment <= 0.0 {
                warn!(
                    "Joint {} speed {} is not positive, holding at {:.3}°",
                    i + 1,
                    speed[i],
                    start[i]
                );
                effective_goal[i] = start[i];
                continue;
            }
            // 步长小于路径上最大幅值的精度时，位姿加上步长不再变化
            let magnitude = start[i].abs().max(target.abs());
            if magnitude + increment == magnitude {
                warn!(
                    "Joint {} speed {} is too small to move at {} Hz, holding at {:.3}°",
                    i + 1,
                    speed[i],
                    control_rate_hz,
                    start[i]
                );
                effective_goal[i] = start[i];
                continue;
            }

            effective_goal[i] = target;
            step[i] = delta.signum() * increment;
        }

        Ok(Self {
            start: start.clone(),
            goal: effective_goal,
            step,
        })
    }

    pub fn start(&self) -> &JointVector {
        &self.start
    }

    /// 有效目标（已钳位，并已应用不运动规则）
    pub fn goal(&self) -> &JointVector {
        &self.goal
    }

    /// 每周期带符号步长
    pub fn step(&self) -> &JointVector {
        &self.step
    }

    /// 由当前位姿计算下一周期的候选位姿
    pub fn advance(&self, current: &JointVector) -> JointVector {
        (0..self.start.len())
            .map(|i| {
                let (lo, hi) = if self.start[i] <= self.goal[i] {
                    (self.start[i], self.goal[i])
                } else {
                    (self.goal[i], self.start[i])
                };
                (current[i] + self.step[i]).clamp(lo, hi)
            })
            .collect()
    }

    /// 是否到位
    pub fn reached(&self, pose: &JointVector, tolerance: f64) -> bool {
        pose.max_abs_diff(&self.goal) <= tolerance
    }

    /// 假设每个周期都被应答时的位姿序列
    ///
    /// 至少产生一个位姿（与起点相同也会发出一帧）。
    pub fn poses(&self, tolerance: f64) -> RampPoses<'_> {
        RampPoses {
            planner: self,
            current: self.start.clone(),
            tolerance,
            done: false,
        }
    }
}

/// [`RampPlanner::poses`] 返回的迭代器
pub struct RampPoses<'a> {
    planner: &'a RampPlanner,
    current: JointVector,
    tolerance: f64,
    done: bool,
}

impl Iterator for RampPoses<'_> {
    type Item = JointVector;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = self.planner.advance(&self.current);
        self.done = self.planner.reached(&next, self.tolerance);
        self.current = next.clone();
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn limits(n: usize) -> Vec<ServoLimits> {
        vec![ServoLimits::mg996r(); n]
    }

    #[test]
    fn test_reference_trajectory() {
        let start = JointVector::zeros(4);
        let goal = JointVector::from([10.0, -10.0, 0.0, 5.0]);
        let speed = SpeedVector::splat(80.0, 4);
        let planner = RampPlanner::new(&start, &goal, &speed, 30.0, &limits(4)).unwrap();

        let poses: Vec<_> = planner.poses(0.01).collect();
        assert_eq!(poses.len(), 4);

        for pose in &poses {
            assert_eq!(pose[2], 0.0);
            assert!((0.0..=10.0).contains(&pose[0]));
            assert!((-10.0..=0.0).contains(&pose[1]));
            assert!((0.0..=5.0).contains(&pose[3]));
        }

        let last = poses.last().unwrap();
        assert!(last.max_abs_diff(&goal) <= 0.01);
        // 关节 4 第二步就到位并保持
        assert_eq!(poses[1][3], 5.0);
    }

    #[test]
    fn test_goal_is_clamped() {
        let start = JointVector::zeros(2);
        let goal = JointVector::from([200.0, -200.0]);
        let speed = SpeedVector::splat(80.0, 2);
        let planner = RampPlanner::new(&start, &goal, &speed, 30.0, &limits(2)).unwrap();
        assert_eq!(planner.goal().as_slice(), &[90.0, -90.0]);
    }

    #[test]
    fn test_non_positive_speed_holds_joint() {
        let start = JointVector::from([5.0, 5.0, 5.0]);
        let goal = JointVector::from([20.0, 20.0, 20.0]);
        let speed = SpeedVector::from([0.0, -10.0, f64::NAN]);
        let planner = RampPlanner::new(&start, &goal, &speed, 30.0, &limits(3)).unwrap();

        assert_eq!(planner.goal(), &start);
        let poses: Vec<_> = planner.poses(0.01).collect();
        assert_eq!(poses, vec![start]);
    }

    #[test]
    fn test_vanishing_step_holds_joint() {
        let start = JointVector::from([10.0, 0.0]);
        let goal = JointVector::from([20.0, 20.0]);
        let speed = SpeedVector::from([1e-15, 1e-15]);
        let planner = RampPlanner::new(&start, &goal, &speed, 30.0, &limits(2)).unwrap();

        assert_eq!(planner.goal(), &start);
        assert_eq!(planner.step().as_slice(), &[0.0, 0.0]);
        let poses: Vec<_> = planner.poses(0.01).collect();
        assert_eq!(poses, vec![start]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let start = JointVector::zeros(4);
        let goal = JointVector::zeros(3);
        let speed = SpeedVector::splat(80.0, 4);
        let result = RampPlanner::new(&start, &goal, &speed, 30.0, &limits(4));
        assert!(matches!(
            result,
            Err(ControlError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_invalid_rate() {
        let start = JointVector::zeros(1);
        let result = RampPlanner::new(&start, &start, &SpeedVector::splat(1.0, 1), 0.0, &limits(1));
        assert!(matches!(result, Err(ControlError::Config(_))));
    }

    #[test]
    fn test_advance_is_pure() {
        let start = JointVector::zeros(1);
        let goal = JointVector::from([3.0]);
        let planner =
            RampPlanner::new(&start, &goal, &SpeedVector::splat(30.0, 1), 10.0, &limits(1)).unwrap();
        let current = JointVector::from([1.0]);
        assert_eq!(planner.advance(&current), planner.advance(&current));
        assert_eq!(planner.advance(&current)[0], 3.0);
    }

    proptest! {
        #[test]
        fn prop_poses_stay_between_start_and_goal(
            start in prop::collection::vec(-90.0f64..90.0, 4),
            goal in prop::collection::vec(-120.0f64..120.0, 4),
            speed in prop::collection::vec(1.0f64..200.0, 4),
        ) {
            let start = JointVector::from(start);
            let goal = JointVector::from(goal);
            let speed = SpeedVector::from(speed);
            let planner = RampPlanner::new(&start, &goal, &speed, 30.0, &limits(4)).unwrap();
            let effective = planner.goal().clone();

            let mut count = 0usize;
            let mut last = start.clone();
            for pose in planner.poses(0.01) {
                for i in 0..4 {
                    let (lo, hi) = if start[i] <= effective[i] {
                        (start[i], effective[i])
                    } else {
                        (effective[i], start[i])
                    };
                    prop_assert!(pose[i] >= lo && pose[i] <= hi);
                }
                last = pose;
                count += 1;
                // 最远 180°，最慢 1°/s @ 30Hz
                prop_assert!(count <= 180 * 30 + 1);
            }
            prop_assert!(last.max_abs_diff(&effective) <= 0.01);
        }
    }
}
