//! TRON1 core: shared by the `tron1` launcher and the ability host.
//!
//! - `config`：环境变量 key、加载辅助函数与结构化配置
//! - `observability`：tracing 初始化
//! - `rate`：固定频率循环节拍器
//! - `robot`：机器人 SDK 抽象（`RobotApi`）、数据类型与进程内仿真机器人

pub mod config;
pub mod observability;
pub mod rate;
pub mod robot;

pub use rate::Rate;
pub use robot::{RlBackend, RobotApi, RobotFamily};
