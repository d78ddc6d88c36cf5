//! TRON1 launcher.
//!
//! - `cli`：`tron1` 与 `tron1-ability` 的命令行参数
//! - `launch`：环境变量校验、机器人初始化与控制器分发
//! - `controllers`：point-foot / wheel-foot / sole-foot 控制器

pub mod cli;
pub mod controllers;
pub mod launch;

pub use launch::{launch, LaunchError, LaunchSettings};
