//! 环境变量 key 常量
//!
//! `ROBOT_TYPE` / `RL_TYPE` / `ROBOT_IP` 沿用部署脚本的既有名称，其余使用 `TRON1_*` 前缀。

/// 机器人与 RL 后端选择
pub mod launch {
    /// Robot model code, e.g. `PF_TRON1A`, `WF_TRON1A`, `SF_TRON1A`.
    pub const ROBOT_TYPE: &str = "ROBOT_TYPE";
    /// `isaacgym` or `isaaclab`.
    pub const RL_TYPE: &str = "RL_TYPE";
    /// Overrides `robot_ip` in the ability host's system config.
    pub const ROBOT_IP: &str = "ROBOT_IP";
}

/// 模型与配置路径
pub mod paths {
    pub const TRON1_MODEL_DIR: &str = "TRON1_MODEL_DIR";
    pub const TRON1_ABILITY_CONFIG: &str = "TRON1_ABILITY_CONFIG";
}

/// 可观测性与日志
pub mod observability {
    pub const TRON1_QUIET: &str = "TRON1_QUIET";
    pub const TRON1_LOG_LEVEL: &str = "TRON1_LOG_LEVEL";
    pub const TRON1_LOG_JSON: &str = "TRON1_LOG_JSON";
}
