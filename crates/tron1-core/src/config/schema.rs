//! 按领域分组的配置结构体
//!
//! 从环境变量加载，统一 fallback 逻辑。

use super::env_keys::{launch, observability as obv_keys, paths};
use super::loader::{env_bool, env_optional, env_or, env_raw};

/// Raw launcher selection as read from the environment.
///
/// Values are kept verbatim (no trimming) because they are matched exactly;
/// only empty strings are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchEnv {
    pub robot_type: Option<String>,
    pub rl_type: Option<String>,
}

impl LaunchEnv {
    /// 从环境变量加载（会自动加载 .env）
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        Self {
            robot_type: env_raw(launch::ROBOT_TYPE, &[]),
            rl_type: env_raw(launch::RL_TYPE, &[]),
        }
    }

    /// Build from an arbitrary key lookup. Used by tests and embedders that do not
    /// want to touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            robot_type: read(launch::ROBOT_TYPE),
            rl_type: read(launch::RL_TYPE),
        }
    }
}

/// 模型与 ability 配置路径
#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub model_dir: Option<String>,
    pub ability_config: Option<String>,
}

impl PathsConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        Self {
            model_dir: env_optional(paths::TRON1_MODEL_DIR, &[]),
            ability_config: env_optional(paths::TRON1_ABILITY_CONFIG, &[]),
        }
    }
}

/// 可观测性配置：quiet、log_level、log_json
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_bool(obv_keys::TRON1_QUIET, &[], false),
                log_level: env_or(obv_keys::TRON1_LOG_LEVEL, &[], || {
                    "tron1=info,tron1_core=info,tron1_ability=info".to_string()
                }),
                log_json: env_bool(obv_keys::TRON1_LOG_JSON, &[], false),
            }
        })
    }
}
