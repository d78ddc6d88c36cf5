//! TRON1 abilities: pluggable robot behaviours with a fixed lifecycle.
//!
//! - **Registry**: immutable map from type key (e.g. `dummy/ability1`) to constructor
//! - **Handle**: one ability instance running `on_start` → `on_main` → `on_stop` on its own thread
//! - **Manager**: loads abilities from a [`SystemConfig`], starts/stops them by name
//! - **Remote CLI**: line-based TCP console driving the manager

mod ability;
pub mod builtin;
mod error;
mod handle;
mod manager;
mod registry;
pub mod remote_cli;
mod robot_data;
mod system_config;

pub use ability::{Ability, AbilityConfig, AbilityContext, AbilityState};
pub use error::AbilityError;
pub use handle::AbilityHandle;
pub use manager::{AbilityInfo, AbilityManager};
pub use registry::{AbilityFactory, AbilityRegistry, AbilityRegistryBuilder};
pub use remote_cli::RemoteCliServer;
pub use robot_data::RobotData;
pub use system_config::{AbilityEntry, LibraryConfig, SystemConfig, DEFAULT_REMOTE_CLI_PORT};
