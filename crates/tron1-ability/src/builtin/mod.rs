//! Abilities compiled into this crate.

mod dummy;

pub use dummy::{DummyAbility, DummyConfig};

use crate::registry::AbilityRegistryBuilder;

pub const DUMMY_ABILITY: &str = "dummy/ability1";

/// Register every built-in ability. Add one line per ability.
pub fn register_builtins(builder: AbilityRegistryBuilder) -> AbilityRegistryBuilder {
    builder.register(DUMMY_ABILITY, || Box::<DummyAbility>::default())
}
