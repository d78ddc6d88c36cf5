//! AbilityRegistry: type key → constructor, built once at startup.
//!
//! Pattern:
//! ```ignore
//! let registry = AbilityRegistry::builder()
//!     .register("dummy/ability1", || Box::new(DummyAbility::default()))
//!     .build();
//! ```
//! After `build()` the registry is immutable; share it by reference or `Arc`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::ability::Ability;
use crate::builtin;

pub type AbilityFactory = Arc<dyn Fn() -> Box<dyn Ability> + Send + Sync>;

pub struct AbilityRegistry {
    factories: BTreeMap<String, AbilityFactory>,
}

#[derive(Default)]
pub struct AbilityRegistryBuilder {
    factories: BTreeMap<String, AbilityFactory>,
}

impl AbilityRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `key`. The first registration of a key wins.
    #[must_use]
    pub fn register<F>(mut self, key: &str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Ability> + Send + Sync + 'static,
    {
        if self.factories.contains_key(key) {
            tracing::warn!(key, "Ability type registered twice; keeping the first");
            return self;
        }
        self.factories.insert(key.to_string(), Arc::new(factory));
        self
    }

    pub fn build(self) -> AbilityRegistry {
        AbilityRegistry {
            factories: self.factories,
        }
    }
}

impl AbilityRegistry {
    pub fn builder() -> AbilityRegistryBuilder {
        AbilityRegistryBuilder::new()
    }

    /// Registry with every ability compiled into this crate.
    pub fn with_builtins() -> Self {
        builtin::register_builtins(Self::builder()).build()
    }

    /// Construct a fresh, uninitialized instance of `key`.
    pub fn create(&self, key: &str) -> Option<Box<dyn Ability>> {
        self.factories.get(key).map(|factory| factory())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for AbilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbilityRegistry")
            .field("keys", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::{AbilityConfig, AbilityContext};
    use crate::error::AbilityError;

    #[allow(dead_code)]
    struct Named(&'static str);

    impl Ability for Named {
        fn initialize(
            &mut self,
            _ctx: &AbilityContext,
            _config: &AbilityConfig,
        ) -> Result<(), AbilityError> {
            Ok(())
        }
    }

    #[test]
    fn test_create_known_and_unknown() {
        let registry = AbilityRegistry::builder()
            .register("test/a", || Box::new(Named("a")))
            .build();
        assert!(registry.create("test/a").is_some());
        assert!(registry.create("test/missing").is_none());
        assert!(registry.contains("test/a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_each_create_returns_new_instance() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let registry = AbilityRegistry::builder()
            .register("test/a", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Box::new(Named("a"))
            })
            .build();
        let _ = registry.create("test/a");
        let _ = registry.create("test/a");
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_duplicate_key_keeps_first() {
        use std::sync::atomic::{AtomicBool, Ordering};
        let second_called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&second_called);
        let registry = AbilityRegistry::builder()
            .register("test/a", || Box::new(Named("first")))
            .register("test/a", move || {
                flag.store(true, Ordering::SeqCst);
                Box::new(Named("second"))
            })
            .build();
        let _ = registry.create("test/a");
        assert!(!second_called.load(Ordering::SeqCst));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_builtins_include_dummy() {
        let registry = AbilityRegistry::with_builtins();
        assert!(registry.contains(builtin::DUMMY_ABILITY));
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec![builtin::DUMMY_ABILITY]);
    }
}
