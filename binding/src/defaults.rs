//! # Configuration Defaults
//!
//! Default-setters applied to a freshly-constructed instance before any
//! property is bound. Holders registered under the global-defaults
//! sentinel of a type run first, then the holders registered under the
//! binding's own key; within each group, creation order decides (every
//! holder draws a sequence number from a process-wide counter).

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::key::BindingKey;
use crate::metadata::ConfigObject;
use crate::provider::ConfigBinding;

type DefaultsFn = dyn Fn(&mut dyn Any) + Send + Sync;

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A default-setter bound to a binding key, with a stable ordering
/// sequence.
#[derive(Clone)]
pub struct ConfigDefaultsHolder {
    key: BindingKey,
    sequence: u64,
    set_defaults: Arc<DefaultsFn>
}

impl ConfigDefaultsHolder {
    /// Defaults for one specific binding.
    pub fn new<T, F>(binding: &ConfigBinding<T>, defaults: F) -> Self
    where
        T: ConfigObject,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        Self::for_key(binding.key().clone(), defaults)
    }

    /// Defaults for a named binding of `T`.
    pub fn named<T, F>(name: impl Into<String>, defaults: F) -> Self
    where
        T: ConfigObject,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        Self::for_key(BindingKey::named::<T>(name), defaults)
    }

    /// Defaults applied to every binding of `T`, regardless of qualifier.
    pub fn global<T, F>(defaults: F) -> Self
    where
        T: ConfigObject,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        Self::for_key(BindingKey::global_defaults::<T>(), defaults)
    }

    fn for_key<T, F>(key: BindingKey, defaults: F) -> Self
    where
        T: ConfigObject,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        Self {
            key,
            sequence: NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed),
            set_defaults: Arc::new(move |instance: &mut dyn Any| {
                if let Some(typed) = instance.downcast_mut::<T>() {
                    defaults(typed);
                }
            })
        }
    }

    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn apply(&self, instance: &mut dyn Any) {
        (self.set_defaults)(instance);
    }
}

impl std::fmt::Debug for ConfigDefaultsHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigDefaultsHolder")
            .field("key", &self.key)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// Multimap from binding key to its registered holders.
#[derive(Default)]
pub(crate) struct DefaultsRegistry {
    holders: Mutex<HashMap<BindingKey, Vec<ConfigDefaultsHolder>>>
}

impl DefaultsRegistry {
    pub fn register(&self, holder: ConfigDefaultsHolder) {
        self.holders
            .lock()
            .entry(holder.key().clone())
            .or_default()
            .push(holder);
    }

    /// The composed defaults for `key`: global holders first, then keyed
    /// holders, each group in sequence order.
    pub fn compose(&self, key: &BindingKey) -> Vec<ConfigDefaultsHolder> {
        let holders = self.holders.lock();

        let mut composed: Vec<ConfigDefaultsHolder> = holders
            .get(&key.as_global_defaults())
            .map(|group| group.to_vec())
            .unwrap_or_default();
        composed.sort_by_key(ConfigDefaultsHolder::sequence);

        if !key.is_global_defaults() {
            let mut keyed: Vec<ConfigDefaultsHolder> =
                holders.get(key).map(|group| group.to_vec()).unwrap_or_default();
            keyed.sort_by_key(ConfigDefaultsHolder::sequence);
            composed.extend(keyed);
        }

        composed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    use crate::metadata::{Attribute, ConfigurationMetadata};

    #[derive(Debug, Default, Validate)]
    struct PoolConfig {
        size: u32,
        label: String
    }

    impl PoolConfig {
        fn set_size(&mut self, size: u32) {
            self.size = size;
        }
    }

    impl ConfigObject for PoolConfig {
        fn configuration_metadata() -> ConfigurationMetadata<Self> {
            ConfigurationMetadata::builder()
                .attribute(Attribute::new("Size", "pool.size", Self::set_size))
                .build()
        }
    }

    #[test]
    fn test_global_runs_before_keyed() {
        let registry = DefaultsRegistry::default();
        let binding = ConfigBinding::<PoolConfig>::named("workers");

        registry.register(ConfigDefaultsHolder::new(&binding, |config: &mut PoolConfig| {
            config.size = 16;
            config.label.push('k');
        }));
        registry.register(ConfigDefaultsHolder::global(|config: &mut PoolConfig| {
            config.size = 4;
            config.label.push('g');
        }));

        let mut instance = PoolConfig::default();
        for holder in registry.compose(binding.key()) {
            holder.apply(&mut instance);
        }

        assert_eq!(instance.label, "gk", "global defaults must run first");
        assert_eq!(instance.size, 16, "keyed defaults override global ones");
    }

    #[test]
    fn test_holders_within_a_group_run_in_creation_order() {
        let registry = DefaultsRegistry::default();

        let first = ConfigDefaultsHolder::global(|config: &mut PoolConfig| {
            config.label.push('a');
        });
        let second = ConfigDefaultsHolder::global(|config: &mut PoolConfig| {
            config.label.push('b');
        });
        assert!(first.sequence() < second.sequence());

        // registration order deliberately reversed
        registry.register(second);
        registry.register(first);

        let mut instance = PoolConfig::default();
        for holder in registry.compose(&BindingKey::of::<PoolConfig>()) {
            holder.apply(&mut instance);
        }
        assert_eq!(instance.label, "ab");
    }

    #[test]
    fn test_unrelated_key_composes_nothing() {
        let registry = DefaultsRegistry::default();
        registry.register(ConfigDefaultsHolder::named::<PoolConfig, _>(
            "workers",
            |config| config.size = 8,
        ));

        assert!(registry.compose(&BindingKey::of::<PoolConfig>()).is_empty());
    }

    #[test]
    fn test_apply_ignores_foreign_instance_type() {
        let holder = ConfigDefaultsHolder::global(|config: &mut PoolConfig| {
            config.size = 99;
        });
        let mut other = String::from("untouched");
        holder.apply(&mut other);
        assert_eq!(other, "untouched");
    }
}
