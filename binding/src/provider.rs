//! # Configuration Providers
//!
//! A [`ConfigBinding`] names what to build (type, qualifier, prefix); a
//! [`ConfigurationProvider`] is the registered handle that builds it
//! through the factory it was registered with. Binding identity (key plus
//! prefix) is both the instance cache key and the registered-provider
//! identity, so two providers for the same binding share one instance.

use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use errors::ConfigurationError;
use parking_lot::Mutex;

use crate::factory::ConfigurationFactory;
use crate::key::BindingKey;
use crate::metadata::ConfigObject;

/// What to build: a configuration type with an optional qualifier and an
/// optional property-name prefix.
pub struct ConfigBinding<T: ConfigObject> {
    key: BindingKey,
    prefix: Option<String>,
    _marker: PhantomData<fn() -> T>
}

impl<T: ConfigObject> ConfigBinding<T> {
    /// The unannotated, unprefixed binding of `T`.
    #[must_use]
    pub fn of() -> Self {
        Self {
            key: BindingKey::of::<T>(),
            prefix: None,
            _marker: PhantomData
        }
    }

    /// Binding whose property names are all read under `prefix + "."`.
    #[must_use]
    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            key: BindingKey::of::<T>(),
            prefix: Some(prefix.into()),
            _marker: PhantomData
        }
    }

    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            key: BindingKey::named::<T>(name),
            prefix: None,
            _marker: PhantomData
        }
    }

    #[must_use]
    pub fn named_prefixed(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            key: BindingKey::named::<T>(name),
            prefix: Some(prefix.into()),
            _marker: PhantomData
        }
    }

    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    #[must_use]
    pub fn identity(&self) -> BindingIdentity {
        BindingIdentity {
            key: self.key.clone(),
            prefix: self.prefix.clone()
        }
    }
}

impl<T: ConfigObject> Clone for ConfigBinding<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            prefix: self.prefix.clone(),
            _marker: PhantomData
        }
    }
}

impl<T: ConfigObject> std::fmt::Debug for ConfigBinding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigBinding")
            .field("key", &self.key)
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// Type-erased binding identity: the instance cache key and the payload
/// handed to binding listeners.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingIdentity {
    key: BindingKey,
    prefix: Option<String>
}

impl BindingIdentity {
    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn config_type(&self) -> &'static str {
        self.key.type_name()
    }
}

/// A registered handle that materialises one binding.
///
/// The factory holds providers strongly; the provider holds the factory
/// weakly, so the registration graph cannot leak.
pub struct ConfigurationProvider<T: ConfigObject> {
    binding: ConfigBinding<T>,
    factory: Mutex<Weak<ConfigurationFactory>>,
    binding_source: Mutex<Option<String>>,
    weak_self: Weak<ConfigurationProvider<T>>
}

impl<T: ConfigObject> ConfigurationProvider<T> {
    pub fn new(binding: ConfigBinding<T>) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            binding,
            factory: Mutex::new(Weak::new()),
            binding_source: Mutex::new(None),
            weak_self: weak_self.clone()
        })
    }

    pub fn binding(&self) -> &ConfigBinding<T> {
        &self.binding
    }

    /// Builds (or fetches the already-built) instance for this binding.
    ///
    /// Fails if the provider was never registered with a factory, or if
    /// the build itself fails.
    pub fn get(&self) -> Result<Arc<T>, ConfigurationError> {
        let factory = self.factory.lock().upgrade().ok_or_else(|| {
            ConfigurationError::from_message(format!(
                "Configuration provider for [{}] is not registered with a factory",
                self.binding.key().type_name()
            ))
        })?;
        let this = self
            .weak_self
            .upgrade()
            .expect("providers are only ever constructed inside an Arc");
        factory.build(&this)
    }
}

impl<T: ConfigObject> std::fmt::Debug for ConfigurationProvider<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationProvider")
            .field("binding", &self.binding)
            .field("binding_source", &*self.binding_source.lock())
            .finish_non_exhaustive()
    }
}

/// Type-erased provider surface used by the registry, listeners, and
/// module scanning.
pub trait AnyConfigurationProvider: Send + Sync {
    fn identity(&self) -> BindingIdentity;

    fn binding_source(&self) -> Option<String>;

    fn set_binding_source(&self, source: Option<String>);

    /// Attaches the factory back-reference at registration time.
    fn attach_factory(&self, factory: &Arc<ConfigurationFactory>);

    /// Triggers the build for whole-graph validation; the instance itself
    /// is left in the factory's cache.
    fn trigger_build(
        self: Arc<Self>,
        factory: &Arc<ConfigurationFactory>,
    ) -> Result<(), ConfigurationError>;
}

impl<T: ConfigObject> AnyConfigurationProvider for ConfigurationProvider<T> {
    fn identity(&self) -> BindingIdentity {
        self.binding.identity()
    }

    fn binding_source(&self) -> Option<String> {
        self.binding_source.lock().clone()
    }

    fn set_binding_source(&self, source: Option<String>) {
        *self.binding_source.lock() = source;
    }

    fn attach_factory(&self, factory: &Arc<ConfigurationFactory>) {
        *self.factory.lock() = Arc::downgrade(factory);
    }

    fn trigger_build(
        self: Arc<Self>,
        factory: &Arc<ConfigurationFactory>,
    ) -> Result<(), ConfigurationError> {
        factory.build(&self).map(|_| ())
    }
}
