//! Binding listeners and the binder handed to them.
//!
//! A listener sees every registered provider exactly once, regardless of
//! whether it was added before or after the provider. Notifications run
//! outside the registrar lock, so a listener may register further
//! bindings through the [`ConfigBinder`] re-entrantly.

use std::sync::Arc;

use crate::factory::ConfigurationFactory;
use crate::metadata::ConfigObject;
use crate::provider::{BindingIdentity, ConfigBinding, ConfigurationProvider};

/// Observer of provider registrations.
pub trait ConfigurationBindingListener: Send + Sync {
    fn configuration_bound(&self, binding: &BindingIdentity, binder: &ConfigBinder);
}

/// Registers bindings against a factory on behalf of listeners and
/// modules.
pub struct ConfigBinder {
    factory: Arc<ConfigurationFactory>,
    source: Option<String>
}

impl ConfigBinder {
    pub fn new(factory: Arc<ConfigurationFactory>) -> Self {
        Self {
            factory,
            source: None
        }
    }

    /// A binder whose registrations carry a provenance source for
    /// diagnostics.
    pub fn with_source(factory: Arc<ConfigurationFactory>, source: impl Into<String>) -> Self {
        Self {
            factory,
            source: Some(source.into())
        }
    }

    pub fn bind<T: ConfigObject>(&self) -> Arc<ConfigurationProvider<T>> {
        self.bind_binding(ConfigBinding::of())
    }

    pub fn bind_prefixed<T: ConfigObject>(
        &self,
        prefix: impl Into<String>,
    ) -> Arc<ConfigurationProvider<T>> {
        self.bind_binding(ConfigBinding::prefixed(prefix))
    }

    pub fn bind_named<T: ConfigObject>(
        &self,
        name: impl Into<String>,
    ) -> Arc<ConfigurationProvider<T>> {
        self.bind_binding(ConfigBinding::named(name))
    }

    pub fn bind_binding<T: ConfigObject>(
        &self,
        binding: ConfigBinding<T>,
    ) -> Arc<ConfigurationProvider<T>> {
        let provider = ConfigurationProvider::new(binding);
        self.factory.register_provider(&provider, self.source.clone());
        provider
    }
}
