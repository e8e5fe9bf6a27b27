//! # Module Scanning
//!
//! Walks externally-supplied module elements and dispatches them into the
//! factory: binding listeners, defaults holders, and providers each go to
//! their registration point, and structural problems surfaced by the
//! element stream come back to the caller as one batch.

use std::sync::Arc;

use errors::Message;

use crate::binder::ConfigurationBindingListener;
use crate::defaults::ConfigDefaultsHolder;
use crate::factory::ConfigurationFactory;
use crate::metadata::ConfigObject;
use crate::provider::{AnyConfigurationProvider, ConfigurationProvider};

/// One element contributed by a module.
pub enum ModuleElement {
    /// A binding listener to install.
    Listener(Arc<dyn ConfigurationBindingListener>),
    /// A defaults holder to register.
    Defaults(ConfigDefaultsHolder),
    /// A provider to register, with an optional provenance source for
    /// diagnostics.
    Provider {
        provider: Arc<dyn AnyConfigurationProvider>,
        source: Option<String>
    },
    /// A structural problem surfaced by the element stream itself.
    Problem(Message)
}

impl ModuleElement {
    pub fn listener(listener: impl ConfigurationBindingListener + 'static) -> Self {
        Self::Listener(Arc::new(listener))
    }

    pub fn defaults(holder: ConfigDefaultsHolder) -> Self {
        Self::Defaults(holder)
    }

    pub fn provider<T: ConfigObject>(
        provider: Arc<ConfigurationProvider<T>>,
        source: Option<String>,
    ) -> Self {
        Self::Provider { provider, source }
    }

    pub fn problem(message: impl Into<String>) -> Self {
        Self::Problem(Message::new(message))
    }
}

/// A source of configuration elements.
pub trait ConfigurationModule: Send + Sync {
    /// Hook invoked for every module before any element is walked, so
    /// configuration-aware modules can lazily register further providers.
    /// The default does nothing.
    fn set_configuration_factory(&mut self, _factory: &Arc<ConfigurationFactory>) {}

    fn elements(&self) -> Vec<ModuleElement>;
}

/// Registers everything the given modules contribute and returns the
/// problems the element streams surfaced, as one batch.
pub fn register_configuration_modules(
    factory: &Arc<ConfigurationFactory>,
    modules: &mut [Box<dyn ConfigurationModule>],
) -> Vec<Message> {
    // factory hand-off happens for every module up front, before any
    // element of any module is walked
    for module in modules.iter_mut() {
        module.set_configuration_factory(factory);
    }

    let mut problems = Vec::new();
    for module in modules.iter() {
        for element in module.elements() {
            match element {
                ModuleElement::Listener(listener) => factory.add_listener(listener),
                ModuleElement::Defaults(holder) => factory.register_config_defaults(holder),
                ModuleElement::Provider { provider, source } => {
                    factory.register_provider_erased(provider, source)
                }
                ModuleElement::Problem(message) => problems.push(message)
            }
        }
    }
    problems
}
