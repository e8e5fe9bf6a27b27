//! # Configuration Binding
//!
//! Materialises strongly-typed configuration objects from a flat map of
//! string-valued properties.
//!
//! This crate provides:
//! - Declarative attribute metadata for configuration types (operative
//!   names, deprecated legacy aliases, defunct names, security-sensitive
//!   flags), memoised per type
//! - String-to-value coercion through the [`FromConfigValue`] trait
//! - Layered defaults (global, then per-binding-key, in registration
//!   order)
//! - A provider registry with a publish-once instance cache and binding
//!   listeners
//! - Declarative constraint validation through the `validator` crate
//! - Batched diagnostics: a failing build reports every problem at once,
//!   and warnings flow to a [`WarningsMonitor`]
//!
//! # Example
//!
//! ```
//! use binding::{Attribute, ConfigObject, ConfigurationFactory, ConfigurationMetadata};
//! use validator::Validate;
//!
//! #[derive(Debug, Default, Validate)]
//! struct ServerConfig {
//!     #[validate(range(min = 1, max = 65535, message = "out of range"))]
//!     port: u16
//! }
//!
//! impl ServerConfig {
//!     fn set_port(&mut self, port: u16) {
//!         self.port = port;
//!     }
//! }
//!
//! impl ConfigObject for ServerConfig {
//!     fn configuration_metadata() -> ConfigurationMetadata<Self> {
//!         ConfigurationMetadata::builder()
//!             .attribute(Attribute::new("Port", "server.port", Self::set_port))
//!             .build()
//!     }
//! }
//!
//! let factory = ConfigurationFactory::new(
//!     [("server.port".to_string(), "8443".to_string())].into(),
//! );
//! let config: ServerConfig = factory.build_config().unwrap();
//! assert_eq!(config.port, 8443);
//! ```

pub mod binder;
pub mod coerce;
pub mod defaults;
pub mod factory;
pub mod key;
pub mod metadata;
pub mod module;
pub mod monitor;
pub mod problems;
pub mod provider;

pub use binder::{ConfigBinder, ConfigurationBindingListener};
pub use coerce::{FromConfigValue, parse_enum_variant, split_values};
pub use defaults::ConfigDefaultsHolder;
pub use errors::{CoerceError, ConfigurationError, Message};
pub use factory::{ConfigPropertyMetadata, ConfigurationFactory};
pub use key::{BindingKey, Qualifier};
pub use metadata::{
    Attribute, AttributeMetadata, ConfigObject, ConfigurationMetadata, Deprecation,
    InjectionPoint, metadata_for,
};
pub use module::{ConfigurationModule, ModuleElement, register_configuration_modules};
pub use monitor::{TracingWarningsMonitor, WarningsMonitor};
pub use problems::Problems;
pub use provider::{
    AnyConfigurationProvider, BindingIdentity, ConfigBinding, ConfigurationProvider,
};
pub use validator::Validate;
