//! # Configuration Factory
//!
//! The binding engine and provider registry. A factory owns one immutable
//! property map for its lifetime; providers registered against it build
//! strongly-typed configuration instances from that map, at most one
//! instance per binding identity.
//!
//! A build runs in phases, failing only at phase boundaries so that one
//! bad configuration reports everything wrong with it at once:
//! metadata problems, then attribute binding (legacy resolution, coercion,
//! defunct checks), then declarative constraint validation.

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use errors::{ConfigurationError, Message};
use parking_lot::Mutex;
use tracing::debug;
use validator::ValidationErrorsKind;

use crate::binder::{ConfigBinder, ConfigurationBindingListener};
use crate::defaults::{ConfigDefaultsHolder, DefaultsRegistry};
use crate::key::BindingKey;
use crate::metadata::{
    AttributeMetadata, ConfigObject, ConfigurationMetadata, Deprecation, InjectionPoint,
    metadata_for, to_upper_camel,
};
use crate::monitor::WarningsMonitor;
use crate::problems::Problems;
use crate::provider::{AnyConfigurationProvider, BindingIdentity, ConfigurationProvider};

/// Replacement for raw values of security-sensitive attributes in every
/// diagnostic.
const REDACTED: &str = "[REDACTED]";

/// A consumed property: its full (prefixed) name and whether its raw value
/// may be echoed in diagnostics. Ordered by name for deterministic
/// reporting.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigPropertyMetadata {
    name: String,
    security_sensitive: bool
}

impl ConfigPropertyMetadata {
    pub fn new(name: impl Into<String>, security_sensitive: bool) -> Self {
        Self {
            name: name.into(),
            security_sensitive
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_security_sensitive(&self) -> bool {
        self.security_sensitive
    }
}

struct ConfigurationHolder<T> {
    instance: T,
    problems: Problems
}

#[derive(Default)]
struct Registrar {
    identities: HashSet<BindingIdentity>,
    providers: Vec<Arc<dyn AnyConfigurationProvider>>,
    listeners: Vec<Arc<dyn ConfigurationBindingListener>>
}

/// The configuration factory: property map, caches, registered providers,
/// listeners, and defaults.
///
/// Factories are always handed out as `Arc` (registration wires a
/// back-reference into every provider), so the constructors return
/// `Arc<Self>`.
pub struct ConfigurationFactory {
    properties: HashMap<String, String>,
    warnings_monitor: Option<Arc<dyn WarningsMonitor>>,
    instance_cache: DashMap<BindingIdentity, Arc<dyn Any + Send + Sync>>,
    used_properties: DashSet<ConfigPropertyMetadata>,
    seen_properties: DashSet<String>,
    registrar: Mutex<Registrar>,
    defaults: DefaultsRegistry,
    weak_self: Weak<ConfigurationFactory>
}

impl ConfigurationFactory {
    pub fn new(properties: HashMap<String, String>) -> Arc<Self> {
        Self::assemble(properties, None)
    }

    pub fn with_warnings_monitor(
        properties: HashMap<String, String>,
        monitor: Arc<dyn WarningsMonitor>,
    ) -> Arc<Self> {
        Self::assemble(properties, Some(monitor))
    }

    fn assemble(
        properties: HashMap<String, String>,
        warnings_monitor: Option<Arc<dyn WarningsMonitor>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            properties,
            warnings_monitor,
            instance_cache: DashMap::new(),
            used_properties: DashSet::new(),
            seen_properties: DashSet::new(),
            registrar: Mutex::new(Registrar::default()),
            defaults: DefaultsRegistry::default(),
            weak_self: weak_self.clone()
        })
    }

    fn shared(&self) -> Arc<Self> {
        self.weak_self
            .upgrade()
            .expect("factories are only ever constructed inside an Arc")
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    /// Marks a property as consumed by an external reader.
    pub fn consume_property(&self, property: ConfigPropertyMetadata) {
        self.used_properties.insert(property);
    }

    /// Properties for which coercion was attempted, sorted by name.
    pub fn used_properties(&self) -> BTreeSet<ConfigPropertyMetadata> {
        self.used_properties
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Every property name any binding has matched syntactically so far.
    pub fn seen_properties(&self) -> BTreeSet<String> {
        self.seen_properties
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Providers registered so far, in registration order.
    pub fn registered_providers(&self) -> Vec<Arc<dyn AnyConfigurationProvider>> {
        self.registrar.lock().providers.clone()
    }

    pub fn register_provider<T: ConfigObject>(
        &self,
        provider: &Arc<ConfigurationProvider<T>>,
        source: Option<String>,
    ) {
        self.register_provider_erased(provider.clone(), source);
    }

    pub(crate) fn register_provider_erased(
        &self,
        provider: Arc<dyn AnyConfigurationProvider>,
        source: Option<String>,
    ) {
        provider.attach_factory(&self.shared());
        // a None source never clears a previously recorded one
        if source.is_some() {
            provider.set_binding_source(source);
        }

        let (fresh, listeners) = {
            let mut registrar = self.registrar.lock();
            if registrar.identities.insert(provider.identity()) {
                registrar.providers.push(provider.clone());
                (true, registrar.listeners.clone())
            } else {
                (false, Vec::new())
            }
        };
        if !fresh {
            return;
        }

        let identity = provider.identity();
        debug!(config = identity.config_type(), "registered configuration provider");
        if listeners.is_empty() {
            return;
        }
        let binder = ConfigBinder::new(self.shared());
        for listener in listeners {
            listener.configuration_bound(&identity, &binder);
        }
    }

    /// Adds a listener and replays every already-registered provider to it.
    pub fn add_listener(&self, listener: Arc<dyn ConfigurationBindingListener>) {
        let providers = {
            let mut registrar = self.registrar.lock();
            registrar.listeners.push(listener.clone());
            registrar.providers.clone()
        };
        let binder = ConfigBinder::new(self.shared());
        for provider in providers {
            listener.configuration_bound(&provider.identity(), &binder);
        }
    }

    pub fn register_config_defaults(&self, holder: ConfigDefaultsHolder) {
        self.defaults.register(holder);
    }

    /// Defaults applied to every binding of `T`.
    pub fn register_global_defaults<T, F>(&self, defaults: F)
    where
        T: ConfigObject,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.defaults.register(ConfigDefaultsHolder::global(defaults));
    }

    /// One-shot, uncached build of `T` with no prefix and no defaults.
    pub fn build_config<T: ConfigObject>(&self) -> Result<T, ConfigurationError> {
        Ok(self.build_internal::<T>(None, &[])?.instance)
    }

    /// One-shot, uncached build of `T` reading properties under `prefix`.
    pub fn build_config_prefixed<T: ConfigObject>(
        &self,
        prefix: &str,
    ) -> Result<T, ConfigurationError> {
        Ok(self.build_internal::<T>(Some(prefix), &[])?.instance)
    }

    /// A fresh instance with metadata checked and composed defaults
    /// applied, but no property bound. Configuration inspection support.
    pub fn build_defaulted<T: ConfigObject>(
        &self,
        key: &BindingKey,
    ) -> Result<T, ConfigurationError> {
        debug_assert_eq!(key.type_id(), TypeId::of::<T>());
        let metadata = metadata_for::<T>();
        metadata.problems().throw_if_has_errors()?;

        let mut instance = T::default();
        for holder in self.defaults.compose(key) {
            holder.apply(&mut instance);
        }
        Ok(instance)
    }

    /// Builds the instance for a provider's binding, publishing it into
    /// the instance cache. Concurrent builds of the same binding race;
    /// the first published instance wins and losers are discarded.
    pub fn build<T: ConfigObject>(
        &self,
        provider: &Arc<ConfigurationProvider<T>>,
    ) -> Result<Arc<T>, ConfigurationError> {
        self.register_provider_erased(provider.clone(), None);

        let identity = provider.binding().identity();
        if let Some(cached) = self.instance_cache.get(&identity) {
            return Ok(downcast_instance::<T>(cached.value().clone()));
        }

        let defaults = self.defaults.compose(provider.binding().key());
        let holder = self.build_internal::<T>(provider.binding().prefix(), &defaults)?;
        debug!(config = identity.config_type(), "built configuration instance");

        if let Some(monitor) = &self.warnings_monitor {
            for warning in holder.problems.warnings() {
                monitor.on_warning(&warning.to_string());
            }
        }

        let fresh: Arc<T> = Arc::new(holder.instance);
        let published = match self.instance_cache.entry(identity) {
            Entry::Occupied(existing) => downcast_instance::<T>(existing.get().clone()),
            Entry::Vacant(slot) => {
                slot.insert(fresh.clone());
                fresh
            }
        };
        Ok(published)
    }

    /// Triggers every registered provider's build and collects the
    /// failures into one batch, each message annotated with its
    /// provider's binding source.
    pub fn validate_registered(&self) -> Vec<Message> {
        let providers = self.registrar.lock().providers.clone();
        let factory = self.shared();

        let mut messages = Vec::new();
        for provider in providers {
            let source = provider.binding_source();
            if let Err(error) = provider.clone().trigger_build(&factory) {
                for message in error.messages() {
                    messages.push(message.annotated(source.clone()));
                }
            }
        }
        messages
    }

    fn build_internal<T: ConfigObject>(
        &self,
        prefix: Option<&str>,
        defaults: &[ConfigDefaultsHolder],
    ) -> Result<ConfigurationHolder<T>, ConfigurationError> {
        let prefix = prefix.map(|value| format!("{value}.")).unwrap_or_default();
        let mut problems = Problems::new();

        let metadata = metadata_for::<T>();
        problems.record(metadata.problems().clone());
        problems.throw_if_has_errors()?;

        let mut instance = T::default();
        for holder in defaults {
            holder.apply(&mut instance);
        }

        for attribute in metadata.attributes() {
            if let Some(operative) = attribute.operative() {
                self.seen_properties
                    .insert(format!("{prefix}{}", operative.property()));
            }
            let mut attribute_problems = Problems::new();
            self.bind_attribute(&mut instance, attribute, &prefix, &mut attribute_problems);
            problems.record(attribute_problems);
        }

        for name in metadata.defunct_properties() {
            let full = format!("{prefix}{name}");
            if !name.is_empty() && self.properties.contains_key(&full) {
                problems.add_error(format!(
                    "Defunct property '{}' (class [{}]) cannot be configured.",
                    full,
                    metadata.type_name()
                ));
            }
        }
        problems.throw_if_has_errors()?;

        self.check_constraints(&instance, &metadata, &prefix, &mut problems);
        problems.throw_if_has_errors()?;

        Ok(ConfigurationHolder { instance, problems })
    }

    fn bind_attribute<T: ConfigObject>(
        &self,
        instance: &mut T,
        attribute: &AttributeMetadata<T>,
        prefix: &str,
        problems: &mut Problems,
    ) {
        let chosen = self.find_operative(attribute, prefix, problems);
        if problems.has_errors() {
            // conflicting legacy values: nothing is assigned
            return;
        }
        let Some((point, full_name, raw)) = chosen else {
            // no injection from configuration, defaults stand
            return;
        };

        if let Some(deprecation) = point.deprecation() {
            problems.add_warning(describe_deprecation(&full_name, deprecation));
        }

        self.used_properties.insert(ConfigPropertyMetadata::new(
            full_name.clone(),
            attribute.is_security_sensitive(),
        ));

        if let Err(cause) = point.apply(instance, raw) {
            problems.add_error_with_cause(
                format!(
                    "Invalid value '{}' for type {} (property '{}')",
                    printable(raw, attribute.is_security_sensitive()),
                    point.value_type(),
                    full_name
                ),
                cause.to_string(),
            );
        }
    }

    /// Resolves which injection point supplies this attribute's value.
    ///
    /// The operative name wins outright when set. Otherwise the first
    /// legacy name (in declared order) that supplies a value wins, and
    /// every later legacy that also supplies one is a conflict error.
    /// Every supplied legacy name warns either way.
    fn find_operative<'a, T: ConfigObject>(
        &'a self,
        attribute: &'a AttributeMetadata<T>,
        prefix: &str,
        problems: &mut Problems,
    ) -> Option<(&'a InjectionPoint<T>, String, &'a str)> {
        let sensitive = attribute.is_security_sensitive();
        let operative_name = attribute
            .operative()
            .map(|point| format!("{prefix}{}", point.property()));

        let mut chosen: Option<(&InjectionPoint<T>, String, &str)> = None;
        let mut chosen_is_legacy = false;

        if let (Some(point), Some(name)) = (attribute.operative(), operative_name.clone()) {
            if let Some(raw) = self.properties.get(&name).map(String::as_str) {
                chosen = Some((point, name, raw));
            }
        }

        for legacy in attribute.legacy() {
            let full = format!("{prefix}{}", legacy.property());
            let Some(raw) = self.properties.get(&full).map(String::as_str) else {
                continue;
            };

            match &operative_name {
                Some(operative) => problems.add_warning(format!(
                    "Configuration property '{}' has been replaced. Use '{}' instead.",
                    full, operative
                )),
                None => problems.add_warning(format!(
                    "Configuration property '{}' has been deprecated.",
                    full
                ))
            }

            if chosen.is_none() {
                chosen = Some((legacy, full, raw));
                chosen_is_legacy = true;
            } else if chosen_is_legacy {
                if let Some((_, winner_name, winner_raw)) = chosen.as_ref() {
                    problems.add_error(format!(
                        "Configuration property '{}' (={}) conflicts with property '{}' (={})",
                        full,
                        printable(raw, sensitive),
                        winner_name,
                        printable(winner_raw, sensitive)
                    ));
                }
            }
            // when the operative value holds, legacy suppliers only warn
        }

        chosen
    }

    fn check_constraints<T: ConfigObject>(
        &self,
        instance: &T,
        metadata: &ConfigurationMetadata<T>,
        prefix: &str,
        problems: &mut Problems,
    ) {
        let Err(violations) = instance.validate() else {
            return;
        };

        let mut fields: Vec<(&str, &ValidationErrorsKind)> = violations
            .errors()
            .iter()
            .map(|(field, kind)| (field.as_ref(), kind))
            .collect();
        fields.sort_by(|left, right| left.0.cmp(right.0));

        for (field, kind) in fields {
            // attributes are leaf-valued; nested violation kinds cannot
            // correspond to an injection point
            let ValidationErrorsKind::Field(field_errors) = kind else {
                continue;
            };
            let attribute = metadata.attribute(&to_upper_camel(field));
            for violation in field_errors {
                let message = violation
                    .message
                    .as_deref()
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("violates constraint '{}'", violation.code));
                match attribute.and_then(AttributeMetadata::operative) {
                    Some(operative) => problems.add_error(format!(
                        "Invalid configuration property {}{}: {} (for class {}.{})",
                        prefix,
                        operative.property(),
                        message,
                        metadata.type_name(),
                        field
                    )),
                    None => problems.add_error(format!(
                        "Invalid configuration property with prefix '{}': {} (for class {}.{})",
                        prefix,
                        message,
                        metadata.type_name(),
                        field
                    ))
                }
            }
        }
    }
}

impl std::fmt::Debug for ConfigurationFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationFactory")
            .field("properties", &self.properties.len())
            .field("cached_instances", &self.instance_cache.len())
            .finish_non_exhaustive()
    }
}

fn downcast_instance<T: ConfigObject>(instance: Arc<dyn Any + Send + Sync>) -> Arc<T> {
    instance
        .downcast::<T>()
        .expect("instance cache entries are keyed by binding type")
}

fn printable(raw: &str, security_sensitive: bool) -> &str {
    if security_sensitive { REDACTED } else { raw }
}

fn describe_deprecation(full_name: &str, deprecation: Deprecation) -> String {
    let mut notice = format!("Configuration property '{}' is deprecated", full_name);
    if let Some(since) = deprecation.since {
        if !since.is_empty() {
            notice.push_str(" since ");
            notice.push_str(since);
        }
    }
    if deprecation.for_removal {
        notice.push_str(" and will be removed in the future");
    } else {
        notice.push_str(" and should not be used");
    }
    notice
}
