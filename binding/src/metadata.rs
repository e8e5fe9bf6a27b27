//! # Configuration Metadata
//!
//! Declarative attribute metadata for configuration types.
//!
//! Where the input format names properties (`http.port`), a configuration
//! type declares attributes: an UpperCamel identity (`HttpPort`), one
//! operative injection point, and any number of legacy aliases that still
//! route into the same attribute. Types describe themselves through
//! [`ConfigObject::configuration_metadata`] with the [`Attribute`] builder;
//! the result is memoised process-wide, at most once per type.
//!
//! Structural anomalies (duplicate names, colliding properties, aliases
//! with nothing to route through) are not panics: they are recorded as
//! problems on the metadata and fail every build of the type.

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use errors::CoerceError;
use once_cell::sync::Lazy;
use validator::Validate;

use crate::coerce::FromConfigValue;
use crate::problems::Problems;

/// A configuration type that the binding engine can materialise.
///
/// `Default` is the construction contract (the fresh mutable instance that
/// defaults and setters are applied to); `Validate` supplies the
/// declarative constraint layer that runs after binding.
pub trait ConfigObject: Default + Validate + Send + Sync + 'static {
    fn configuration_metadata() -> ConfigurationMetadata<Self>;
}

/// Deprecation marker on an injection point. Routing is unaffected; use of
/// the point only produces a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deprecation {
    pub since: Option<&'static str>,
    pub for_removal: bool
}

type ApplyFn<T> = dyn Fn(&mut T, &str) -> Result<(), CoerceError> + Send + Sync;

/// The pair (property name, setter): how a raw value is pushed into a
/// configuration instance. The setter closure owns the coercion to its
/// declared value type.
pub struct InjectionPoint<T: 'static> {
    property: &'static str,
    value_type: &'static str,
    deprecation: Option<Deprecation>,
    apply: Arc<ApplyFn<T>>
}

impl<T: 'static> InjectionPoint<T> {
    fn new<V, F>(property: &'static str, setter: F) -> Self
    where
        V: FromConfigValue,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self {
            property,
            value_type: std::any::type_name::<V>(),
            deprecation: None,
            apply: Arc::new(move |instance: &mut T, raw: &str| {
                setter(instance, V::from_config_value(raw)?);
                Ok(())
            })
        }
    }

    fn alias_of(&self, property: &'static str) -> Self {
        Self {
            property,
            value_type: self.value_type,
            deprecation: None,
            apply: Arc::clone(&self.apply)
        }
    }

    pub fn property(&self) -> &'static str {
        self.property
    }

    /// Name of the setter's declared value type, for diagnostics.
    pub fn value_type(&self) -> &'static str {
        self.value_type
    }

    pub fn deprecation(&self) -> Option<Deprecation> {
        self.deprecation
    }

    /// Coerces `raw` and invokes the setter.
    pub fn apply(&self, instance: &mut T, raw: &str) -> Result<(), CoerceError> {
        (self.apply)(instance, raw)
    }
}

impl<T: 'static> std::fmt::Debug for InjectionPoint<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectionPoint")
            .field("property", &self.property)
            .field("value_type", &self.value_type)
            .field("deprecation", &self.deprecation)
            .finish_non_exhaustive()
    }
}

/// Builder for one attribute declaration.
pub struct Attribute<T: 'static> {
    name: &'static str,
    operative: Option<InjectionPoint<T>>,
    legacy: Vec<InjectionPoint<T>>,
    security_sensitive: bool,
    problems: Vec<String>
}

impl<T: 'static> Attribute<T> {
    /// An attribute with an operative (canonical) property name.
    pub fn new<V, F>(name: &'static str, property: &'static str, setter: F) -> Self
    where
        V: FromConfigValue,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self {
            name,
            operative: Some(InjectionPoint::new(property, setter)),
            legacy: Vec::new(),
            security_sensitive: false,
            problems: Vec::new()
        }
    }

    /// An attribute that only exists under a deprecated name. Using it
    /// warns that the property "has been deprecated".
    pub fn legacy_only<V, F>(name: &'static str, property: &'static str, setter: F) -> Self
    where
        V: FromConfigValue,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self {
            name,
            operative: None,
            legacy: vec![InjectionPoint::new(property, setter)],
            security_sensitive: false,
            problems: Vec::new()
        }
    }

    /// A deprecated alias routed through the operative setter.
    #[must_use]
    pub fn legacy(mut self, property: &'static str) -> Self {
        match &self.operative {
            Some(operative) => self.legacy.push(operative.alias_of(property)),
            None => self.problems.push(format!(
                "Legacy alias '{}' on attribute '{}' has no operative setter to route through",
                property, self.name
            ))
        }
        self
    }

    /// A deprecated alias with its own setter (and therefore possibly its
    /// own value type).
    #[must_use]
    pub fn legacy_setter<V, F>(mut self, property: &'static str, setter: F) -> Self
    where
        V: FromConfigValue,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.legacy.push(InjectionPoint::new(property, setter));
        self
    }

    /// Marks raw values of this attribute as never printable in
    /// diagnostics.
    #[must_use]
    pub fn security_sensitive(mut self) -> Self {
        self.security_sensitive = true;
        self
    }

    /// Marks the operative setter as deprecated.
    #[must_use]
    pub fn deprecated(mut self, since: Option<&'static str>, for_removal: bool) -> Self {
        match &mut self.operative {
            Some(operative) => {
                operative.deprecation = Some(Deprecation { since, for_removal });
            }
            None => self.problems.push(format!(
                "Attribute '{}' carries a deprecation marker but has no operative setter",
                self.name
            ))
        }
        self
    }
}

/// Finalised metadata for one attribute.
#[derive(Debug)]
pub struct AttributeMetadata<T: 'static> {
    name: &'static str,
    operative: Option<InjectionPoint<T>>,
    legacy: Vec<InjectionPoint<T>>,
    security_sensitive: bool
}

impl<T: 'static> AttributeMetadata<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn operative(&self) -> Option<&InjectionPoint<T>> {
        self.operative.as_ref()
    }

    /// Legacy injection points in declared order.
    pub fn legacy(&self) -> &[InjectionPoint<T>] {
        &self.legacy
    }

    pub fn is_security_sensitive(&self) -> bool {
        self.security_sensitive
    }
}

/// Everything the engine knows about a configuration type: its attributes
/// in declaration order, its defunct property names, and any structural
/// problems found while assembling the declaration.
#[derive(Debug)]
pub struct ConfigurationMetadata<T: 'static> {
    type_name: &'static str,
    attributes: Vec<AttributeMetadata<T>>,
    defunct_properties: BTreeSet<String>,
    problems: Problems
}

impl<T: 'static> ConfigurationMetadata<T> {
    #[must_use]
    pub fn builder() -> MetadataBuilder<T> {
        MetadataBuilder {
            type_name: std::any::type_name::<T>(),
            attributes: Vec::new(),
            defunct_properties: BTreeSet::new(),
            problems: Problems::new()
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn attributes(&self) -> &[AttributeMetadata<T>] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeMetadata<T>> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    pub fn defunct_properties(&self) -> &BTreeSet<String> {
        &self.defunct_properties
    }

    /// Structural problems; any error here fails every build of the type.
    pub fn problems(&self) -> &Problems {
        &self.problems
    }
}

pub struct MetadataBuilder<T: 'static> {
    type_name: &'static str,
    attributes: Vec<AttributeMetadata<T>>,
    defunct_properties: BTreeSet<String>,
    problems: Problems
}

impl<T: 'static> MetadataBuilder<T> {
    #[must_use]
    pub fn attribute(mut self, attribute: Attribute<T>) -> Self {
        for text in &attribute.problems {
            self.problems.add_error(format!("{} (class [{}])", text, self.type_name));
        }
        self.attributes.push(AttributeMetadata {
            name: attribute.name,
            operative: attribute.operative,
            legacy: attribute.legacy,
            security_sensitive: attribute.security_sensitive
        });
        self
    }

    /// Property names that must not appear in the input at all.
    #[must_use]
    pub fn defunct<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defunct_properties.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn build(mut self) -> ConfigurationMetadata<T> {
        self.check_structure();
        ConfigurationMetadata {
            type_name: self.type_name,
            attributes: self.attributes,
            defunct_properties: self.defunct_properties,
            problems: self.problems
        }
    }

    fn check_structure(&mut self) {
        let mut attribute_names: HashSet<&'static str> = HashSet::new();
        let mut claimed_properties: HashSet<&'static str> = HashSet::new();

        for attribute in &self.attributes {
            if attribute.name.is_empty() {
                self.problems.add_error(format!(
                    "Attribute with an empty name (class [{}])",
                    self.type_name
                ));
            }
            if !attribute_names.insert(attribute.name) {
                self.problems.add_error(format!(
                    "Attribute '{}' is declared twice (class [{}])",
                    attribute.name, self.type_name
                ));
            }
            if attribute.operative.is_none() && attribute.legacy.is_empty() {
                self.problems.add_error(format!(
                    "Attribute '{}' has no injection points (class [{}])",
                    attribute.name, self.type_name
                ));
            }

            let points = attribute.operative.iter().chain(&attribute.legacy);
            for point in points {
                if point.property.is_empty() {
                    self.problems.add_error(format!(
                        "Attribute '{}' has an injection point with an empty property name (class [{}])",
                        attribute.name, self.type_name
                    ));
                    continue;
                }
                if !claimed_properties.insert(point.property) {
                    self.problems.add_error(format!(
                        "Property '{}' is claimed by more than one injection point (class [{}])",
                        point.property, self.type_name
                    ));
                }
            }
        }
    }
}

static METADATA_CACHE: Lazy<DashMap<TypeId, Arc<dyn Any + Send + Sync>>> =
    Lazy::new(DashMap::new);

/// Memoised metadata lookup. The declaration runs at most once per type
/// per process; every subsequent call shares the cached record.
pub fn metadata_for<T: ConfigObject>() -> Arc<ConfigurationMetadata<T>> {
    let erased = METADATA_CACHE
        .entry(TypeId::of::<T>())
        .or_insert_with(|| Arc::new(T::configuration_metadata()) as Arc<dyn Any + Send + Sync>)
        .value()
        .clone();
    erased
        .downcast::<ConfigurationMetadata<T>>()
        .expect("metadata cache entries are keyed by TypeId")
}

/// `snake_case` field name to the UpperCamel attribute identity, used to
/// map constraint violations back onto attributes.
pub(crate) fn to_upper_camel(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for segment in field.split('_') {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Validate)]
    struct SampleConfig {
        port: u16,
        name: Option<String>
    }

    impl SampleConfig {
        fn set_port(&mut self, port: u16) {
            self.port = port;
        }

        fn set_name(&mut self, name: String) {
            self.name = Some(name);
        }
    }

    impl ConfigObject for SampleConfig {
        fn configuration_metadata() -> ConfigurationMetadata<Self> {
            ConfigurationMetadata::builder()
                .attribute(
                    Attribute::new("Port", "sample.port", Self::set_port)
                        .legacy("sample.old-port"),
                )
                .attribute(Attribute::new("Name", "sample.name", Self::set_name))
                .defunct(["sample.retired"])
                .build()
        }
    }

    #[test]
    fn test_metadata_shape() {
        let metadata = SampleConfig::configuration_metadata();
        assert!(metadata.problems().errors().is_empty());
        assert_eq!(metadata.attributes().len(), 2);

        let port = metadata.attribute("Port").unwrap();
        assert_eq!(port.operative().unwrap().property(), "sample.port");
        assert_eq!(port.legacy().len(), 1);
        assert_eq!(port.legacy()[0].property(), "sample.old-port");
        assert!(metadata.defunct_properties().contains("sample.retired"));
    }

    #[test]
    fn test_alias_shares_operative_setter() {
        let metadata = SampleConfig::configuration_metadata();
        let port = metadata.attribute("Port").unwrap();

        let mut instance = SampleConfig::default();
        port.legacy()[0].apply(&mut instance, "9000").unwrap();
        assert_eq!(instance.port, 9000);
    }

    #[test]
    fn test_legacy_setter_uses_its_own_value_type() {
        let metadata: ConfigurationMetadata<SampleConfig> = ConfigurationMetadata::builder()
            .attribute(
                Attribute::new("Port", "sample.port", SampleConfig::set_port).legacy_setter(
                    "sample.port-offset",
                    |config: &mut SampleConfig, offset: i32| {
                        config.port = (9000 + offset) as u16;
                    },
                ),
            )
            .build();
        assert!(metadata.problems().errors().is_empty());

        let port = metadata.attribute("Port").unwrap();
        assert_eq!(port.legacy().len(), 1);
        let legacy = &port.legacy()[0];
        assert_eq!(legacy.property(), "sample.port-offset");
        assert_ne!(
            legacy.value_type(),
            port.operative().unwrap().value_type(),
            "the alias declares its own value type"
        );

        let mut instance = SampleConfig::default();
        legacy.apply(&mut instance, "42").unwrap();
        assert_eq!(instance.port, 9042);
    }

    #[test]
    fn test_duplicate_attribute_name_is_structural_problem() {
        let metadata: ConfigurationMetadata<SampleConfig> = ConfigurationMetadata::builder()
            .attribute(Attribute::new("Port", "a.port", SampleConfig::set_port))
            .attribute(Attribute::new("Port", "b.port", SampleConfig::set_port))
            .build();
        assert!(metadata.problems().has_errors());
        assert!(
            metadata.problems().errors()[0]
                .text()
                .contains("declared twice")
        );
    }

    #[test]
    fn test_duplicate_property_is_structural_problem() {
        let metadata: ConfigurationMetadata<SampleConfig> = ConfigurationMetadata::builder()
            .attribute(Attribute::new("Port", "same.property", SampleConfig::set_port))
            .attribute(Attribute::new("Name", "same.property", SampleConfig::set_name))
            .build();
        assert!(metadata.problems().has_errors());
        assert!(
            metadata.problems().errors()[0]
                .text()
                .contains("more than one injection point")
        );
    }

    #[test]
    fn test_alias_without_operative_is_structural_problem() {
        let metadata: ConfigurationMetadata<SampleConfig> = ConfigurationMetadata::builder()
            .attribute(
                Attribute::legacy_only("Name", "old.name", SampleConfig::set_name)
                    .legacy("older.name"),
            )
            .build();
        assert!(metadata.problems().has_errors());
        assert!(
            metadata.problems().errors()[0]
                .text()
                .contains("no operative setter")
        );
    }

    #[test]
    fn test_cache_returns_shared_record() {
        let first = metadata_for::<SampleConfig>();
        let second = metadata_for::<SampleConfig>();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_to_upper_camel() {
        assert_eq!(to_upper_camel("http_port"), "HttpPort");
        assert_eq!(to_upper_camel("port"), "Port");
        assert_eq!(to_upper_camel("max_idle_time_ms"), "MaxIdleTimeMs");
    }
}
