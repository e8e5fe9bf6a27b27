//! Binding keys.
//!
//! A key identifies a configuration type together with an optional
//! qualifier. The `GlobalDefaults` qualifier is a sentinel under which
//! type-wide defaults are registered; it never identifies a binding of its
//! own.

use std::any::TypeId;

/// Qualifier part of a [`BindingKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Qualifier {
    /// The unannotated binding of a type.
    None,
    /// A named binding, distinguishing multiple bindings of one type.
    Named(String),
    /// Sentinel for defaults that apply to every binding of the type.
    GlobalDefaults
}

/// Identity of a configuration binding: the configuration type plus an
/// optional qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingKey {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: Qualifier
}

impl BindingKey {
    /// Key for the unannotated binding of `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            qualifier: Qualifier::None
        }
    }

    /// Key for a named binding of `T`.
    #[must_use]
    pub fn named<T: 'static>(name: impl Into<String>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            qualifier: Qualifier::Named(name.into())
        }
    }

    /// The sentinel key collecting defaults that apply to every binding of
    /// `T` regardless of qualifier.
    #[must_use]
    pub fn global_defaults<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            qualifier: Qualifier::GlobalDefaults
        }
    }

    /// This key's global-defaults counterpart (same type, sentinel
    /// qualifier).
    #[must_use]
    pub fn as_global_defaults(&self) -> Self {
        Self {
            type_id: self.type_id,
            type_name: self.type_name,
            qualifier: Qualifier::GlobalDefaults
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn qualifier(&self) -> &Qualifier {
        &self.qualifier
    }

    pub fn is_global_defaults(&self) -> bool {
        self.qualifier == Qualifier::GlobalDefaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Alpha;
    struct Beta;

    #[test]
    fn test_keys_distinguish_types() {
        assert_ne!(BindingKey::of::<Alpha>(), BindingKey::of::<Beta>());
    }

    #[test]
    fn test_keys_distinguish_qualifiers() {
        let plain = BindingKey::of::<Alpha>();
        let named = BindingKey::named::<Alpha>("worker");
        let global = BindingKey::global_defaults::<Alpha>();
        assert_ne!(plain, named);
        assert_ne!(plain, global);
        assert_ne!(named, global);
    }

    #[test]
    fn test_as_global_defaults_keeps_type() {
        let named = BindingKey::named::<Alpha>("worker");
        let global = named.as_global_defaults();
        assert_eq!(global, BindingKey::global_defaults::<Alpha>());
        assert_eq!(global.type_id(), named.type_id());
    }
}
