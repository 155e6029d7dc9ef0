use std::any::{Any, TypeId};
use std::fmt;

/// Stable registration key for controllers and fixtures.
///
/// Equality follows the `TypeId`; the type name is kept for diagnostics,
/// fixture hash ids and default mount paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeIdentity {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeIdentity {
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified type name, e.g. `my_app::shop::WidgetsController`.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Last path segment of the type name, e.g. `WidgetsController`.
    pub fn short_name(&self) -> &'static str {
        let base = self.type_name.split('<').next().unwrap_or(self.type_name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widgets;
    struct Parts;
    #[allow(dead_code)]
    struct Wrapper<T>(T);

    #[test]
    fn test_identity_by_type() {
        assert_eq!(TypeIdentity::of::<Widgets>(), TypeIdentity::of::<Widgets>());
        assert_ne!(TypeIdentity::of::<Widgets>(), TypeIdentity::of::<Parts>());
    }

    #[test]
    fn test_short_name() {
        assert_eq!(TypeIdentity::of::<Widgets>().short_name(), "Widgets");
        assert_eq!(TypeIdentity::of::<Wrapper<Parts>>().short_name(), "Wrapper");
        assert!(TypeIdentity::of::<Parts>().type_name().ends_with("::Parts"));
    }
}
