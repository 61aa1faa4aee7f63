//! Identifiers for event-sourced entities and their event versions.
//!
//! An [`EntityKey`] names the partition that holds one entity's history.
//! A [`Version`] orders the events inside that partition. Versions are
//! bounded by `i64::MAX` so every version fits a 19-digit zero-padded row
//! identifier, which keeps lexicographic and numeric ordering identical.

use serde::{Deserialize, Serialize};

/// Opaque key of one event-sourced entity instance.
///
/// The core only relies on string equality. Keys are usually derived with
/// [`EntityKey::for_entity`] so they are legal partition identifiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    /// Wrap an already-derived key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derive the key for an entity from its state type name, its primary
    /// identity, and an optional key extension.
    ///
    /// Parts are joined with `_`. Characters that are illegal in partition
    /// identifiers are replaced: `/` becomes `.` and `+` becomes `-`.
    pub fn for_entity(type_name: &str, id: &str, extension: Option<&str>) -> Self {
        let mut key = String::with_capacity(
            type_name
                .len()
                .saturating_add(id.len())
                .saturating_add(extension.map_or(0, str::len))
                .saturating_add(2),
        );
        key.push_str(type_name);
        key.push('_');
        key.push_str(id);
        if let Some(ext) = extension {
            key.push('_');
            key.push_str(ext);
        }
        Self(key.replace('/', ".").replace('+', "-"))
    }

    /// Borrow the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for EntityKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl AsRef<str> for EntityKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Position of an event in its entity's history.
///
/// The first event an entity raises has version 0. An entity that has not
/// raised any event yet has no version at all (`Option<Version>::None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Version of the first event of every entity.
    pub const FIRST: Self = Self(0);

    /// Largest representable version (`i64::MAX`).
    pub const MAX: Self = Self(9_223_372_036_854_775_807);

    /// Create a version, returning `None` above [`Version::MAX`].
    pub const fn new(value: u64) -> Option<Self> {
        if value > Self::MAX.0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// The version that follows `self`, or `None` at [`Version::MAX`].
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        if self.0 >= Self::MAX.0 {
            None
        } else {
            Some(Self(self.0.saturating_add(1)))
        }
    }

    /// The version that follows `current`, or [`Version::FIRST`] when the
    /// entity has no events yet. `None` once `current` is [`Version::MAX`].
    #[must_use]
    pub const fn after(current: Option<Self>) -> Option<Self> {
        match current {
            Some(version) => version.next(),
            None => Some(Self::FIRST),
        }
    }

    /// Return the raw integer value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for Version {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_type_id_and_extension() {
        let key = EntityKey::for_entity("Account", "42", Some("eu"));
        assert_eq!(key.as_str(), "Account_42_eu");
    }

    #[test]
    fn key_without_extension() {
        let key = EntityKey::for_entity("Account", "42", None);
        assert_eq!(key.as_str(), "Account_42");
    }

    #[test]
    fn key_replaces_illegal_partition_characters() {
        let key = EntityKey::for_entity("Cart+Line", "a/b", None);
        assert_eq!(key.as_str(), "Cart-Line_a.b");
    }

    #[test]
    fn version_after_none_is_first() {
        assert_eq!(Version::after(None), Some(Version::FIRST));
        assert_eq!(Version::after(Some(Version::FIRST)), Version::new(1));
    }

    #[test]
    fn version_rejects_values_above_i64_max() {
        assert!(Version::new(u64::MAX).is_none());
        assert_eq!(Version::new(9_223_372_036_854_775_807), Some(Version::MAX));
        assert_eq!(Version::new(41).and_then(Version::next), Version::new(42));
        assert_eq!(Version::MAX.next(), None);
        assert_eq!(Version::after(Some(Version::MAX)), None);
    }

    #[test]
    fn version_serializes_as_plain_integer() {
        let json = serde_json::to_string(&Version::new(7)).unwrap_or_default();
        assert_eq!(json, "7");
    }
}
