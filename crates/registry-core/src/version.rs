//! Version identifier: `v<major>.<minor>`.

use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// A data product version, a `(major, minor)` pair formatted as `v<major>.<minor>`.
///
/// Ordering is lexicographic over the pair, which is exactly the ordering
/// the [`Ord`] derive gives a two-field tuple struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major component. Incremented by backward-incompatible changes.
    pub major: u32,
    /// Minor component. Incremented by backward-compatible changes.
    pub minor: u32,
}

impl Version {
    /// The version assigned to a product's first accepted write.
    pub const INITIAL: Version = Version { major: 1, minor: 0 };

    /// Construct a version directly from its components.
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// The next major version: `(major + 1, 0)`.
    pub fn increment_major(&self) -> Self {
        Self::new(self.major + 1, 0)
    }

    /// The next minor version: `(major, minor + 1)`.
    pub fn increment_minor(&self) -> Self {
        Self::new(self.major, self.minor + 1)
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix('v')
            .ok_or_else(|| EngineError::MalformedVersion(s.to_string()))?;

        let (major_str, minor_str) = rest
            .split_once('.')
            .ok_or_else(|| EngineError::MalformedVersion(s.to_string()))?;

        let major = major_str
            .parse::<u32>()
            .map_err(|_| EngineError::MalformedVersion(s.to_string()))?;
        let minor = minor_str
            .parse::<u32>()
            .map_err(|_| EngineError::MalformedVersion(s.to_string()))?;

        Ok(Version { major, minor })
    }
}

impl serde::Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_formats_round_trip() {
        for s in ["v0.0", "v1.0", "v12.34", "v0.7"] {
            let parsed: Version = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!("1.0".parse::<Version>().is_err());
    }

    #[test]
    fn rejects_surplus_input() {
        assert!("v1.0.0".parse::<Version>().is_err());
        assert!("v1.0x".parse::<Version>().is_err());
    }

    #[test]
    fn rejects_non_numeric_components() {
        assert!("va.b".parse::<Version>().is_err());
    }

    #[test]
    fn increments() {
        let v = Version::new(3, 4);
        assert_eq!(v.increment_major(), Version::new(4, 0));
        assert_eq!(v.increment_minor(), Version::new(3, 5));
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(Version::new(1, 9) < Version::new(2, 0));
        assert!(Version::new(2, 0) < Version::new(2, 1));
        assert_eq!(Version::new(1, 1), Version::new(1, 1));
    }
}
