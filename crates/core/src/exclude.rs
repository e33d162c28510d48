//! Names that walks always skip
//!
//! Operating systems scatter metadata files across removable storage. They
//! are matched by exact name; there are no wildcard patterns.

use std::collections::BTreeMap;

/// Built-in artifact names skipped during walks
pub const DEFAULT_EXCLUDED: &[&str] = &[
    ".DS_Store",
    "._.DS_Store",
    ".Spotlight-V100",
    ".Trashes",
    ".fseventsd",
    ".TemporaryItems",
    ".localized",
    "Thumbs.db",
    "desktop.ini",
    "$RECYCLE.BIN",
    "System Volume Information",
];

/// Static mapping of name to "always skip"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedNames {
    names: BTreeMap<String, bool>,
}

impl ExcludedNames {
    /// An empty set that skips nothing
    pub fn none() -> Self {
        Self {
            names: BTreeMap::new(),
        }
    }

    /// Apply overrides on top of the current set
    ///
    /// A `false` entry re-enables a built-in name.
    pub fn with_overrides<'a>(
        mut self,
        overrides: impl IntoIterator<Item = (&'a String, &'a bool)>,
    ) -> Self {
        for (name, skip) in overrides {
            self.names.insert(name.clone(), *skip);
        }
        self
    }

    /// Whether a file name must be skipped
    pub fn is_excluded(&self, name: &str) -> bool {
        self.names.get(name).copied().unwrap_or(false)
    }

    /// Names currently skipped
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .filter(|(_, skip)| **skip)
            .map(|(name, _)| name.as_str())
    }
}

impl Default for ExcludedNames {
    fn default() -> Self {
        Self {
            names: DEFAULT_EXCLUDED
                .iter()
                .map(|name| (name.to_string(), true))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set() {
        let excluded = ExcludedNames::default();
        assert!(excluded.is_excluded(".DS_Store"));
        assert!(excluded.is_excluded("Thumbs.db"));
        assert!(!excluded.is_excluded("photo.jpg"));
        // exact match only
        assert!(!excluded.is_excluded(".ds_store"));
        assert!(!excluded.is_excluded("x.DS_Store"));
    }

    #[test]
    fn test_overrides() {
        let overrides: BTreeMap<String, bool> = [
            ("Thumbs.db".to_string(), false),
            ("@eaDir".to_string(), true),
        ]
        .into_iter()
        .collect();

        let excluded = ExcludedNames::default().with_overrides(&overrides);
        assert!(!excluded.is_excluded("Thumbs.db"));
        assert!(excluded.is_excluded("@eaDir"));
        assert!(excluded.is_excluded(".Trashes"));
        assert!(!excluded.iter().any(|name| name == "Thumbs.db"));
    }

    #[test]
    fn test_none() {
        assert!(!ExcludedNames::none().is_excluded(".DS_Store"));
    }
}
