//! Directory-scan registry of finalized stores.
//!
//! Stores are discovered by file name, `snps.{version}.{species}.db3`, so a
//! catalog is nothing more than a scan of one directory. It is built once at
//! startup and then shared read-only by every request.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

const PREFIX: &str = "snps";
const EXTENSION: &str = "db3";

/// File name of the store for `(version, species)`.
pub fn store_file_name(version: &str, species: &str) -> String {
    format!("{}.{}.{}.{}", PREFIX, normalize_version(version), species, EXTENSION)
}

/// Numeric versions are compared by value, so `091` and `91` are the same.
fn normalize_version(version: &str) -> String {
    version
        .trim()
        .parse::<u64>()
        .map(|v| v.to_string())
        .unwrap_or_else(|_| version.trim().to_string())
}

/// Total order on versions: non-numeric versions sort below every numeric
/// one, numeric versions compare by value and the rest lexically.
fn compare_versions(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// One store found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub version: String,
    pub species: String,
    pub path: PathBuf,
}

impl StoreEntry {
    /// Recognise a store from its file name.
    fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let parts: Vec<&str> = name.split('.').collect();
        match parts.as_slice() {
            [PREFIX, version, species, EXTENSION] if !version.is_empty() && !species.is_empty() => {
                Some(Self {
                    version: normalize_version(version),
                    species: species.to_string(),
                    path: path.to_path_buf(),
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Sorted by version descending, then species ascending.
    entries: Vec<StoreEntry>,
    by_key: HashMap<(String, String), usize>,
}

impl Catalog {
    /// Scan `dir` for stores. Files that do not follow the naming convention
    /// are ignored.
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(store) = StoreEntry::from_path(&path) {
                tracing::debug!("found store {}", path.display());
                entries.push(store);
            }
        }

        let catalog = Self::from_entries(entries);
        tracing::info!("{} store(s) in {}", catalog.len(), dir.display());
        Ok(catalog)
    }

    pub fn from_entries(mut entries: Vec<StoreEntry>) -> Self {
        entries.sort_by(|a, b| {
            compare_versions(&b.version, &a.version).then_with(|| a.species.cmp(&b.species))
        });

        let by_key = entries
            .iter()
            .enumerate()
            .map(|(idx, e)| ((e.version.clone(), e.species.clone()), idx))
            .collect();

        Self { entries, by_key }
    }

    /// Find the store for `(version, species)`.
    pub fn resolve(&self, version: &str, species: &str) -> Result<&StoreEntry> {
        self.by_key
            .get(&(normalize_version(version), species.to_string()))
            .map(|&idx| &self.entries[idx])
            .ok_or_else(|| Error::StoreNotFound {
                version: version.to_string(),
                species: species.to_string(),
            })
    }

    pub fn entries(&self) -> &[StoreEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_store_file_name() {
        assert_eq!(store_file_name("91", "Mm"), "snps.91.Mm.db3");
        assert_eq!(store_file_name("091", "Mm"), "snps.91.Mm.db3");
    }

    #[test]
    fn test_scan_and_sort() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "snps.90.Mm.db3");
        touch(dir.path(), "snps.100.Mm.db3");
        touch(dir.path(), "snps.91.Mm.db3");
        touch(dir.path(), "snps.91.Hs.db3");
        touch(dir.path(), "snps.92.Mm.db3.partial");
        touch(dir.path(), "notes.txt");
        std::fs::create_dir(dir.path().join("snps.1.Xx.db3")).unwrap();

        let catalog = Catalog::scan(dir.path()).unwrap();
        let keys: Vec<_> = catalog
            .entries()
            .iter()
            .map(|e| format!("{}:{}", e.version, e.species))
            .collect();
        assert_eq!(keys, vec!["100:Mm", "91:Hs", "91:Mm", "90:Mm"]);
    }

    #[test]
    fn test_mixed_versions_sort_consistently() {
        let mut versions = vec!["1a", "9", "10", "beta", "2"];
        versions.sort_by(|a, b| compare_versions(a, b));
        assert_eq!(versions, vec!["1a", "beta", "2", "9", "10"]);

        assert_eq!(compare_versions("9", "10"), Ordering::Less);
        assert_eq!(compare_versions("10", "1a"), Ordering::Greater);
        assert_eq!(compare_versions("1a", "9"), Ordering::Less);
    }

    #[test]
    fn test_scan_lists_numeric_versions_first() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "snps.9.Mm.db3");
        touch(dir.path(), "snps.10.Mm.db3");
        touch(dir.path(), "snps.1a.Mm.db3");

        let catalog = Catalog::scan(dir.path()).unwrap();
        let versions: Vec<_> = catalog.entries().iter().map(|e| e.version.as_str()).collect();
        assert_eq!(versions, vec!["10", "9", "1a"]);
    }

    #[test]
    fn test_resolve() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "snps.91.Mm.db3");
        let catalog = Catalog::scan(dir.path()).unwrap();

        let entry = catalog.resolve("91", "Mm").unwrap();
        assert_eq!(entry.path, dir.path().join("snps.91.Mm.db3"));
        assert!(catalog.resolve("091", "Mm").is_ok());

        assert!(matches!(
            catalog.resolve("91", "Hs"),
            Err(Error::StoreNotFound { .. })
        ));
        assert!(matches!(
            catalog.resolve("90", "Mm"),
            Err(Error::StoreNotFound { .. })
        ));
    }

    #[test]
    fn test_scan_missing_dir() {
        assert!(Catalog::scan(Path::new("/no/such/dir")).is_err());
    }
}
