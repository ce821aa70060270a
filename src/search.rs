//! Read-only query operators over finalized stores.
//!
//! Every call resolves `(version, species)` through the [`Catalog`], opens its
//! own read-only handle and drops it before returning, so calls can run
//! concurrently against the same store without coordination.

use std::collections::HashSet;
use std::time::Instant;

use crate::binning;
use crate::catalog::Catalog;
use crate::region::{Region, parse_region};
use crate::storage::{META_ASSEMBLY, META_ASSEMBLY_PATCH, META_VERSION, SqliteStore};
use crate::types::{IdLookup, MetaInfo, Snp};
use crate::{Error, Result};

fn open(catalog: &Catalog, version: &str, species: &str) -> Result<SqliteStore> {
    let entry = catalog.resolve(version, species)?;
    SqliteStore::open_read_only(&entry.path)
}

/// Metadata stored with `(version, species)`.
pub fn meta(catalog: &Catalog, version: &str, species: &str) -> Result<MetaInfo> {
    let store = open(catalog, version, species)?;

    let mut info = MetaInfo {
        species: species.to_string(),
        ..Default::default()
    };
    for (key, value) in store.meta(species)? {
        match key.as_str() {
            META_VERSION => info.version = Some(value),
            META_ASSEMBLY => info.assembly = Some(value),
            META_ASSEMBLY_PATCH => info.assembly_patch = Some(value),
            _ => {}
        }
    }

    Ok(info)
}

/// Metadata for every store in the catalog, in catalog order.
pub fn versions(catalog: &Catalog) -> Result<Vec<MetaInfo>> {
    catalog
        .entries()
        .iter()
        .map(|entry| meta(catalog, &entry.version, &entry.species))
        .collect()
}

/// Look up SNPs by id.
///
/// Found SNPs come back ordered by chromosome then position. Requested ids
/// with no match are returned in request order, duplicates included.
pub fn by_ids(catalog: &Catalog, ids: &[String], version: &str, species: &str) -> Result<IdLookup> {
    tracing::debug!("ids={:?}", &ids[..ids.len().min(10)]);
    tracing::debug!("version={} species={}", version, species);

    let store = open(catalog, version, species)?;
    if ids.is_empty() {
        return Err(Error::EmptyQuery);
    }

    let snps = store.snps_by_ids(ids)?;

    let found: HashSet<&str> = snps.iter().map(|s| s.id.as_str()).collect();
    let not_found = ids
        .iter()
        .filter(|id| !found.contains(id.as_str()))
        .cloned()
        .collect();

    Ok(IdLookup { snps, not_found })
}

/// SNPs overlapping `region`, ordered by position and capped at `limit`.
pub fn by_region(
    catalog: &Catalog,
    region: &str,
    version: &str,
    species: &str,
    limit: usize,
) -> Result<Vec<Snp>> {
    tracing::debug!("region={} version={} species={} limit={}", region, version, species, limit);

    let store = open(catalog, version, species)?;
    let region = parse_region(region)?;
    snps_in_region(&store, &region, limit)
}

fn snps_in_region(store: &SqliteStore, region: &Region, limit: usize) -> Result<Vec<Snp>> {
    if region.start == 0 {
        return Err(Error::InvalidCoordinate(0));
    }
    if region.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    // no stored position can lie at or beyond MAX_POSITION
    let end = region.end_position().min(binning::MAX_POSITION - 1);
    if end < region.start {
        return Ok(Vec::new());
    }
    // stored positions are points, so the closed [start, end] covers [start, end + 1)
    let bins = binning::query_bin_ranges(region.start, end.saturating_add(1))?;
    if bins.is_empty() {
        return Ok(Vec::new());
    }

    let started = Instant::now();
    let snps = store.snps_in_region(&region.chromosome, region.start, end, &bins, limit)?;
    tracing::info!("{} snps in {} found in {:?}", snps.len(), region, started.elapsed());
    Ok(snps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::position_bin;
    use crate::catalog::store_file_name;
    use crate::storage::{BinnedSnp, SnpSink};
    use std::path::Path;
    use tempfile::TempDir;

    fn snp(chromosome: &str, position: u64, id: &str) -> BinnedSnp {
        BinnedSnp {
            snp: Snp {
                chromosome: chromosome.to_string(),
                position,
                id: id.to_string(),
                reference: "C".to_string(),
                alternate: "T".to_string(),
            },
            bin: position_bin(position).unwrap(),
        }
    }

    fn write_store(dir: &Path, rows: &[BinnedSnp]) {
        let mut store = SqliteStore::create(&dir.join(store_file_name("91", "Mm"))).unwrap();
        store.create_schema().unwrap();
        store.insert_batch(rows).unwrap();
        store.create_indices().unwrap();
        store
            .write_meta(
                "Mm",
                &[
                    (META_VERSION, "91".to_string()),
                    (META_ASSEMBLY, "GRCm38".to_string()),
                    (META_ASSEMBLY_PATCH, "p6".to_string()),
                ],
            )
            .unwrap();
    }

    fn fixture() -> (TempDir, Catalog) {
        let dir = TempDir::new().unwrap();
        let mut rows = vec![
            snp("2", 5_000, "rs2"),
            snp("1", 9_000, "rs1"),
            snp("X", 500_000, "rs3"),
        ];
        rows.extend((1..=10).map(|i| snp("1", i * 1_000_000, &format!("rs10{}", i))));
        write_store(dir.path(), &rows);
        let catalog = Catalog::scan(dir.path()).unwrap();
        (dir, catalog)
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_by_ids_found_and_not_found() {
        let (_dir, catalog) = fixture();
        let result = by_ids(&catalog, &ids(&["rs2", "rs1", "rsX"]), "91", "Mm").unwrap();

        let found: Vec<_> = result.snps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(found, vec!["rs1", "rs2"]);
        assert_eq!(result.not_found, vec!["rsX"]);
    }

    #[test]
    fn test_by_ids_keeps_duplicate_misses() {
        let (_dir, catalog) = fixture();
        let result = by_ids(&catalog, &ids(&["rsX", "rs1", "rsX"]), "91", "Mm").unwrap();
        assert_eq!(result.snps.len(), 1);
        assert_eq!(result.not_found, vec!["rsX", "rsX"]);
    }

    #[test]
    fn test_by_ids_empty() {
        let (_dir, catalog) = fixture();
        assert!(matches!(
            by_ids(&catalog, &[], "91", "Mm"),
            Err(Error::EmptyQuery)
        ));
    }

    #[test]
    fn test_store_not_found() {
        let (_dir, catalog) = fixture();
        assert!(matches!(
            by_ids(&catalog, &ids(&["rs1"]), "90", "Mm"),
            Err(Error::StoreNotFound { .. })
        ));
        assert!(matches!(
            by_region(&catalog, "1:1-10", "91", "Hs", 10),
            Err(Error::StoreNotFound { .. })
        ));
    }

    #[test]
    fn test_by_region_limit() {
        let (_dir, catalog) = fixture();
        let snps = by_region(&catalog, "1:1-1000000000", "91", "Mm", 5).unwrap();
        let positions: Vec<_> = snps.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![9_000, 1_000_000, 2_000_000, 3_000_000, 4_000_000]);
    }

    #[test]
    fn test_by_region_end_beyond_coordinate_space() {
        let (_dir, catalog) = fixture();
        let bounded = by_region(&catalog, "1:1-4000000000", "91", "Mm", 100).unwrap();
        let huge = by_region(&catalog, "1:1-9999999999999999999", "91", "Mm", 100).unwrap();
        assert_eq!(bounded.len(), 11);
        assert_eq!(huge, bounded);

        let past_end = by_region(&catalog, "1:5000000000-6000000000", "91", "Mm", 100).unwrap();
        assert!(past_end.is_empty());
    }

    #[test]
    fn test_by_region_units() {
        let (_dir, catalog) = fixture();
        let snps = by_region(&catalog, "chr1:2m-3m", "91", "Mm", 100).unwrap();
        let found: Vec<_> = snps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(found, vec!["rs102", "rs103"]);
    }

    #[test]
    fn test_by_region_point() {
        let (_dir, catalog) = fixture();
        let snps = by_region(&catalog, "X:500k", "91", "Mm", 100).unwrap();
        assert_eq!(snps.len(), 1);
        assert_eq!(snps[0].id, "rs3");
    }

    #[test]
    fn test_by_region_inverted_is_empty() {
        let (_dir, catalog) = fixture();
        let snps = by_region(&catalog, "1:10m-200k", "91", "Mm", 100).unwrap();
        assert!(snps.is_empty());
    }

    #[test]
    fn test_by_region_errors() {
        let (_dir, catalog) = fixture();
        assert!(matches!(
            by_region(&catalog, "", "91", "Mm", 100),
            Err(Error::InvalidRegion(_))
        ));
        assert!(matches!(
            by_region(&catalog, "1:0-100", "91", "Mm", 100),
            Err(Error::InvalidCoordinate(0))
        ));
    }

    #[test]
    fn test_meta_and_versions() {
        let (_dir, catalog) = fixture();
        let info = meta(&catalog, "91", "Mm").unwrap();
        assert_eq!(
            info,
            MetaInfo {
                species: "Mm".to_string(),
                version: Some("91".to_string()),
                assembly: Some("GRCm38".to_string()),
                assembly_patch: Some("p6".to_string()),
            }
        );
        assert_eq!(versions(&catalog).unwrap(), vec![info]);
    }
}
