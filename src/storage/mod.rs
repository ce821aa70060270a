//! Storage contract for binned SNP stores.
//!
//! The store builder only needs a handful of operations from the persistent
//! engine: create the schema, bulk insert a batch, build the secondary
//! indexes, run the integrity checks and write the metadata. These are
//! captured by [`SnpSink`] so the loading pipeline is independent of the
//! engine behind it.
//!
//! # Implementations
//!
//! - [`SqliteStore`] - one SQLite file per (release, species)
//!
//! # Example
//!
//! ```no_run
//! use snpgetr::storage::{SnpSink, SqliteStore};
//! use std::path::Path;
//!
//! let mut store = SqliteStore::create(Path::new("snps.91.Mm.db3.partial")).unwrap();
//! store.create_schema().unwrap();
//! ```

mod sqlite;

pub use sqlite::SqliteStore;

use crate::binning::Bin;
use crate::types::Snp;
use crate::Result;
use std::fmt;

/// A SNP row together with the bin it was tagged with at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinnedSnp {
    pub snp: Snp,
    pub bin: Bin,
}

/// Duplicate data found after loading. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityWarning {
    DuplicateId { id: String, count: u64 },
    DuplicatePosition {
        chromosome: String,
        position: u64,
        count: u64,
    },
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityWarning::DuplicateId { id, count } => {
                write!(f, "id {} appears {} times", id, count)
            }
            IntegrityWarning::DuplicatePosition {
                chromosome,
                position,
                count,
            } => write!(f, "position {}:{} appears {} times", chromosome, position, count),
        }
    }
}

/// Metadata keys written into every finalized store.
pub const META_VERSION: &str = "version";
pub const META_ASSEMBLY: &str = "assembly";
pub const META_ASSEMBLY_PATCH: &str = "assembly_patch";
pub const META_SCHEMA_VERSION: &str = "schema_version";

/// Write side of a store.
pub trait SnpSink {
    /// Create the SNP and metadata tables. Safe to run more than once.
    fn create_schema(&mut self) -> Result<()>;

    /// Insert one batch of rows in a single bulk operation.
    fn insert_batch(&mut self, batch: &[BinnedSnp]) -> Result<()>;

    /// Build the chromosome, position, id and bin indexes.
    fn create_indices(&mut self) -> Result<()>;

    /// Look for duplicate ids and duplicate (chromosome, position) pairs.
    fn integrity_checks(&mut self) -> Result<Vec<IntegrityWarning>>;

    /// Persist `(key, value)` metadata rows for `species`.
    fn write_meta(&mut self, species: &str, entries: &[(&str, String)]) -> Result<()>;
}
