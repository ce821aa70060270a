//! Store construction.
//!
//! Each (release, species) pair becomes one store, built through a fixed
//! sequence of states:
//!
//! ```text
//! Empty -> SchemaReady -> Loading -> Indexed -> Validated -> Finalized
//! ```
//!
//! Rows are streamed from the variant source into batches of [`BATCH_SIZE`],
//! so memory is bounded by one batch no matter how large the source is.
//! Indexes are only created once every row is present.
//!
//! A store is written to `<name>.partial` and renamed into place once it is
//! finalized; a failed build never replaces a good store.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::binning::{self, SCHEMA_VERSION};
use crate::catalog::store_file_name;
use crate::formats::{VariantSource, VcfSource};
use crate::release::{ReleaseDescriptor, Releases};
use crate::storage::{
    BinnedSnp, IntegrityWarning, META_ASSEMBLY, META_ASSEMBLY_PATCH, META_SCHEMA_VERSION,
    META_VERSION, SnpSink, SqliteStore,
};
use crate::types::{RawVariant, Snp};
use crate::{Error, Result};

/// Rows per bulk insert. Part of the storage format version.
pub const BATCH_SIZE: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Empty,
    SchemaReady,
    Loading,
    Indexed,
    Validated,
    Finalized,
}

/// Drives one store through its build states.
pub struct StoreBuilder<S: SnpSink> {
    sink: S,
    state: StoreState,
    load_complete: bool,
    warnings: Vec<IntegrityWarning>,
}

impl<S: SnpSink> StoreBuilder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            state: StoreState::Empty,
            load_complete: false,
            warnings: Vec::new(),
        }
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn warnings(&self) -> &[IntegrityWarning] {
        &self.warnings
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn expect_state(&self, expected: StoreState, action: &str) -> Result<()> {
        if self.state != expected {
            return Err(Error::Internal(format!(
                "cannot {} a store in state {:?}",
                action, self.state
            )));
        }
        Ok(())
    }

    /// `Empty -> SchemaReady`
    pub fn create_schema(&mut self) -> Result<()> {
        self.expect_state(StoreState::Empty, "create the schema of")?;
        self.sink.create_schema()?;
        self.state = StoreState::SchemaReady;
        Ok(())
    }

    /// `SchemaReady -> Loading`. Returns the number of rows loaded.
    ///
    /// If the source fails the store stays in `Loading` and cannot advance.
    pub fn load<I: VariantSource>(&mut self, source: I) -> Result<u64> {
        self.load_batched(source, BATCH_SIZE)
    }

    fn load_batched<I: VariantSource>(&mut self, source: I, batch_size: usize) -> Result<u64> {
        self.expect_state(StoreState::SchemaReady, "load")?;
        self.state = StoreState::Loading;

        let mut batch: Vec<BinnedSnp> = Vec::new();
        let mut loaded = 0u64;

        for raw in source {
            batch.push(binned(raw?)?);

            if batch.len() == batch_size {
                self.sink.insert_batch(&batch)?;
                loaded += batch.len() as u64;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.sink.insert_batch(&batch)?;
            loaded += batch.len() as u64;
        }

        self.load_complete = true;
        Ok(loaded)
    }

    /// `Loading -> Indexed`
    pub fn create_indices(&mut self) -> Result<()> {
        self.expect_state(StoreState::Loading, "index")?;
        if !self.load_complete {
            return Err(Error::Internal(
                "cannot index a store whose load did not complete".to_string(),
            ));
        }
        self.sink.create_indices()?;
        self.state = StoreState::Indexed;
        Ok(())
    }

    /// `Indexed -> Validated`. Duplicates are reported, never fatal.
    pub fn validate(&mut self) -> Result<&[IntegrityWarning]> {
        self.expect_state(StoreState::Indexed, "validate")?;
        self.warnings = self.sink.integrity_checks()?;
        for warning in &self.warnings {
            tracing::warn!("integrity check: {}", warning);
        }
        self.state = StoreState::Validated;
        Ok(&self.warnings)
    }

    /// `Validated -> Finalized`
    pub fn finalize(&mut self, release: &ReleaseDescriptor) -> Result<()> {
        self.expect_state(StoreState::Validated, "finalize")?;
        let entries = [
            (META_VERSION, release.version.clone()),
            (META_ASSEMBLY, release.assembly.clone()),
            (META_ASSEMBLY_PATCH, release.assembly_patch.clone()),
            (META_SCHEMA_VERSION, SCHEMA_VERSION.to_string()),
        ];
        self.sink.write_meta(&release.species_id, &entries)?;
        self.state = StoreState::Finalized;
        Ok(())
    }
}

fn binned(raw: RawVariant) -> Result<BinnedSnp> {
    let bin = binning::position_bin(raw.position)?;
    Ok(BinnedSnp {
        snp: Snp::from(raw),
        bin,
    })
}

/// Result of a build request: which pairs were built and which failed.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub built: Vec<PathBuf>,
    pub failed: Vec<(String, String, Error)>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Build one store per selected (release, species) pair into `directory`.
///
/// Unknown versions or species fail the request before any store is touched.
/// After that, a failing pair is recorded in the report and the remaining
/// pairs are still built.
pub fn create(
    releases: &Releases,
    versions: Option<&[String]>,
    species: Option<&[String]>,
    directory: &Path,
) -> Result<BuildReport> {
    match versions {
        Some(v) => tracing::debug!("versions: {}", v.join(",")),
        None => tracing::debug!("versions: ALL"),
    }
    tracing::debug!("directory: {}", directory.display());

    let selected = releases.select(versions, species)?;
    let mut report = BuildReport::default();

    for release in selected {
        tracing::info!(
            "generating store for version {} species {}",
            release.version,
            release.species_id
        );

        match build_store(release, directory) {
            Ok(path) => report.built.push(path),
            Err(e) => {
                tracing::error!(
                    "failed to build version {} species {}: {}",
                    release.version,
                    release.species_id,
                    e
                );
                report
                    .failed
                    .push((release.version.clone(), release.species_id.clone(), e));
            }
        }
    }

    tracing::info!("DONE");
    Ok(report)
}

/// Build the store for `release` from its variant file.
pub fn build_store(release: &ReleaseDescriptor, directory: &Path) -> Result<PathBuf> {
    let vcf_path = release.vcf_path();
    let source = VcfSource::open(&vcf_path).map_err(|e| stream_error(release, e))?;
    build_store_from(release, directory, source)
}

/// Build the store for `release` from any variant source.
pub fn build_store_from<I: VariantSource>(
    release: &ReleaseDescriptor,
    directory: &Path,
    source: I,
) -> Result<PathBuf> {
    let started = Instant::now();
    let path = directory.join(store_file_name(&release.version, &release.species_id));
    let partial = partial_path(&path);

    if partial.exists() {
        std::fs::remove_file(&partial)?;
    }

    tracing::info!("creating: {}", path.display());
    let mut builder = StoreBuilder::new(SqliteStore::create(&partial)?);
    builder.create_schema()?;

    tracing::info!("extracting and inserting snps...");
    let loaded = builder
        .load(source)
        .map_err(|e| stream_error(release, e))?;
    tracing::info!("{} snps loaded", loaded);

    tracing::info!("finalizing...");
    builder.create_indices()?;
    builder.validate()?;
    builder.finalize(release)?;

    let store = builder.into_sink();
    for (key, value, species) in store.all_meta()? {
        tracing::info!("{}\t{}\t{}", key, value, species);
    }
    drop(store);

    std::fs::rename(&partial, &path)?;
    tracing::info!("store finalized in {:?}", started.elapsed());
    Ok(path)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

fn stream_error(release: &ReleaseDescriptor, e: Error) -> Error {
    match e {
        Error::RecordStream { .. } => e,
        other => Error::RecordStream {
            version: release.version.clone(),
            species: release.species_id.clone(),
            message: other.to_string(),
        },
    }
}
