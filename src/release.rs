//! Release descriptors and the configuration resource that lists them.
//!
//! The resource is tab-separated text with a header line naming the columns,
//! followed by one row per (release, species). Columns beyond these are ignored:
//!
//! ```text
//! version  release_date  assembly  assembly_patch  species_id  species_name  vcf_file
//! ```
//!
//! It can be read from a local path, a `file://` URL or (with the `http`
//! feature) an `http(s)://` URL.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use url::Url;

use crate::{Error, Result};

/// One (release, species) entry from the configuration resource. Fields are
/// matched to columns by header name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseDescriptor {
    pub version: String,
    pub release_date: String,
    pub assembly: String,
    pub assembly_patch: String,
    pub species_id: String,
    pub species_name: String,
    pub vcf_file: String,
}

impl ReleaseDescriptor {
    /// Local path of the variant file, stripping a `file://` scheme.
    pub fn vcf_path(&self) -> PathBuf {
        match Url::parse(&self.vcf_file) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .unwrap_or_else(|_| PathBuf::from(&self.vcf_file)),
            _ => PathBuf::from(&self.vcf_file),
        }
    }
}

/// All releases in a resource: version -> species -> descriptor.
#[derive(Debug, Clone, Default)]
pub struct Releases {
    releases: BTreeMap<String, BTreeMap<String, ReleaseDescriptor>>,
}

impl Releases {
    /// Parse the tab-separated resource text. `resource` is only used for
    /// error messages.
    pub fn parse(text: &str, resource: &str) -> Result<Self> {
        let unparseable = |message: String| Error::ConfigResourceUnreachable {
            resource: resource.to_string(),
            message,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut releases: BTreeMap<String, BTreeMap<String, ReleaseDescriptor>> = BTreeMap::new();
        for row in reader.deserialize::<ReleaseDescriptor>() {
            let descriptor = row.map_err(|e| unparseable(e.to_string()))?;
            releases
                .entry(descriptor.version.clone())
                .or_default()
                .insert(descriptor.species_id.clone(), descriptor);
        }

        if releases.is_empty() {
            return Err(Error::ConfigResourceUnreachable {
                resource: resource.to_string(),
                message: "no releases listed".to_string(),
            });
        }

        Ok(Self { releases })
    }

    pub fn versions(&self) -> Vec<String> {
        self.releases.keys().cloned().collect()
    }

    pub fn species(&self) -> Vec<String> {
        self.releases
            .values()
            .flat_map(|species| species.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Descriptors matching the filters, ordered by version then species.
    ///
    /// `None` means all. Any requested version or species absent from the
    /// resource fails the whole selection.
    pub fn select(
        &self,
        versions: Option<&[String]>,
        species: Option<&[String]>,
    ) -> Result<Vec<&ReleaseDescriptor>> {
        if let Some(versions) = versions {
            let missing = missing(versions, &self.versions());
            if !missing.is_empty() {
                return Err(Error::UnresolvedRelease {
                    missing,
                    available: self.versions(),
                });
            }
        }

        if let Some(species) = species {
            let missing = missing(species, &self.species());
            if !missing.is_empty() {
                return Err(Error::UnresolvedSpecies {
                    missing,
                    available: self.species(),
                });
            }
        }

        let selected = self
            .releases
            .iter()
            .filter(|(version, _)| versions.is_none_or(|v| v.contains(*version)))
            .flat_map(|(_, by_species)| by_species.values())
            .filter(|d| species.is_none_or(|s| s.contains(&d.species_id)))
            .collect();

        Ok(selected)
    }
}

fn missing(requested: &[String], available: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|r| !available.contains(*r))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Fetch and parse the configuration resource.
pub async fn load(resource: &str) -> Result<Releases> {
    let started = std::time::Instant::now();
    let text = fetch(resource).await?;
    let releases = Releases::parse(&text, resource)?;
    tracing::info!("config parsed in {:?}", started.elapsed());
    Ok(releases)
}

async fn fetch(resource: &str) -> Result<String> {
    let unreachable_err = |message: String| Error::ConfigResourceUnreachable {
        resource: resource.to_string(),
        message,
    };

    let path = match Url::parse(resource) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            return fetch_http(url).await.map_err(unreachable_err);
        }
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|_| unreachable_err("invalid file URL".to_string()))?,
        Ok(url) if url.scheme().len() > 1 => {
            return Err(unreachable_err(format!("unsupported scheme {}", url.scheme())));
        }
        // bare paths, including Windows drive letters
        _ => PathBuf::from(resource),
    };

    tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| unreachable_err(e.to_string()))
}

#[cfg(feature = "http")]
async fn fetch_http(url: Url) -> std::result::Result<String, String> {
    let response = reqwest::get(url).await.map_err(|e| e.to_string())?;
    let response = response.error_for_status().map_err(|e| e.to_string())?;
    response.text().await.map_err(|e| e.to_string())
}

#[cfg(not(feature = "http"))]
async fn fetch_http(_url: Url) -> std::result::Result<String, String> {
    Err("built without http support".to_string())
}
