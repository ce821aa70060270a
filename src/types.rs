use serde::{Deserialize, Serialize};

/// Default cap on the number of SNPs returned for a region query.
pub const DEFAULT_REGION_LIMIT: usize = 100_000;

/// A variant as produced by a variant-file reader, before binning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVariant {
    pub chromosome: String,
    /// 1-based position.
    pub position: u64,
    pub id: String,
    pub reference: String,
    pub alternates: Vec<String>,
}

/// A stored SNP as exposed to callers. The bin is never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snp {
    pub chromosome: String,
    pub position: u64,
    pub id: String,
    pub reference: String,
    /// Alternate alleles joined with `,`; empty when there are none.
    pub alternate: String,
}

impl From<RawVariant> for Snp {
    fn from(raw: RawVariant) -> Self {
        Self {
            chromosome: raw.chromosome,
            position: raw.position,
            id: raw.id,
            reference: raw.reference,
            alternate: raw.alternates.join(","),
        }
    }
}

/// Outcome of an identifier lookup: the SNPs found and the requested ids
/// that matched nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdLookup {
    pub snps: Vec<Snp>,
    pub not_found: Vec<String>,
}

/// Condensed release metadata persisted in every store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaInfo {
    pub species: String,
    pub version: Option<String>,
    pub assembly: Option<String>,
    pub assembly_patch: Option<String>,
}

/// Query parameters shared by every endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct StoreQuery {
    pub version: Option<String>,
    pub species: Option<String>,
    pub callback: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SnpsQuery {
    pub version: Option<String>,
    pub species: Option<String>,
    #[serde(default)]
    pub ids: Vec<String>,
    pub callback: Option<String>,
}

impl SnpsQuery {
    /// Build from a URL query string, collecting every repeated `ids` value.
    pub fn from_query_string(query: &str) -> Self {
        let mut parsed = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "version" => parsed.version = Some(value.into_owned()),
                "species" => parsed.species = Some(value.into_owned()),
                "ids" => parsed.ids.push(value.into_owned()),
                "callback" => parsed.callback = Some(value.into_owned()),
                _ => {}
            }
        }
        parsed
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RegionQuery {
    pub version: Option<String>,
    pub species: Option<String>,
    pub region: Option<String>,
    pub limit: Option<Limit>,
    pub callback: Option<String>,
}

/// A result cap as sent by a client: a JSON number, or text from a query
/// string. Text that is not a number falls back to the default.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Limit {
    Number(usize),
    Text(String),
}

impl RegionQuery {
    pub fn effective_limit(&self) -> usize {
        match &self.limit {
            Some(Limit::Number(n)) => *n,
            Some(Limit::Text(text)) => text.trim().parse().unwrap_or(DEFAULT_REGION_LIMIT),
            None => DEFAULT_REGION_LIMIT,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SnpsResponse {
    pub num_snps: usize,
    pub snps: Vec<Snp>,
    pub num_unknown: usize,
    pub unknown: Vec<String>,
}

impl From<IdLookup> for SnpsResponse {
    fn from(lookup: IdLookup) -> Self {
        Self {
            num_snps: lookup.snps.len(),
            snps: lookup.snps,
            num_unknown: lookup.not_found.len(),
            unknown: lookup.not_found,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegionResponse {
    pub num_snps: usize,
    pub snps: Vec<Snp>,
}

impl From<Vec<Snp>> for RegionResponse {
    fn from(snps: Vec<Snp>) -> Self {
        Self {
            num_snps: snps.len(),
            snps,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VersionsResponse {
    pub versions: Vec<MetaInfo>,
}
