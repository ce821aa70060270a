//! Parsing of free-form region strings such as `1:1000000-2000000`,
//! `chr1:1m-2m` or `X:500k`.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

use crate::{Error, Result};

static REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:chr)?\s*([0-9]{1,2}|X|Y|MT)\s*[-:]?\s*(\d+)\s*(mb|m|k)?\s*[-:]?\s*(\d+)?\s*(mb|m|k)?",
    )
    .expect("region pattern is valid")
});

/// A parsed query interval. Positions are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    pub chromosome: String,
    pub start: u64,
    /// `None` when the region string carried no end bound.
    pub end: Option<u64>,
}

impl Region {
    pub fn new(chromosome: impl Into<String>, start: u64, end: Option<u64>) -> Self {
        Self {
            chromosome: chromosome.into(),
            start,
            end,
        }
    }

    /// Inclusive end of the interval. A region without an end bound is the
    /// single position `start`.
    pub fn end_position(&self) -> u64 {
        self.end.unwrap_or(self.start)
    }

    /// True when the interval contains no positions.
    pub fn is_empty(&self) -> bool {
        self.start > self.end_position()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}:{}-{}", self.chromosome, self.start, end),
            None => write!(f, "{}:{}", self.chromosome, self.start),
        }
    }
}

impl std::str::FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_region(s)
    }
}

/// Multiplier for a unit suffix. `mb` is ten million, matching the
/// long-standing behaviour of the region grammar.
fn multiplier(unit: Option<&str>) -> u64 {
    match unit.map(str::to_ascii_lowercase).as_deref() {
        Some("mb") => 10_000_000,
        Some("m") => 1_000_000,
        Some("k") => 1_000,
        _ => 1,
    }
}

fn scaled(digits: &str, unit: Option<&str>, input: &str) -> Result<u64> {
    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier(unit)))
        .ok_or_else(|| Error::InvalidRegion(format!("position out of range in '{}'", input)))
}

/// Parse a region string.
///
/// The chromosome token is one or two digits or `X`, `Y`, `MT` (any case,
/// optionally prefixed with `chr`) and is returned upper-cased. Start and end
/// carry independent unit suffixes. Anything after the recognised prefix is
/// ignored.
pub fn parse_region(input: &str) -> Result<Region> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidRegion("empty region".to_string()));
    }

    let caps = REGION
        .captures(trimmed)
        .ok_or_else(|| Error::InvalidRegion(format!("unable to parse '{}'", trimmed)))?;

    let chromosome = caps[1].to_ascii_uppercase();
    let start = scaled(&caps[2], caps.get(3).map(|m| m.as_str()), trimmed)?;
    let end = caps
        .get(4)
        .map(|m| scaled(m.as_str(), caps.get(5).map(|m| m.as_str()), trimmed))
        .transpose()?;

    Ok(Region {
        chromosome,
        start,
        end,
    })
}
