//! Multi-resolution genomic binning.
//!
//! Every stored SNP is tagged with the smallest bin that fully contains it,
//! and a region query is pruned to the bins that could hold an overlapping
//! SNP. The scheme is a seven level hierarchy with a shrink factor of eight
//! per level:
//!
//! | level | bin size | offset | bins    |
//! |-------|----------|--------|---------|
//! | 0     | 4 Gb     | 0      | 1       |
//! | 1     | 512 Mb   | 1      | 8       |
//! | 2     | 64 Mb    | 9      | 64      |
//! | 3     | 8 Mb     | 73     | 512     |
//! | 4     | 1 Mb     | 585    | 4096    |
//! | 5     | 128 kb   | 4681   | 32768   |
//! | 6     | 16 kb    | 37449  | 262144  |
//!
//! These constants are part of the on-disk format: a store built with one set
//! of constants cannot be queried with another. [`SCHEMA_VERSION`] is written
//! into every store's metadata.
//!
//! Intervals are half-open `[start, end)` over 1-based positions.

use std::ops::RangeInclusive;

use crate::{Error, Result};

/// Storage format version covering the bin constants and the batch size.
pub const SCHEMA_VERSION: u32 = 1;

/// log2 of the finest bin size.
pub const MIN_SHIFT: u32 = 14;

/// Number of levels below the root.
pub const DEPTH: u32 = 6;

/// log2 of the shrink factor between levels.
const LEVEL_SHIFT: u32 = 3;

/// Exclusive upper bound on positions: the span of the root bin.
pub const MAX_POSITION: u64 = 1 << (MIN_SHIFT + LEVEL_SHIFT * DEPTH);

/// Largest bin identifier, the last slot of the finest level.
pub const MAX_BIN: u32 = level_offset(DEPTH) + (1 << (LEVEL_SHIFT * DEPTH)) - 1;

pub type Bin = u32;

/// First bin identifier of `level`.
pub const fn level_offset(level: u32) -> Bin {
    ((1 << (LEVEL_SHIFT * level)) - 1) / 7
}

const fn level_shift(level: u32) -> u32 {
    MIN_SHIFT + LEVEL_SHIFT * (DEPTH - level)
}

fn check_position(position: u64) -> Result<()> {
    if position == 0 || position >= MAX_POSITION {
        return Err(Error::InvalidCoordinate(position));
    }
    Ok(())
}

/// Smallest bin fully containing `[start, end)`.
///
/// `end` must be greater than `start`; both must be valid 1-based positions
/// (`end` may equal [`MAX_POSITION`]).
pub fn tag_bin(start: u64, end: u64) -> Result<Bin> {
    check_position(start)?;
    if end <= start || end > MAX_POSITION {
        return Err(Error::InvalidCoordinate(end));
    }

    let last = end - 1;
    for level in (0..=DEPTH).rev() {
        let shift = level_shift(level);
        if start >> shift == last >> shift {
            return Ok(level_offset(level) + (start >> shift) as Bin);
        }
    }

    // level 0 spans every valid position
    Ok(0)
}

/// Bin for the single point feature at `position`.
pub fn position_bin(position: u64) -> Result<Bin> {
    tag_bin(position, position + 1)
}

/// Level a bin identifier belongs to, 0 being the coarsest.
pub fn bin_level(bin: Bin) -> u32 {
    (0..=DEPTH)
        .rev()
        .find(|&level| bin >= level_offset(level))
        .unwrap_or(0)
}

/// Contiguous bin ranges, one per level, that may hold a feature overlapping
/// `[start, end)`.
///
/// An empty or inverted interval yields no ranges. The end is clamped to
/// [`MAX_POSITION`] so open-ended queries stay inside the bin space.
pub fn query_bin_ranges(start: u64, end: u64) -> Result<Vec<RangeInclusive<Bin>>> {
    check_position(start)?;
    if end <= start {
        return Ok(Vec::new());
    }

    let last = end.min(MAX_POSITION) - 1;
    let ranges = (0..=DEPTH)
        .map(|level| {
            let shift = level_shift(level);
            let offset = level_offset(level);
            (offset + (start >> shift) as Bin)..=(offset + (last >> shift) as Bin)
        })
        .collect();

    Ok(ranges)
}

/// Every bin identifier that may hold a feature overlapping `[start, end)`.
pub fn query_bins(start: u64, end: u64) -> Result<Vec<Bin>> {
    Ok(query_bin_ranges(start, end)?
        .into_iter()
        .flatten()
        .collect())
}
