//! Variant-file readers using noodles.
//!
//! A reader is a lazy, forward-only stream of [`RawVariant`]s. The store
//! builder consumes it exactly once; end of stream means the load is done.
//!
//! # Supported Formats
//!
//! - [`VcfSource`] - VCF files, plain or bgzip-compressed

mod vcf;

pub use vcf::VcfSource;

use crate::Result;
use crate::types::RawVariant;

/// Anything that yields raw variants can feed a store build.
pub trait VariantSource: Iterator<Item = Result<RawVariant>> {}

impl<T> VariantSource for T where T: Iterator<Item = Result<RawVariant>> {}
