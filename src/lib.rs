pub mod binning;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod error;
pub mod formats;
pub mod handlers;
pub mod region;
pub mod release;
pub mod search;
pub mod storage;
pub mod types;

pub use config::Cli;
pub use error::{Error, Result};
