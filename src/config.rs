use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "snpgetr")]
#[command(about = "Build binned SNP stores and serve queries over them")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build stores for the selected releases and species
    Create(CreateArgs),
    /// Serve the query API over a directory of stores
    Serve(ServeArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct CreateArgs {
    /// Directory the stores are written to
    #[arg(short, long, default_value = ".")]
    pub directory: PathBuf,

    /// Release configuration (path, file:// or http(s):// URL)
    #[arg(
        short,
        long,
        env = "SNPGETR_RESOURCE",
        default_value = "./snpgetr.releases.tsv"
    )]
    pub resource: String,

    /// Species to build (repeatable, default: all)
    #[arg(short, long = "species")]
    pub species: Vec<String>,

    /// Release versions to build (repeatable, default: all)
    #[arg(long = "ver")]
    pub versions: Vec<String>,
}

impl CreateArgs {
    pub fn species_filter(&self) -> Option<&[String]> {
        non_empty(&self.species)
    }

    pub fn version_filter(&self) -> Option<&[String]> {
        non_empty(&self.versions)
    }
}

fn non_empty(values: &[String]) -> Option<&[String]> {
    if values.is_empty() { None } else { Some(values) }
}

#[derive(Debug, Clone, clap::Args)]
pub struct ServeArgs {
    /// Host address to bind to
    #[arg(long, env = "SNPGETR_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "SNPGETR_PORT", default_value = "8080")]
    pub port: u16,

    /// Directory containing snps.<version>.<species>.db3 stores
    #[arg(long, env = "SNPGETR_DB_DIR", default_value = ".")]
    pub db_dir: PathBuf,

    /// Enable CORS for all origins
    #[arg(long, env = "SNPGETR_CORS", default_value = "true")]
    pub cors: bool,
}

impl ServeArgs {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
