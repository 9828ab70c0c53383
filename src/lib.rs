pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod manifest;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use api::{EpiasClient, Endpoint, TgtManager};
pub use config::cli::LocalStorage;
pub use config::settings::Settings;
pub use core::{
    dataset::{Dataset, DatasetQuery},
    etl::EtlEngine,
    fetchers::DataFetcher,
    pipeline::DatasetPipeline,
};
pub use utils::error::{EpiasError, Result};
