pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{cli::LocalStorage, CliConfig, TomlConfig};
pub use core::{etl::EtlEngine, pipeline::VacancyPipeline};
pub use utils::error::{EtlError, Result};
