pub mod cli;
pub mod toml_config;

pub use toml_config::TomlConfig;

use crate::core::salary::SalaryTokens;
use crate::core::stats::AverageDivisor;
use crate::domain::model::ChartSpec;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "salary-etl")]
#[command(about = "Fetch job vacancies and build a per-city salary report")]
pub struct CliConfig {
    /// Job title to search for
    #[arg(value_name = "JOB_TITLE")]
    pub search_text: String,

    #[arg(long, default_value = "https://api.hh.ru/vacancies")]
    pub api_endpoint: String,

    /// Region id the search runs in
    #[arg(long, default_value_t = 113)]
    pub area: u32,

    #[arg(long, default_value_t = 5)]
    pub pages: u32,

    #[arg(long, default_value_t = 20)]
    pub per_page: u32,

    /// Area ids whose vacancies are dropped (Moscow by default)
    #[arg(long, value_delimiter = ',', default_value = "1")]
    pub exclude_areas: Vec<String>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, default_value = "salary_report.zip")]
    pub archive_name: String,

    /// Salaries within this distance of their neighbour share a group
    #[arg(long, default_value_t = 5000)]
    pub tolerance: i64,

    /// What the overall average divides by
    #[arg(long, value_enum, default_value_t = AverageDivisor::TotalCount)]
    pub average_divisor: AverageDivisor,

    /// Whether vacancies without a salary are left out of the groups
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    pub drop_absent_from_groups: bool,

    /// Abort on the first unparseable salary instead of skipping it
    #[arg(long)]
    pub strict: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log system stats per pipeline phase")]
    pub monitor: bool,

    /// TOML config file; when given it replaces the CLI knobs
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,

    #[arg(skip)]
    #[serde(default)]
    pub tokens: SalaryTokens,

    #[arg(skip)]
    #[serde(default)]
    pub chart: ChartSpec,
}

impl ConfigProvider for CliConfig {
    fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    fn search_text(&self) -> &str {
        &self.search_text
    }

    fn area(&self) -> u32 {
        self.area
    }

    fn pages(&self) -> u32 {
        self.pages
    }

    fn per_page(&self) -> u32 {
        self.per_page
    }

    fn excluded_areas(&self) -> &[String] {
        &self.exclude_areas
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn archive_name(&self) -> &str {
        &self.archive_name
    }

    fn salary_tolerance(&self) -> i64 {
        self.tolerance
    }

    fn average_divisor(&self) -> AverageDivisor {
        self.average_divisor
    }

    fn drop_absent_from_groups(&self) -> bool {
        self.drop_absent_from_groups
    }

    fn strict_parsing(&self) -> bool {
        self.strict
    }

    fn tokens(&self) -> &SalaryTokens {
        &self.tokens
    }

    fn chart(&self) -> &ChartSpec {
        &self.chart
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("api_endpoint", &self.api_endpoint)?;
        validation::validate_non_empty_string("search_text", &self.search_text)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_non_empty_string("archive_name", &self.archive_name)?;
        validation::validate_positive_number("pages", self.pages as usize, 1)?;
        validation::validate_range("per_page", self.per_page, 1, 100)?;
        if self.tolerance < 0 {
            return Err(EtlError::InvalidConfigValueError {
                field: "tolerance".to_string(),
                value: self.tolerance.to_string(),
                reason: "Tolerance cannot be negative".to_string(),
            });
        }
        Ok(())
    }
}
