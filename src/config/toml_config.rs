use crate::core::salary::SalaryTokens;
use crate::core::stats::AverageDivisor;
use crate::domain::model::ChartSpec;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File form of the run configuration. Values support `${VAR}`
/// environment-variable substitution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineInfo,
    pub source: SourceSection,
    #[serde(default)]
    pub analysis: AnalysisSection,
    pub report: ReportSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineInfo {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    pub endpoint: String,
    pub text: String,
    #[serde(default = "default_area")]
    pub area: u32,
    #[serde(default = "default_pages")]
    pub pages: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_exclude_areas")]
    pub exclude_areas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    pub tolerance: i64,
    pub average_divisor: AverageDivisor,
    pub drop_absent_from_groups: bool,
    pub strict: bool,
    pub tokens: SalaryTokens,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            tolerance: 5000,
            average_divisor: AverageDivisor::TotalCount,
            drop_absent_from_groups: true,
            strict: false,
            tokens: SalaryTokens::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub output_path: String,
    #[serde(default = "default_archive_name")]
    pub archive_name: String,
    #[serde(default)]
    pub chart: ChartSpec,
}

fn default_area() -> u32 {
    113
}

fn default_pages() -> u32 {
    5
}

fn default_per_page() -> u32 {
    20
}

fn default_exclude_areas() -> Vec<String> {
    vec!["1".to_string()]
}

fn default_archive_name() -> String {
    "salary_report.zip".to_string()
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    // ${VAR_NAME} placeholders; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").expect("valid placeholder regex");

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("source.endpoint", &self.source.endpoint)?;
        validation::validate_non_empty_string("source.text", &self.source.text)?;
        validation::validate_path("report.output_path", &self.report.output_path)?;
        validation::validate_non_empty_string("report.archive_name", &self.report.archive_name)?;
        validation::validate_positive_number("source.pages", self.source.pages as usize, 1)?;
        validation::validate_range("source.per_page", self.source.per_page, 1, 100)?;
        if self.analysis.tolerance < 0 {
            return Err(EtlError::InvalidConfigValueError {
                field: "analysis.tolerance".to_string(),
                value: self.analysis.tolerance.to_string(),
                reason: "Tolerance cannot be negative".to_string(),
            });
        }
        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn api_endpoint(&self) -> &str {
        &self.source.endpoint
    }

    fn search_text(&self) -> &str {
        &self.source.text
    }

    fn area(&self) -> u32 {
        self.source.area
    }

    fn pages(&self) -> u32 {
        self.source.pages
    }

    fn per_page(&self) -> u32 {
        self.source.per_page
    }

    fn excluded_areas(&self) -> &[String] {
        &self.source.exclude_areas
    }

    fn output_path(&self) -> &str {
        &self.report.output_path
    }

    fn archive_name(&self) -> &str {
        &self.report.archive_name
    }

    fn salary_tolerance(&self) -> i64 {
        self.analysis.tolerance
    }

    fn average_divisor(&self) -> AverageDivisor {
        self.analysis.average_divisor
    }

    fn drop_absent_from_groups(&self) -> bool {
        self.analysis.drop_absent_from_groups
    }

    fn strict_parsing(&self) -> bool {
        self.analysis.strict
    }

    fn tokens(&self) -> &SalaryTokens {
        &self.analysis.tokens
    }

    fn chart(&self) -> &ChartSpec {
        &self.report.chart
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
