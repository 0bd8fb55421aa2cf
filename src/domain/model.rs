use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Vacancy as fetched from the listings API, salary still in source form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VacancyRecord {
    pub title: String,
    pub salary: Option<SalarySource>,
    pub city: String,
    pub company: String,
}

/// The two salary representations sources hand us: a structured range
/// or a free-form string. Untagged so API payloads deserialize directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SalarySource {
    Range(SalaryRange),
    Text(String),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SalaryRange {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

/// Vacancy with its salary reduced to one comparable integer (or absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vacancy {
    pub title: String,
    pub salary: Option<i64>,
    pub city: String,
    pub company: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
}

/// Per-city percentile report. Cities with no known salary are omitted.
pub type PercentileReport = BTreeMap<String, Percentiles>;

/// One row of the statistics sheet: median/mean/count over a city's
/// known salaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CitySummary {
    pub median: f64,
    pub mean: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallStats {
    pub average: f64,
    pub median: Option<f64>,
    pub p25: Option<f64>,
    pub p75: Option<f64>,
    pub total: usize,
    pub with_salary: usize,
}

/// Run of vacancies whose sorted salaries are each within the tolerance
/// of their neighbour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalaryGroup {
    pub vacancies: Vec<Vacancy>,
}

impl SalaryGroup {
    pub fn len(&self) -> usize {
        self.vacancies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vacancies.is_empty()
    }

    /// Mean over the group's known salaries; None if none are known.
    pub fn average_known(&self) -> Option<f64> {
        let known: Vec<i64> = self.vacancies.iter().filter_map(|v| v.salary).collect();
        if known.is_empty() {
            return None;
        }
        Some(known.iter().sum::<i64>() as f64 / known.len() as f64)
    }

    pub fn cities(&self) -> String {
        self.vacancies
            .iter()
            .map(|v| v.city.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One point of the chart sheet: group average salary against the
/// group's joined city list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub avg_salary: f64,
    pub cities: String,
}

/// Record skipped in lenient mode because its salary failed to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseFailure {
    pub title: String,
    pub city: String,
    pub reason: String,
}

/// Rendering options handed to the reporter at call time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartSpec {
    fn default() -> Self {
        Self {
            title: "Зарплаты по городам".to_string(),
            x_label: "Зарплата (руб.)".to_string(),
            y_label: "Города".to_string(),
            width: 1000,
            height: 600,
        }
    }
}

/// Everything transform hands the reporter.
#[derive(Debug, Clone)]
pub struct ReportBundle {
    pub vacancies: Vec<Vacancy>,
    pub percentiles: PercentileReport,
    pub city_summary: BTreeMap<String, CitySummary>,
    pub overall: OverallStats,
    pub groups: Vec<SalaryGroup>,
    pub chart_points: Vec<ChartPoint>,
    pub skipped: Vec<ParseFailure>,
}
