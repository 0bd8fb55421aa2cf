use crate::domain::model::{CitySummary, OverallStats, PercentileReport, Percentiles, Vacancy};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Divisor for the overall average: `TotalCount` divides the sum of
/// known salaries by every vacancy (the upstream report's convention),
/// `KnownCount` only by the vacancies that actually carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AverageDivisor {
    #[default]
    TotalCount,
    KnownCount,
}

// Linear interpolation at rank p/100 * (n-1); assumes a non-empty
// ascending-sorted slice.
fn interpolate(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let p = p.clamp(0.0, 100.0) / 100.0;
    let idx = p * ((sorted.len() - 1) as f64);
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let w = idx - lo as f64;
        sorted[lo] * (1.0 - w) + sorted[hi] * w
    }
}

pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    Some(interpolate(sorted, p))
}

fn known_salaries_sorted(vacancies: &[Vacancy]) -> Vec<f64> {
    let mut salaries: Vec<f64> = vacancies
        .iter()
        .filter_map(|v| v.salary)
        .map(|s| s as f64)
        .collect();
    salaries.sort_by(|a, b| a.total_cmp(b));
    salaries
}

/// Overall average salary. Empty input yields 0.0 rather than an error.
pub fn average_salary(vacancies: &[Vacancy], divisor: AverageDivisor) -> f64 {
    let sum: i64 = vacancies.iter().filter_map(|v| v.salary).sum();
    let denominator = match divisor {
        AverageDivisor::TotalCount => vacancies.len(),
        AverageDivisor::KnownCount => vacancies.iter().filter(|v| v.salary.is_some()).count(),
    };
    if denominator == 0 {
        return 0.0;
    }
    sum as f64 / denominator as f64
}

/// P25/P50/P75 per city over known salaries. Cities where no vacancy
/// carries a salary are left out entirely.
pub fn city_percentiles(vacancies: &[Vacancy]) -> PercentileReport {
    salaries_by_city(vacancies)
        .into_iter()
        .map(|(city, salaries)| {
            let report = Percentiles {
                p25: interpolate(&salaries, 25.0),
                p50: interpolate(&salaries, 50.0),
                p75: interpolate(&salaries, 75.0),
            };
            (city, report)
        })
        .collect()
}

/// The statistics-sheet pivot: median, mean and count of known salaries
/// per city.
pub fn city_summary(vacancies: &[Vacancy]) -> BTreeMap<String, CitySummary> {
    salaries_by_city(vacancies)
        .into_iter()
        .map(|(city, salaries)| {
            let summary = CitySummary {
                median: interpolate(&salaries, 50.0),
                mean: salaries.iter().sum::<f64>() / salaries.len() as f64,
                count: salaries.len(),
            };
            (city, summary)
        })
        .collect()
}

pub fn overall_stats(vacancies: &[Vacancy], divisor: AverageDivisor) -> OverallStats {
    let sorted = known_salaries_sorted(vacancies);
    OverallStats {
        average: average_salary(vacancies, divisor),
        median: percentile(&sorted, 50.0),
        p25: percentile(&sorted, 25.0),
        p75: percentile(&sorted, 75.0),
        total: vacancies.len(),
        with_salary: sorted.len(),
    }
}

// Known salaries grouped by city, each list sorted ascending. Cities
// with no known salary never get an entry.
fn salaries_by_city(vacancies: &[Vacancy]) -> BTreeMap<String, Vec<f64>> {
    let mut by_city: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for vacancy in vacancies {
        if let Some(salary) = vacancy.salary {
            by_city
                .entry(vacancy.city.clone())
                .or_default()
                .push(salary as f64);
        }
    }
    for salaries in by_city.values_mut() {
        salaries.sort_by(|a, b| a.total_cmp(b));
    }
    by_city
}
