use crate::domain::model::{ChartPoint, SalaryGroup, Vacancy};

/// Partition vacancies into runs of near-equal salary.
///
/// Sort is ascending with absent salaries ordered as 0. A known salary
/// joins the current group while it stays within `tolerance` of the
/// previously seen known salary; a larger jump closes the group and
/// starts the next one, so consecutive groups are separated by a gap
/// greater than `tolerance`. Absent salaries are dropped when
/// `drop_absent` is set, otherwise they ride along in whatever group is
/// open without affecting the known-salary chain.
pub fn group_by_tolerance(
    vacancies: &[Vacancy],
    tolerance: i64,
    drop_absent: bool,
) -> Vec<SalaryGroup> {
    let mut sorted = vacancies.to_vec();
    sorted.sort_by_key(|v| v.salary.unwrap_or(0));

    let mut groups: Vec<SalaryGroup> = Vec::new();
    let mut current: Vec<Vacancy> = Vec::new();
    let mut last_known: Option<i64> = None;

    for vacancy in sorted {
        match vacancy.salary {
            Some(salary) => {
                if let Some(previous) = last_known {
                    if (salary - previous).abs() > tolerance {
                        groups.push(SalaryGroup {
                            vacancies: std::mem::take(&mut current),
                        });
                    }
                }
                current.push(vacancy);
                last_known = Some(salary);
            }
            None => {
                if !drop_absent {
                    current.push(vacancy);
                }
            }
        }
    }

    if !current.is_empty() {
        groups.push(SalaryGroup { vacancies: current });
    }

    groups
}

/// Scatter series for the chart sheet: one point per group carrying at
/// least one known salary.
pub fn chart_points(groups: &[SalaryGroup]) -> Vec<ChartPoint> {
    groups
        .iter()
        .filter_map(|group| {
            group.average_known().map(|avg_salary| ChartPoint {
                avg_salary,
                cities: group.cities(),
            })
        })
        .collect()
}
