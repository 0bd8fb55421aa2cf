use crate::core::{grouping, salary, stats};
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{
    ChartPoint, ChartSpec, OverallStats, ParseFailure, ReportBundle, Vacancy, VacancyRecord,
};
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// One page of the listings API.
#[derive(Debug, Deserialize)]
struct VacancyPage {
    #[serde(default)]
    items: Vec<ApiVacancy>,
    #[serde(default)]
    found: Option<u64>,
    #[serde(default)]
    pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiVacancy {
    name: Option<String>,
    #[serde(default)]
    salary: Option<crate::domain::model::SalarySource>,
    area: Option<ApiArea>,
    #[serde(default)]
    employer: Option<ApiEmployer>,
}

#[derive(Debug, Deserialize)]
struct ApiArea {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiEmployer {
    name: Option<String>,
}

const MISSING_TITLE: &str = "Нет названия";
const MISSING_NAME: &str = "Не указана";

pub struct VacancyPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: Client,
}

impl<S: Storage, C: ConfigProvider> VacancyPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for VacancyPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<VacancyRecord>> {
        let mut records = Vec::new();

        for page in 0..self.config.pages() {
            let params = [
                ("text", self.config.search_text().to_string()),
                ("area", self.config.area().to_string()),
                ("page", page.to_string()),
                ("per_page", self.config.per_page().to_string()),
            ];

            tracing::debug!(
                "📡 requesting page {} from {}",
                page + 1,
                self.config.api_endpoint()
            );
            let response = self
                .client
                .get(self.config.api_endpoint())
                .query(&params)
                .send()
                .await?;

            if !response.status().is_success() {
                tracing::warn!(
                    "⚠️ page {} request failed with status {}",
                    page + 1,
                    response.status()
                );
                continue;
            }

            let page_data: VacancyPage = response.json().await?;
            if let Some(found) = page_data.found {
                tracing::debug!("📡 page {}: {} items of {} found", page + 1, page_data.items.len(), found);
            }

            for item in page_data.items {
                let area = item.area;
                if let Some(area) = &area {
                    if self.config.excluded_areas().iter().any(|id| *id == area.id) {
                        continue;
                    }
                }

                records.push(VacancyRecord {
                    title: item.name.unwrap_or_else(|| MISSING_TITLE.to_string()),
                    salary: item.salary,
                    city: area
                        .map(|a| a.name)
                        .unwrap_or_else(|| MISSING_NAME.to_string()),
                    company: item
                        .employer
                        .and_then(|e| e.name)
                        .unwrap_or_else(|| MISSING_NAME.to_string()),
                });
            }

            // The API reports how many pages the search actually has.
            if let Some(total_pages) = page_data.pages {
                if page + 1 >= total_pages {
                    break;
                }
            }
        }

        tracing::info!("🔍 collected {} vacancies", records.len());
        Ok(records)
    }

    async fn transform(&self, data: Vec<VacancyRecord>) -> Result<ReportBundle> {
        let tokens = self.config.tokens();
        let mut vacancies = Vec::with_capacity(data.len());
        let mut skipped = Vec::new();

        for record in data {
            let normalized = match &record.salary {
                Some(source) => match salary::normalize(source, tokens) {
                    Ok(value) => value,
                    Err(e) => {
                        if self.config.strict_parsing() {
                            return Err(e);
                        }
                        tracing::warn!(
                            "⚠️ skipping salary of '{}' ({}): {}",
                            record.title,
                            record.city,
                            e
                        );
                        skipped.push(ParseFailure {
                            title: record.title.clone(),
                            city: record.city.clone(),
                            reason: e.to_string(),
                        });
                        None
                    }
                },
                None => None,
            };

            vacancies.push(Vacancy {
                title: record.title,
                salary: normalized,
                city: record.city,
                company: record.company,
            });
        }

        let overall = stats::overall_stats(&vacancies, self.config.average_divisor());
        let percentiles = stats::city_percentiles(&vacancies);
        let city_summary = stats::city_summary(&vacancies);
        let groups = grouping::group_by_tolerance(
            &vacancies,
            self.config.salary_tolerance(),
            self.config.drop_absent_from_groups(),
        );
        let chart_points = grouping::chart_points(&groups);

        tracing::info!(
            "🧮 {} vacancies ({} with salary) across {} cities, {} salary groups",
            overall.total,
            overall.with_salary,
            city_summary.len(),
            groups.len()
        );

        Ok(ReportBundle {
            vacancies,
            percentiles,
            city_summary,
            overall,
            groups,
            chart_points,
            skipped,
        })
    }

    async fn load(&self, bundle: ReportBundle) -> Result<String> {
        let archive_name = self.config.archive_name();
        let output_path = format!("{}/{}", self.config.output_path(), archive_name);

        let vacancies_csv = render_vacancies_csv(&bundle.vacancies)?;
        let statistics_csv = render_statistics_csv(&bundle)?;
        let chart_csv = render_chart_csv(&bundle.chart_points, self.config.chart())?;
        let summary_json = render_summary_json(&bundle, self.config.chart())?;

        tracing::debug!("📦 packing report archive {}", archive_name);
        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            zip.start_file::<_, ()>("vacancies.csv", FileOptions::default())?;
            zip.write_all(&vacancies_csv)?;

            zip.start_file::<_, ()>("statistics.csv", FileOptions::default())?;
            zip.write_all(&statistics_csv)?;

            zip.start_file::<_, ()>("chart.csv", FileOptions::default())?;
            zip.write_all(&chart_csv)?;

            zip.start_file::<_, ()>("summary.json", FileOptions::default())?;
            zip.write_all(summary_json.as_bytes())?;

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("💾 writing report archive ({} bytes)", zip_data.len());
        self.storage.write_file(archive_name, &zip_data).await?;

        Ok(output_path)
    }
}

/// The raw-data sheet.
fn render_vacancies_csv(vacancies: &[Vacancy]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["title", "city", "company", "salary"])?;
    for vacancy in vacancies {
        let salary = vacancy.salary.map(|s| s.to_string()).unwrap_or_default();
        writer.write_record([
            vacancy.title.as_str(),
            vacancy.city.as_str(),
            vacancy.company.as_str(),
            salary.as_str(),
        ])?;
    }
    finish_csv(writer)
}

/// The statistics sheet: one row per city with known salaries.
fn render_statistics_csv(bundle: &ReportBundle) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["city", "count", "mean", "p25", "median", "p75"])?;
    for (city, summary) in &bundle.city_summary {
        let Some(percentiles) = bundle.percentiles.get(city) else {
            continue;
        };
        let count = summary.count.to_string();
        let mean = format!("{:.2}", summary.mean);
        let p25 = format!("{:.2}", percentiles.p25);
        let p50 = format!("{:.2}", percentiles.p50);
        let p75 = format!("{:.2}", percentiles.p75);
        writer.write_record([
            city.as_str(),
            count.as_str(),
            mean.as_str(),
            p25.as_str(),
            p50.as_str(),
            p75.as_str(),
        ])?;
    }
    finish_csv(writer)
}

/// The chart sheet: the scatter series the workbook would plot, with
/// columns named after the configured axes.
fn render_chart_csv(points: &[ChartPoint], chart: &ChartSpec) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([chart.x_label.as_str(), chart.y_label.as_str()])?;
    for point in points {
        let avg = format!("{:.2}", point.avg_salary);
        writer.write_record([avg.as_str(), point.cities.as_str()])?;
    }
    finish_csv(writer)
}

#[derive(Serialize)]
struct ReportSummary<'a> {
    generated_at: String,
    chart_title: &'a str,
    overall: &'a OverallStats,
    city_count: usize,
    group_count: usize,
    skipped: &'a [ParseFailure],
}

fn render_summary_json(bundle: &ReportBundle, chart: &ChartSpec) -> Result<String> {
    let summary = ReportSummary {
        generated_at: chrono::Utc::now().to_rfc3339(),
        chart_title: &chart.title,
        overall: &bundle.overall,
        city_count: bundle.city_summary.len(),
        group_count: bundle.groups.len(),
        skipped: &bundle.skipped,
    };
    Ok(serde_json::to_string_pretty(&summary)?)
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer.into_inner().map_err(|e| EtlError::ProcessingError {
        message: format!("CSV buffer error: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::salary::SalaryTokens;
    use crate::core::stats::AverageDivisor;
    use crate::domain::model::{SalaryRange, SalarySource};
    use httpmock::prelude::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        api_endpoint: String,
        pages: u32,
        excluded: Vec<String>,
        strict: bool,
        drop_absent: bool,
        divisor: AverageDivisor,
        tokens: SalaryTokens,
        chart: ChartSpec,
    }

    impl MockConfig {
        fn new(api_endpoint: String) -> Self {
            Self {
                api_endpoint,
                pages: 1,
                excluded: vec!["1".to_string()],
                strict: false,
                drop_absent: true,
                divisor: AverageDivisor::TotalCount,
                tokens: SalaryTokens::default(),
                chart: ChartSpec::default(),
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn api_endpoint(&self) -> &str {
            &self.api_endpoint
        }

        fn search_text(&self) -> &str {
            "программист"
        }

        fn area(&self) -> u32 {
            113
        }

        fn pages(&self) -> u32 {
            self.pages
        }

        fn per_page(&self) -> u32 {
            20
        }

        fn excluded_areas(&self) -> &[String] {
            &self.excluded
        }

        fn output_path(&self) -> &str {
            "test_output"
        }

        fn archive_name(&self) -> &str {
            "salary_report.zip"
        }

        fn salary_tolerance(&self) -> i64 {
            5000
        }

        fn average_divisor(&self) -> AverageDivisor {
            self.divisor
        }

        fn drop_absent_from_groups(&self) -> bool {
            self.drop_absent
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

    fn record(title: &str, city: &str, salary: Option<SalarySource>) -> VacancyRecord {
        VacancyRecord {
            title: title.to_string(),
            salary,
            city: city.to_string(),
            company: "ООО Тест".to_string(),
        }
    }

    fn range(from: Option<i64>, to: Option<i64>) -> Option<SalarySource> {
        Some(SalarySource::Range(SalaryRange { from, to }))
    }

    #[tokio::test]
    async fn test_extract_maps_api_items() {
        let server = MockServer::start();
        let page = serde_json::json!({
            "items": [
                {
                    "name": "Rust-разработчик",
                    "salary": {"from": 100000, "to": 150000},
                    "area": {"id": "88", "name": "Казань"},
                    "employer": {"name": "ООО Ромашка"}
                },
                {
                    "name": null,
                    "salary": null,
                    "area": {"id": "66", "name": "Омск"},
                    "employer": null
                }
            ],
            "found": 2,
            "pages": 1
        });

        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/vacancies").query_param("page", "0");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(page);
        });

        let config = MockConfig::new(server.url("/vacancies"));
        let pipeline = VacancyPipeline::new(MockStorage::new(), config);

        let records = pipeline.extract().await.unwrap();

        api_mock.assert();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Rust-разработчик");
        assert_eq!(records[0].city, "Казань");
        assert_eq!(records[0].company, "ООО Ромашка");
        assert!(records[0].salary.is_some());
        assert_eq!(records[1].title, "Нет названия");
        assert_eq!(records[1].company, "Не указана");
        assert!(records[1].salary.is_none());
    }

    #[tokio::test]
    async fn test_extract_drops_excluded_areas() {
        let server = MockServer::start();
        let page = serde_json::json!({
            "items": [
                {
                    "name": "Разработчик",
                    "salary": null,
                    "area": {"id": "1", "name": "Москва"},
                    "employer": {"name": "ООО Столица"}
                },
                {
                    "name": "Разработчик",
                    "salary": null,
                    "area": {"id": "2", "name": "Санкт-Петербург"},
                    "employer": {"name": "ООО Нева"}
                }
            ],
            "pages": 1
        });

        server.mock(|when, then| {
            when.method(GET).path("/vacancies");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(page);
        });

        let config = MockConfig::new(server.url("/vacancies"));
        let pipeline = VacancyPipeline::new(MockStorage::new(), config);

        let records = pipeline.extract().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].city, "Санкт-Петербург");
    }

    #[tokio::test]
    async fn test_extract_skips_failed_pages() {
        let server = MockServer::start();

        let failed = server.mock(|when, then| {
            when.method(GET).path("/vacancies").query_param("page", "0");
            then.status(500);
        });
        let ok = server.mock(|when, then| {
            when.method(GET).path("/vacancies").query_param("page", "1");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "items": [{
                        "name": "Разработчик",
                        "salary": null,
                        "area": {"id": "66", "name": "Омск"},
                        "employer": null
                    }],
                    "pages": 2
                }));
        });

        let mut config = MockConfig::new(server.url("/vacancies"));
        config.pages = 2;
        let pipeline = VacancyPipeline::new(MockStorage::new(), config);

        let records = pipeline.extract().await.unwrap();

        failed.assert();
        ok.assert();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_extract_stops_at_last_api_page() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(GET).path("/vacancies").query_param("page", "0");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"items": [], "pages": 1}));
        });
        let second = server.mock(|when, then| {
            when.method(GET).path("/vacancies").query_param("page", "1");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"items": [], "pages": 1}));
        });

        let mut config = MockConfig::new(server.url("/vacancies"));
        config.pages = 5;
        let pipeline = VacancyPipeline::new(MockStorage::new(), config);

        pipeline.extract().await.unwrap();

        first.assert();
        second.assert_hits(0);
    }

    #[tokio::test]
    async fn test_transform_normalizes_and_aggregates() {
        let config = MockConfig::new("http://unused".to_string());
        let pipeline = VacancyPipeline::new(MockStorage::new(), config);

        let data = vec![
            record("Джун", "Казань", range(Some(40000), Some(60001))),
            record(
                "Мидл",
                "Казань",
                Some(SalarySource::Text("от 100 000".to_string())),
            ),
            record("Сеньор", "Тверь", None),
            record(
                "Стажёр",
                "Омск",
                Some(SalarySource::Text("не указана".to_string())),
            ),
        ];

        let bundle = pipeline.transform(data).await.unwrap();

        assert_eq!(bundle.vacancies.len(), 4);
        assert_eq!(bundle.vacancies[0].salary, Some(50000));
        assert_eq!(bundle.vacancies[1].salary, Some(100000));
        assert_eq!(bundle.vacancies[2].salary, None);
        assert_eq!(bundle.vacancies[3].salary, None);

        // Divide-by-total-count: (50000 + 100000) / 4.
        assert_eq!(bundle.overall.average, 37500.0);
        assert_eq!(bundle.overall.total, 4);
        assert_eq!(bundle.overall.with_salary, 2);

        // Only the city with known salaries shows up.
        assert_eq!(bundle.percentiles.len(), 1);
        assert!(bundle.percentiles.contains_key("Казань"));

        // 50000 and 100000 are further than 5000 apart.
        assert_eq!(bundle.groups.len(), 2);
        assert_eq!(bundle.chart_points.len(), 2);
        assert!(bundle.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_transform_lenient_mode_reports_and_continues() {
        let config = MockConfig::new("http://unused".to_string());
        let pipeline = VacancyPipeline::new(MockStorage::new(), config);

        let data = vec![
            record(
                "Плотник",
                "Тверь",
                Some(SalarySource::Text("от ста тысяч".to_string())),
            ),
            record("Столяр", "Тверь", range(Some(50000), None)),
        ];

        let bundle = pipeline.transform(data).await.unwrap();

        assert_eq!(bundle.vacancies[0].salary, None);
        assert_eq!(bundle.vacancies[1].salary, Some(50000));
        assert_eq!(bundle.skipped.len(), 1);
        assert_eq!(bundle.skipped[0].title, "Плотник");
    }

    #[tokio::test]
    async fn test_transform_strict_mode_aborts() {
        let mut config = MockConfig::new("http://unused".to_string());
        config.strict = true;
        let pipeline = VacancyPipeline::new(MockStorage::new(), config);

        let data = vec![record(
            "Плотник",
            "Тверь",
            Some(SalarySource::Text("от ста тысяч".to_string())),
        )];

        let result = pipeline.transform(data).await;
        assert!(matches!(
            result,
            Err(EtlError::SalaryParseError { .. })
        ));
    }

    #[tokio::test]
    async fn test_transform_empty_input() {
        let config = MockConfig::new("http://unused".to_string());
        let pipeline = VacancyPipeline::new(MockStorage::new(), config);

        let bundle = pipeline.transform(Vec::new()).await.unwrap();

        assert_eq!(bundle.overall.average, 0.0);
        assert!(bundle.percentiles.is_empty());
        assert!(bundle.groups.is_empty());
    }

    #[tokio::test]
    async fn test_load_packs_report_archive() {
        let storage = MockStorage::new();
        let config = MockConfig::new("http://unused".to_string());
        let pipeline = VacancyPipeline::new(storage.clone(), config);

        let data = vec![
            record("Джун", "Казань", range(Some(40000), Some(60000))),
            record("Мидл", "Казань", range(Some(45000), Some(55000))),
        ];
        let bundle = pipeline.transform(data).await.unwrap();
        let output_path = pipeline.load(bundle).await.unwrap();

        assert_eq!(output_path, "test_output/salary_report.zip");

        let zip_data = storage.get_file("salary_report.zip").await.unwrap();
        let cursor = std::io::Cursor::new(zip_data);
        let mut archive = zip::ZipArchive::new(cursor).unwrap();

        let mut file_names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        file_names.sort();
        assert_eq!(
            file_names,
            vec!["chart.csv", "statistics.csv", "summary.json", "vacancies.csv"]
        );

        let vacancies_csv = {
            let mut file = archive.by_name("vacancies.csv").unwrap();
            let mut content = String::new();
            std::io::Read::read_to_string(&mut file, &mut content).unwrap();
            content
        };
        let lines: Vec<&str> = vacancies_csv.lines().collect();
        assert_eq!(lines[0], "title,city,company,salary");
        assert_eq!(lines[1], "Джун,Казань,ООО Тест,50000");

        let summary: serde_json::Value = {
            let mut file = archive.by_name("summary.json").unwrap();
            let mut content = String::new();
            std::io::Read::read_to_string(&mut file, &mut content).unwrap();
            serde_json::from_str(&content).unwrap()
        };
        assert_eq!(summary["overall"]["total"], 2);
        assert_eq!(summary["group_count"], 1);
    }

    #[tokio::test]
    async fn test_load_chart_sheet_uses_configured_labels() {
        let storage = MockStorage::new();
        let mut config = MockConfig::new("http://unused".to_string());
        config.chart = ChartSpec {
            title: "Salaries".to_string(),
            x_label: "salary".to_string(),
            y_label: "cities".to_string(),
            width: 800,
            height: 400,
        };
        let pipeline = VacancyPipeline::new(storage.clone(), config);

        let data = vec![record("Джун", "Казань", range(Some(40000), Some(60000)))];
        let bundle = pipeline.transform(data).await.unwrap();
        pipeline.load(bundle).await.unwrap();

        let zip_data = storage.get_file("salary_report.zip").await.unwrap();
        let cursor = std::io::Cursor::new(zip_data);
        let mut archive = zip::ZipArchive::new(cursor).unwrap();
        let chart_csv = {
            let mut file = archive.by_name("chart.csv").unwrap();
            let mut content = String::new();
            std::io::Read::read_to_string(&mut file, &mut content).unwrap();
            content
        };
        let lines: Vec<&str> = chart_csv.lines().collect();
        assert_eq!(lines[0], "salary,cities");
        assert_eq!(lines[1], "50000.00,Казань");
    }
}
