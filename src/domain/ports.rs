use crate::core::salary::SalaryTokens;
use crate::core::stats::AverageDivisor;
use crate::domain::model::{ChartSpec, ReportBundle, VacancyRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn search_text(&self) -> &str;
    fn area(&self) -> u32;
    fn pages(&self) -> u32;
    fn per_page(&self) -> u32;
    fn excluded_areas(&self) -> &[String];
    fn output_path(&self) -> &str;
    fn archive_name(&self) -> &str;
    fn salary_tolerance(&self) -> i64;
    fn average_divisor(&self) -> AverageDivisor;
    fn drop_absent_from_groups(&self) -> bool;
    fn strict_parsing(&self) -> bool;
    fn tokens(&self) -> &SalaryTokens;
    fn chart(&self) -> &ChartSpec;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<VacancyRecord>>;
    async fn transform(&self, data: Vec<VacancyRecord>) -> Result<ReportBundle>;
    async fn load(&self, bundle: ReportBundle) -> Result<String>;
}
