use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::default(),
        }
    }

    pub fn new_with_monitoring(pipeline: P, enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        println!("Starting ETL process...");

        println!("Extracting data...");
        let raw_data = self.pipeline.extract().await?;
        println!("Extracted {} records", raw_data.len());
        self.monitor.log_stats("extract");

        println!("Transforming data...");
        let bundle = self.pipeline.transform(raw_data).await?;
        println!("Transformed {} records", bundle.vacancies.len());
        self.monitor.log_stats("transform");

        println!("Loading data...");
        let output_path = self.pipeline.load(bundle).await?;
        println!("Output saved to: {}", output_path);
        self.monitor.log_stats("load");

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}
