use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting ETL process");

        // Extract
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("Extracted {} responses", raw_data.len());

        // Transform
        let tables = self.pipeline.transform(raw_data).await?;
        for table in &tables {
            tracing::info!("Table {}: {} rows", table.name, table.len());
        }

        // Load
        let output_path = self.pipeline.load(tables).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(output_path)
    }
}
