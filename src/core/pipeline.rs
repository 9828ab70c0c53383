use super::dataset::{Dataset, DatasetQuery};
use super::export::export_bundle;
use super::fetchers::DataFetcher;
use super::processors;
use crate::domain::model::Period;
use crate::domain::ports::{Pipeline, RawResponses, Storage};
use crate::domain::table::Table;
use crate::utils::error::{EpiasError, Result};
use chrono::NaiveDateTime;
use serde_json::{json, Value};

/// Fetches one dataset, turns it into tables and stores a zip bundle.
pub struct DatasetPipeline<S: Storage> {
    fetcher: DataFetcher,
    storage: S,
    dataset: Dataset,
    query: DatasetQuery,
    formats: Vec<String>,
}

impl<S: Storage> DatasetPipeline<S> {
    pub fn new(
        fetcher: DataFetcher,
        storage: S,
        dataset: Dataset,
        query: DatasetQuery,
        formats: Vec<String>,
    ) -> Self {
        Self {
            fetcher,
            storage,
            dataset,
            query,
            formats,
        }
    }

    /// `<dataset>_<start>_<end>.zip`
    pub fn archive_name(&self) -> String {
        format!(
            "{}_{}_{}.zip",
            self.dataset.name().replace('-', "_"),
            self.query.range.start().format("%Y%m%d"),
            self.query.range.end().format("%Y%m%d")
        )
    }

    fn response<'a>(&self, data: &'a RawResponses, idx: usize) -> Result<&'a Value> {
        data.get(idx).ok_or_else(|| EpiasError::ProcessingError {
            message: format!(
                "expected {} responses for {}, got {}",
                self.dataset.endpoints().len(),
                self.dataset,
                data.len()
            ),
        })
    }
}

fn resampled_table(
    name: &str,
    period: Period,
    points: Vec<(NaiveDateTime, f64)>,
) -> Table {
    let mut table = Table::new(
        format!("{}_{}", name, period.to_string().to_lowercase()),
        vec!["datetime".to_string(), "value".to_string()],
    );
    for (at, value) in processors::resample(&points, period) {
        table
            .rows
            .push(vec![json!(at.format("%Y-%m-%d %H:%M:%S").to_string()), json!(value)]);
    }
    table
}

fn points<T>(
    records: &[T],
    at: impl Fn(&T) -> Option<NaiveDateTime>,
    value: impl Fn(&T) -> f64,
) -> Vec<(NaiveDateTime, f64)> {
    records
        .iter()
        .filter_map(|r| at(r).map(|dt| (dt, value(r))))
        .collect()
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for DatasetPipeline<S> {
    async fn extract(&self) -> Result<RawResponses> {
        tracing::debug!("Extracting {} for {}", self.dataset, self.query.range);
        self.fetcher.fetch_raw(self.dataset, &self.query).await
    }

    async fn transform(&self, data: RawResponses) -> Result<Vec<Table>> {
        let name = self.dataset.name().replace('-', "_");
        let period = self.query.period;
        let mut tables = Vec::new();

        match self.dataset {
            Dataset::Ptf => {
                let records = processors::process_ptf(self.response(&data, 0)?);
                if let Some(period) = period {
                    let pts = points(&records, |r| r.datetime, |r| r.price);
                    tables.push(resampled_table(&name, period, pts));
                }
                tables.insert(0, Table::from_rows(&name, &records));
            }
            Dataset::Smf => {
                let records = processors::process_smf(self.response(&data, 0)?);
                if let Some(period) = period {
                    let pts = points(&records, |r| r.datetime, |r| r.up_price);
                    tables.push(resampled_table(&name, period, pts));
                }
                tables.insert(0, Table::from_rows(&name, &records));
            }
            Dataset::Bilateral => {
                let pivot = processors::process_bilateral(
                    self.response(&data, 0)?,
                    self.response(&data, 1)?,
                );
                tables.push(pivot.to_table(&name));
            }
            Dataset::Generation => {
                let records = processors::process_generation(self.response(&data, 0)?);
                let summary = processors::aggregate_generation_by_type(&records);
                tables.push(Table::from_rows(&name, &records));
                tables.push(Table::from_rows("generation_by_type", &summary));
                if let Some(period) = period {
                    let pts = points(&records, |r| r.datetime, |r| r.value);
                    tables.push(resampled_table(&name, period, pts));
                }
            }
            Dataset::Kgup => {
                let records = processors::process_kgup(self.response(&data, 0)?);
                tables.push(Table::from_rows(&name, &records));
            }
            Dataset::Consumption => {
                let records = processors::process_consumption(self.response(&data, 0)?);
                if let Some(period) = period {
                    let pts = points(&records, |r| r.datetime, |r| r.value);
                    tables.push(resampled_table(&name, period, pts));
                }
                tables.insert(0, Table::from_rows(&name, &records));
            }
            Dataset::ClearingQuantity => {
                let records = processors::process_clearing_quantity(self.response(&data, 0)?);
                tables.push(Table::from_rows(&name, &records));
            }
        }

        Ok(tables)
    }

    async fn load(&self, tables: Vec<Table>) -> Result<String> {
        let archive = self.archive_name();
        let bundle = export_bundle(&tables, &self.formats)?;

        tracing::debug!("Writing {} ({} bytes)", archive, bundle.len());
        self.storage.write_file(&archive, &bundle).await?;
        Ok(self.storage.describe(&archive))
    }
}
