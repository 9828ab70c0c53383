use crate::api::Endpoint;
use crate::domain::model::Period;
use crate::domain::request::{DateRange, DateRangeRequest};
use crate::utils::error::{EpiasError, Result};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Datasets that can be run through the ETL pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Ptf,
    Smf,
    Bilateral,
    Generation,
    Kgup,
    Consumption,
    ClearingQuantity,
}

impl Dataset {
    pub const ALL: [Dataset; 7] = [
        Dataset::Ptf,
        Dataset::Smf,
        Dataset::Bilateral,
        Dataset::Generation,
        Dataset::Kgup,
        Dataset::Consumption,
        Dataset::ClearingQuantity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dataset::Ptf => "ptf",
            Dataset::Smf => "smf",
            Dataset::Bilateral => "bilateral",
            Dataset::Generation => "generation",
            Dataset::Kgup => "kgup",
            Dataset::Consumption => "consumption",
            Dataset::ClearingQuantity => "clearing-quantity",
        }
    }

    /// Endpoints queried, in the order their responses are returned.
    pub fn endpoints(&self) -> &'static [Endpoint] {
        match self {
            Dataset::Ptf => &[Endpoint::DamMcp],
            Dataset::Smf => &[Endpoint::BpmSystemMarginalPrice],
            Dataset::Bilateral => &[
                Endpoint::BilateralContractsBid,
                Endpoint::BilateralContractsOffer,
            ],
            Dataset::Generation => &[Endpoint::GenerationRealtime],
            Dataset::Kgup => &[Endpoint::GenerationDpp],
            Dataset::Consumption => &[Endpoint::ConsumptionQuantity],
            Dataset::ClearingQuantity => &[Endpoint::DamClearingQuantity],
        }
    }

    pub fn requires_organization(&self) -> bool {
        matches!(self, Dataset::Generation | Dataset::Kgup)
    }
}

impl FromStr for Dataset {
    type Err = EpiasError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Dataset::ALL
            .into_iter()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| EpiasError::ValidationError {
                message: format!(
                    "unknown dataset '{}' (expected one of: {})",
                    s,
                    Dataset::ALL.map(|d| d.name()).join(", ")
                ),
            })
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Filters for a dataset run.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetQuery {
    pub range: DateRange,
    pub organization_id: Option<u64>,
    pub power_plant_id: Option<u64>,
    pub province_id: Option<u64>,
    pub period: Option<Period>,
}

impl DatasetQuery {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            organization_id: None,
            power_plant_id: None,
            province_id: None,
            period: None,
        }
    }

    pub fn validate_for(&self, dataset: Dataset) -> Result<()> {
        if dataset.requires_organization() && self.organization_id.is_none() {
            return Err(EpiasError::ValidationError {
                message: format!("dataset '{}' needs an organization id (--org)", dataset),
            });
        }
        Ok(())
    }

    /// Request body for `dataset`, without paging.
    pub fn request_body(&self, dataset: Dataset) -> Result<Value> {
        self.validate_for(dataset)?;

        let mut request = DateRangeRequest::new(&self.range);
        match dataset {
            Dataset::Generation => {
                request.organization_id = self.organization_id;
                request.power_plant_id = self.power_plant_id;
            }
            Dataset::Kgup => request.organization_id = self.organization_id,
            Dataset::Consumption => request.province_id = self.province_id,
            Dataset::ClearingQuantity => request.power_plant_id = self.power_plant_id,
            Dataset::Ptf | Dataset::Smf | Dataset::Bilateral => {}
        }
        request.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range() -> DateRange {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        DateRange::new(d, d).unwrap()
    }

    #[test]
    fn test_dataset_names_parse() {
        for dataset in Dataset::ALL {
            assert_eq!(dataset.name().parse::<Dataset>().unwrap(), dataset);
        }
        assert_eq!("clearing_quantity".parse::<Dataset>().unwrap(), Dataset::ClearingQuantity);
        assert!("imbalance".parse::<Dataset>().is_err());
    }

    #[test]
    fn test_generation_requires_organization() {
        let mut query = DatasetQuery::new(range());
        assert!(query.request_body(Dataset::Generation).is_err());

        query.organization_id = Some(195);
        query.power_plant_id = Some(7);
        let body = query.request_body(Dataset::Generation).unwrap();
        assert_eq!(body["organizationId"], 195);
        assert_eq!(body["powerPlantId"], 7);

        let ptf = query.request_body(Dataset::Ptf).unwrap();
        assert!(ptf.get("organizationId").is_none());
    }
}
