use super::dataset::{Dataset, DatasetQuery};
use super::processors;
use crate::api::{EpiasClient, Endpoint};
use crate::domain::model::{
    BilateralPivot, ClearingQuantityRecord, ConsumptionRecord, DashboardMetric,
    GenerationRecord, KgupRecord, Organization, PowerPlant, PtfRecord, SmfRecord, Uevcb,
};
use crate::domain::ports::RawResponses;
use crate::domain::request::{DateRange, DateRangeRequest, UevcbListRequest};
use crate::utils::error::{EpiasError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::task::JoinSet;

/// Everything the overview command shows for one organization.
#[derive(Debug, Clone, Default)]
pub struct OrganizationOverview {
    pub uevcb_list: Vec<Uevcb>,
    pub generation: Vec<GenerationRecord>,
    pub kgup: Vec<KgupRecord>,
    pub ptf: Vec<PtfRecord>,
    pub smf: Vec<SmfRecord>,
}

/// High-level retrieval on top of [`EpiasClient`].
#[derive(Debug, Clone)]
pub struct DataFetcher {
    client: EpiasClient,
}

/// Deserialize `body.<key>` as a list of entities.
fn body_list<T: DeserializeOwned>(response: &Value, key: &str) -> Result<Vec<T>> {
    let Some(items) = response
        .get("body")
        .and_then(|b| b.get(key))
        .and_then(Value::as_array)
    else {
        return Ok(Vec::new());
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(serde_json::from_value(item.clone())?);
    }
    Ok(out)
}

fn or_empty<T: Default>(name: &str, organization_id: u64, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        tracing::error!("Failed to fetch {} for org {}: {}", name, organization_id, e);
        T::default()
    })
}

impl DataFetcher {
    pub fn new(client: EpiasClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &EpiasClient {
        &self.client
    }

    pub async fn fetch_organizations(&self, range: &DateRange) -> Result<Vec<Organization>> {
        let body = DateRangeRequest::new(range).to_json()?;
        let response = self
            .client
            .post(Endpoint::GenerationOrgList, &body)
            .await
            .inspect_err(|e| tracing::error!("Failed to fetch organizations: {}", e))?;

        let organizations: Vec<Organization> = body_list(&response, "organizations")?;
        tracing::info!("Fetched {} organizations", organizations.len());
        Ok(organizations)
    }

    pub async fn fetch_power_plants(&self) -> Result<Vec<PowerPlant>> {
        let response = self
            .client
            .get(Endpoint::GenerationPowerPlantList)
            .await
            .inspect_err(|e| tracing::error!("Failed to fetch power plants: {}", e))?;

        let plants: Vec<PowerPlant> = body_list(&response, "powerPlantList")?;
        tracing::info!("Fetched {} power plants", plants.len());
        Ok(plants)
    }

    pub async fn fetch_uevcb_list(&self, organization_id: u64) -> Result<Vec<Uevcb>> {
        let request = UevcbListRequest {
            organization_id,
            page: None,
        };
        let response = self
            .client
            .post(Endpoint::GenerationUevcbList, &serde_json::to_value(&request)?)
            .await
            .inspect_err(|e| tracing::error!("Failed to fetch UEVCB list: {}", e))?;

        let units: Vec<Uevcb> = body_list(&response, "uevcbList")?;
        tracing::info!("Fetched {} UEVCBs for org {}", units.len(), organization_id);
        Ok(units)
    }

    /// Raw responses for a dataset, one per endpoint in
    /// [`Dataset::endpoints`] order. Multi-endpoint datasets are fetched
    /// concurrently.
    pub async fn fetch_raw(&self, dataset: Dataset, query: &DatasetQuery) -> Result<RawResponses> {
        let body = query.request_body(dataset)?;

        let mut set = JoinSet::new();
        for (idx, endpoint) in dataset.endpoints().iter().copied().enumerate() {
            let client = self.client.clone();
            let body = body.clone();
            set.spawn(async move {
                let items = client.get_paginated(endpoint, &body).await;
                (idx, items)
            });
        }

        let mut responses = vec![Value::Null; dataset.endpoints().len()];
        while let Some(joined) = set.join_next().await {
            let (idx, items) = joined.map_err(|e| EpiasError::ProcessingError {
                message: format!("fetch task failed: {}", e),
            })?;
            let items = items.inspect_err(|e| {
                tracing::error!("Failed to fetch {} data: {}", dataset, e)
            })?;
            responses[idx] = Value::Array(items);
        }
        Ok(responses)
    }

    pub async fn fetch_ptf(&self, range: &DateRange) -> Result<Vec<PtfRecord>> {
        let raw = self.fetch_raw(Dataset::Ptf, &DatasetQuery::new(*range)).await?;
        let records = processors::process_ptf(&raw[0]);
        tracing::info!("Fetched PTF data: {} records", records.len());
        Ok(records)
    }

    pub async fn fetch_smf(&self, range: &DateRange) -> Result<Vec<SmfRecord>> {
        let raw = self.fetch_raw(Dataset::Smf, &DatasetQuery::new(*range)).await?;
        let records = processors::process_smf(&raw[0]);
        tracing::info!("Fetched SMF data: {} records", records.len());
        Ok(records)
    }

    /// Buy and sell sides are fetched concurrently and pivoted together.
    pub async fn fetch_bilateral_contracts(&self, range: &DateRange) -> Result<BilateralPivot> {
        let raw = self
            .fetch_raw(Dataset::Bilateral, &DatasetQuery::new(*range))
            .await?;
        let pivot = processors::process_bilateral(&raw[0], &raw[1]);
        tracing::info!("Fetched bilateral contracts: {} records", pivot.len());
        Ok(pivot)
    }

    pub async fn fetch_generation(
        &self,
        organization_id: u64,
        range: &DateRange,
        power_plant_id: Option<u64>,
    ) -> Result<Vec<GenerationRecord>> {
        let mut query = DatasetQuery::new(*range);
        query.organization_id = Some(organization_id);
        query.power_plant_id = power_plant_id;

        let raw = self.fetch_raw(Dataset::Generation, &query).await?;
        let records = processors::process_generation(&raw[0]);
        tracing::info!(
            "Fetched generation data for org {}: {} records",
            organization_id,
            records.len()
        );
        Ok(records)
    }

    /// One concurrent download per organization. A failing organization is
    /// logged and yields an empty list.
    pub async fn fetch_generation_for_orgs(
        &self,
        organization_ids: &[u64],
        range: &DateRange,
    ) -> BTreeMap<u64, Vec<GenerationRecord>> {
        let mut set = JoinSet::new();
        for &organization_id in organization_ids {
            let fetcher = self.clone();
            let range = *range;
            set.spawn(async move {
                let result = fetcher.fetch_generation(organization_id, &range, None).await;
                (organization_id, result)
            });
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((organization_id, result)) => {
                    results.insert(organization_id, or_empty("generation", organization_id, result));
                }
                Err(e) => tracing::error!("Generation task failed: {}", e),
            }
        }
        for organization_id in organization_ids {
            results.entry(*organization_id).or_default();
        }
        results
    }

    pub async fn fetch_kgup(&self, organization_id: u64, range: &DateRange) -> Result<Vec<KgupRecord>> {
        let mut query = DatasetQuery::new(*range);
        query.organization_id = Some(organization_id);

        let raw = self.fetch_raw(Dataset::Kgup, &query).await?;
        let records = processors::process_kgup(&raw[0]);
        tracing::info!(
            "Fetched KGÜP data for org {}: {} records",
            organization_id,
            records.len()
        );
        Ok(records)
    }

    pub async fn fetch_consumption(
        &self,
        range: &DateRange,
        province_id: Option<u64>,
    ) -> Result<Vec<ConsumptionRecord>> {
        let mut query = DatasetQuery::new(*range);
        query.province_id = province_id;

        let raw = self.fetch_raw(Dataset::Consumption, &query).await?;
        let records = processors::process_consumption(&raw[0]);
        tracing::info!("Fetched consumption data: {} records", records.len());
        Ok(records)
    }

    /// Day-ahead matched bid/offer quantities, optionally for one plant.
    pub async fn fetch_clearing_quantity(
        &self,
        range: &DateRange,
        power_plant_id: Option<u64>,
    ) -> Result<Vec<ClearingQuantityRecord>> {
        let mut query = DatasetQuery::new(*range);
        query.power_plant_id = power_plant_id;

        let raw = self.fetch_raw(Dataset::ClearingQuantity, &query).await?;
        let records = processors::process_clearing_quantity(&raw[0]);
        tracing::info!("Fetched clearing quantity data: {} records", records.len());
        Ok(records)
    }

    /// All dashboards concurrently; a failing dashboard becomes an empty entry.
    pub async fn fetch_dashboard(&self) -> BTreeMap<String, Vec<DashboardMetric>> {
        let mut set = JoinSet::new();
        for (name, endpoint) in Endpoint::DASHBOARDS {
            let client = self.client.clone();
            set.spawn(async move { (name, client.get(endpoint).await) });
        }

        let mut dashboards = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            let Ok((name, result)) = joined else {
                tracing::error!("Dashboard task failed");
                continue;
            };
            let metrics = match result {
                Ok(response) => processors::process_dashboard(&response),
                Err(e) => {
                    tracing::error!("Failed to fetch {} dashboard: {}", name, e);
                    Vec::new()
                }
            };
            dashboards.insert(name.to_string(), metrics);
        }
        for (name, _) in Endpoint::DASHBOARDS {
            dashboards.entry(name.to_string()).or_default();
        }
        dashboards
    }

    pub async fn fetch_organization_overview(
        &self,
        organization_id: u64,
        range: &DateRange,
    ) -> OrganizationOverview {
        let (uevcb_list, generation, kgup, ptf, smf) = tokio::join!(
            self.fetch_uevcb_list(organization_id),
            self.fetch_generation(organization_id, range, None),
            self.fetch_kgup(organization_id, range),
            self.fetch_ptf(range),
            self.fetch_smf(range),
        );

        OrganizationOverview {
            uevcb_list: or_empty("uevcb_list", organization_id, uevcb_list),
            generation: or_empty("generation", organization_id, generation),
            kgup: or_empty("kgup", organization_id, kgup),
            ptf: or_empty("ptf", organization_id, ptf),
            smf: or_empty("smf", organization_id, smf),
        }
    }
}
