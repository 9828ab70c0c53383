use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::utils::error::EpiasError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub eic: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerPlant {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub eic: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Settlement-based injection/withdrawal unit (UEVÇB).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Uevcb {
    pub id: u64,
    pub name: String,
    pub eic: String,
    pub organization_id: u64,
    #[serde(default)]
    pub organization_name: Option<String>,
}

/// Response envelope: `{ body, resultCode, resultDescription }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope {
    #[serde(default)]
    pub body: serde_json::Value,
    #[serde(default)]
    pub result_code: Option<String>,
    #[serde(default)]
    pub result_description: Option<String>,
}

impl ApiEnvelope {
    pub fn is_success(&self) -> bool {
        self.result_code.as_deref().map_or(true, |code| code == "200")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemDirection {
    #[serde(rename = "Enerji Fazlası")]
    Surplus,
    #[serde(rename = "Enerji Açığı")]
    Deficit,
    #[serde(rename = "Dengede")]
    Balanced,
}

impl SystemDirection {
    pub fn label(&self) -> &'static str {
        match self {
            SystemDirection::Surplus => "Enerji Fazlası",
            SystemDirection::Deficit => "Enerji Açığı",
            SystemDirection::Balanced => "Dengede",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Enerji Fazlası" | "ENERGY_SURPLUS" => Some(SystemDirection::Surplus),
            "Enerji Açığı" | "ENERGY_DEFICIT" => Some(SystemDirection::Deficit),
            "Dengede" | "IN_BALANCE" => Some(SystemDirection::Balanced),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractType {
    #[serde(rename = "EÜAŞ-GTŞ")]
    EuasGts,
    #[serde(rename = "Diğer")]
    Other,
}

impl ContractType {
    pub fn label(&self) -> &'static str {
        match self {
            ContractType::EuasGts => "EÜAŞ-GTŞ",
            ContractType::Other => "Diğer",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "EÜAŞ-GTŞ" => Some(ContractType::EuasGts),
            "Diğer" => Some(ContractType::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GenerationType {
    #[serde(rename = "Rüzgar")]
    Wind,
    #[serde(rename = "Güneş")]
    Solar,
    #[serde(rename = "Barajlı")]
    HydroDam,
    #[serde(rename = "Akarsu")]
    HydroRunOfRiver,
    #[serde(rename = "Doğal Gaz")]
    NaturalGas,
    #[serde(rename = "Linyit")]
    Lignite,
    #[serde(rename = "İthal Kömür")]
    ImportedCoal,
    #[serde(rename = "Nükleer")]
    Nuclear,
    #[serde(rename = "Jeotermal")]
    Geothermal,
    #[serde(rename = "Biyokütle")]
    Biomass,
    #[serde(rename = "Diğer")]
    Other,
}

impl GenerationType {
    pub const ALL: [GenerationType; 11] = [
        GenerationType::Wind,
        GenerationType::Solar,
        GenerationType::HydroDam,
        GenerationType::HydroRunOfRiver,
        GenerationType::NaturalGas,
        GenerationType::Lignite,
        GenerationType::ImportedCoal,
        GenerationType::Nuclear,
        GenerationType::Geothermal,
        GenerationType::Biomass,
        GenerationType::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GenerationType::Wind => "Rüzgar",
            GenerationType::Solar => "Güneş",
            GenerationType::HydroDam => "Barajlı",
            GenerationType::HydroRunOfRiver => "Akarsu",
            GenerationType::NaturalGas => "Doğal Gaz",
            GenerationType::Lignite => "Linyit",
            GenerationType::ImportedCoal => "İthal Kömür",
            GenerationType::Nuclear => "Nükleer",
            GenerationType::Geothermal => "Jeotermal",
            GenerationType::Biomass => "Biyokütle",
            GenerationType::Other => "Diğer",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label.trim())
    }
}

/// Organised electricity markets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Market {
    /// GÖP, day-ahead market
    DayAhead,
    /// GİP, intraday market
    Intraday,
    /// DGP, balancing power market
    Balancing,
}

impl Market {
    pub fn code(&self) -> &'static str {
        match self {
            Market::DayAhead => "GÖP",
            Market::Intraday => "GİP",
            Market::Balancing => "DGP",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Market::DayAhead => "Gün Öncesi Piyasası (Day Ahead Market)",
            Market::Intraday => "Gün İçi Piyasası (Intraday Market)",
            Market::Balancing => "Dengeleme Güç Piyasası (Balancing Power Market)",
        }
    }
}

/// Aggregation bucket for time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Period {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl FromStr for Period {
    type Err = EpiasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hourly" | "hour" => Ok(Period::Hourly),
            "daily" | "day" => Ok(Period::Daily),
            "weekly" | "week" => Ok(Period::Weekly),
            "monthly" | "month" => Ok(Period::Monthly),
            other => Err(EpiasError::ValidationError {
                message: format!("unknown period '{}'", other),
            }),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Period::Hourly => "Hourly",
            Period::Daily => "Daily",
            Period::Weekly => "Weekly",
            Period::Monthly => "Monthly",
        };
        write!(f, "{}", name)
    }
}

/// Day-ahead market clearing price (PTF).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PtfRecord {
    pub datetime: Option<NaiveDateTime>,
    pub price: f64,
    pub hour: u32,
}

/// System marginal price (SMF) with regulation prices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmfRecord {
    pub datetime: Option<NaiveDateTime>,
    pub up_price: f64,
    pub down_price: f64,
    pub direction: Option<SystemDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRecord {
    pub datetime: Option<NaiveDateTime>,
    pub power_plant: String,
    pub power_plant_id: Option<u64>,
    pub generation_type: String,
    pub value: f64,
}

impl GenerationRecord {
    pub fn kind(&self) -> Option<GenerationType> {
        GenerationType::from_label(&self.generation_type)
    }
}

/// Finalised daily production plan (KGÜP) entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KgupRecord {
    pub datetime: Option<NaiveDateTime>,
    pub uevcb: String,
    pub uevcb_id: Option<u64>,
    pub planned_generation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumptionRecord {
    pub datetime: Option<NaiveDateTime>,
    pub province: String,
    pub district: String,
    pub profile_group: String,
    pub subscriber_type: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClearingQuantityRecord {
    pub datetime: Option<NaiveDateTime>,
    pub matched_bids: f64,
    pub matched_offers: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetric {
    pub metric: String,
    pub value: serde_json::Value,
    pub change: Option<f64>,
    pub timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSummary {
    pub generation_type: String,
    pub total: f64,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceStatistics {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub volatility: f64,
}

/// Bilateral contract quantities pivoted by `(side, contract type)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BilateralPivot {
    pub columns: Vec<(String, String)>,
    pub rows: BTreeMap<NaiveDateTime, Vec<f64>>,
}

impl BilateralPivot {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn value(&self, at: NaiveDateTime, side: &str, contract_type: &str) -> Option<f64> {
        let col = self
            .columns
            .iter()
            .position(|(s, c)| s == side && c == contract_type)?;
        self.rows.get(&at).and_then(|row| row.get(col).copied())
    }
}
