//! Transparency platform endpoint catalogue.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    // Dashboard
    DashboardBpm,
    DashboardDam,
    DashboardIdm,
    DashboardMms,
    DashboardConsumption,
    DashboardGeneration,
    DashboardWeightedPrice,

    // Generation
    GenerationAic,
    GenerationDpp,
    GenerationInjection,
    GenerationRealtime,
    GenerationOrgList,
    GenerationPowerPlantList,
    GenerationRegionList,
    GenerationUevcbList,

    // Bilateral contracts
    BilateralContractsAmount,
    BilateralContractsBid,
    BilateralContractsOffer,

    // Balancing power market
    BpmOrderSummaryUp,
    BpmOrderSummaryDown,
    BpmSystemDirection,
    BpmSystemMarginalPrice,

    // Day-ahead market
    DamBlockBid,
    DamBlockOffer,
    DamClearingQuantity,
    DamClearingOrgList,
    DamTradeVolume,
    DamFlexibleBid,
    DamFlexibleOffer,
    DamInterimMcp,
    DamMcp,
    DamSubmittedBid,
    DamSubmittedOffer,
    DamSupplyDemand,

    // Intraday market
    IdmBidOffer,
    IdmMatchingQuantity,
    IdmMinMaxBid,
    IdmMinMaxMatch,
    IdmMinMaxOffer,
    IdmTradeVolume,
    IdmWeightedAverage,

    // Consumption
    ConsumptionQuantity,
    ConsumptionConsumerQuantity,
    ConsumptionDemandForecast,
    ConsumptionDistributionRegion,
    ConsumptionEligibleConsumerCount,
    ConsumptionEligibleConsumerQuantity,
    ConsumptionLoadEstimationPlan,
    ConsumptionRealtime,
    ConsumptionWithdrawalQuantity,

    // Main
    MainDateInit,
    MainProvinceList,
    MainDistrictList,

    // Ancillary services
    AncillaryPrimaryCapacityAmount,
    AncillaryPrimaryCapacityPrice,
    AncillarySecondaryCapacityAmount,
    AncillarySecondaryCapacityPrice,

    // Imbalance
    ImbalanceQuantity,
    ImbalanceAmount,
}

impl Endpoint {
    pub const DASHBOARDS: [(&'static str, Endpoint); 6] = [
        ("bpm", Endpoint::DashboardBpm),
        ("dam", Endpoint::DashboardDam),
        ("idm", Endpoint::DashboardIdm),
        ("consumption", Endpoint::DashboardConsumption),
        ("generation", Endpoint::DashboardGeneration),
        ("weighted_price", Endpoint::DashboardWeightedPrice),
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::DashboardBpm => "/dashboard/balancing-power-market",
            Endpoint::DashboardDam => "/dashboard/day-ahead-market",
            Endpoint::DashboardIdm => "/dashboard/intra-day-market",
            Endpoint::DashboardMms => "/dashboard/market-message-system",
            Endpoint::DashboardConsumption => "/dashboard/realtime-consumption",
            Endpoint::DashboardGeneration => "/dashboard/realtime-generation",
            Endpoint::DashboardWeightedPrice => "/dashboard/weighted-average-price",

            Endpoint::GenerationAic => "/generation/data/aic",
            Endpoint::GenerationDpp => "/generation/data/dpp",
            Endpoint::GenerationInjection => "/generation/data/injection-quantity",
            Endpoint::GenerationRealtime => "/generation/data/realtime-generation",
            Endpoint::GenerationOrgList => "/generation/data/organization-list",
            Endpoint::GenerationPowerPlantList => "/generation/data/powerplant-list",
            Endpoint::GenerationRegionList => "/generation/data/region-list",
            Endpoint::GenerationUevcbList => "/generation/data/uevcb-list",

            Endpoint::BilateralContractsAmount => {
                "/markets/bilateral-contracts/data/amount-of-bilateral-contracts"
            }
            Endpoint::BilateralContractsBid => {
                "/markets/bilateral-contracts/data/bilateral-contracts-bid-quantity"
            }
            Endpoint::BilateralContractsOffer => {
                "/markets/bilateral-contracts/data/bilateral-contracts-offer-quantity"
            }

            Endpoint::BpmOrderSummaryUp => "/markets/bpm/data/order-summary-up",
            Endpoint::BpmOrderSummaryDown => "/markets/bpm/data/order-summary-down",
            Endpoint::BpmSystemDirection => "/markets/bpm/data/system-direction",
            Endpoint::BpmSystemMarginalPrice => "/markets/bpm/data/system-marginal-price",

            Endpoint::DamBlockBid => "/markets/dam/data/amount-of-block-buying",
            Endpoint::DamBlockOffer => "/markets/dam/data/amount-of-block-selling",
            Endpoint::DamClearingQuantity => "/markets/dam/data/clearing-quantity",
            Endpoint::DamClearingOrgList => "/markets/dam/data/clearing-quantity-organization-list",
            Endpoint::DamTradeVolume => "/markets/dam/data/day-ahead-market-trade-volume",
            Endpoint::DamFlexibleBid => "/markets/dam/data/flexible-offer-buying-quantity",
            Endpoint::DamFlexibleOffer => "/markets/dam/data/flexible-offer-selling-quantity",
            Endpoint::DamInterimMcp => "/markets/dam/data/interim-mcp",
            Endpoint::DamMcp => "/markets/dam/data/mcp",
            Endpoint::DamSubmittedBid => "/markets/dam/data/submitted-bid-order-volume",
            Endpoint::DamSubmittedOffer => "/markets/dam/data/submitted-sales-order-volume",
            Endpoint::DamSupplyDemand => "/markets/dam/data/supply-demand",

            Endpoint::IdmBidOffer => "/markets/idm/data/bid-offer-quantities",
            Endpoint::IdmMatchingQuantity => "/markets/idm/data/matching-quantity",
            Endpoint::IdmMinMaxBid => "/markets/idm/data/min-max-bid-price",
            Endpoint::IdmMinMaxMatch => "/markets/idm/data/min-max-matching-price",
            Endpoint::IdmMinMaxOffer => "/markets/idm/data/min-max-offer-price",
            Endpoint::IdmTradeVolume => "/markets/idm/data/intraday-trade-volume",
            Endpoint::IdmWeightedAverage => "/markets/idm/data/weighted-average-price",

            Endpoint::ConsumptionQuantity => "/consumption/data/consumption-quantity",
            Endpoint::ConsumptionConsumerQuantity => "/consumption/data/consumer-quantity",
            Endpoint::ConsumptionDemandForecast => "/consumption/data/demand-forecast",
            Endpoint::ConsumptionDistributionRegion => "/consumption/data/distribution-region",
            Endpoint::ConsumptionEligibleConsumerCount => {
                "/consumption/data/eligible-consumer-count"
            }
            Endpoint::ConsumptionEligibleConsumerQuantity => {
                "/consumption/data/eligible-consumer-quantity"
            }
            Endpoint::ConsumptionLoadEstimationPlan => "/consumption/data/load-estimation-plan",
            Endpoint::ConsumptionRealtime => "/consumption/data/realtime-consumption",
            Endpoint::ConsumptionWithdrawalQuantity => "/consumption/data/st-uecm",

            Endpoint::MainDateInit => "/main/date-init",
            Endpoint::MainProvinceList => "/main/province-list",
            Endpoint::MainDistrictList => "/main/district-list",

            Endpoint::AncillaryPrimaryCapacityAmount => {
                "/markets/ancillary-services/data/primary-frequency-capacity-amount"
            }
            Endpoint::AncillaryPrimaryCapacityPrice => {
                "/markets/ancillary-services/data/primary-frequency-capacity-price"
            }
            Endpoint::AncillarySecondaryCapacityAmount => {
                "/markets/ancillary-services/data/secondary-frequency-capacity-amount"
            }
            Endpoint::AncillarySecondaryCapacityPrice => {
                "/markets/ancillary-services/data/secondary-frequency-capacity-price"
            }

            Endpoint::ImbalanceQuantity => "/markets/imbalance/data/imbalance-quantity",
            Endpoint::ImbalanceAmount => "/markets/imbalance/data/imbalance-amount",
        }
    }

    /// Most data endpoints take a JSON body and are POST; lists and
    /// dashboards are plain GETs.
    pub fn method(&self) -> RequestMethod {
        match self {
            Endpoint::DashboardBpm
            | Endpoint::DashboardDam
            | Endpoint::DashboardIdm
            | Endpoint::DashboardMms
            | Endpoint::DashboardConsumption
            | Endpoint::DashboardGeneration
            | Endpoint::DashboardWeightedPrice
            | Endpoint::GenerationPowerPlantList
            | Endpoint::GenerationRegionList
            | Endpoint::ConsumptionDistributionRegion
            | Endpoint::MainDateInit
            | Endpoint::MainProvinceList => RequestMethod::Get,
            _ => RequestMethod::Post,
        }
    }

    /// Spreadsheet export variant of a data endpoint (`/data/` → `/export/`).
    pub fn export_path(&self) -> String {
        self.path().replace("/data/", "/export/")
    }

    pub fn is_dashboard(&self) -> bool {
        self.path().starts_with("/dashboard/")
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method().as_str(), self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_methods_follow_catalogue() {
        assert_eq!(Endpoint::DamMcp.method(), RequestMethod::Post);
        assert_eq!(Endpoint::GenerationPowerPlantList.method(), RequestMethod::Get);
        assert_eq!(Endpoint::MainDistrictList.method(), RequestMethod::Post);
        assert_eq!(Endpoint::DashboardWeightedPrice.method(), RequestMethod::Get);
    }

    #[test]
    fn test_export_path() {
        assert_eq!(Endpoint::DamMcp.export_path(), "/markets/dam/export/mcp");
        assert_eq!(
            Endpoint::ConsumptionWithdrawalQuantity.export_path(),
            "/consumption/export/st-uecm"
        );
        // Dashboards have no data segment to rewrite.
        assert_eq!(
            Endpoint::DashboardDam.export_path(),
            Endpoint::DashboardDam.path()
        );
    }

    #[test]
    fn test_dashboard_set() {
        assert!(Endpoint::DASHBOARDS.iter().all(|(_, e)| e.is_dashboard()));
        assert!(!Endpoint::DamMcp.is_dashboard());
    }
}
