//! Raw transparency-platform responses → typed rows.

use crate::domain::model::{
    BilateralPivot, ClearingQuantityRecord, ConsumptionRecord, ContractType, DashboardMetric,
    GenerationRecord, GenerationSummary, KgupRecord, Period, PriceStatistics, PtfRecord,
    SmfRecord, SystemDirection,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde_json::Value;
use std::collections::BTreeMap;

/// Pull the item list out of whatever envelope the endpoint used.
pub fn extract_content(response: &Value) -> Vec<Value> {
    match response {
        Value::Array(items) => items.clone(),
        Value::Object(map) => {
            let list = map
                .get("body")
                .and_then(|b| b.get("content"))
                .or_else(|| map.get("content"))
                .or_else(|| map.get("items"));
            match list {
                Some(Value::Array(items)) => items.clone(),
                Some(Value::Null) => Vec::new(),
                Some(other) => vec![other.clone()],
                None if map.is_empty() => Vec::new(),
                None => vec![response.clone()],
            }
        }
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// Offsets are dropped after conversion; the result is Istanbul wall time
/// as the platform sends it.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.contains('T') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_local());
        }
        return NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .ok();
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// First non-zero value among `keys`, else 0.
fn first_number(item: &Value, keys: &[&str]) -> f64 {
    keys.iter()
        .filter_map(|k| item.get(*k).and_then(as_f64))
        .find(|v| *v != 0.0)
        .unwrap_or(0.0)
}

fn text(item: &Value, key: &str) -> String {
    match item.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn id(item: &Value, key: &str) -> Option<u64> {
    match item.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Hours arrive either as numbers or as `"HH:MM"` strings.
fn hour(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().map(|h| h as u32),
        Value::String(s) => s.split(':').next()?.trim().parse().ok(),
        _ => None,
    }
}

fn item_datetime(item: &Value) -> Option<NaiveDateTime> {
    item.get("date")
        .and_then(Value::as_str)
        .and_then(parse_datetime)
}

fn with_hour(dt: Option<NaiveDateTime>, h: u32) -> Option<NaiveDateTime> {
    dt.and_then(|dt| dt.with_hour(h))
}

/// Sort key placing records without a datetime after all dated ones.
fn missing_last(dt: Option<NaiveDateTime>) -> (bool, Option<NaiveDateTime>) {
    (dt.is_none(), dt)
}

fn objects(response: &Value) -> impl Iterator<Item = Value> {
    extract_content(response).into_iter().filter(Value::is_object)
}

pub fn process_ptf(response: &Value) -> Vec<PtfRecord> {
    let mut records: Vec<PtfRecord> = objects(response)
        .map(|item| {
            let datetime = item_datetime(&item);
            let hour = item
                .get("hour")
                .and_then(hour)
                .or_else(|| datetime.map(|dt| dt.hour()))
                .unwrap_or(0);
            PtfRecord {
                datetime,
                price: first_number(&item, &["price", "value"]),
                hour,
            }
        })
        .collect();

    records.sort_by_key(|r| missing_last(r.datetime));
    tracing::info!("Processed PTF data: {} records", records.len());
    records
}

pub fn process_smf(response: &Value) -> Vec<SmfRecord> {
    let mut records: Vec<SmfRecord> = objects(response)
        .map(|item| SmfRecord {
            datetime: item_datetime(&item),
            up_price: first_number(&item, &["upRegulationPrice", "yalPrice"]),
            down_price: first_number(&item, &["downRegulationPrice", "yatPrice"]),
            direction: SystemDirection::from_label(&text(&item, "systemDirection")),
        })
        .collect();

    records.sort_by_key(|r| missing_last(r.datetime));
    tracing::info!("Processed SMF data: {} records", records.len());
    records
}

pub fn process_generation(response: &Value) -> Vec<GenerationRecord> {
    let mut records = Vec::new();

    for item in objects(response) {
        let datetime = item_datetime(&item);
        let power_plant = text(&item, "powerPlantName");
        let power_plant_id = id(&item, "powerPlantId");

        match item.get("hourlyGenerations").and_then(Value::as_array) {
            Some(hours) => {
                for hour_data in hours {
                    let h = hour_data.get("hour").and_then(hour).unwrap_or(0);
                    records.push(GenerationRecord {
                        datetime: with_hour(datetime, h),
                        power_plant: power_plant.clone(),
                        power_plant_id,
                        generation_type: text(hour_data, "generationType"),
                        value: first_number(hour_data, &["generation"]),
                    });
                }
            }
            None => records.push(GenerationRecord {
                datetime,
                power_plant,
                power_plant_id,
                generation_type: text(&item, "generationType"),
                value: first_number(&item, &["generation", "value"]),
            }),
        }
    }

    records.sort_by_key(|r| missing_last(r.datetime));
    tracing::info!("Processed generation data: {} records", records.len());
    records
}

pub fn process_kgup(response: &Value) -> Vec<KgupRecord> {
    let mut records = Vec::new();

    for item in objects(response) {
        let datetime = item_datetime(&item);
        let uevcb = text(&item, "uevcbName");
        let uevcb_id = id(&item, "uevcbId");

        match item.get("hourlyPlans").and_then(Value::as_array) {
            Some(hours) => {
                for hour_data in hours {
                    let h = hour_data.get("hour").and_then(hour).unwrap_or(0);
                    records.push(KgupRecord {
                        datetime: with_hour(datetime, h),
                        uevcb: uevcb.clone(),
                        uevcb_id,
                        planned_generation: first_number(hour_data, &["plannedGeneration"]),
                    });
                }
            }
            None => records.push(KgupRecord {
                datetime,
                uevcb,
                uevcb_id,
                planned_generation: first_number(&item, &["plannedGeneration", "value"]),
            }),
        }
    }

    records.sort_by_key(|r| missing_last(r.datetime));
    tracing::info!("Processed KGÜP data: {} records", records.len());
    records
}

/// Pivot buy/sell quantities into one row per timestamp and one column per
/// `(side, contract type)`. Duplicate cells are averaged, gaps are 0.
/// Items without a parsable datetime are dropped.
pub fn process_bilateral(buy: &Value, sell: &Value) -> BilateralPivot {
    let mut cells: BTreeMap<(NaiveDateTime, (String, String)), (f64, usize)> = BTreeMap::new();

    for (side, response) in [("buy", buy), ("sell", sell)] {
        for item in objects(response) {
            let Some(at) = item_datetime(&item) else {
                continue;
            };
            let raw_type = text(&item, "contractType");
            let contract_type = ContractType::from_label(&raw_type)
                .map(|t| t.label().to_string())
                .unwrap_or_else(|| raw_type.trim().to_string());
            let key = (at, (side.to_string(), contract_type));
            let quantity = first_number(&item, &["quantity", "value"]);
            let cell = cells.entry(key).or_insert((0.0, 0));
            cell.0 += quantity;
            cell.1 += 1;
        }
    }

    let mut columns: Vec<(String, String)> = cells.keys().map(|(_, c)| c.clone()).collect();
    columns.sort();
    columns.dedup();

    let mut pivot = BilateralPivot {
        columns,
        rows: BTreeMap::new(),
    };
    for ((at, column), (sum, count)) in cells {
        let width = pivot.columns.len();
        let row = pivot.rows.entry(at).or_insert_with(|| vec![0.0; width]);
        if let Some(idx) = pivot.columns.iter().position(|c| *c == column) {
            row[idx] = sum / count as f64;
        }
    }

    tracing::info!("Processed bilateral contracts: {} records", pivot.len());
    pivot
}

pub fn process_consumption(response: &Value) -> Vec<ConsumptionRecord> {
    let mut records: Vec<ConsumptionRecord> = objects(response)
        .map(|item| ConsumptionRecord {
            datetime: item_datetime(&item),
            province: text(&item, "province"),
            district: text(&item, "district"),
            profile_group: text(&item, "profileGroup"),
            subscriber_type: text(&item, "subscriberType"),
            value: first_number(&item, &["consumption", "value"]),
        })
        .collect();

    records.sort_by_key(|r| missing_last(r.datetime));
    tracing::info!("Processed consumption data: {} records", records.len());
    records
}

/// Dashboards come either as a `body.summary` map or a `body.data` list.
pub fn process_dashboard(response: &Value) -> Vec<DashboardMetric> {
    let Some(body) = response.get("body") else {
        return Vec::new();
    };

    let mut records = Vec::new();
    if let Some(summary) = body.get("summary").and_then(Value::as_object) {
        let now = chrono::Local::now().naive_local();
        for (metric, value) in summary {
            records.push(DashboardMetric {
                metric: metric.clone(),
                value: value.clone(),
                change: None,
                timestamp: Some(now),
            });
        }
    } else if let Some(data) = body.get("data").and_then(Value::as_array) {
        for item in data.iter().filter(|i| i.is_object()) {
            records.push(DashboardMetric {
                metric: text(item, "name"),
                value: item.get("value").cloned().unwrap_or(Value::from(0)),
                change: Some(first_number(item, &["change"])),
                timestamp: item_datetime(item),
            });
        }
    }

    tracing::info!("Processed dashboard data: {} records", records.len());
    records
}

pub fn process_clearing_quantity(response: &Value) -> Vec<ClearingQuantityRecord> {
    let mut records: Vec<ClearingQuantityRecord> = objects(response)
        .map(|item| ClearingQuantityRecord {
            datetime: item_datetime(&item),
            matched_bids: item.get("matchedBids").and_then(as_f64).unwrap_or(0.0),
            matched_offers: item.get("matchedOffers").and_then(as_f64).unwrap_or(0.0),
        })
        .collect();

    records.sort_by_key(|r| missing_last(r.datetime));
    tracing::info!("Processed clearing quantity data: {} records", records.len());
    records
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn aggregate_generation_by_type(records: &[GenerationRecord]) -> Vec<GenerationSummary> {
    // Known types group under their canonical label.
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        let key = match record.kind() {
            Some(kind) => kind.label(),
            None => record.generation_type.trim(),
        };
        groups.entry(key).or_default().push(record.value);
    }

    groups
        .into_iter()
        .map(|(generation_type, values)| {
            let total: f64 = values.iter().sum();
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            GenerationSummary {
                generation_type: generation_type.to_string(),
                total: round2(total),
                mean: round2(total / values.len() as f64),
                max: round2(max),
                min: round2(min),
            }
        })
        .collect()
}

/// Sample (n-1) standard deviation; a single value has a deviation of 0.
pub fn price_statistics(prices: &[f64]) -> Option<PriceStatistics> {
    if prices.is_empty() {
        return None;
    }

    let n = prices.len() as f64;
    let mean = prices.iter().sum::<f64>() / n;

    let mut sorted = prices.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    let std = if prices.len() > 1 {
        let var = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1.0);
        var.sqrt()
    } else {
        0.0
    };

    Some(PriceStatistics {
        mean,
        median,
        std,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        volatility: if mean > 0.0 { std / mean * 100.0 } else { 0.0 },
    })
}

fn bucket_start(at: NaiveDateTime, period: Period) -> NaiveDateTime {
    let date = at.date();
    match period {
        Period::Hourly => date.and_time(NaiveTime::MIN) + Duration::hours(at.hour() as i64),
        Period::Daily => date.and_time(NaiveTime::MIN),
        Period::Weekly => {
            let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
            monday.and_time(NaiveTime::MIN)
        }
        Period::Monthly => date.with_day(1).unwrap_or(date).and_time(NaiveTime::MIN),
    }
}

/// Mean value per hour, day, ISO week (Monday start) or calendar month.
pub fn resample(points: &[(NaiveDateTime, f64)], period: Period) -> Vec<(NaiveDateTime, f64)> {
    let mut buckets: BTreeMap<NaiveDateTime, (f64, usize)> = BTreeMap::new();
    for (at, value) in points {
        let bucket = buckets.entry(bucket_start(*at, period)).or_insert((0.0, 0));
        bucket.0 += value;
        bucket.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(at, (sum, count))| (at, sum / count as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_extract_content_shapes() {
        assert_eq!(extract_content(&json!([1, 2])).len(), 2);
        assert_eq!(extract_content(&json!({"body": {"content": [1, 2, 3]}})).len(), 3);
        assert_eq!(extract_content(&json!({"content": [1]})).len(), 1);
        assert_eq!(extract_content(&json!({"items": [1, 2]})).len(), 2);
        assert_eq!(extract_content(&json!({"price": 5})), vec![json!({"price": 5})]);
        assert!(extract_content(&json!({})).is_empty());
        assert!(extract_content(&Value::Null).is_empty());
    }

    #[test]
    fn test_parse_datetime_formats() {
        assert_eq!(
            parse_datetime("2024-03-01T05:00:00+03:00"),
            Some(at("2024-03-01 05:00"))
        );
        assert_eq!(parse_datetime("2024-03-01T05:30:00"), Some(at("2024-03-01 05:30")));
        assert_eq!(parse_datetime("2024-03-01"), Some(at("2024-03-01 00:00")));
        assert_eq!(parse_datetime("yesterday"), None);
        assert_eq!(parse_datetime(""), None);
    }

    #[test]
    fn test_process_ptf_sorts_and_falls_back() {
        let response = json!({"items": [
            {"date": "2024-03-01T02:00:00+03:00", "price": 0, "value": "2100.5"},
            {"date": "2024-03-01T01:00:00+03:00", "price": 1999.0, "hour": "01:00"},
            {"date": "garbage", "price": 10}
        ]});

        let records = process_ptf(&response);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].price, 1999.0);
        assert_eq!(records[0].hour, 1);
        assert_eq!(records[1].price, 2100.5);
        assert_eq!(records[1].hour, 2);
        assert_eq!(records[2].datetime, None);
        assert_eq!(records[2].price, 10.0);
    }

    #[test]
    fn test_process_smf_alternate_keys() {
        let response = json!([{
            "date": "2024-03-01T00:00:00+03:00",
            "yalPrice": 2500,
            "downRegulationPrice": 1800,
            "systemDirection": "Enerji Açığı"
        }]);

        let records = process_smf(&response);
        assert_eq!(records[0].up_price, 2500.0);
        assert_eq!(records[0].down_price, 1800.0);
        assert_eq!(records[0].direction, Some(SystemDirection::Deficit));
    }

    #[test]
    fn test_process_generation_expands_hours() {
        let response = json!({"body": {"content": [{
            "date": "2024-03-01T00:00:00+03:00",
            "powerPlantName": "Santral A",
            "powerPlantId": 7,
            "hourlyGenerations": [
                {"hour": 3, "generationType": "Rüzgar", "generation": 12.5},
                {"hour": 1, "generationType": "Rüzgar", "generation": 10}
            ]
        }]}});

        let records = process_generation(&response);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].datetime, Some(at("2024-03-01 01:00")));
        assert_eq!(records[1].value, 12.5);
        assert_eq!(records[1].power_plant_id, Some(7));
    }

    #[test]
    fn test_process_kgup_flat_and_hourly() {
        let response = json!([
            {"date": "2024-03-02", "uevcbName": "U1", "uevcbId": 3, "value": 40},
            {"date": "2024-03-01", "uevcbName": "U2", "hourlyPlans": [
                {"hour": 4, "plannedGeneration": 55}
            ]}
        ]);

        let records = process_kgup(&response);
        assert_eq!(records[0].uevcb, "U2");
        assert_eq!(records[0].datetime, Some(at("2024-03-01 04:00")));
        assert_eq!(records[1].planned_generation, 40.0);
        assert_eq!(records[1].uevcb_id, Some(3));
    }

    #[test]
    fn test_bilateral_pivot_fills_gaps() {
        let buy = json!([
            {"date": "2024-03-01T00:00:00", "contractType": "EÜAŞ-GTŞ", "quantity": 100},
            {"date": "2024-03-01T01:00:00", "contractType": "Diğer", "quantity": 30}
        ]);
        let sell = json!([
            {"date": "2024-03-01T00:00:00", "contractType": "Diğer ", "value": 80},
            {"date": "not a date", "contractType": "Diğer", "value": 5}
        ]);

        let pivot = process_bilateral(&buy, &sell);

        assert_eq!(pivot.len(), 2);
        assert_eq!(pivot.columns.len(), 3);
        let t0 = at("2024-03-01 00:00");
        let t1 = at("2024-03-01 01:00");
        assert_eq!(pivot.value(t0, "buy", "EÜAŞ-GTŞ"), Some(100.0));
        assert_eq!(pivot.value(t0, "sell", "Diğer"), Some(80.0));
        assert_eq!(pivot.value(t1, "buy", "EÜAŞ-GTŞ"), Some(0.0));
    }

    #[test]
    fn test_process_dashboard_shapes() {
        let summary = process_dashboard(&json!({"body": {"summary": {"ptf": 2400, "smf": 2500}}}));
        assert_eq!(summary.len(), 2);
        assert!(summary[0].timestamp.is_some());

        let list = process_dashboard(&json!({"body": {"data": [
            {"name": "consumption", "value": 38000, "change": -1.5, "date": "2024-03-01"}
        ]}}));
        assert_eq!(list[0].metric, "consumption");
        assert_eq!(list[0].change, Some(-1.5));

        assert!(process_dashboard(&json!({"items": []})).is_empty());
    }

    #[test]
    fn test_clearing_quantity_numeric_strings() {
        let records = process_clearing_quantity(&json!({"items": [
            {"date": "2024-03-01T00:00:00+03:00", "hour": "00:00", "matchedBids": "120.5", "matchedOffers": 99}
        ]}));
        assert_eq!(records[0].matched_bids, 120.5);
        assert_eq!(records[0].matched_offers, 99.0);
    }

    #[test]
    fn test_aggregate_generation_by_type() {
        let make = |t: &str, v: f64| GenerationRecord {
            datetime: None,
            power_plant: "P".to_string(),
            power_plant_id: None,
            generation_type: t.to_string(),
            value: v,
        };
        let summary = aggregate_generation_by_type(&[
            make("Rüzgar", 10.0),
            make("Rüzgar ", 20.004),
            make("Güneş", 5.0),
            make(" Hibrit", 1.0),
        ]);

        assert_eq!(summary.len(), 3);
        assert!(summary.iter().any(|s| s.generation_type == "Hibrit"));
        let wind = summary.iter().find(|s| s.generation_type == "Rüzgar").unwrap();
        assert_eq!(wind.total, 30.0);
        assert_eq!(wind.mean, 15.0);
        assert_eq!(wind.max, 20.0);
        assert_eq!(wind.min, 10.0);
    }

    #[test]
    fn test_price_statistics() {
        assert!(price_statistics(&[]).is_none());

        let stats = price_statistics(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        assert!((stats.std - 1.2909944).abs() < 1e-6);
        assert!((stats.volatility - 51.639777).abs() < 1e-5);

        let flat = price_statistics(&[0.0, 0.0]).unwrap();
        assert_eq!(flat.volatility, 0.0);
    }

    #[test]
    fn test_resample_buckets() {
        let points = vec![
            (at("2024-03-04 01:00"), 10.0), // Monday
            (at("2024-03-06 13:00"), 20.0),
            (at("2024-03-11 00:00"), 40.0),
        ];

        let weekly = resample(&points, Period::Weekly);
        assert_eq!(weekly, vec![(at("2024-03-04 00:00"), 15.0), (at("2024-03-11 00:00"), 40.0)]);

        let monthly = resample(&points, Period::Monthly);
        assert_eq!(monthly.len(), 1);
        assert_eq!(monthly[0].0, at("2024-03-01 00:00"));

        let daily = resample(&points, Period::Daily);
        assert_eq!(daily.len(), 3);
    }
}
