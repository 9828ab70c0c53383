//! Column-ordered tables, the common shape every dataset is exported in.

use super::model::{
    BilateralPivot, ClearingQuantityRecord, ConsumptionRecord, DashboardMetric,
    GenerationRecord, GenerationSummary, KgupRecord, Organization, PowerPlant, PtfRecord,
    SmfRecord, Uevcb,
};
use chrono::NaiveDateTime;
use serde_json::{json, Map, Value};

pub trait TableRow {
    fn columns() -> &'static [&'static str];
    fn cells(&self) -> Vec<Value>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows<R: TableRow>(name: impl Into<String>, rows: &[R]) -> Self {
        Self {
            name: name.into(),
            columns: R::columns().iter().map(|c| c.to_string()).collect(),
            rows: rows.iter().map(TableRow::cells).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                Value::Object(object)
            })
            .collect()
    }
}

fn datetime_cell(dt: &Option<NaiveDateTime>) -> Value {
    match dt {
        Some(dt) => Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        None => Value::Null,
    }
}

impl TableRow for PtfRecord {
    fn columns() -> &'static [&'static str] {
        &["datetime", "price", "hour"]
    }

    fn cells(&self) -> Vec<Value> {
        vec![datetime_cell(&self.datetime), json!(self.price), json!(self.hour)]
    }
}

impl TableRow for SmfRecord {
    fn columns() -> &'static [&'static str] {
        &["datetime", "up_price", "down_price", "direction"]
    }

    fn cells(&self) -> Vec<Value> {
        vec![
            datetime_cell(&self.datetime),
            json!(self.up_price),
            json!(self.down_price),
            json!(self.direction.map(|d| d.label())),
        ]
    }
}

impl TableRow for GenerationRecord {
    fn columns() -> &'static [&'static str] {
        &["datetime", "power_plant", "power_plant_id", "type", "value"]
    }

    fn cells(&self) -> Vec<Value> {
        vec![
            datetime_cell(&self.datetime),
            json!(self.power_plant),
            json!(self.power_plant_id),
            json!(self.generation_type),
            json!(self.value),
        ]
    }
}

impl TableRow for KgupRecord {
    fn columns() -> &'static [&'static str] {
        &["datetime", "uevcb", "uevcb_id", "planned_generation"]
    }

    fn cells(&self) -> Vec<Value> {
        vec![
            datetime_cell(&self.datetime),
            json!(self.uevcb),
            json!(self.uevcb_id),
            json!(self.planned_generation),
        ]
    }
}

impl TableRow for ConsumptionRecord {
    fn columns() -> &'static [&'static str] {
        &[
            "datetime",
            "province",
            "district",
            "profile_group",
            "subscriber_type",
            "value",
        ]
    }

    fn cells(&self) -> Vec<Value> {
        vec![
            datetime_cell(&self.datetime),
            json!(self.province),
            json!(self.district),
            json!(self.profile_group),
            json!(self.subscriber_type),
            json!(self.value),
        ]
    }
}

impl TableRow for ClearingQuantityRecord {
    fn columns() -> &'static [&'static str] {
        &["datetime", "matched_bids", "matched_offers"]
    }

    fn cells(&self) -> Vec<Value> {
        vec![
            datetime_cell(&self.datetime),
            json!(self.matched_bids),
            json!(self.matched_offers),
        ]
    }
}

impl TableRow for DashboardMetric {
    fn columns() -> &'static [&'static str] {
        &["metric", "value", "change", "timestamp"]
    }

    fn cells(&self) -> Vec<Value> {
        vec![
            json!(self.metric),
            self.value.clone(),
            json!(self.change),
            datetime_cell(&self.timestamp),
        ]
    }
}

impl TableRow for GenerationSummary {
    fn columns() -> &'static [&'static str] {
        &["type", "total", "mean", "max", "min"]
    }

    fn cells(&self) -> Vec<Value> {
        vec![
            json!(self.generation_type),
            json!(self.total),
            json!(self.mean),
            json!(self.max),
            json!(self.min),
        ]
    }
}

impl TableRow for Organization {
    fn columns() -> &'static [&'static str] {
        &["id", "name", "eic", "status"]
    }

    fn cells(&self) -> Vec<Value> {
        vec![json!(self.id), json!(self.name), json!(self.eic), json!(self.status)]
    }
}

impl TableRow for PowerPlant {
    fn columns() -> &'static [&'static str] {
        &["id", "name", "short_name", "eic", "status"]
    }

    fn cells(&self) -> Vec<Value> {
        vec![
            json!(self.id),
            json!(self.name),
            json!(self.short_name),
            json!(self.eic),
            json!(self.status),
        ]
    }
}

impl TableRow for Uevcb {
    fn columns() -> &'static [&'static str] {
        &["id", "name", "eic", "organization_id", "organization_name"]
    }

    fn cells(&self) -> Vec<Value> {
        vec![
            json!(self.id),
            json!(self.name),
            json!(self.eic),
            json!(self.organization_id),
            json!(self.organization_name),
        ]
    }
}

impl BilateralPivot {
    /// Flatten the `(side, contract type)` header into `side:contract_type` columns.
    pub fn to_table(&self, name: impl Into<String>) -> Table {
        let mut columns = vec!["datetime".to_string()];
        columns.extend(
            self.columns
                .iter()
                .map(|(side, contract)| format!("{}:{}", side, contract)),
        );

        let mut table = Table::new(name, columns);
        for (at, values) in &self.rows {
            let mut row = vec![datetime_cell(&Some(*at))];
            row.extend(values.iter().map(|v| json!(v)));
            table.rows.push(row);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_table_from_typed_rows() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(5, 0, 0);
        let rows = vec![PtfRecord {
            datetime: at,
            price: 2450.5,
            hour: 5,
        }];

        let table = Table::from_rows("ptf", &rows);

        assert_eq!(table.columns, vec!["datetime", "price", "hour"]);
        assert_eq!(table.rows[0][0], "2024-01-01 05:00:00");
        assert_eq!(table.to_records()[0]["price"], 2450.5);
        assert_eq!(table.column_index("hour"), Some(2));
    }
}
