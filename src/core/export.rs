use crate::domain::table::Table;
use crate::utils::error::{EpiasError, Result};
use serde_json::Value;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn delimited(table: &Table, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(cell_text))?;
    }

    writer.into_inner().map_err(|e| EpiasError::ProcessingError {
        message: format!("could not flush {} export: {}", table.name, e),
    })
}

/// Render one table in `format` (`csv`, `tsv` or `json`).
pub fn render_table(table: &Table, format: &str) -> Result<Vec<u8>> {
    match format {
        "csv" => delimited(table, b','),
        "tsv" => delimited(table, b'\t'),
        "json" => Ok(serde_json::to_vec_pretty(&table.to_records())?),
        other => Err(EpiasError::ValidationError {
            message: format!("unsupported export format '{}'", other),
        }),
    }
}

/// Zip archive holding `<table>.<format>` for every table and format.
pub fn export_bundle(tables: &[Table], formats: &[String]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for table in tables {
        for format in formats {
            let data = render_table(table, format)?;
            zip.start_file(format!("{}.{}", table.name, format), options)?;
            zip.write_all(&data)?;
        }
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Read;

    fn sample() -> Table {
        let mut table = Table::new(
            "ptf",
            vec!["datetime".to_string(), "price".to_string(), "note".to_string()],
        );
        table.rows.push(vec![json!("2024-03-01 00:00:00"), json!(2450.5), Value::Null]);
        table.rows.push(vec![json!("2024-03-01 01:00:00"), json!(2300), json!("a,b")]);
        table
    }

    #[test]
    fn test_csv_quotes_and_blanks() {
        let csv = String::from_utf8(render_table(&sample(), "csv").unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "datetime,price,note");
        assert_eq!(lines[1], "2024-03-01 00:00:00,2450.5,");
        assert_eq!(lines[2], "2024-03-01 01:00:00,2300,\"a,b\"");
    }

    #[test]
    fn test_tsv_and_json() {
        let tsv = String::from_utf8(render_table(&sample(), "tsv").unwrap()).unwrap();
        assert!(tsv.starts_with("datetime\tprice\tnote\n"));

        let json: Value = serde_json::from_slice(&render_table(&sample(), "json").unwrap()).unwrap();
        assert_eq!(json[0]["price"], 2450.5);
        assert!(render_table(&sample(), "xlsx").is_err());
    }

    #[test]
    fn test_bundle_contains_every_format() {
        let bytes = export_bundle(&[sample()], &["csv".to_string(), "json".to_string()]).unwrap();

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut content = String::new();
        archive
            .by_name("ptf.csv")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert!(content.contains("2450.5"));
        assert!(archive.by_name("ptf.json").is_ok());
    }
}
