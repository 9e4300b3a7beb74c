use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::store::{StoreError, read_document};
use crate::types::VariantMap;

pub const ITEM_COLUMNS: [&str; 8] = [
    "id", "name", "category", "type", "rarity", "origin", "value", "image_url",
];

pub const VARIANT_COLUMNS: [&str; 8] = [
    "id", "name", "base_name", "variant", "rarity", "origin", "value", "image_url",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    Written(usize),
    /// Nothing to export; no file was written.
    Empty,
    /// The JSON document to export from does not exist.
    MissingSource,
}

impl Display for ExportOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportOutcome::Written(rows) => write!(f, "{} row(s) written", rows),
            ExportOutcome::Empty => write!(f, "skipped, no data"),
            ExportOutcome::MissingSource => write!(f, "skipped, no JSON document"),
        }
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write, S: AsRef<str>>(w: &mut W, row: &[S]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\n")
}

/// `{:?}` keeps the trailing `.0` on whole numbers.
fn format_value(value: f64) -> String {
    format!("{:?}", value)
}

fn text_field(rec: &Map<String, Value>, key: &str) -> String {
    match rec.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Flattens the item document. Fields a record lacks come out empty, and
/// categories or records that are not objects are left out.
pub fn item_rows(doc: &Map<String, Value>) -> Vec<[String; 8]> {
    doc.iter()
        .filter_map(|(category, items)| Some((category, items.as_object()?)))
        .flat_map(|(category, items)| {
            items
                .iter()
                .filter_map(|(id, rec)| Some((id, rec.as_object()?)))
                .map(move |(id, rec)| {
                    [
                        id.clone(),
                        text_field(rec, "name"),
                        category.clone(),
                        text_field(rec, "type"),
                        text_field(rec, "rarity"),
                        text_field(rec, "origin"),
                        rec.get("value")
                            .and_then(Value::as_f64)
                            .map(format_value)
                            .unwrap_or_default(),
                        text_field(rec, "image_url"),
                    ]
                })
        })
        .collect()
}

pub fn variant_rows(map: &VariantMap) -> Vec<[String; 8]> {
    map.iter()
        .map(|(variant, id, rec)| {
            [
                id.clone(),
                rec.name.clone(),
                rec.base_name.clone(),
                variant.key().to_string(),
                rec.rarity.clone(),
                rec.origin.clone(),
                format_value(rec.value),
                rec.image_url.clone(),
            ]
        })
        .collect()
}

fn write_csv(path: &Path, header: &[&str], rows: &[[String; 8]]) -> Result<ExportOutcome, ExportError> {
    if rows.is_empty() {
        return Ok(ExportOutcome::Empty);
    }

    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut w = BufWriter::new(file);
    write_row(&mut w, header).map_err(io_err)?;
    for row in rows {
        write_row(&mut w, row).map_err(io_err)?;
    }
    w.flush().map_err(io_err)?;

    Ok(ExportOutcome::Written(rows.len()))
}

/// Flattens the item document at `json_path` into `csv_path`.
pub fn export_items_csv(json_path: &Path, csv_path: &Path) -> Result<ExportOutcome, ExportError> {
    let Some(doc) = read_document(json_path)? else {
        log::warn!(
            "Cannot create CSV because the JSON file ('{}') was not found",
            json_path.display()
        );
        return Ok(ExportOutcome::MissingSource);
    };

    let outcome = write_csv(csv_path, &ITEM_COLUMNS, &item_rows(&doc))?;
    match outcome {
        ExportOutcome::Written(rows) => {
            log::info!("CSV saved to '{}' ({} rows)", csv_path.display(), rows)
        }
        _ => log::info!("No data available to create a CSV file"),
    }
    Ok(outcome)
}

pub fn export_variants_csv(csv_path: &Path, map: &VariantMap) -> Result<ExportOutcome, ExportError> {
    let outcome = write_csv(csv_path, &VARIANT_COLUMNS, &variant_rows(map))?;
    match outcome {
        ExportOutcome::Written(rows) => {
            log::info!("CSV saved to '{}' ({} rows)", csv_path.display(), rows)
        }
        _ => log::info!("No data to save"),
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoryMap, ItemRecord, Variant, VariantRecord};
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;

    fn record(name: &str, value: f64) -> ItemRecord {
        ItemRecord {
            name: name.to_string(),
            item_type: "Pet".to_string(),
            rarity: "Legendary".to_string(),
            origin: "Halloween 2019 (Candy)".to_string(),
            value,
            image_url: "https://adoptmetradingvalues.com/images/205.png".to_string(),
        }
    }

    #[test]
    fn test_write_row_quotes_when_needed() {
        let mut buf = Vec::new();
        write_row(&mut buf, &["plain", "a,b", "say \"hi\"", "two\nlines"]).unwrap();

        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "plain,\"a,b\",\"say \"\"hi\"\"\",\"two\nlines\"\n"
        );
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(0.0), "0.0");
        assert_eq!(format_value(150.0), "150.0");
        assert_eq!(format_value(152.5), "152.5");
    }

    #[test]
    fn test_export_items_csv_column_order() {
        let temp = tempdir().unwrap();
        let json = temp.path().join("values.json");
        let csv = temp.path().join("values.csv");

        let mut map = CategoryMap::new();
        map.insert(
            "pets".to_string(),
            BTreeMap::from([("205".to_string(), record("Bat Dragon", 152.5))]),
        );
        map.insert("toys".to_string(), BTreeMap::new());
        crate::store::write_json_pretty(&json, &map).unwrap();

        let outcome = export_items_csv(&json, &csv).unwrap();

        assert_eq!(outcome, ExportOutcome::Written(1));
        let text = fs::read_to_string(&csv).unwrap();
        assert_eq!(
            text,
            "id,name,category,type,rarity,origin,value,image_url\n\
             205,Bat Dragon,pets,Pet,Legendary,Halloween 2019 (Candy),152.5,https://adoptmetradingvalues.com/images/205.png\n"
        );
    }

    #[test]
    fn test_export_items_csv_empty_document_writes_nothing() {
        let temp = tempdir().unwrap();
        let json = temp.path().join("values.json");
        let csv = temp.path().join("values.csv");
        fs::write(&json, r#"{"pets": {}}"#).unwrap();

        let outcome = export_items_csv(&json, &csv).unwrap();

        assert_eq!(outcome, ExportOutcome::Empty);
        assert!(!csv.exists());
    }

    #[test]
    fn test_export_items_csv_missing_json() {
        let temp = tempdir().unwrap();

        let outcome = export_items_csv(&temp.path().join("nope.json"), &temp.path().join("out.csv"))
            .unwrap();

        assert_eq!(outcome, ExportOutcome::MissingSource);
    }

    #[test]
    fn test_export_items_csv_corrupted_json_is_error() {
        let temp = tempdir().unwrap();
        let json = temp.path().join("values.json");
        fs::write(&json, "[1, 2").unwrap();

        let result = export_items_csv(&json, &temp.path().join("out.csv"));

        assert!(matches!(result, Err(ExportError::Store(StoreError::Json { .. }))));
    }

    #[test]
    fn test_export_items_csv_records_with_fewer_fields() {
        let temp = tempdir().unwrap();
        let json = temp.path().join("values.json");
        let csv = temp.path().join("values.csv");
        fs::write(
            &json,
            r#"{"pets": {"1": {"name": "Dog", "value": 2, "image_url": "x"}}, "notes": "keep"}"#,
        )
        .unwrap();

        let outcome = export_items_csv(&json, &csv).unwrap();

        assert_eq!(outcome, ExportOutcome::Written(1));
        let text = fs::read_to_string(&csv).unwrap();
        assert_eq!(text.lines().nth(1), Some("1,Dog,pets,,,,2.0,x"));
    }

    #[test]
    fn test_export_variants_csv() {
        let temp = tempdir().unwrap();
        let csv = temp.path().join("variants.csv");

        let mut map = VariantMap::new();
        map.insert(
            Variant::Mega,
            "205".to_string(),
            VariantRecord {
                name: "Mega Bat Dragon".to_string(),
                base_name: "Bat Dragon".to_string(),
                rarity: "Legendary".to_string(),
                origin: "Halloween 2019 (Candy)".to_string(),
                value: 1250.0,
                image_url: "https://adoptmetradingvalues.com/images/pets/bat_dragon.png".to_string(),
            },
        );

        let outcome = export_variants_csv(&csv, &map).unwrap();

        assert_eq!(outcome, ExportOutcome::Written(1));
        let text = fs::read_to_string(&csv).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,name,base_name,variant,rarity,origin,value,image_url")
        );
        assert_eq!(
            lines.next(),
            Some("205,Mega Bat Dragon,Bat Dragon,megas,Legendary,Halloween 2019 (Candy),1250.0,https://adoptmetradingvalues.com/images/pets/bat_dragon.png")
        );
    }

    #[test]
    fn test_export_variants_csv_empty() {
        let temp = tempdir().unwrap();
        let csv = temp.path().join("variants.csv");

        assert_eq!(
            export_variants_csv(&csv, &VariantMap::new()).unwrap(),
            ExportOutcome::Empty
        );
        assert!(!csv.exists());
    }
}
