use std::collections::BTreeSet;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::types::{CategoryMap, ScrapedItem, VariantMap};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("JSON document {path} is corrupted or has an old format: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("JSON document {path} is not a category map: {reason}")]
    Shape { path: PathBuf, reason: String },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        StoreError::Json {
            path: path.to_path_buf(),
            source,
        }
    }

    fn shape(path: &Path, reason: impl Into<String>) -> Self {
        StoreError::Shape {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Serializes with four-space indentation and overwrites `path`.
pub(crate) fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut ser)
        .map_err(|e| StoreError::json(path, e))?;
    fs::write(path, buf).map_err(|e| StoreError::io(path, e))
}

fn read_text(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Reads and decodes a [`CategoryMap`]; `Ok(None)` when the file does not exist.
pub(crate) fn read_category_map(path: &Path) -> Result<Option<CategoryMap>, StoreError> {
    let Some(text) = read_text(path)? else {
        return Ok(None);
    };

    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| StoreError::json(path, e))
}

/// Reads the document as a top-level JSON object without checking record fields,
/// so entries written with fewer fields than [`ItemRecord`](crate::types::ItemRecord)
/// still count.
pub(crate) fn read_document(path: &Path) -> Result<Option<Map<String, Value>>, StoreError> {
    let Some(text) = read_text(path)? else {
        return Ok(None);
    };

    match serde_json::from_str(&text).map_err(|e| StoreError::json(path, e))? {
        Value::Object(doc) => Ok(Some(doc)),
        other => Err(StoreError::shape(
            path,
            format!("top level is {}", json_kind(&other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The on-disk item document, rewritten in full on every upsert.
#[derive(Debug, Clone)]
pub struct ItemStore {
    path: PathBuf,
    categories: Vec<String>,
}

impl ItemStore {
    /// `categories` seed a fresh document when none can be read.
    pub fn new(path: impl Into<PathBuf>, categories: &[String]) -> Self {
        Self {
            path: path.into(),
            categories: categories.to_vec(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strictly typed view of the document.
    pub fn load(&self) -> Result<Option<CategoryMap>, StoreError> {
        read_category_map(&self.path)
    }

    /// Every id stored under any object-valued category, whatever its record looks like.
    pub fn load_ids(&self) -> Result<Option<BTreeSet<String>>, StoreError> {
        let Some(doc) = read_document(&self.path)? else {
            return Ok(None);
        };

        Ok(Some(
            doc.values()
                .filter_map(Value::as_object)
                .flat_map(|items| items.keys().cloned())
                .collect(),
        ))
    }

    fn fresh(&self) -> Map<String, Value> {
        self.categories
            .iter()
            .map(|c| (c.clone(), Value::Object(Map::new())))
            .collect()
    }

    /// Re-reads the document, inserts or overwrites one record and writes it back.
    /// Other categories and records are kept as they are on disk.
    pub fn upsert(&self, item: &ScrapedItem) -> Result<(), StoreError> {
        let mut all_values = match read_document(&self.path) {
            Ok(Some(doc)) => doc,
            Ok(None) => self.fresh(),
            Err(e @ (StoreError::Json { .. } | StoreError::Shape { .. })) => {
                log::warn!("Discarding unreadable document: {}", e);
                self.fresh()
            }
            Err(e) => return Err(e),
        };

        let record = serde_json::to_value(&item.record).map_err(|e| StoreError::json(&self.path, e))?;

        let items = all_values
            .entry(item.category.clone())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| {
                StoreError::shape(
                    &self.path,
                    format!("category '{}' is not an object", item.category),
                )
            })?;
        items.insert(item.id.clone(), record);

        write_json_pretty(&self.path, &all_values)
    }
}

/// Overwrites the variant document with `map`.
pub fn save_variants(path: &Path, map: &VariantMap) -> Result<(), StoreError> {
    write_json_pretty(path, map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemRecord;
    use tempfile::tempdir;

    fn item(id: &str, category: &str, name: &str) -> ScrapedItem {
        ScrapedItem {
            id: id.to_string(),
            category: category.to_string(),
            record: ItemRecord {
                name: name.to_string(),
                item_type: "Pet".to_string(),
                rarity: "Common".to_string(),
                origin: "Cracked Egg".to_string(),
                value: 1.5,
                image_url: format!("https://adoptmetradingvalues.com/images/{id}.png"),
            },
        }
    }

    #[test]
    fn test_load_missing_is_none() {
        let temp = tempdir().unwrap();
        let store = ItemStore::new(temp.path().join("values.json"), &["pets".to_string()]);

        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_upsert_creates_seeded_document() {
        let temp = tempdir().unwrap();
        let categories = vec!["pets".to_string(), "toys".to_string()];
        let store = ItemStore::new(temp.path().join("values.json"), &categories);

        store.upsert(&item("1", "pets", "Dog")).unwrap();

        let map = store.load().unwrap().unwrap();
        assert_eq!(map["pets"]["1"].name, "Dog");
        assert!(map["toys"].is_empty());
    }

    #[test]
    fn test_upsert_overwrites_and_adds_missing_category() {
        let temp = tempdir().unwrap();
        let store = ItemStore::new(temp.path().join("values.json"), &["pets".to_string()]);

        store.upsert(&item("1", "pets", "Dog")).unwrap();
        store.upsert(&item("1", "pets", "Doggo")).unwrap();
        store.upsert(&item("2", "unknown", "Mystery")).unwrap();

        let map = store.load().unwrap().unwrap();
        assert_eq!(map["pets"].len(), 1);
        assert_eq!(map["pets"]["1"].name, "Doggo");
        assert_eq!(map["unknown"]["2"].name, "Mystery");
        assert_eq!(
            store.load_ids().unwrap().unwrap(),
            BTreeSet::from(["1".to_string(), "2".to_string()])
        );
    }

    #[test]
    fn test_corrupted_document_reported_then_replaced() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("values.json");
        fs::write(&path, "{ not json").unwrap();
        let store = ItemStore::new(&path, &["pets".to_string()]);

        assert!(matches!(store.load(), Err(StoreError::Json { .. })));

        store.upsert(&item("5", "pets", "Cat")).unwrap();
        let map = store.load().unwrap().unwrap();
        assert_eq!(map["pets"]["5"].name, "Cat");
    }

    #[test]
    fn test_old_format_is_reported() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("values.json");
        fs::write(&path, r#"{"Dog": 1.5, "Cat": 2.0}"#).unwrap();

        let store = ItemStore::new(&path, &["pets".to_string()]);

        assert!(matches!(store.load(), Err(StoreError::Json { .. })));
    }

    #[test]
    fn test_load_ids_accepts_records_with_fewer_fields() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("values.json");
        fs::write(
            &path,
            r#"{"pets": {"1": {"name": "Dog", "value": 1.5}}, "toys": {"77": {}}, "notes": "x"}"#,
        )
        .unwrap();
        let store = ItemStore::new(&path, &["pets".to_string()]);

        assert!(matches!(store.load(), Err(StoreError::Json { .. })));
        assert_eq!(
            store.load_ids().unwrap().unwrap(),
            BTreeSet::from(["1".to_string(), "77".to_string()])
        );
    }

    #[test]
    fn test_load_ids_rejects_non_object_document() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("values.json");
        fs::write(&path, "[1, 2]").unwrap();
        let store = ItemStore::new(&path, &["pets".to_string()]);

        assert!(matches!(store.load_ids(), Err(StoreError::Shape { .. })));
    }

    #[test]
    fn test_upsert_keeps_existing_records_and_categories() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("values.json");
        fs::write(
            &path,
            r#"{"pets": {"1": {"name": "Dog", "value": 1.5}}, "toys": {"77": {"name": "Ball"}}}"#,
        )
        .unwrap();
        let store = ItemStore::new(&path, &["pets".to_string()]);

        store.upsert(&item("2", "pets", "Cat")).unwrap();

        let doc: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["pets"]["1"], serde_json::json!({"name": "Dog", "value": 1.5}));
        assert_eq!(doc["pets"]["2"]["name"], "Cat");
        assert_eq!(doc["toys"]["77"]["name"], "Ball");
    }

    #[test]
    fn test_upsert_into_non_object_category_fails() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("values.json");
        fs::write(&path, r#"{"pets": ["1"]}"#).unwrap();
        let store = ItemStore::new(&path, &["pets".to_string()]);

        let result = store.upsert(&item("2", "pets", "Cat"));

        assert!(matches!(result, Err(StoreError::Shape { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"pets": ["1"]}"#);
    }

    #[test]
    fn test_documents_use_four_space_indent() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("variants.json");

        save_variants(&path, &VariantMap::new()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n    \"neons\": {},\n    \"megas\": {}\n}");
    }
}
