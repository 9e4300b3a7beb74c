use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Category name → item id → record, as persisted in the item store.
pub type CategoryMap = BTreeMap<String, BTreeMap<String, ItemRecord>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub rarity: String,
    pub origin: String,
    pub value: f64,
    pub image_url: String,
}

impl Display for ItemRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] = {} RP ({}) from {}",
            self.name, self.item_type, self.value, self.rarity, self.origin
        )
    }
}

/// An item fetched from a detail page, before it lands in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedItem {
    pub id: String,
    pub category: String,
    pub record: ItemRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Variant {
    #[serde(rename = "neons")]
    Neon,
    #[serde(rename = "megas")]
    Mega,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Neon, Variant::Mega];

    /// Key used in the persisted JSON document and the CSV `variant` column.
    pub fn key(&self) -> &'static str {
        match self {
            Variant::Neon => "neons",
            Variant::Mega => "megas",
        }
    }

    /// Prefix for display names, e.g. "Mega Bat Dragon".
    pub fn label(&self) -> &'static str {
        match self {
            Variant::Neon => "Neon",
            Variant::Mega => "Mega",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub name: String,
    pub base_name: String,
    pub rarity: String,
    pub origin: String,
    pub value: f64,
    pub image_url: String,
}

impl Display for VariantRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} = {} RP ({}) from {}",
            self.name, self.value, self.rarity, self.origin
        )
    }
}

/// Both variant buckets; each is always present in the serialized document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantMap {
    pub neons: BTreeMap<String, VariantRecord>,
    pub megas: BTreeMap<String, VariantRecord>,
}

impl VariantMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, variant: Variant) -> &BTreeMap<String, VariantRecord> {
        match variant {
            Variant::Neon => &self.neons,
            Variant::Mega => &self.megas,
        }
    }

    /// Inserts or overwrites; returns the previous record for that id, if any.
    pub fn insert(
        &mut self,
        variant: Variant,
        id: String,
        record: VariantRecord,
    ) -> Option<VariantRecord> {
        let bucket = match variant {
            Variant::Neon => &mut self.neons,
            Variant::Mega => &mut self.megas,
        };
        bucket.insert(id, record)
    }

    pub fn len(&self) -> usize {
        self.neons.len() + self.megas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates `(variant, id, record)` in variant order, then id order.
    pub fn iter(&self) -> impl Iterator<Item = (Variant, &String, &VariantRecord)> {
        Variant::ALL
            .into_iter()
            .flat_map(move |v| self.get(v).iter().map(move |(id, rec)| (v, id, rec)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> VariantRecord {
        VariantRecord {
            name: format!("Neon {name}"),
            base_name: name.to_string(),
            rarity: "Legendary".to_string(),
            origin: "Unknown".to_string(),
            value: 12.5,
            image_url: "https://adoptmetradingvalues.com/images/1.png".to_string(),
        }
    }

    #[test]
    fn test_item_record_display() {
        let record = ItemRecord {
            name: "Bat Dragon".to_string(),
            item_type: "Pet".to_string(),
            rarity: "Legendary".to_string(),
            origin: "Halloween 2019 (Candy)".to_string(),
            value: 152.5,
            image_url: String::new(),
        };

        assert_eq!(
            record.to_string(),
            "Bat Dragon [Pet] = 152.5 RP (Legendary) from Halloween 2019 (Candy)"
        );
    }

    #[test]
    fn test_empty_variant_map_keeps_both_keys() {
        let json = serde_json::to_value(VariantMap::new()).unwrap();
        assert!(json["neons"].as_object().unwrap().is_empty());
        assert!(json["megas"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_variant_map_iter_order() {
        let mut map = VariantMap::new();
        map.insert(Variant::Mega, "2".into(), record("Owl"));
        map.insert(Variant::Neon, "9".into(), record("Frost Dragon"));
        map.insert(Variant::Neon, "10".into(), record("Shadow Dragon"));

        let order: Vec<(Variant, &str)> = map.iter().map(|(v, id, _)| (v, id.as_str())).collect();
        assert_eq!(
            order,
            vec![
                (Variant::Neon, "10"),
                (Variant::Neon, "9"),
                (Variant::Mega, "2"),
            ]
        );
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_item_record_type_field_name() {
        let rec = ItemRecord {
            name: "Bat Dragon".into(),
            item_type: "Pet".into(),
            rarity: "Legendary".into(),
            origin: "Halloween 2019".into(),
            value: 150.0,
            image_url: "https://adoptmetradingvalues.com/images/42.png".into(),
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["type"], "Pet");
        assert!(json.get("item_type").is_none());
    }
}
