use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::types::{ItemRecord, Variant, VariantMap, VariantRecord};

pub(crate) const UNKNOWN: &str = "Unknown";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to parse URL: {0}")]
    UrlParse(String),
    #[error("Failed to parse value: {0}")]
    ValueParse(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
}

static RE_ITEM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"id=(\d+)").expect("invalid regex: item id"));

static RE_RP_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*RP").expect("invalid regex: rp value"));

static RE_TITLE_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" - | from ").expect("invalid regex: title delimiter"));

static SEL_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("invalid selector: link"));

static SEL_NAME_CANDIDATES: LazyLock<[Selector; 3]> = LazyLock::new(|| {
    ["h2", "h1", "title"].map(|s| Selector::parse(s).expect("invalid selector: name"))
});

static SEL_DETAIL_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.styled-table tr").expect("invalid selector: row"));

static SEL_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("invalid selector: cell"));

static SEL_LIST_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.liclass").expect("invalid selector: list item"));

static SEL_VALUE_SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.ctr").expect("invalid selector: value span"));

static SEL_IMG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("invalid selector: img"));

static SEL_MEGA_MARKER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.bottom-right-mega").expect("invalid selector: mega marker")
});

static SEL_PET_INPUT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"input[type="hidden"][name="pets[]"]"#).expect("invalid selector: input")
});

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn item_id_from_href(href: &str) -> Option<String> {
    RE_ITEM_ID
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub(crate) fn image_url_for(base_url: &str, id: &str) -> String {
    format!("{}/images/{}.png", base_url.trim_end_matches('/'), id)
}

/// Item ids linked from a category listing page, in first-seen order.
pub fn parse_listing_ids(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();

    document
        .select(&SEL_LINK)
        .filter_map(|a| a.value().attr("href").and_then(item_id_from_href))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Parses a single item detail page. Shape mismatches fall back to defaults.
pub fn parse_item_detail(html: &str, id: &str, base_url: &str) -> ItemRecord {
    let document = Html::parse_document(html);

    let name = SEL_NAME_CANDIDATES
        .iter()
        .filter_map(|sel| document.select(sel).next())
        .map(|elem| elem_text(elem).trim().to_string())
        .find(|text| !text.is_empty())
        .map(|text| match text.split_once(" - ") {
            Some((head, _)) => head.trim_end().to_string(),
            None => text,
        })
        .unwrap_or_else(|| format!("Unknown ID {}", id));

    // Matched against the raw page, markup included.
    let value = RE_RP_VALUE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);

    let mut item_type = None;
    let mut rarity = None;
    let mut origin = None;

    for row in document.select(&SEL_DETAIL_ROW) {
        let cells: Vec<ElementRef> = row.select(&SEL_CELL).collect();
        if cells.len() != 2 {
            continue;
        }

        let key = elem_text(cells[0]).trim().to_lowercase();
        let val = elem_text(cells[1]).trim().to_string();

        match key.as_str() {
            "type" => item_type = Some(val),
            "rarity" => rarity = Some(val),
            "origin" => {
                origin = Some(val.lines().next().unwrap_or_default().trim_end().to_string())
            }
            _ => {}
        }
    }

    ItemRecord {
        name,
        item_type: item_type.unwrap_or_else(|| UNKNOWN.to_string()),
        rarity: rarity.unwrap_or_else(|| UNKNOWN.to_string()),
        origin: origin.unwrap_or_else(|| UNKNOWN.to_string()),
        value,
        image_url: image_url_for(base_url, id),
    }
}

/// Splits "Bat Dragon - Legendary from Halloween 2019" into name, rarity and origin.
pub fn split_title(title: &str) -> (String, String, String) {
    let parts: Vec<&str> = RE_TITLE_DELIMITER.split(title).collect();

    let part = |i: usize| {
        parts
            .get(i)
            .map(|p| p.trim().to_string())
            .unwrap_or_else(|| UNKNOWN.to_string())
    };

    let origin = if parts.len() > 2 {
        parts[2..].join(" ").trim().to_string()
    } else {
        UNKNOWN.to_string()
    };

    (part(0), part(1), origin)
}

/// "1,250.5 RP" → 1250.5. Blank text is 0.0.
pub fn parse_value_text(text: &str) -> Result<f64, ParseError> {
    let cleaned = text.trim().replace(" RP", "").replace(',', "");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return Ok(0.0);
    }

    cleaned
        .parse::<f64>()
        .map_err(|_| ParseError::ValueParse(text.trim().to_string()))
}

pub fn classify_variant(item: ElementRef) -> Variant {
    let mega_marked = item
        .select(&SEL_MEGA_MARKER)
        .next()
        .is_some_and(|div| elem_text(div).trim() == "M");

    if mega_marked {
        return Variant::Mega;
    }

    // Neon either way; the hidden input only confirms it.
    let neon_marked = item
        .select(&SEL_PET_INPUT)
        .any(|input| input.value().attr("value").unwrap_or("").contains('N'));
    if !neon_marked {
        log::debug!("No variant marker found, defaulting to neon");
    }

    Variant::Neon
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedVariant {
    pub variant: Variant,
    pub id: String,
    pub record: VariantRecord,
}

/// Parses one `li.liclass` element of the rendered neon/mega listing.
pub fn parse_variant_item(
    item: ElementRef,
    base_url: &Url,
) -> Result<ParsedVariant, ParseError> {
    let value = match item.select(&SEL_VALUE_SPAN).next() {
        Some(span) => parse_value_text(&elem_text(span))?,
        None => 0.0,
    };

    let (link, id) = item
        .select(&SEL_LINK)
        .find_map(|a| {
            a.value()
                .attr("href")
                .and_then(item_id_from_href)
                .map(|id| (a, id))
        })
        .ok_or_else(|| ParseError::MissingField("item link".to_string()))?;

    let img = link
        .select(&SEL_IMG)
        .next()
        .ok_or_else(|| ParseError::MissingField(format!("image for id {}", id)))?;

    let src = img
        .value()
        .attr("src")
        .ok_or_else(|| ParseError::MissingField(format!("image src for id {}", id)))?;

    let image_url = base_url
        .join(&src.replace('\\', "/"))
        .map_err(|e| ParseError::UrlParse(format!("{}: {}", src, e)))?
        .to_string();

    let title = img
        .value()
        .attr("title")
        .or_else(|| img.value().attr("alt"))
        .unwrap_or("")
        .trim();

    let (base_name, rarity, origin) = split_title(title);
    let variant = classify_variant(item);

    Ok(ParsedVariant {
        variant,
        id,
        record: VariantRecord {
            name: format!("{} {}", variant.label(), base_name),
            base_name,
            rarity,
            origin,
            value,
            image_url,
        },
    })
}

#[derive(Debug, Default)]
pub struct VariantListing {
    pub map: VariantMap,
    pub extracted: usize,
    pub skipped: usize,
}

/// Parses every list item of the rendered listing; broken items are logged and skipped.
pub fn parse_variant_listing(html: &str, base_url: &str) -> Result<VariantListing, ParseError> {
    let base = Url::parse(base_url).map_err(|e| ParseError::UrlParse(format!("{base_url}: {e}")))?;
    let document = Html::parse_document(html);
    let mut listing = VariantListing::default();

    for item in document.select(&SEL_LIST_ITEM) {
        match parse_variant_item(item, &base) {
            Ok(parsed) => {
                log::info!("Extracted: {} (ID: {})", parsed.record, parsed.id);
                listing.map.insert(parsed.variant, parsed.id, parsed.record);
                listing.extracted += 1;
            }
            Err(e) => {
                log::warn!("Error extracting item: {}", e);
                listing.skipped += 1;
            }
        }
    }

    Ok(listing)
}
