use serde::{Deserialize, Deserializer};
use std::io::Read;

use super::super::domain::{BodyType, CatalogItem, FuelType, ItemId, SubScores, Transmission};
use super::CatalogImportError;

pub(crate) fn parse_items<R: Read>(reader: R) -> Result<Vec<CatalogItem>, CatalogImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut items = Vec::new();

    for (index, record) in csv_reader.deserialize::<CatalogRow>().enumerate() {
        let row = record?;
        // Line 1 is the header.
        let line = index + 2;
        let item = row
            .into_item(line)
            .map_err(|reason| CatalogImportError::InvalidRow { line, reason })?;
        items.push(item);
    }

    Ok(items)
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(
        rename = "ID",
        alias = "Id",
        alias = "id",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    id: Option<String>,
    #[serde(rename = "Brand", alias = "brand", alias = "Make")]
    brand: String,
    #[serde(rename = "Model", alias = "model")]
    model: String,
    #[serde(rename = "Year", alias = "year", alias = "Model Year")]
    year: String,
    #[serde(
        rename = "Body Type",
        alias = "body_type",
        alias = "Body",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    body_type: Option<String>,
    #[serde(
        rename = "Transmission",
        alias = "transmission",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    transmission: Option<String>,
    #[serde(rename = "Fuel", alias = "fuel", default, deserialize_with = "empty_string_as_none")]
    fuel: Option<String>,
    #[serde(rename = "Doors", alias = "doors")]
    doors: String,
    #[serde(
        rename = "Air Conditioning",
        alias = "air_conditioning",
        alias = "A/C",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    air_conditioning: Option<String>,
    #[serde(rename = "Price", alias = "price")]
    price: String,
    #[serde(
        rename = "Mileage",
        alias = "mileage",
        alias = "Distance",
        alias = "distance_km",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    distance: Option<String>,
    #[serde(
        rename = "Comfort",
        alias = "comfort",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    comfort: Option<String>,
    #[serde(
        rename = "Economy",
        alias = "economy",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    economy: Option<String>,
    #[serde(rename = "Space", alias = "space", default, deserialize_with = "empty_string_as_none")]
    space: Option<String>,
    #[serde(
        rename = "Safety",
        alias = "safety",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    safety: Option<String>,
    #[serde(rename = "Value", alias = "value", default, deserialize_with = "empty_string_as_none")]
    value: Option<String>,
    #[serde(
        rename = "Description",
        alias = "description",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    description: Option<String>,
}

impl CatalogRow {
    fn into_item(self, line: usize) -> Result<CatalogItem, String> {
        let model_year: i32 = parse_number("year", &self.year)?;
        let doors: u8 = parse_number("doors", &self.doors)?;
        let price = parse_amount(&self.price)?;
        let distance_km = match self.distance.as_deref() {
            Some(raw) => parse_amount(raw)?,
            None => 0,
        };
        let air_conditioning = match self.air_conditioning.as_deref() {
            Some(raw) => parse_flag(raw)
                .ok_or_else(|| format!("unrecognised air conditioning flag {raw:?}"))?,
            None => false,
        };

        let scores = SubScores {
            comfort: parse_score("comfort", self.comfort.as_deref())?,
            economy: parse_score("economy", self.economy.as_deref())?,
            space: parse_score("space", self.space.as_deref())?,
            safety: parse_score("safety", self.safety.as_deref())?,
            value: parse_score("value", self.value.as_deref())?,
        };

        let id = self.id.unwrap_or_else(|| {
            format!(
                "{}-{}-{}-{}",
                slug(&self.brand),
                slug(&self.model),
                model_year,
                line
            )
        });

        Ok(CatalogItem {
            id: ItemId(id),
            brand: self.brand,
            model: self.model,
            model_year,
            body_type: self
                .body_type
                .as_deref()
                .map(BodyType::parse)
                .unwrap_or(BodyType::Other),
            transmission: self
                .transmission
                .as_deref()
                .map(Transmission::parse)
                .unwrap_or(Transmission::Other),
            fuel: self
                .fuel
                .as_deref()
                .map(FuelType::parse)
                .unwrap_or(FuelType::Other),
            doors,
            air_conditioning,
            price,
            distance_km,
            scores,
            description: self.description,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("invalid {field} {raw:?}"))
}

/// Whole-unit amounts; thousands separators and currency or unit noise are dropped.
fn parse_amount(raw: &str) -> Result<u32, String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits
        .parse()
        .map_err(|_| format!("invalid amount {raw:?}"))
}

/// Missing scores default to the scale minimum.
fn parse_score(field: &str, raw: Option<&str>) -> Result<u8, String> {
    match raw {
        None => Ok(1),
        Some(raw) => {
            let value: f32 = parse_number(field, raw)?;
            Ok(value.round().clamp(1.0, 10.0) as u8)
        }
    }
}

pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "1" | "sim" | "s" => Some(true),
        "no" | "n" | "false" | "0" | "não" | "nao" => Some(false),
        _ => None,
    }
}

fn slug(value: &str) -> String {
    value
        .split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
