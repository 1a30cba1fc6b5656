use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for catalog items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyType {
    Hatchback,
    Sedan,
    Suv,
    Pickup,
    Minivan,
    Wagon,
    Coupe,
    Van,
    Other,
}

impl BodyType {
    pub const fn label(self) -> &'static str {
        match self {
            BodyType::Hatchback => "hatchback",
            BodyType::Sedan => "sedan",
            BodyType::Suv => "suv",
            BodyType::Pickup => "pickup",
            BodyType::Minivan => "minivan",
            BodyType::Wagon => "wagon",
            BodyType::Coupe => "coupe",
            BodyType::Van => "van",
            BodyType::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hatch" | "hatchback" => Self::Hatchback,
            "sedan" | "saloon" => Self::Sedan,
            "suv" | "crossover" => Self::Suv,
            "pickup" | "picape" | "truck" => Self::Pickup,
            "minivan" | "mpv" => Self::Minivan,
            "wagon" | "estate" | "perua" => Self::Wagon,
            "coupe" | "cupe" => Self::Coupe,
            "van" | "furgao" => Self::Van,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transmission {
    Manual,
    Automatic,
    Cvt,
    AutomatedManual,
    Other,
}

impl Transmission {
    pub const fn label(self) -> &'static str {
        match self {
            Transmission::Manual => "manual",
            Transmission::Automatic => "automatic",
            Transmission::Cvt => "cvt",
            Transmission::AutomatedManual => "automated manual",
            Transmission::Other => "other",
        }
    }

    /// Automatic and CVT gearboxes earn the comfort transmission bonus.
    pub const fn is_automatic(self) -> bool {
        matches!(self, Transmission::Automatic | Transmission::Cvt)
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "manual" | "mecanico" | "mecânico" => Self::Manual,
            "automatic" | "auto" | "automatico" | "automático" => Self::Automatic,
            "cvt" => Self::Cvt,
            "automated manual" | "automated" | "automatizado" => Self::AutomatedManual,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Gasoline,
    Ethanol,
    Flex,
    Diesel,
    Hybrid,
    Electric,
    Other,
}

impl FuelType {
    pub const fn label(self) -> &'static str {
        match self {
            FuelType::Gasoline => "gasoline",
            FuelType::Ethanol => "ethanol",
            FuelType::Flex => "flex",
            FuelType::Diesel => "diesel",
            FuelType::Hybrid => "hybrid",
            FuelType::Electric => "electric",
            FuelType::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gasoline" | "petrol" | "gasolina" => Self::Gasoline,
            "ethanol" | "etanol" | "alcool" | "álcool" => Self::Ethanol,
            "flex" => Self::Flex,
            "diesel" => Self::Diesel,
            "hybrid" | "hibrido" | "híbrido" => Self::Hybrid,
            "electric" | "ev" | "eletrico" | "elétrico" => Self::Electric,
            _ => Self::Other,
        }
    }
}

/// The five aptitude dimensions every catalog item is scored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreDimension {
    Comfort,
    Economy,
    Space,
    Safety,
    Value,
}

impl ScoreDimension {
    pub const ALL: [ScoreDimension; 5] = [
        ScoreDimension::Comfort,
        ScoreDimension::Economy,
        ScoreDimension::Space,
        ScoreDimension::Safety,
        ScoreDimension::Value,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ScoreDimension::Comfort => "comfort",
            ScoreDimension::Economy => "economy",
            ScoreDimension::Space => "space",
            ScoreDimension::Safety => "safety",
            ScoreDimension::Value => "value",
        }
    }
}

/// Precomputed 1–10 aptitude scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubScores {
    pub comfort: u8,
    pub economy: u8,
    pub space: u8,
    pub safety: u8,
    pub value: u8,
}

impl SubScores {
    pub const fn get(&self, dimension: ScoreDimension) -> u8 {
        match dimension {
            ScoreDimension::Comfort => self.comfort,
            ScoreDimension::Economy => self.economy,
            ScoreDimension::Space => self.space,
            ScoreDimension::Safety => self.safety,
            ScoreDimension::Value => self.value,
        }
    }
}

/// Read-only catalog snapshot of a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub brand: String,
    pub model: String,
    pub model_year: i32,
    pub body_type: BodyType,
    pub transmission: Transmission,
    pub fuel: FuelType,
    pub doors: u8,
    pub air_conditioning: bool,
    pub price: u32,
    pub distance_km: u32,
    pub scores: SubScores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CatalogItem {
    /// Text fed to the embedding provider. Changing it invalidates the cached vector.
    pub fn source_text(&self) -> String {
        let mut text = format!(
            "{} {} {} {} {} transmission {} fuel {} doors{}",
            self.brand,
            self.model,
            self.model_year,
            self.body_type.label(),
            self.transmission.label(),
            self.fuel.label(),
            self.doors,
            if self.air_conditioning {
                " air conditioning"
            } else {
                ""
            },
        );
        if let Some(description) = self.description.as_deref().map(str::trim) {
            if !description.is_empty() {
                text.push_str(". ");
                text.push_str(description);
            }
        }
        text
    }

    /// Attributes required before any decision can be made about the item.
    pub fn missing_attributes(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.brand.trim().is_empty() {
            missing.push("brand");
        }
        if self.model.trim().is_empty() {
            missing.push("model");
        }
        if self.model_year <= 0 {
            missing.push("model year");
        }
        missing
    }

    pub fn display_name(&self) -> String {
        format!("{} {} {}", self.brand, self.model, self.model_year)
    }
}

/// Declared purpose selecting the ranker's weights and bonus rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseCase {
    Family,
    Economy,
    RideHailing,
    Delivery,
    Commute,
    FirstCar,
}

impl UseCase {
    pub const fn label(self) -> &'static str {
        match self {
            UseCase::Family => "family",
            UseCase::Economy => "economy",
            UseCase::RideHailing => "ride-hailing",
            UseCase::Delivery => "delivery",
            UseCase::Commute => "commute",
            UseCase::FirstCar => "first car",
        }
    }

    /// Use-cases where passenger comfort (and therefore an automatic gearbox) matters.
    pub const fn comfort_relevant(self) -> bool {
        matches!(
            self,
            UseCase::Family | UseCase::RideHailing | UseCase::Commute
        )
    }
}

/// Per-request ranking and filtering inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingContext {
    pub use_case: UseCase,
    #[serde(default)]
    pub budget: Option<u32>,
    #[serde(default)]
    pub min_year: Option<i32>,
    #[serde(default)]
    pub max_distance: Option<u32>,
    #[serde(default)]
    pub body_types: Vec<BodyType>,
    #[serde(default)]
    pub transmission: Option<Transmission>,
    #[serde(default)]
    pub priorities: Vec<ScoreDimension>,
}

impl RankingContext {
    pub fn new(use_case: UseCase) -> Self {
        Self {
            use_case,
            budget: None,
            min_year: None,
            max_distance: None,
            body_types: Vec::new(),
            transmission: None,
            priorities: Vec::new(),
        }
    }

    pub fn with_budget(mut self, budget: u32) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_min_year(mut self, year: i32) -> Self {
        self.min_year = Some(year);
        self
    }

    pub fn with_max_distance(mut self, distance_km: u32) -> Self {
        self.max_distance = Some(distance_km);
        self
    }

    pub fn with_body_types(mut self, body_types: Vec<BodyType>) -> Self {
        self.body_types = body_types;
        self
    }

    pub fn with_transmission(mut self, transmission: Transmission) -> Self {
        self.transmission = Some(transmission);
        self
    }

    pub fn with_priorities(mut self, priorities: Vec<ScoreDimension>) -> Self {
        self.priorities = priorities;
        self
    }
}

/// Catalog predicate derived from a ranking context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub max_price: Option<u32>,
    pub min_year: Option<i32>,
    pub max_distance: Option<u32>,
    pub body_types: Vec<BodyType>,
    pub transmission: Option<Transmission>,
}

impl CatalogFilter {
    pub fn matches(&self, item: &CatalogItem) -> bool {
        self.max_price.map_or(true, |max| item.price <= max)
            && self.min_year.map_or(true, |min| item.model_year >= min)
            && self.max_distance.map_or(true, |max| item.distance_km <= max)
            && (self.body_types.is_empty() || self.body_types.contains(&item.body_type))
            && self
                .transmission
                .map_or(true, |wanted| item.transmission == wanted)
    }
}

impl From<&RankingContext> for CatalogFilter {
    fn from(context: &RankingContext) -> Self {
        Self {
            max_price: context.budget,
            min_year: context.min_year,
            max_distance: context.max_distance,
            body_types: context.body_types.clone(),
            transmission: context.transmission,
        }
    }
}

/// Ride tiers every jurisdiction evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideTier {
    Standard,
    Comfort,
    Premium,
}

impl RideTier {
    pub const ALL: [RideTier; 3] = [RideTier::Standard, RideTier::Comfort, RideTier::Premium];

    pub const fn key(self) -> &'static str {
        match self {
            RideTier::Standard => "standard",
            RideTier::Comfort => "comfort",
            RideTier::Premium => "premium",
        }
    }
}

/// Eligibility category: a known tier or a string-keyed extension discovered
/// from external rule sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Tier(RideTier),
    Extension(String),
}

impl Category {
    pub fn key(&self) -> &str {
        match self {
            Category::Tier(tier) => tier.key(),
            Category::Extension(key) => key,
        }
    }

    fn normalize_key(raw: &str) -> String {
        raw.trim()
            .to_ascii_lowercase()
            .split(|c: char| c.is_whitespace() || c == '-')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl From<RideTier> for Category {
    fn from(value: RideTier) -> Self {
        Self::Tier(value)
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        let key = Self::normalize_key(&value);
        RideTier::ALL
            .into_iter()
            .find(|tier| tier.key() == key)
            .map(Category::Tier)
            .unwrap_or(Category::Extension(key))
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.key().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Region-specific policy context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jurisdiction {
    pub code: String,
    pub name: String,
    pub max_age_years: u8,
    /// Qualitative policy text handed to the generative fallback.
    pub policy_summary: String,
    #[serde(default)]
    pub extension_categories: Vec<String>,
}

impl Jurisdiction {
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = RideTier::ALL.into_iter().map(Category::from).collect();
        for raw in &self.extension_categories {
            let category = Category::from(raw.as_str());
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
        categories
    }

    pub fn age_floor(&self, current_year: i32) -> i32 {
        current_year - i32::from(self.max_age_years)
    }
}

/// "This brand/model is allowed in this category starting at `min_year`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRule {
    pub brand: String,
    pub model: String,
    pub min_year: i32,
    #[serde(default)]
    pub provenance: String,
}

/// Versioned allow-list snapshot for one jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub jurisdiction: String,
    pub fetched_at: DateTime<Utc>,
    pub ttl_seconds: i64,
    pub source: String,
    pub rules_by_category: BTreeMap<Category, Vec<EligibilityRule>>,
}

impl RuleSet {
    /// Negative TTLs are always stale; TTLs beyond the representable range never expire.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        if self.ttl_seconds < 0 {
            return false;
        }
        match Duration::try_seconds(self.ttl_seconds) {
            Some(ttl) => now - self.fetched_at <= ttl,
            None => true,
        }
    }

    pub fn rules_for(&self, category: &Category) -> &[EligibilityRule] {
        self.rules_by_category
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Where a category decision came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    HardGate,
    AgeCutoff,
    AllowList { source: String },
    GenerativeFallback { provider: Option<String> },
    InvalidInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDecision {
    pub approved: bool,
    pub confidence: f32,
    pub reasoning: String,
    pub provenance: Provenance,
}

impl CategoryDecision {
    pub fn approve(confidence: f32, reasoning: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            approved: true,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            provenance,
        }
    }

    pub fn reject(confidence: f32, reasoning: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            approved: false,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            provenance,
        }
    }
}

/// Per-category verdicts for one item in one jurisdiction. Always complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub item_id: ItemId,
    pub jurisdiction: String,
    pub decisions: BTreeMap<Category, CategoryDecision>,
}

impl EligibilityResult {
    pub fn uniform(
        item_id: ItemId,
        jurisdiction: impl Into<String>,
        categories: &[Category],
        decision: CategoryDecision,
    ) -> Self {
        Self {
            item_id,
            jurisdiction: jurisdiction.into(),
            decisions: categories
                .iter()
                .map(|category| (category.clone(), decision.clone()))
                .collect(),
        }
    }

    pub fn decision(&self, category: &Category) -> Option<&CategoryDecision> {
        self.decisions.get(category)
    }

    pub fn is_approved(&self, category: &Category) -> bool {
        self.decision(category)
            .map(|decision| decision.approved)
            .unwrap_or(false)
    }

    pub fn approved_categories(&self) -> Vec<&Category> {
        self.decisions
            .iter()
            .filter(|(_, decision)| decision.approved)
            .map(|(category, _)| category)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_parse_known_tiers_and_extensions() {
        assert_eq!(Category::from("Comfort"), Category::Tier(RideTier::Comfort));
        assert_eq!(
            Category::from("Flash Delivery"),
            Category::Extension("flash_delivery".to_string())
        );
        assert_eq!(String::from(Category::Tier(RideTier::Premium)), "premium");
    }

    #[test]
    fn category_keys_round_trip_through_json_maps() {
        let mut map = BTreeMap::new();
        map.insert(Category::Tier(RideTier::Standard), 1);
        map.insert(Category::Extension("moto".to_string()), 2);

        let json = serde_json::to_value(&map).expect("serializes");
        assert_eq!(json["standard"], 1);
        assert_eq!(json["moto"], 2);
    }

    #[test]
    fn jurisdiction_categories_deduplicate_extensions() {
        let jurisdiction = Jurisdiction {
            code: "sp".to_string(),
            name: "São Paulo".to_string(),
            max_age_years: 10,
            policy_summary: String::new(),
            extension_categories: vec!["comfort".to_string(), "Pet".to_string()],
        };

        let categories = jurisdiction.categories();
        assert_eq!(categories.len(), 4);
        assert_eq!(categories[3], Category::Extension("pet".to_string()));
        assert_eq!(jurisdiction.age_floor(2026), 2016);
    }

    #[test]
    fn rule_set_freshness_respects_ttl() {
        let now = Utc::now();
        let snapshot = RuleSet {
            jurisdiction: "sp".to_string(),
            fetched_at: now - Duration::hours(2),
            ttl_seconds: 3600,
            source: "test".to_string(),
            rules_by_category: BTreeMap::new(),
        };

        assert!(!snapshot.is_fresh(now));
        assert!(snapshot.is_fresh(now - Duration::minutes(90)));
        assert!(snapshot.rules_for(&RideTier::Standard.into()).is_empty());

        let unbounded = RuleSet {
            ttl_seconds: i64::MAX,
            ..snapshot.clone()
        };
        assert!(unbounded.is_fresh(now));

        let negative = RuleSet {
            ttl_seconds: -1,
            fetched_at: now,
            ..snapshot
        };
        assert!(!negative.is_fresh(now));
    }

    #[test]
    fn filter_applies_every_populated_bound() {
        let context = RankingContext::new(UseCase::Economy)
            .with_budget(60_000)
            .with_min_year(2018)
            .with_transmission(Transmission::Manual);
        let filter = CatalogFilter::from(&context);

        let mut item = sample_item();
        assert!(filter.matches(&item));

        item.price = 60_001;
        assert!(!filter.matches(&item));

        item.price = 50_000;
        item.transmission = Transmission::Automatic;
        assert!(!filter.matches(&item));
    }

    fn sample_item() -> CatalogItem {
        CatalogItem {
            id: ItemId("onix-2020".to_string()),
            brand: "Chevrolet".to_string(),
            model: "Onix LT".to_string(),
            model_year: 2020,
            body_type: BodyType::Hatchback,
            transmission: Transmission::Manual,
            fuel: FuelType::Flex,
            doors: 4,
            air_conditioning: true,
            price: 55_000,
            distance_km: 40_000,
            scores: SubScores {
                comfort: 6,
                economy: 8,
                space: 5,
                safety: 6,
                value: 8,
            },
            description: None,
        }
    }
}
