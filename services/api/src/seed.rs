use chrono::{DateTime, Duration, Utc};
use fleetmatch::workflows::matching::{
    BodyType, CatalogItem, Category, EligibilityRule, FuelType, ItemId, Jurisdiction, RideTier,
    RuleSet, SubScores, Transmission,
};
use std::collections::BTreeMap;

/// Catalog served when no CSV export is configured.
pub(crate) fn sample_catalog() -> Vec<CatalogItem> {
    vec![
        vehicle(
            ("toyota-corolla-2021", "Toyota", "Corolla XEi", 2021),
            (BodyType::Sedan, Transmission::Cvt, FuelType::Flex),
            (118_900, 48_000),
            [8, 7, 7, 9, 7],
            "Spacious sedan with a reliable hybrid-ready platform.",
        ),
        vehicle(
            ("hyundai-hb20-2022", "Hyundai", "HB20 Comfort", 2022),
            (BodyType::Hatchback, Transmission::Manual, FuelType::Flex),
            (72_500, 31_000),
            [6, 9, 5, 7, 9],
            "Economical city hatch with low running costs.",
        ),
        vehicle(
            ("chevrolet-onix-2023", "Chevrolet", "Onix Plus LT", 2023),
            (BodyType::Sedan, Transmission::Automatic, FuelType::Flex),
            (94_000, 22_000),
            [7, 8, 6, 8, 8],
            "Compact sedan popular with ride-hailing drivers.",
        ),
        vehicle(
            ("jeep-compass-2024", "Jeep", "Compass Longitude", 2024),
            (BodyType::Suv, Transmission::Automatic, FuelType::Diesel),
            (189_000, 15_000),
            [9, 5, 8, 9, 6],
            "Comfortable SUV for long family trips.",
        ),
        vehicle(
            ("fiat-strada-2022", "Fiat", "Strada Freedom", 2022),
            (BodyType::Pickup, Transmission::Manual, FuelType::Flex),
            (99_000, 42_000),
            [5, 7, 9, 6, 8],
            "Light pickup with a large bed for deliveries.",
        ),
        vehicle(
            ("bmw-320i-2020", "BMW", "320i M Sport", 2020),
            (BodyType::Sedan, Transmission::Automatic, FuelType::Gasoline),
            (215_000, 56_000),
            [10, 5, 7, 9, 5],
            "Premium sports sedan.",
        ),
        vehicle(
            ("renault-kwid-2019", "Renault", "Kwid Zen", 2019),
            (BodyType::Hatchback, Transmission::Manual, FuelType::Flex),
            (44_900, 88_000),
            [4, 9, 3, 5, 9],
            "Entry-level hatch for a first car on a budget.",
        ),
        vehicle(
            ("byd-dolphin-2024", "BYD", "Dolphin", 2024),
            (BodyType::Hatchback, Transmission::Automatic, FuelType::Electric),
            (149_800, 9_000),
            [8, 10, 6, 8, 7],
            "Electric hatch with very low cost per kilometre.",
        ),
    ]
}

pub(crate) fn sample_jurisdictions() -> Vec<Jurisdiction> {
    vec![
        Jurisdiction {
            code: "sp".to_string(),
            name: "São Paulo".to_string(),
            max_age_years: 10,
            policy_summary: "Four doors, air conditioning and at most 10 years old. \
                Comfort requires a mid-size sedan or better; premium is limited to luxury brands."
                .to_string(),
            extension_categories: vec!["Black".to_string()],
        },
        Jurisdiction {
            code: "rj".to_string(),
            name: "Rio de Janeiro".to_string(),
            max_age_years: 8,
            policy_summary: "Four doors, air conditioning and at most 8 years old.".to_string(),
            extension_categories: Vec::new(),
        },
    ]
}

/// Allow-list snapshots. `rj` has none and always resolves through the fallback.
pub(crate) fn sample_snapshots(now: DateTime<Utc>, ttl: Duration) -> Vec<RuleSet> {
    let mut rules_by_category = BTreeMap::new();
    rules_by_category.insert(
        Category::from(RideTier::Standard),
        vec![
            rule("Toyota", "Corolla", 2016),
            rule("Chevrolet", "Onix", 2017),
            rule("Hyundai", "HB20", 2017),
        ],
    );
    rules_by_category.insert(
        Category::from(RideTier::Comfort),
        vec![rule("Toyota", "Corolla", 2019), rule("Jeep", "Compass", 2019)],
    );
    rules_by_category.insert(
        Category::from(RideTier::Premium),
        vec![rule("BMW", "320i", 2019)],
    );

    vec![RuleSet {
        jurisdiction: "sp".to_string(),
        fetched_at: now,
        ttl_seconds: ttl.num_seconds(),
        source: "seed".to_string(),
        rules_by_category,
    }]
}

fn rule(brand: &str, model: &str, min_year: i32) -> EligibilityRule {
    EligibilityRule {
        brand: brand.to_string(),
        model: model.to_string(),
        min_year,
        provenance: "seed".to_string(),
    }
}

fn vehicle(
    (id, brand, model, model_year): (&str, &str, &str, i32),
    (body_type, transmission, fuel): (BodyType, Transmission, FuelType),
    (price, distance_km): (u32, u32),
    [comfort, economy, space, safety, value]: [u8; 5],
    description: &str,
) -> CatalogItem {
    CatalogItem {
        id: ItemId(id.to_string()),
        brand: brand.to_string(),
        model: model.to_string(),
        model_year,
        body_type,
        transmission,
        fuel,
        doors: if body_type == BodyType::Pickup { 2 } else { 4 },
        air_conditioning: true,
        price,
        distance_km,
        scores: SubScores {
            comfort,
            economy,
            space,
            safety,
            value,
        },
        description: Some(description.to_string()),
    }
}
