use super::super::domain::{CatalogItem, EligibilityRule};

/// Lowercases, drops hyphens and collapses whitespace so "HB-20  Sense" and
/// "hb20 sense" compare equal.
pub(crate) fn normalize(value: &str) -> String {
    value
        .replace('-', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Loose containment: the rule's model text must appear within the item's
/// model text, so a "Corolla" rule covers a "Corolla Altis" listing.
pub(crate) fn matches_rule(item: &CatalogItem, rule: &EligibilityRule) -> bool {
    let rule_model = normalize(&rule.model);
    normalize(&item.brand) == normalize(&rule.brand)
        && !rule_model.is_empty()
        && normalize(&item.model).contains(&rule_model)
}

/// Most specific matching rule: the one with the longest model text. Earlier
/// rules win ties.
pub(crate) fn find_rule<'a>(
    item: &CatalogItem,
    rules: &'a [EligibilityRule],
) -> Option<&'a EligibilityRule> {
    rules
        .iter()
        .filter(|rule| matches_rule(item, rule))
        .fold(None, |best: Option<&EligibilityRule>, rule| match best {
            Some(current) if normalize(&current.model).len() >= normalize(&rule.model).len() => {
                Some(current)
            }
            _ => Some(rule),
        })
}

pub(crate) fn effective_min_year(floor: i32, rule_min_year: i32) -> i32 {
    floor.max(rule_min_year)
}
