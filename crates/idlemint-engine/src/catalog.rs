//! The immutable business catalog.
//!
//! Definitions are process-wide configuration: built once at startup,
//! shared by reference (`Arc`), and never mutated. The portfolio component
//! receives the catalog explicitly instead of reading global state.
//!
//! # Upgrade cost curve
//!
//! Exactly one curve is used everywhere:
//! `cost(n -> n+1) = floor(base_cost * 1.5^n)`.

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use idlemint_types::{BusinessCategory, BusinessDefinition, BusinessId};

/// Per-level multiplier of the upgrade cost curve (1.5).
fn upgrade_growth() -> Decimal {
    Decimal::new(15, 1)
}

/// Cost of upgrading a business from `current_level` to the next level.
///
/// `floor(base_cost * 1.5^current_level)`. Returns `None` if the
/// computation overflows `Decimal` or the result does not fit a `u64`
/// (an absurd level for any real catalog entry).
pub fn upgrade_cost(base_cost: u64, current_level: u32) -> Option<u64> {
    let growth = upgrade_growth();
    let mut cost = Decimal::from(base_cost);
    for _ in 0..current_level {
        cost = cost.checked_mul(growth)?;
    }
    cost.floor().to_u64()
}

/// The catalog of purchasable businesses, keyed by slug.
#[derive(Debug, Clone)]
pub struct BusinessCatalog {
    entries: BTreeMap<BusinessId, BusinessDefinition>,
}

impl BusinessCatalog {
    /// Build a catalog from explicit definitions. Later duplicates of a
    /// slug replace earlier ones.
    pub fn from_definitions(definitions: Vec<BusinessDefinition>) -> Self {
        let entries = definitions
            .into_iter()
            .map(|def| (def.id.clone(), def))
            .collect();
        Self { entries }
    }

    /// The standard live catalog.
    pub fn standard() -> Self {
        let defs = vec![
            definition("lemonade", "Lemonade Stand", 100, 10, 1, BusinessCategory::Food),
            definition("food_truck", "Food Truck", 750, 45, 3, BusinessCategory::Food),
            definition("car_wash", "Car Wash", 2_500, 120, 5, BusinessCategory::Services),
            definition("corner_shop", "Corner Shop", 8_000, 320, 8, BusinessCategory::Retail),
            definition("gym", "24/7 Gym", 25_000, 850, 12, BusinessCategory::Services),
            definition("arcade", "Retro Arcade", 60_000, 1_800, 16, BusinessCategory::Entertainment),
            definition("cinema", "Multiplex Cinema", 150_000, 4_000, 22, BusinessCategory::Entertainment),
            definition("startup", "Tech Startup", 400_000, 9_500, 30, BusinessCategory::Tech),
            definition("bank", "Private Bank", 1_200_000, 26_000, 40, BusinessCategory::Finance),
        ];
        Self::from_definitions(defs)
    }

    /// Look up a definition by slug.
    pub fn get(&self, id: &BusinessId) -> Option<&BusinessDefinition> {
        self.entries.get(id)
    }

    /// Number of catalog entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all definitions in slug order.
    pub fn iter(&self) -> impl Iterator<Item = &BusinessDefinition> {
        self.entries.values()
    }
}

/// Shorthand constructor used by [`BusinessCatalog::standard`].
fn definition(
    slug: &str,
    name: &str,
    base_cost: u64,
    base_income_per_hour: u64,
    required_level: u32,
    category: BusinessCategory,
) -> BusinessDefinition {
    BusinessDefinition {
        id: BusinessId::from(slug),
        name: name.to_owned(),
        base_cost,
        base_income_per_hour,
        required_level,
        category,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_has_lemonade_entry() {
        let catalog = BusinessCatalog::standard();
        let lemonade = catalog.get(&BusinessId::from("lemonade")).unwrap();
        assert_eq!(lemonade.base_cost, 100);
        assert_eq!(lemonade.base_income_per_hour, 10);
        assert_eq!(lemonade.required_level, 1);
    }

    #[test]
    fn upgrade_cost_follows_single_curve() {
        // base 100: level 1 -> 150, level 2 -> 225, level 3 -> 337 (floored).
        assert_eq!(upgrade_cost(100, 0), Some(100));
        assert_eq!(upgrade_cost(100, 1), Some(150));
        assert_eq!(upgrade_cost(100, 2), Some(225));
        assert_eq!(upgrade_cost(100, 3), Some(337));
    }

    #[test]
    fn upgrade_cost_handles_absurd_levels() {
        // 1.5^400 overflows Decimal; the caller gets None, not a panic.
        assert_eq!(upgrade_cost(u64::MAX, 400), None);
    }

    #[test]
    fn catalog_lookup_misses_unknown_slug() {
        let catalog = BusinessCatalog::standard();
        assert!(catalog.get(&BusinessId::from("moon_base")).is_none());
        assert!(!catalog.is_empty());
    }
}
