use std::collections::HashMap;

use crate::config::CalorieMode;

pub const DEFAULT_WEIGHT_G: f64 = 100.0;

/// kcal per 100 g for the foods the service knows about.
#[derive(Debug, Clone)]
pub struct FoodTable {
    kcal_per_100g: HashMap<String, f64>,
}

impl Default for FoodTable {
    fn default() -> Self {
        Self::from_entries([
            ("apple", 52.0),
            ("banana", 89.0),
            ("rice", 130.0),
            ("egg", 155.0),
            ("chicken", 239.0),
            ("bread", 265.0),
        ])
    }
}

impl FoodTable {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            kcal_per_100g: entries
                .into_iter()
                .map(|(name, kcal)| (normalize(name), kcal))
                .collect(),
        }
    }

    pub fn kcal_per_100g(&self, food: &str) -> Option<f64> {
        self.kcal_per_100g.get(&normalize(food)).copied()
    }

    /// Unknown food is a silent zero.
    pub fn calories(&self, food: &str, weight_g: f64) -> f64 {
        self.kcal_per_100g(food)
            .map(|kcal| kcal * (weight_g / 100.0))
            .unwrap_or(0.0)
    }
}

impl CalorieMode {
    pub fn compute(&self, table: &FoodTable, food: Option<&str>, weight_g: f64) -> f64 {
        match self {
            CalorieMode::Lookup => food.map(|f| table.calories(f, weight_g)).unwrap_or(0.0),
            CalorieMode::Fixed(kcal) => *kcal,
        }
    }
}

fn normalize(food: &str) -> String {
    food.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_foods_scale_with_weight() {
        let table = FoodTable::default();
        assert_eq!(table.calories("apple", 200.0), 104.0);
        assert_eq!(table.calories("rice", 100.0), 130.0);
        assert_eq!(table.calories("egg", 50.0), 77.5);
        assert_eq!(table.calories("bread", 0.0), 0.0);

        for (food, kcal) in [("banana", 89.0), ("chicken", 239.0)] {
            for w in [1.0, 33.3, 100.0, 250.0, 1000.0] {
                assert_eq!(table.calories(food, w), kcal * (w / 100.0));
            }
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let table = FoodTable::default();
        assert_eq!(table.kcal_per_100g("Apple"), Some(52.0));
        assert_eq!(table.kcal_per_100g(" BANANA "), Some(89.0));
    }

    #[test]
    fn unknown_food_is_zero() {
        let table = FoodTable::default();
        assert_eq!(table.kcal_per_100g("pizza"), None);
        assert_eq!(table.calories("pizza", 300.0), 0.0);
        assert_eq!(table.calories("", 100.0), 0.0);
    }

    #[test]
    fn calorie_modes() {
        let table = FoodTable::default();
        assert_eq!(
            CalorieMode::Lookup.compute(&table, Some("apple"), DEFAULT_WEIGHT_G),
            52.0
        );
        assert_eq!(CalorieMode::Lookup.compute(&table, None, 200.0), 0.0);
        assert_eq!(CalorieMode::Lookup.compute(&table, Some("dog"), 200.0), 0.0);
        assert_eq!(
            CalorieMode::Fixed(100.0).compute(&table, Some("dog"), 500.0),
            100.0
        );
        assert_eq!(CalorieMode::Fixed(100.0).compute(&table, None, 1.0), 100.0);
    }
}
