use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

use crate::dictionary::Language;

/// Every nutrient the label parser knows how to recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NutritionItem {
    Calories,
    CaloriesFromFat,
    Fat,
    SaturatedFat,
    TransFat,
    MonounsaturatedFat,
    PolyunsaturatedFat,
    Carbohydrates,
    DietaryFiber,
    Sugar,
    AddedSugar,
    SugarAlcohol,
    Protein,
    Sodium,
    Salt,
    Cholesterol,
    VitaminA,
    VitaminC,
    VitaminD,
    VitaminE,
    VitaminK,
    Thiamin,
    Riboflavin,
    Niacin,
    PantothenicAcid,
    VitaminB6,
    Biotin,
    Folate,
    VitaminB12,
    Calcium,
    Iron,
    Potassium,
    Magnesium,
    Zinc,
    Phosphorus,
    Iodine,
    Selenium,
    Copper,
    Manganese,
    Caffeine,
    Taurine,
    Alcohol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NutrientCategory {
    Macronutrient,
    Micronutrient,
    Vitamin,
    Other,
}

impl NutritionItem {
    pub const ALL: [NutritionItem; 42] = [
        Self::Calories,
        Self::CaloriesFromFat,
        Self::Fat,
        Self::SaturatedFat,
        Self::TransFat,
        Self::MonounsaturatedFat,
        Self::PolyunsaturatedFat,
        Self::Carbohydrates,
        Self::DietaryFiber,
        Self::Sugar,
        Self::AddedSugar,
        Self::SugarAlcohol,
        Self::Protein,
        Self::Sodium,
        Self::Salt,
        Self::Cholesterol,
        Self::VitaminA,
        Self::VitaminC,
        Self::VitaminD,
        Self::VitaminE,
        Self::VitaminK,
        Self::Thiamin,
        Self::Riboflavin,
        Self::Niacin,
        Self::PantothenicAcid,
        Self::VitaminB6,
        Self::Biotin,
        Self::Folate,
        Self::VitaminB12,
        Self::Calcium,
        Self::Iron,
        Self::Potassium,
        Self::Magnesium,
        Self::Zinc,
        Self::Phosphorus,
        Self::Iodine,
        Self::Selenium,
        Self::Copper,
        Self::Manganese,
        Self::Caffeine,
        Self::Taurine,
        Self::Alcohol,
    ];

    pub fn category(self) -> NutrientCategory {
        use NutritionItem::*;
        match self {
            Calories | CaloriesFromFat | Fat | SaturatedFat | TransFat | MonounsaturatedFat
            | PolyunsaturatedFat | Carbohydrates | DietaryFiber | Sugar | AddedSugar
            | SugarAlcohol | Protein => NutrientCategory::Macronutrient,
            Sodium | Salt | Cholesterol | Calcium | Iron | Potassium | Magnesium | Zinc
            | Phosphorus | Iodine | Selenium | Copper | Manganese => NutrientCategory::Micronutrient,
            VitaminA | VitaminC | VitaminD | VitaminE | VitaminK | Thiamin | Riboflavin | Niacin
            | PantothenicAcid | VitaminB6 | Biotin | Folate | VitaminB12 => NutrientCategory::Vitamin,
            Caffeine | Taurine | Alcohol => NutrientCategory::Other,
        }
    }

    /// Labels whose bare numbers are energies rather than unitless counts.
    pub fn is_energy(self) -> bool {
        matches!(self, Self::Calories | Self::CaloriesFromFat)
    }

    /// Renders an amount the way a label in `language` shows it next to this item.
    pub fn format_amount(self, amount: &NutritionAmount, language: Language) -> String {
        let separator = language.decimal_separator();
        match (self.category(), amount) {
            (NutrientCategory::Macronutrient, NutritionAmount::Solid(mg)) => format!(
                "{} g",
                format_number(mg / MeasurementUnit::Gram.conversion_factor(), separator)
            ),
            _ => amount.format_with(separator),
        }
    }
}

/// A quantity in its canonical base unit: milligrams for solids, millilitres for liquids and
/// kilocalories for energy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum NutritionAmount {
    Unitless(f64),
    Energy(f64),
    Solid(f64),
    Liquid(f64),
    DailyValue(i32),
}

impl NutritionAmount {
    /// Confidence of the amount when the same item is observed more than once.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::DailyValue(_) => 1,
            Self::Unitless(_) => 2,
            Self::Energy(_) | Self::Solid(_) | Self::Liquid(_) => 3,
        }
    }

    pub fn canonical_value(&self) -> f64 {
        match *self {
            Self::Unitless(value) | Self::Energy(value) | Self::Solid(value) | Self::Liquid(value) => {
                value
            }
            Self::DailyValue(percent) => percent as f64,
        }
    }

    /// Expresses the amount in `unit`, or `None` when the unit measures something else.
    pub fn value_in(&self, unit: MeasurementUnit) -> Option<f64> {
        let compatible = matches!(
            (self, unit.kind()),
            (Self::Solid(_), UnitKind::Solid)
                | (Self::Liquid(_), UnitKind::Liquid)
                | (Self::Energy(_), UnitKind::Energy)
                | (Self::DailyValue(_), UnitKind::Percent)
        );
        compatible.then(|| self.canonical_value() / unit.conversion_factor())
    }

    /// Reads a bare number as an energy, used for calorie rows printed without a unit.
    pub fn as_energy(self) -> Self {
        match self {
            Self::Unitless(value) => Self::Energy(value),
            other => other,
        }
    }

    pub(crate) fn compare_precedence(&self, other: &Self) -> Ordering {
        self.precedence().cmp(&other.precedence())
    }

    /// Display form in the best fitting unit, with `separator` before the decimals.
    pub fn format_with(&self, separator: char) -> String {
        let number = |value: f64| format_number(value, separator);
        match *self {
            Self::Unitless(value) => number(value),
            Self::Energy(kcal) => format!("{} kcal", number(kcal)),
            Self::Solid(mg) => {
                let unit = [MeasurementUnit::Gram, MeasurementUnit::Milligram]
                    .into_iter()
                    .find(|unit| mg >= unit.conversion_factor())
                    .unwrap_or(MeasurementUnit::Microgram);
                format!("{} {}", number(mg / unit.conversion_factor()), unit.symbol())
            }
            Self::Liquid(ml) if ml >= MeasurementUnit::Liter.conversion_factor() => {
                format!("{} l", number(ml / MeasurementUnit::Liter.conversion_factor()))
            }
            Self::Liquid(ml) => format!("{} ml", number(ml)),
            Self::DailyValue(percent) => format!("{percent}%"),
        }
    }
}

impl fmt::Display for NutritionAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with('.'))
    }
}

fn format_number(value: f64, separator: char) -> String {
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    trimmed.replace('.', &separator.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitKind {
    Solid,
    Liquid,
    Energy,
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeasurementUnit {
    Microgram,
    Milligram,
    Gram,
    Kilogram,
    Ounce,
    Milliliter,
    Centiliter,
    Deciliter,
    Liter,
    FluidOunce,
    Kilocalorie,
    Kilojoule,
    Percent,
}

impl MeasurementUnit {
    pub const ALL: [MeasurementUnit; 13] = [
        Self::Microgram,
        Self::Milligram,
        Self::Gram,
        Self::Kilogram,
        Self::Ounce,
        Self::Milliliter,
        Self::Centiliter,
        Self::Deciliter,
        Self::Liter,
        Self::FluidOunce,
        Self::Kilocalorie,
        Self::Kilojoule,
        Self::Percent,
    ];

    pub fn kind(self) -> UnitKind {
        match self {
            Self::Microgram | Self::Milligram | Self::Gram | Self::Kilogram | Self::Ounce => {
                UnitKind::Solid
            }
            Self::Milliliter | Self::Centiliter | Self::Deciliter | Self::Liter | Self::FluidOunce => {
                UnitKind::Liquid
            }
            Self::Kilocalorie | Self::Kilojoule => UnitKind::Energy,
            Self::Percent => UnitKind::Percent,
        }
    }

    /// Multiplier taking a value in this unit to the canonical unit of its kind.
    pub fn conversion_factor(self) -> f64 {
        match self {
            Self::Microgram => 0.001,
            Self::Milligram => 1.0,
            Self::Gram => 1_000.0,
            Self::Kilogram => 1_000_000.0,
            Self::Ounce => 28_349.523,
            Self::Milliliter => 1.0,
            Self::Centiliter => 10.0,
            Self::Deciliter => 100.0,
            Self::Liter => 1_000.0,
            Self::FluidOunce => 29.573_53,
            Self::Kilocalorie => 1.0,
            Self::Kilojoule => 1.0 / 4.184,
            Self::Percent => 1.0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Microgram => "µg",
            Self::Milligram => "mg",
            Self::Gram => "g",
            Self::Kilogram => "kg",
            Self::Ounce => "oz",
            Self::Milliliter => "ml",
            Self::Centiliter => "cl",
            Self::Deciliter => "dl",
            Self::Liter => "l",
            Self::FluidOunce => "fl oz",
            Self::Kilocalorie => "kcal",
            Self::Kilojoule => "kJ",
            Self::Percent => "%",
        }
    }

    /// Converts an observed value into its canonical amount.
    pub fn normalize(self, value: f64) -> NutritionAmount {
        let canonical = value * self.conversion_factor();
        match self.kind() {
            UnitKind::Solid => NutritionAmount::Solid(canonical),
            UnitKind::Liquid => NutritionAmount::Liquid(canonical),
            UnitKind::Energy => NutritionAmount::Energy(canonical),
            UnitKind::Percent => NutritionAmount::DailyValue(canonical.round() as i32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizing_round_trips_through_the_conversion_factor() {
        for unit in MeasurementUnit::ALL {
            for value in [1.0, 12.0, 250.0] {
                let amount = unit.normalize(value);
                let recovered = amount.canonical_value() / unit.conversion_factor();
                assert!(
                    (recovered - value).abs() < 1e-9 * value.max(1.0),
                    "{unit:?} turned {value} into {recovered}"
                );
                assert_eq!(amount.value_in(unit).map(f64::round), Some(value));
            }
        }
    }

    #[test]
    fn display_keeps_order_of_magnitude() {
        assert_eq!(MeasurementUnit::Gram.normalize(5.0).to_string(), "5 g");
        assert_eq!(MeasurementUnit::Milligram.normalize(240.0).to_string(), "240 mg");
        assert_eq!(MeasurementUnit::Microgram.normalize(2.5).to_string(), "2.5 µg");
        assert_eq!(MeasurementUnit::Liter.normalize(1.5).to_string(), "1.5 l");
        assert_eq!(MeasurementUnit::Kilojoule.normalize(1046.0).to_string(), "250 kcal");
        assert_eq!(MeasurementUnit::Percent.normalize(7.4).to_string(), "7%");
    }

    #[test]
    fn macronutrients_render_in_grams() {
        let half_gram = MeasurementUnit::Milligram.normalize(500.0);
        assert_eq!(
            NutritionItem::Fat.format_amount(&half_gram, Language::English),
            "0.5 g"
        );
        assert_eq!(
            NutritionItem::Sodium.format_amount(&half_gram, Language::English),
            "500 mg"
        );
    }

    #[test]
    fn formatting_uses_the_label_language_separator() {
        let amount = MeasurementUnit::Gram.normalize(3.5);
        assert_eq!(NutritionItem::Protein.format_amount(&amount, Language::German), "3,5 g");
        assert_eq!(NutritionItem::Protein.format_amount(&amount, Language::French), "3,5 g");
        assert_eq!(
            MeasurementUnit::Liter.normalize(1.5).format_with(','),
            "1,5 l"
        );
        assert_eq!(NutritionAmount::Energy(250.0).format_with(','), "250 kcal");
    }

    #[test]
    fn precedence_orders_daily_value_below_unitless_below_units() {
        let daily = NutritionAmount::DailyValue(10);
        let bare = NutritionAmount::Unitless(3.0);
        let solid = NutritionAmount::Solid(3.0);
        assert!(daily.precedence() < bare.precedence());
        assert!(bare.precedence() < solid.precedence());
        assert_eq!(solid.precedence(), NutritionAmount::Energy(1.0).precedence());
        assert_eq!(solid.precedence(), NutritionAmount::Liquid(1.0).precedence());
    }

    #[test]
    fn value_in_rejects_incompatible_units() {
        let solid = NutritionAmount::Solid(1_000.0);
        assert_eq!(solid.value_in(MeasurementUnit::Gram), Some(1.0));
        assert_eq!(solid.value_in(MeasurementUnit::Milliliter), None);
        assert_eq!(NutritionAmount::Unitless(4.0).value_in(MeasurementUnit::Gram), None);
    }

    #[test]
    fn every_item_has_a_category() {
        assert_eq!(NutritionItem::ALL.len(), 42);
        assert_eq!(NutritionItem::Iron.category(), NutrientCategory::Micronutrient);
        assert_eq!(NutritionItem::Folate.category(), NutrientCategory::Vitamin);
        assert_eq!(NutritionItem::Caffeine.category(), NutrientCategory::Other);
    }
}
