use tracing::instrument;

use crate::{
    dictionary::Language,
    error::Result,
    lexer::{tokenize, TextDescription},
    nutrition::{MeasurementUnit, NutritionAmount, NutritionItem},
    NutritionLabel, ServingSize, TextBox,
};

const KEY_SUFFIXES: [&str; 3] = ["_100g", "_serving", "_value"];

/// Nutrient and default unit for a database key.
pub fn item_for_key(key: &str) -> Option<(NutritionItem, MeasurementUnit)> {
    use MeasurementUnit::{Gram, Kilocalorie, Kilojoule};
    use NutritionItem as N;

    let key = KEY_SUFFIXES
        .iter()
        .find_map(|suffix| key.strip_suffix(suffix))
        .unwrap_or(key);
    let mapping = match key {
        "energy-kcal" => (N::Calories, Kilocalorie),
        "energy-kj" | "energy" => (N::Calories, Kilojoule),
        "energy-from-fat" => (N::CaloriesFromFat, Kilojoule),
        "fat" => (N::Fat, Gram),
        "saturated-fat" => (N::SaturatedFat, Gram),
        "trans-fat" => (N::TransFat, Gram),
        "monounsaturated-fat" => (N::MonounsaturatedFat, Gram),
        "polyunsaturated-fat" => (N::PolyunsaturatedFat, Gram),
        "carbohydrates" => (N::Carbohydrates, Gram),
        "fiber" => (N::DietaryFiber, Gram),
        "sugars" => (N::Sugar, Gram),
        "added-sugars" => (N::AddedSugar, Gram),
        "polyols" => (N::SugarAlcohol, Gram),
        "proteins" => (N::Protein, Gram),
        "sodium" => (N::Sodium, Gram),
        "salt" => (N::Salt, Gram),
        "cholesterol" => (N::Cholesterol, Gram),
        "vitamin-a" => (N::VitaminA, Gram),
        "vitamin-c" => (N::VitaminC, Gram),
        "vitamin-d" => (N::VitaminD, Gram),
        "vitamin-e" => (N::VitaminE, Gram),
        "vitamin-k" => (N::VitaminK, Gram),
        "vitamin-b1" => (N::Thiamin, Gram),
        "vitamin-b2" => (N::Riboflavin, Gram),
        "vitamin-pp" => (N::Niacin, Gram),
        "pantothenic-acid" => (N::PantothenicAcid, Gram),
        "vitamin-b6" => (N::VitaminB6, Gram),
        "biotin" => (N::Biotin, Gram),
        "vitamin-b9" | "folates" => (N::Folate, Gram),
        "vitamin-b12" => (N::VitaminB12, Gram),
        "calcium" => (N::Calcium, Gram),
        "iron" => (N::Iron, Gram),
        "potassium" => (N::Potassium, Gram),
        "magnesium" => (N::Magnesium, Gram),
        "zinc" => (N::Zinc, Gram),
        "phosphorus" => (N::Phosphorus, Gram),
        "iodine" => (N::Iodine, Gram),
        "selenium" => (N::Selenium, Gram),
        "copper" => (N::Copper, Gram),
        "manganese" => (N::Manganese, Gram),
        "caffeine" => (N::Caffeine, Gram),
        "taurine" => (N::Taurine, Gram),
        "alcohol" => (N::Alcohol, Gram),
        _ => return None,
    };
    Some(mapping)
}

/// Reads a unit label such as `"mg"` or `"kJ"` through the English unit table.
pub fn parse_unit(unit: &str) -> Option<MeasurementUnit> {
    let unit = unit.trim().to_lowercase();
    let dictionary = Language::English.dictionary();
    if dictionary.is_unit(&unit) {
        dictionary.classify_unit(&unit).ok()
    } else {
        None
    }
}

/// Canonical amount for one nutriment record. Unknown keys and unknown or mismatched units yield
/// `None`.
pub fn map_nutriment(
    key: &str,
    value: f64,
    unit: Option<&str>,
) -> Option<(NutritionItem, NutritionAmount)> {
    let (item, default_unit) = item_for_key(key)?;
    if item == NutritionItem::Alcohol {
        // Stored as percent by volume, which is no daily value.
        return Some((item, NutritionAmount::Unitless(value)));
    }
    let unit = match unit {
        Some(unit) => parse_unit(unit)?,
        None => default_unit,
    };
    if unit.kind() != default_unit.kind() {
        log::debug!("Ignoring {key} given in {unit:?}");
        return None;
    }
    Some((item, unit.normalize(value)))
}

/// Builds a label from database records. `serving_size` is free text such as `"30 g"` or
/// `"1 cup (240 ml)"`.
#[instrument(level = "debug", skip(nutriments))]
pub fn label_from_product<'a>(
    nutriments: impl IntoIterator<Item = (&'a str, f64, Option<&'a str>)>,
    serving_size: Option<&str>,
    language: Language,
) -> Result<NutritionLabel> {
    let mut label = NutritionLabel::new(language);
    for (key, value, unit) in nutriments {
        if let Some((item, amount)) = map_nutriment(key, value, unit) {
            label.record(item, amount);
        }
    }
    if let Some(text) = serving_size {
        label.serving_size = parse_serving_size(text, language)?;
    }
    Ok(label)
}

/// Serving size from free text: the first amount, with the word after a bare number as its unit.
pub fn parse_serving_size(text: &str, language: Language) -> Result<Option<ServingSize>> {
    let fragment = TextBox::from_xywh(text, 0.0, 0.0, 1.0, 1.0);
    let tokens = tokenize(&fragment, 0, language)?;
    let Some(position) = tokens
        .iter()
        .position(|token| matches!(token.description, TextDescription::Amount(_)))
    else {
        return Ok(None);
    };
    let serving_size = match tokens[position].description {
        TextDescription::Amount(NutritionAmount::DailyValue(percent)) => {
            ServingSize::ContainerFraction { percent }
        }
        TextDescription::Amount(NutritionAmount::Unitless(value)) => ServingSize::AbsoluteValue {
            value,
            unit: tokens
                .get(position + 1)
                .and_then(|token| match &token.description {
                    TextDescription::Uncategorized(unit) => Some(unit.clone()),
                    _ => None,
                }),
        },
        TextDescription::Amount(amount) => ServingSize::Amount { amount },
        _ => return Ok(None),
    };
    Ok(Some(serving_size))
}
