use std::{
    collections::{BTreeSet, HashMap},
    ops::Bound,
};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    nutrition::{MeasurementUnit, NutritionItem},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Language {
    English,
    German,
    French,
}

impl Language {
    /// Detection order. Ties between languages go to the earlier entry.
    pub const ALL: [Language; 3] = [Self::English, Self::German, Self::French];
    pub const FALLBACK: Language = Self::English;

    /// Separator printed on labels of this language. Both `.` and `,` are accepted when reading
    /// numbers since OCR confuses them regularly.
    pub fn decimal_separator(self) -> char {
        match self {
            Self::English => '.',
            Self::German | Self::French => ',',
        }
    }

    pub fn dictionary(self) -> &'static Dictionary {
        match self {
            Self::English => &ENGLISH,
            Self::German => &GERMAN,
            Self::French => &FRENCH,
        }
    }
}

/// Label text that is recognised but does not name a nutrient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KnownLabel {
    NutritionFacts,
    ServingSize,
    ServingsPerContainer,
    PerServing,
    PerHundred,
    DailyValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Nutrition(NutritionItem),
    Label(KnownLabel),
}

pub struct Dictionary {
    language: Language,
    spellings: BTreeSet<&'static str>,
    items: HashMap<&'static str, NutritionItem>,
    labels: HashMap<&'static str, KnownLabel>,
    unit_spellings: BTreeSet<&'static str>,
    units: HashMap<&'static str, MeasurementUnit>,
}

impl Dictionary {
    fn new(
        language: Language,
        items: &[(&'static str, NutritionItem)],
        labels: &[(&'static str, KnownLabel)],
        units: &[(&'static str, MeasurementUnit)],
    ) -> Self {
        let spellings = items
            .iter()
            .map(|(spelling, _)| *spelling)
            .chain(labels.iter().map(|(spelling, _)| *spelling))
            .collect();
        Self {
            language,
            spellings,
            items: items.iter().copied().collect(),
            labels: labels.iter().copied().collect(),
            unit_spellings: units.iter().map(|(spelling, _)| *spelling).collect(),
            units: units.iter().copied().collect(),
        }
    }

    /// All keyword spellings: nutrient names and known labels.
    pub fn vocabulary(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.spellings.iter().copied()
    }

    pub fn is_keyword_prefix(&self, text: &str) -> bool {
        has_prefix(&self.spellings, text)
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.spellings.contains(text)
    }

    pub fn classify_keyword(&self, text: &str) -> Result<Keyword> {
        if let Some(item) = self.items.get(text) {
            Ok(Keyword::Nutrition(*item))
        } else if let Some(label) = self.labels.get(text) {
            Ok(Keyword::Label(*label))
        } else {
            Err(Error::UnclassifiedKeyword {
                spelling: text.to_string(),
                language: self.language,
            })
        }
    }

    pub fn is_unit_prefix(&self, text: &str) -> bool {
        has_prefix(&self.unit_spellings, text)
    }

    pub fn is_unit(&self, text: &str) -> bool {
        self.unit_spellings.contains(text)
    }

    pub fn classify_unit(&self, text: &str) -> Result<MeasurementUnit> {
        self.units
            .get(text)
            .copied()
            .ok_or_else(|| Error::UnclassifiedUnit {
                spelling: text.to_string(),
                language: self.language,
            })
    }
}

fn has_prefix(set: &BTreeSet<&'static str>, prefix: &str) -> bool {
    set.range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
        .next()
        .is_some_and(|spelling| spelling.starts_with(prefix))
}

lazy_static! {
    static ref ENGLISH: Dictionary =
        Dictionary::new(Language::English, ENGLISH_ITEMS, ENGLISH_LABELS, ENGLISH_UNITS);
    static ref GERMAN: Dictionary =
        Dictionary::new(Language::German, GERMAN_ITEMS, GERMAN_LABELS, GERMAN_UNITS);
    static ref FRENCH: Dictionary =
        Dictionary::new(Language::French, FRENCH_ITEMS, FRENCH_LABELS, FRENCH_UNITS);
}

use KnownLabel as L;
use MeasurementUnit as U;
use NutritionItem as N;

const ENGLISH_ITEMS: &[(&str, NutritionItem)] = &[
    ("calories", N::Calories),
    ("calorie", N::Calories),
    ("energy", N::Calories),
    ("calories from fat", N::CaloriesFromFat),
    ("fat calories", N::CaloriesFromFat),
    ("total fat", N::Fat),
    ("fat", N::Fat),
    ("saturated fat", N::SaturatedFat),
    ("sat. fat", N::SaturatedFat),
    ("saturates", N::SaturatedFat),
    ("trans fat", N::TransFat),
    ("monounsaturated fat", N::MonounsaturatedFat),
    ("monounsaturates", N::MonounsaturatedFat),
    ("polyunsaturated fat", N::PolyunsaturatedFat),
    ("polyunsaturates", N::PolyunsaturatedFat),
    ("total carbohydrate", N::Carbohydrates),
    ("total carbohydrates", N::Carbohydrates),
    ("total carb.", N::Carbohydrates),
    ("total carbs", N::Carbohydrates),
    ("carbohydrate", N::Carbohydrates),
    ("carbohydrates", N::Carbohydrates),
    ("dietary fiber", N::DietaryFiber),
    ("dietary fibre", N::DietaryFiber),
    ("fiber", N::DietaryFiber),
    ("fibre", N::DietaryFiber),
    ("total sugars", N::Sugar),
    ("total sugar", N::Sugar),
    ("sugars", N::Sugar),
    ("sugar", N::Sugar),
    ("of which sugars", N::Sugar),
    ("added sugars", N::AddedSugar),
    ("added sugar", N::AddedSugar),
    ("sugar alcohol", N::SugarAlcohol),
    ("sugar alcohols", N::SugarAlcohol),
    ("polyols", N::SugarAlcohol),
    ("protein", N::Protein),
    ("sodium", N::Sodium),
    ("salt", N::Salt),
    ("cholesterol", N::Cholesterol),
    ("cholest.", N::Cholesterol),
    ("vitamin a", N::VitaminA),
    ("vitamin c", N::VitaminC),
    ("vitamin d", N::VitaminD),
    ("vitamin e", N::VitaminE),
    ("vitamin k", N::VitaminK),
    ("thiamin", N::Thiamin),
    ("thiamine", N::Thiamin),
    ("vitamin b1", N::Thiamin),
    ("riboflavin", N::Riboflavin),
    ("vitamin b2", N::Riboflavin),
    ("niacin", N::Niacin),
    ("vitamin b3", N::Niacin),
    ("pantothenic acid", N::PantothenicAcid),
    ("vitamin b6", N::VitaminB6),
    ("biotin", N::Biotin),
    ("folate", N::Folate),
    ("folic acid", N::Folate),
    ("vitamin b12", N::VitaminB12),
    ("calcium", N::Calcium),
    ("iron", N::Iron),
    ("potassium", N::Potassium),
    ("magnesium", N::Magnesium),
    ("zinc", N::Zinc),
    ("phosphorus", N::Phosphorus),
    ("iodine", N::Iodine),
    ("selenium", N::Selenium),
    ("copper", N::Copper),
    ("manganese", N::Manganese),
    ("caffeine", N::Caffeine),
    ("taurine", N::Taurine),
    ("alcohol", N::Alcohol),
];

const ENGLISH_LABELS: &[(&str, KnownLabel)] = &[
    ("nutrition facts", L::NutritionFacts),
    ("nutrition information", L::NutritionFacts),
    ("serving size", L::ServingSize),
    ("servings per container", L::ServingsPerContainer),
    ("amount per serving", L::PerServing),
    ("per serving", L::PerServing),
    ("per 100g", L::PerHundred),
    ("per 100 g", L::PerHundred),
    ("per 100ml", L::PerHundred),
    ("per 100 ml", L::PerHundred),
    ("% daily value", L::DailyValue),
    ("daily value", L::DailyValue),
];

const ENGLISH_UNITS: &[(&str, MeasurementUnit)] = &[
    ("mcg", U::Microgram),
    ("µg", U::Microgram),
    ("μg", U::Microgram),
    ("ug", U::Microgram),
    ("mg", U::Milligram),
    ("g", U::Gram),
    ("gr", U::Gram),
    ("gram", U::Gram),
    ("grams", U::Gram),
    ("kg", U::Kilogram),
    ("oz", U::Ounce),
    ("ml", U::Milliliter),
    ("cl", U::Centiliter),
    ("dl", U::Deciliter),
    ("l", U::Liter),
    ("fl oz", U::FluidOunce),
    ("fl. oz", U::FluidOunce),
    ("fl.oz", U::FluidOunce),
    ("kcal", U::Kilocalorie),
    ("cal", U::Kilocalorie),
    ("kj", U::Kilojoule),
    ("%", U::Percent),
];

const GERMAN_ITEMS: &[(&str, NutritionItem)] = &[
    ("brennwert", N::Calories),
    ("energie", N::Calories),
    ("kalorien", N::Calories),
    ("fett", N::Fat),
    ("davon gesättigte fettsäuren", N::SaturatedFat),
    ("gesättigte fettsäuren", N::SaturatedFat),
    ("transfettsäuren", N::TransFat),
    ("einfach ungesättigte fettsäuren", N::MonounsaturatedFat),
    ("mehrfach ungesättigte fettsäuren", N::PolyunsaturatedFat),
    ("kohlenhydrate", N::Carbohydrates),
    ("ballaststoffe", N::DietaryFiber),
    ("davon zucker", N::Sugar),
    ("zucker", N::Sugar),
    ("zugesetzter zucker", N::AddedSugar),
    ("mehrwertige alkohole", N::SugarAlcohol),
    ("eiweiß", N::Protein),
    ("eiweiss", N::Protein),
    ("natrium", N::Sodium),
    ("salz", N::Salt),
    ("cholesterin", N::Cholesterol),
    ("vitamin a", N::VitaminA),
    ("vitamin c", N::VitaminC),
    ("vitamin d", N::VitaminD),
    ("vitamin e", N::VitaminE),
    ("vitamin k", N::VitaminK),
    ("thiamin", N::Thiamin),
    ("vitamin b1", N::Thiamin),
    ("riboflavin", N::Riboflavin),
    ("vitamin b2", N::Riboflavin),
    ("niacin", N::Niacin),
    ("pantothensäure", N::PantothenicAcid),
    ("vitamin b6", N::VitaminB6),
    ("biotin", N::Biotin),
    ("folsäure", N::Folate),
    ("vitamin b12", N::VitaminB12),
    ("calcium", N::Calcium),
    ("kalzium", N::Calcium),
    ("eisen", N::Iron),
    ("kalium", N::Potassium),
    ("magnesium", N::Magnesium),
    ("zink", N::Zinc),
    ("phosphor", N::Phosphorus),
    ("jod", N::Iodine),
    ("selen", N::Selenium),
    ("kupfer", N::Copper),
    ("mangan", N::Manganese),
    ("koffein", N::Caffeine),
    ("taurin", N::Taurine),
    ("alkohol", N::Alcohol),
];

const GERMAN_LABELS: &[(&str, KnownLabel)] = &[
    ("nährwertangaben", L::NutritionFacts),
    ("nährwertinformationen", L::NutritionFacts),
    ("portionsgröße", L::ServingSize),
    ("portionsgrösse", L::ServingSize),
    ("pro portion", L::PerServing),
    ("pro 100g", L::PerHundred),
    ("pro 100 g", L::PerHundred),
    ("pro 100ml", L::PerHundred),
    ("pro 100 ml", L::PerHundred),
    ("je 100 g", L::PerHundred),
    ("% der referenzmenge", L::DailyValue),
    ("referenzmenge", L::DailyValue),
];

const GERMAN_UNITS: &[(&str, MeasurementUnit)] = &[
    ("mcg", U::Microgram),
    ("µg", U::Microgram),
    ("μg", U::Microgram),
    ("mg", U::Milligram),
    ("g", U::Gram),
    ("kg", U::Kilogram),
    ("ml", U::Milliliter),
    ("cl", U::Centiliter),
    ("dl", U::Deciliter),
    ("l", U::Liter),
    ("kcal", U::Kilocalorie),
    ("kj", U::Kilojoule),
    ("%", U::Percent),
];

const FRENCH_ITEMS: &[(&str, NutritionItem)] = &[
    ("énergie", N::Calories),
    ("energie", N::Calories),
    ("valeur énergétique", N::Calories),
    ("calories", N::Calories),
    ("matières grasses", N::Fat),
    ("lipides", N::Fat),
    ("dont acides gras saturés", N::SaturatedFat),
    ("acides gras saturés", N::SaturatedFat),
    ("acides gras trans", N::TransFat),
    ("acides gras monoinsaturés", N::MonounsaturatedFat),
    ("acides gras polyinsaturés", N::PolyunsaturatedFat),
    ("glucides", N::Carbohydrates),
    ("fibres alimentaires", N::DietaryFiber),
    ("fibres", N::DietaryFiber),
    ("dont sucres", N::Sugar),
    ("sucres", N::Sugar),
    ("sucres ajoutés", N::AddedSugar),
    ("polyols", N::SugarAlcohol),
    ("protéines", N::Protein),
    ("sodium", N::Sodium),
    ("sel", N::Salt),
    ("cholestérol", N::Cholesterol),
    ("vitamine a", N::VitaminA),
    ("vitamine c", N::VitaminC),
    ("vitamine d", N::VitaminD),
    ("vitamine e", N::VitaminE),
    ("vitamine k", N::VitaminK),
    ("thiamine", N::Thiamin),
    ("vitamine b1", N::Thiamin),
    ("riboflavine", N::Riboflavin),
    ("vitamine b2", N::Riboflavin),
    ("niacine", N::Niacin),
    ("acide pantothénique", N::PantothenicAcid),
    ("vitamine b6", N::VitaminB6),
    ("biotine", N::Biotin),
    ("folates", N::Folate),
    ("acide folique", N::Folate),
    ("vitamine b12", N::VitaminB12),
    ("calcium", N::Calcium),
    ("fer", N::Iron),
    ("potassium", N::Potassium),
    ("magnésium", N::Magnesium),
    ("zinc", N::Zinc),
    ("phosphore", N::Phosphorus),
    ("iode", N::Iodine),
    ("sélénium", N::Selenium),
    ("cuivre", N::Copper),
    ("manganèse", N::Manganese),
    ("caféine", N::Caffeine),
    ("taurine", N::Taurine),
    ("alcool", N::Alcohol),
];

const FRENCH_LABELS: &[(&str, KnownLabel)] = &[
    ("valeurs nutritionnelles", L::NutritionFacts),
    ("informations nutritionnelles", L::NutritionFacts),
    ("taille de la portion", L::ServingSize),
    ("par portion", L::PerServing),
    ("pour 100g", L::PerHundred),
    ("pour 100 g", L::PerHundred),
    ("pour 100ml", L::PerHundred),
    ("pour 100 ml", L::PerHundred),
    ("% vnr", L::DailyValue),
    ("% ar", L::DailyValue),
];

const FRENCH_UNITS: &[(&str, MeasurementUnit)] = &[
    ("mcg", U::Microgram),
    ("µg", U::Microgram),
    ("μg", U::Microgram),
    ("mg", U::Milligram),
    ("g", U::Gram),
    ("gr", U::Gram),
    ("kg", U::Kilogram),
    ("ml", U::Milliliter),
    ("cl", U::Centiliter),
    ("dl", U::Deciliter),
    ("l", U::Liter),
    ("kcal", U::Kilocalorie),
    ("kj", U::Kilojoule),
    ("%", U::Percent),
];
