use std::collections::BTreeMap;

use geo::{coord, Area, BoundingRect, Coord, LineString, Polygon, Rect};
use serde::{Deserialize, Serialize};

use crate::{
    dictionary::Language,
    nutrition::{NutritionAmount, NutritionItem},
};

/// Smallest `serving size + nutrition facts` count accepted as a real label.
pub const MIN_VALID_SCORE: usize = 5;

/// One recognised text fragment. `bounds` is normalised to the image it was read from, origin at
/// the top-left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub text: String,
    pub bounds: Rect<f32>,
}

impl TextBox {
    pub fn new(text: impl Into<String>, bounds: Rect<f32>) -> Self {
        Self {
            text: text.into(),
            bounds,
        }
    }

    pub fn from_xywh(text: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(
            text,
            Rect::new(coord! { x: x, y: y }, coord! { x: x + width, y: y + height }),
        )
    }
}

/// Bounds of a single glyph, as reported by a character-level detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CharacterBox {
    pub bounds: Rect<f32>,
}

impl CharacterBox {
    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            bounds: Rect::new(coord! { x: x, y: y }, coord! { x: x + width, y: y + height }),
        }
    }
}

/// A detected quadrilateral, normalised to the image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectangleObservation {
    pub top_left: Coord<f32>,
    pub top_right: Coord<f32>,
    pub bottom_left: Coord<f32>,
    pub bottom_right: Coord<f32>,
}

impl RectangleObservation {
    pub fn from_rect(rect: Rect<f32>) -> Self {
        let (min, max) = (rect.min(), rect.max());
        Self {
            top_left: min,
            top_right: coord! { x: max.x, y: min.y },
            bottom_left: coord! { x: min.x, y: max.y },
            bottom_right: max,
        }
    }

    pub fn corners(&self) -> [Coord<f32>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    pub fn to_polygon(&self) -> Polygon<f32> {
        Polygon::new(LineString::from(self.corners().to_vec()), vec![])
    }

    pub fn area(&self) -> f32 {
        self.to_polygon().unsigned_area()
    }

    pub fn bounding_rect(&self) -> Option<Rect<f32>> {
        self.to_polygon().bounding_rect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ServingSize {
    Amount { amount: NutritionAmount },
    /// Share of the container, in percent.
    ContainerFraction { percent: i32 },
    AbsoluteValue { value: f64, unit: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionLabel {
    pub language: Language,
    pub serving_size: Option<ServingSize>,
    pub nutrition_facts: BTreeMap<NutritionItem, NutritionAmount>,
}

impl NutritionLabel {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            serving_size: None,
            nutrition_facts: BTreeMap::new(),
        }
    }

    pub fn get(&self, item: NutritionItem) -> Option<&NutritionAmount> {
        self.nutrition_facts.get(&item)
    }

    /// Stores `amount` unless the item already holds an amount of equal or higher precedence.
    /// Returns whether the amount was stored.
    pub fn record(&mut self, item: NutritionItem, amount: NutritionAmount) -> bool {
        match self.nutrition_facts.get(&item) {
            Some(existing) if !amount.compare_precedence(existing).is_gt() => false,
            _ => {
                self.nutrition_facts.insert(item, amount);
                true
            }
        }
    }

    pub fn score(&self) -> usize {
        usize::from(self.serving_size.is_some()) + self.nutrition_facts.len()
    }

    pub fn is_valid(&self) -> bool {
        self.score() >= MIN_VALID_SCORE
    }

    /// Facts in item order, each amount rendered the way this label's language prints it.
    pub fn formatted_facts(&self) -> Vec<(NutritionItem, String)> {
        self.nutrition_facts
            .iter()
            .map(|(item, amount)| (*item, item.format_amount(amount, self.language)))
            .collect()
    }
}
