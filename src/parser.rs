use float_ord::FloatOrd;
use geo::Coord;
use tracing::instrument;

use crate::{
    dictionary::Language,
    lexer::{CategorizedToken, TextDescription, NO_PRECEDENCE},
    nutrition::{NutritionAmount, NutritionItem},
    result::MIN_VALID_SCORE,
    util::distance,
    NutritionLabel, ServingSize,
};

const INCLUSION_MARKER: &str = "incl";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParserOptions {
    /// Largest vertical centre offset, as a fraction of the label's height, for a value to count
    /// as being on the label's row.
    pub row_tolerance: f32,
    /// Search radius of the calories fallback, in normalised frame units.
    pub calories_fallback_max_distance: f32,
    pub min_valid_score: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            row_tolerance: 0.5,
            calories_fallback_max_distance: 0.5,
            min_valid_score: MIN_VALID_SCORE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Trailing,
    Leading,
}

pub struct LabelParser<'a> {
    tokens: &'a [CategorizedToken],
    options: ParserOptions,
    /// Label tokens first, highest precedence first.
    label_order: Vec<usize>,
    /// Candidates are visited from lowest to highest precedence, so a higher-precedence value
    /// always displaces a nearer, lower-precedence one.
    candidate_order: Vec<usize>,
    consumed: Vec<bool>,
    label: NutritionLabel,
}

impl<'a> LabelParser<'a> {
    pub fn new(tokens: &'a [CategorizedToken], language: Language, options: ParserOptions) -> Self {
        let mut label_order = (0..tokens.len()).collect::<Vec<_>>();
        label_order.sort_by_key(|&i| std::cmp::Reverse(tokens[i].precedence()));
        let mut candidate_order = (0..tokens.len()).collect::<Vec<_>>();
        candidate_order.sort_by_key(|&i| tokens[i].precedence());
        Self {
            tokens,
            options,
            label_order,
            candidate_order,
            consumed: vec![false; tokens.len()],
            label: NutritionLabel::new(language),
        }
    }

    #[instrument(level = "debug", skip(self), fields(tokens = self.tokens.len()))]
    pub fn parse(mut self) -> NutritionLabel {
        let tokens = self.tokens;
        for position in 0..self.label_order.len() {
            let index = self.label_order[position];
            match &tokens[index].description {
                TextDescription::NutritionFactLabel(item) => self.match_item(index, *item),
                TextDescription::ServingSizeKeyword if self.label.serving_size.is_none() => {
                    self.match_serving_size(index)
                }
                _ => {}
            }
        }
        log::debug!(
            "Parsed {} nutrition facts, serving size {:?}",
            self.label.nutrition_facts.len(),
            self.label.serving_size
        );
        self.label
    }

    fn match_item(&mut self, index: usize, item: NutritionItem) {
        let value = self
            .find_value_for(index, item == NutritionItem::AddedSugar)
            .or_else(|| {
                (item == NutritionItem::Calories)
                    .then(|| self.find_calories_fallback(index))
                    .flatten()
            });
        let Some(value) = value else {
            log::trace!("No value found for {item:?}");
            return;
        };
        let Some(amount) = self.tokens[value].description.amount().copied() else {
            return;
        };
        let amount = if item.is_energy() {
            amount.as_energy()
        } else {
            amount
        };
        self.consumed[value] = true;
        if self.label.record(item, amount) {
            log::debug!("Matched {item:?} to {amount}");
        } else {
            log::trace!("Kept earlier amount for {item:?} over {amount}");
        }
    }

    fn match_serving_size(&mut self, index: usize) {
        let Some(value) = self.find_value_for(index, false) else {
            return;
        };
        let Some(amount) = self.tokens[value].description.amount().copied() else {
            return;
        };
        self.consumed[value] = true;
        let serving_size = match amount {
            NutritionAmount::DailyValue(percent) => ServingSize::ContainerFraction { percent },
            NutritionAmount::Unitless(value_amount) => ServingSize::AbsoluteValue {
                value: value_amount,
                unit: self.unit_text_after(value),
            },
            amount => ServingSize::Amount { amount },
        };
        log::debug!("Matched serving size {serving_size:?}");
        self.label.serving_size = Some(serving_size);
    }

    /// Same-row search. Added sugar may look left first when its row reads "incl. 13g added
    /// sugar".
    fn find_value_for(&self, index: usize, may_lead: bool) -> Option<usize> {
        if may_lead && self.leading_enabled(index) {
            if let Some(value) = self.find_on_row(index, Direction::Leading) {
                return Some(value);
            }
        }
        self.find_on_row(index, Direction::Trailing)
    }

    fn leading_enabled(&self, index: usize) -> bool {
        let source = &self.tokens[index];
        source.allows_leading_match
            || self.tokens.iter().enumerate().any(|(i, token)| {
                i != index
                    && matches!(&token.description, TextDescription::Uncategorized(text)
                        if text.to_lowercase().contains(INCLUSION_MARKER))
                    && self.on_same_row(source, token)
                    && center(token).x < center(source).x
            })
    }

    fn on_same_row(&self, source: &CategorizedToken, candidate: &CategorizedToken) -> bool {
        candidate.fragment == source.fragment
            || (center(candidate).y - center(source).y).abs()
                <= source.text_box.bounds.height() * self.options.row_tolerance
    }

    fn find_on_row(&self, index: usize, direction: Direction) -> Option<usize> {
        let source = &self.tokens[index];
        let origin = center(source);
        let mut closest = None;
        let mut closest_distance = f32::MAX;
        let mut closest_precedence = NO_PRECEDENCE;
        for &i in &self.candidate_order {
            let candidate = &self.tokens[i];
            if i == index || self.consumed[i] || candidate.description.amount().is_none() {
                continue;
            }
            let position = center(candidate);
            let on_side = match direction {
                Direction::Trailing => position.x > origin.x,
                Direction::Leading => position.x < origin.x,
            };
            if !on_side || !self.on_same_row(source, candidate) {
                continue;
            }
            let candidate_distance = distance(origin, position);
            let precedence = candidate.precedence();
            if candidate_distance < closest_distance || closest_precedence < precedence {
                closest = Some(i);
                closest_distance = candidate_distance;
                closest_precedence = precedence;
            }
        }
        closest
    }

    /// Calorie counts are often printed large and off-row; take the nearest bare number or energy
    /// anywhere within reach.
    fn find_calories_fallback(&self, index: usize) -> Option<usize> {
        let origin = center(&self.tokens[index]);
        self.tokens
            .iter()
            .enumerate()
            .filter(|(i, token)| {
                !self.consumed[*i]
                    && matches!(
                        token.description,
                        TextDescription::Amount(NutritionAmount::Unitless(_))
                            | TextDescription::Amount(NutritionAmount::Energy(_))
                    )
            })
            .map(|(i, token)| (i, distance(origin, center(token))))
            .filter(|(_, d)| *d <= self.options.calories_fallback_max_distance)
            .min_by_key(|(_, d)| FloatOrd(*d))
            .map(|(i, d)| {
                log::debug!("Calories fallback matched token {i} at distance {d}");
                i
            })
    }

    /// Text of the word printed right after a bare serving-size number, e.g. "cup".
    fn unit_text_after(&self, value: usize) -> Option<String> {
        let source = &self.tokens[value];
        let bounds = source.text_box.bounds;
        self.tokens
            .iter()
            .filter(|token| matches!(token.description, TextDescription::Uncategorized(_)))
            .filter(|token| self.on_same_row(source, token))
            .filter(|token| {
                let gap = token.text_box.bounds.min().x - bounds.max().x;
                gap >= -f32::EPSILON && gap <= bounds.height()
            })
            .min_by_key(|token| FloatOrd(token.text_box.bounds.min().x))
            .map(|token| token.text_box.text.clone())
    }
}

fn center(token: &CategorizedToken) -> Coord<f32> {
    token.text_box.bounds.center()
}
