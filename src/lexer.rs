use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    dictionary::{Dictionary, Keyword, KnownLabel, Language},
    error::Result,
    nutrition::{NutritionAmount, NutritionItem},
    util::sub_bounds,
    TextBox,
};

/// Precedence of an empty slot; every real token ranks above it.
pub const NO_PRECEDENCE: u8 = 0;

const SEPARATORS: [char; 6] = ['(', ')', ':', ';', '|', '*'];
const INCLUSION_MARKER: &str = "incl";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum TextDescription {
    NutritionFactLabel(NutritionItem),
    Amount(NutritionAmount),
    ServingSizeKeyword,
    KnownLabel(KnownLabel),
    Uncategorized(String),
}

impl TextDescription {
    pub fn precedence(&self) -> u8 {
        match self {
            Self::NutritionFactLabel(item) if item.is_energy() => 9,
            Self::NutritionFactLabel(_) | Self::ServingSizeKeyword | Self::KnownLabel(_) => 8,
            Self::Uncategorized(_) => 5,
            Self::Amount(amount) => amount.precedence(),
        }
    }

    pub fn amount(&self) -> Option<&NutritionAmount> {
        match self {
            Self::Amount(amount) => Some(amount),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedToken {
    pub description: TextDescription,
    /// The token's own text and its estimated bounds inside the fragment.
    pub text_box: TextBox,
    /// Index of the fragment the token was cut from.
    pub fragment: usize,
    /// Set on added-sugar labels preceded by "incl." in their fragment, whose amount is printed
    /// before the label.
    pub allows_leading_match: bool,
}

impl CategorizedToken {
    pub fn precedence(&self) -> u8 {
        self.description.precedence()
    }
}

#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    cursor: usize,
    length: usize,
}

pub struct Lexer<'a> {
    dictionary: &'static Dictionary,
    fragment: &'a TextBox,
    index: usize,
    original: Vec<char>,
    lowered: Vec<char>,
    cursor: usize,
    buffer: String,
    tokens: Vec<CategorizedToken>,
}

impl<'a> Lexer<'a> {
    pub fn new(fragment: &'a TextBox, index: usize, language: Language) -> Self {
        let original = fragment.text.chars().collect::<Vec<_>>();
        let lowered = original
            .iter()
            .map(|c| c.to_lowercase().next().unwrap_or(*c))
            .collect();
        Self {
            dictionary: language.dictionary(),
            fragment,
            index,
            original,
            lowered,
            cursor: 0,
            buffer: String::new(),
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<CategorizedToken>> {
        while self.skip_separators() {
            let start = self.cursor;
            if self.lex_label(start)? || self.lex_amount(start)? {
                continue;
            }
            self.lex_uncategorized(start);
        }
        log::trace!(
            "Fragment {:?} produced {} tokens",
            self.fragment.text,
            self.tokens.len()
        );
        Ok(self.tokens)
    }

    fn len(&self) -> usize {
        self.lowered.len()
    }

    fn skip_separators(&mut self) -> bool {
        while self.cursor < self.len() && is_separator(self.lowered[self.cursor]) {
            self.cursor += 1;
        }
        self.cursor < self.len()
    }

    /// A match ending before `cursor` must not run into a letter after a letter or a digit after a
    /// digit, so "vitamin b1" is no match inside "vitamin b12" but "vitamin b12" is one inside
    /// "vitamin b12mcg".
    fn at_word_boundary(&self, cursor: usize) -> bool {
        let (Some(last), Some(next)) = (
            cursor.checked_sub(1).and_then(|i| self.lowered.get(i)),
            self.lowered.get(cursor),
        ) else {
            return true;
        };
        !(last.is_alphabetic() && next.is_alphabetic()
            || last.is_ascii_digit() && next.is_ascii_digit())
    }

    /// Longest spelling starting at `start` accepted by `is_prefix`/`is_complete` that ends on a
    /// word boundary, as a checkpoint past its last character. The matched text is left in
    /// `buffer`.
    fn scan_longest(
        &mut self,
        start: usize,
        is_prefix: impl Fn(&Dictionary, &str) -> bool,
        is_complete: impl Fn(&Dictionary, &str) -> bool,
    ) -> Option<Checkpoint> {
        self.buffer.clear();
        let mut checkpoint = None;
        let mut cursor = start;
        while cursor < self.len() {
            self.buffer.push(self.lowered[cursor]);
            if !is_prefix(self.dictionary, &self.buffer) {
                break;
            }
            cursor += 1;
            if is_complete(self.dictionary, &self.buffer) && self.at_word_boundary(cursor) {
                checkpoint = Some(Checkpoint {
                    cursor,
                    length: self.buffer.len(),
                });
            }
        }
        let checkpoint = checkpoint?;
        self.buffer.truncate(checkpoint.length);
        Some(checkpoint)
    }

    fn lex_label(&mut self, start: usize) -> Result<bool> {
        let Some(checkpoint) =
            self.scan_longest(start, Dictionary::is_keyword_prefix, Dictionary::is_keyword)
        else {
            return Ok(false);
        };
        let keyword = self.dictionary.classify_keyword(&self.buffer)?;
        let description = match keyword {
            Keyword::Nutrition(item) => TextDescription::NutritionFactLabel(item),
            Keyword::Label(KnownLabel::ServingSize) => TextDescription::ServingSizeKeyword,
            Keyword::Label(kind) => TextDescription::KnownLabel(kind),
        };
        let allows_leading_match = keyword == Keyword::Nutrition(NutritionItem::AddedSugar)
            && self.has_inclusion_marker_before(start);
        self.emit(start, checkpoint.cursor, description, allows_leading_match);
        Ok(true)
    }

    fn has_inclusion_marker_before(&self, start: usize) -> bool {
        self.lowered[..start]
            .iter()
            .collect::<String>()
            .contains(INCLUSION_MARKER)
    }

    fn lex_amount(&mut self, start: usize) -> Result<bool> {
        let mut cursor = start;
        if self.lowered[cursor] == '<' && self.is_digit_at(cursor + 1) {
            cursor += 1;
        }
        let starts_number = self.is_digit_at(cursor)
            || (is_decimal_separator(self.lowered[cursor]) && self.is_digit_at(cursor + 1));
        if !starts_number {
            return Ok(false);
        }

        self.buffer.clear();
        let mut checkpoint = None;
        while cursor < self.len() && is_numeric(self.lowered[cursor]) {
            let c = self.lowered[cursor];
            self.buffer.push(if is_decimal_separator(c) { '.' } else { c });
            cursor += 1;
            if c.is_ascii_digit() && self.buffer.parse::<f64>().is_ok() {
                checkpoint = Some(Checkpoint {
                    cursor,
                    length: self.buffer.len(),
                });
            }
        }
        let Some(number) = checkpoint else {
            return Ok(false);
        };
        self.buffer.truncate(number.length);
        let Ok(value) = self.buffer.parse::<f64>() else {
            log::debug!("Numeric buffer {:?} did not parse", self.buffer);
            return Ok(false);
        };

        let mut unit_start = number.cursor;
        while unit_start < self.len() && self.lowered[unit_start].is_whitespace() {
            unit_start += 1;
        }
        let (end, amount) =
            match self.scan_longest(unit_start, Dictionary::is_unit_prefix, Dictionary::is_unit) {
                Some(unit_end) => {
                    let unit = self.dictionary.classify_unit(&self.buffer)?;
                    (unit_end.cursor, unit.normalize(value))
                }
                None => (number.cursor, NutritionAmount::Unitless(value)),
            };
        self.emit(start, end, TextDescription::Amount(amount), false);
        Ok(true)
    }

    fn lex_uncategorized(&mut self, start: usize) {
        let mut end = start + 1;
        while end < self.len() && !is_separator(self.lowered[end]) {
            end += 1;
        }
        let text = self.original[start..end].iter().collect();
        self.emit(start, end, TextDescription::Uncategorized(text), false);
    }

    fn is_digit_at(&self, cursor: usize) -> bool {
        self.lowered.get(cursor).is_some_and(char::is_ascii_digit)
    }

    fn emit(
        &mut self,
        start: usize,
        end: usize,
        description: TextDescription,
        allows_leading_match: bool,
    ) {
        let text = self.original[start..end].iter().collect::<String>();
        let bounds = sub_bounds(&self.fragment.bounds, start, end, self.len());
        self.tokens.push(CategorizedToken {
            description,
            text_box: TextBox::new(text, bounds),
            fragment: self.index,
            allows_leading_match,
        });
        self.cursor = end;
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || SEPARATORS.contains(&c)
}

fn is_decimal_separator(c: char) -> bool {
    c == '.' || c == ','
}

fn is_numeric(c: char) -> bool {
    c.is_ascii_digit() || is_decimal_separator(c)
}

/// Tokenizes one fragment.
pub fn tokenize(
    fragment: &TextBox,
    index: usize,
    language: Language,
) -> Result<Vec<CategorizedToken>> {
    Lexer::new(fragment, index, language).tokenize()
}

/// Tokenizes every fragment of a region, keeping reading order.
#[instrument(level = "debug", skip(fragments), fields(fragments = fragments.len()))]
pub fn tokenize_all(fragments: &[TextBox], language: Language) -> Result<Vec<CategorizedToken>> {
    let mut tokens = Vec::new();
    for (index, fragment) in fragments.iter().enumerate() {
        tokens.extend(tokenize(fragment, index, language)?);
    }
    log::debug!("{} fragments produced {} tokens", fragments.len(), tokens.len());
    Ok(tokens)
}
