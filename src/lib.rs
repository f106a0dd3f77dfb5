use image::DynamicImage;
use tracing::instrument;

pub mod dictionary;
mod error;
pub mod language;
pub mod lexer;
pub mod lookup;
mod nutrition;
pub mod parser;
pub mod region;
mod result;
pub mod skew;
pub mod util;

pub use dictionary::{KnownLabel, Language};
pub use error::{Error, Result};
pub use lexer::{CategorizedToken, TextDescription};
pub use nutrition::*;
pub use parser::ParserOptions;
pub use region::{Region, RegionOptions, RegionSelection};
pub use result::*;
pub use skew::SkewOptions;

use language::detect_language;
use lexer::tokenize_all;
use parser::LabelParser;
use region::RegionSelector;
use skew::estimate_skew;
use util::rotate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecognitionLevel {
    /// Cheap pass used to score candidate regions.
    Fast,
    #[default]
    Accurate,
}

/// The OCR engine the scanner reads text through.
pub trait TextRecognizer {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Text fragments with bounds normalised to `image`.
    fn recognize_text(
        &self,
        image: &DynamicImage,
        level: RecognitionLevel,
    ) -> std::result::Result<Vec<TextBox>, Self::Error>;

    /// Glyph boxes normalised to `image`. Engines without glyph output return nothing, which
    /// disables skew correction.
    fn recognize_characters(
        &self,
        _image: &DynamicImage,
    ) -> std::result::Result<Vec<CharacterBox>, Self::Error> {
        Ok(Vec::new())
    }
}

/// Turns the fragments of one region into a label, or `None` when too little of a label was
/// found.
#[instrument(level = "debug", skip(fragments), fields(fragments = fragments.len()))]
pub fn parse_label(
    fragments: &[TextBox],
    options: &ParserOptions,
) -> Result<Option<NutritionLabel>> {
    let language = detect_language(fragments);
    let tokens = tokenize_all(fragments, language)?;
    let label = LabelParser::new(&tokens, language, *options).parse();
    if label.score() >= options.min_valid_score {
        Ok(Some(label))
    } else {
        log::debug!(
            "Rejecting label with score {} below {}",
            label.score(),
            options.min_valid_score
        );
        Ok(None)
    }
}

pub struct NutritionScannerBuilder {
    parser_options: ParserOptions,
    skew_options: SkewOptions,
    region_options: RegionOptions,
    deskew: bool,
}

impl NutritionScannerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parser_options(mut self, options: ParserOptions) -> Self {
        self.parser_options = options;
        self
    }

    pub fn skew_options(mut self, options: SkewOptions) -> Self {
        self.skew_options = options;
        self
    }

    pub fn region_options(mut self, options: RegionOptions) -> Self {
        self.region_options = options;
        self
    }

    pub fn deskew(mut self, deskew: bool) -> Self {
        self.deskew = deskew;
        self
    }

    pub fn min_valid_score(mut self, score: usize) -> Self {
        self.parser_options.min_valid_score = score;
        self
    }

    pub fn build<R: TextRecognizer>(self, recognizer: R) -> NutritionScanner<R> {
        NutritionScanner {
            recognizer,
            parser_options: self.parser_options,
            skew_options: self.skew_options,
            region_options: self.region_options,
            deskew: self.deskew,
        }
    }
}

impl Default for NutritionScannerBuilder {
    fn default() -> Self {
        Self {
            parser_options: ParserOptions::default(),
            skew_options: SkewOptions::default(),
            region_options: RegionOptions::default(),
            deskew: true,
        }
    }
}

pub struct NutritionScanner<R> {
    recognizer: R,
    parser_options: ParserOptions,
    skew_options: SkewOptions,
    region_options: RegionOptions,
    deskew: bool,
}

impl<R: TextRecognizer> NutritionScanner<R> {
    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Reads a label from one photo. `candidates` are the rectangles detected in it, most
    /// confident first.
    #[instrument(skip(self, image, candidates))]
    pub fn scan(
        &self,
        image: &DynamicImage,
        candidates: &[RectangleObservation],
    ) -> Result<Option<NutritionLabel>> {
        let selector = RegionSelector::new(&self.recognizer, self.region_options);
        let Some(selection) = selector.select(image, candidates)? else {
            return Ok(None);
        };
        let Some(mut region_image) = selection.region.extract(image) else {
            return Ok(None);
        };

        if self.deskew {
            let characters = self
                .recognizer
                .recognize_characters(&region_image)
                .map_err(Error::recognition)?;
            let angle = estimate_skew(&characters, &self.skew_options);
            if angle != 0.0 {
                log::debug!("Rotating region by {} degrees", -angle);
                region_image = rotate(&region_image, -angle);
            }
        }

        let fragments = self
            .recognizer
            .recognize_text(&region_image, RecognitionLevel::Accurate)
            .map_err(Error::recognition)?;
        parse_label(&fragments, &self.parser_options)
    }
}
