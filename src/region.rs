use std::collections::HashSet;

use geo::Rect;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    dictionary::Language,
    error::{Error, Result},
    language::detect_language,
    util::{correct_perspective, crop_region, expand, union},
    RecognitionLevel, RectangleObservation, TextBox, TextRecognizer,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionOptions {
    /// Growth applied to the keyword bounds when no detected quad qualifies.
    pub fallback_expansion: f32,
    /// Detected quads past this count are ignored.
    pub max_candidates: usize,
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self {
            fallback_expansion: 0.1,
            max_candidates: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Region {
    /// A quadrilateral reported by the rectangle detector.
    Detected { quad: RectangleObservation },
    /// Bounds of the keyword fragments when no detected quad qualified.
    Fallback { rect: Rect<f32> },
}

impl Region {
    pub fn area(&self) -> f32 {
        match self {
            Self::Detected { quad } => quad.area(),
            Self::Fallback { rect } => rect.width() * rect.height(),
        }
    }

    /// Cuts the region out of `image`, upright.
    pub fn extract(&self, image: &DynamicImage) -> Option<DynamicImage> {
        match self {
            Self::Detected { quad } => correct_perspective(image, quad),
            Self::Fallback { rect } => Some(crop_region(image, rect)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionSelection {
    pub region: Region,
    pub language: Language,
    /// Distinct vocabulary entries found in the region.
    pub keyword_count: usize,
}

/// Number of distinct vocabulary spellings occurring anywhere in the fragments.
pub fn distinct_keyword_count(language: Language, fragments: &[TextBox]) -> usize {
    let texts = fragments
        .iter()
        .map(|fragment| fragment.text.to_lowercase())
        .collect::<Vec<_>>();
    language
        .dictionary()
        .vocabulary()
        .filter(|spelling| texts.iter().any(|text| text.contains(spelling)))
        .collect::<HashSet<_>>()
        .len()
}

fn contains_keyword(language: Language, fragment: &TextBox) -> bool {
    let text = fragment.text.to_lowercase();
    language
        .dictionary()
        .vocabulary()
        .any(|spelling| text.contains(spelling))
}

pub struct RegionSelector<'a, R> {
    recognizer: &'a R,
    options: RegionOptions,
}

impl<'a, R: TextRecognizer> RegionSelector<'a, R> {
    pub fn new(recognizer: &'a R, options: RegionOptions) -> Self {
        Self {
            recognizer,
            options,
        }
    }

    /// Best detected quad, falling back to the keyword bounds of the whole image.
    #[instrument(level = "debug", skip(self, image, candidates), fields(candidates = candidates.len()))]
    pub fn select(
        &self,
        image: &DynamicImage,
        candidates: &[RectangleObservation],
    ) -> Result<Option<RegionSelection>> {
        if let Some(selection) = self.select_detected(image, candidates)? {
            return Ok(Some(selection));
        }
        log::debug!("No detected rectangle contains keywords, trying fallback");
        self.select_fallback(image)
    }

    /// The quad with the most distinct keywords, the smaller one on ties. `None` when no quad
    /// contains a keyword.
    pub fn select_detected(
        &self,
        image: &DynamicImage,
        candidates: &[RectangleObservation],
    ) -> Result<Option<RegionSelection>> {
        let mut best: Option<RegionSelection> = None;
        for (index, quad) in candidates
            .iter()
            .take(self.options.max_candidates)
            .enumerate()
        {
            let Some(region_image) = correct_perspective(image, quad) else {
                log::debug!("Skipping degenerate candidate {index}");
                continue;
            };
            #[cfg(feature = "debug")]
            if let Err(error) = region_image.save(format!("regions/{index}.png")) {
                log::warn!("Could not save candidate {index}: {error}");
            }
            let fragments = self.recognize(&region_image)?;
            let language = detect_language(&fragments);
            let keyword_count = distinct_keyword_count(language, &fragments);
            let region = Region::Detected { quad: *quad };
            log::debug!(
                "Candidate {index}: {keyword_count} keywords, area {}",
                region.area()
            );
            if keyword_count == 0 {
                continue;
            }
            let better = best.as_ref().map_or(true, |best| {
                keyword_count > best.keyword_count
                    || (keyword_count == best.keyword_count && region.area() < best.region.area())
            });
            if better {
                best = Some(RegionSelection {
                    region,
                    language,
                    keyword_count,
                });
            }
        }
        Ok(best)
    }

    /// Union of all keyword fragments of the whole image, grown by
    /// [`RegionOptions::fallback_expansion`].
    pub fn select_fallback(&self, image: &DynamicImage) -> Result<Option<RegionSelection>> {
        let fragments = self.recognize(image)?;
        let language = detect_language(&fragments);
        let keyword_bounds = fragments
            .iter()
            .filter(|fragment| contains_keyword(language, fragment))
            .map(|fragment| fragment.bounds);
        let Some(bounds) = union(keyword_bounds) else {
            log::debug!("No keywords anywhere in the image");
            return Ok(None);
        };
        let rect = expand(bounds, self.options.fallback_expansion);
        Ok(Some(RegionSelection {
            region: Region::Fallback { rect },
            language,
            keyword_count: distinct_keyword_count(language, &fragments),
        }))
    }

    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextBox>> {
        self.recognizer
            .recognize_text(image, RecognitionLevel::Fast)
            .map_err(Error::recognition)
    }
}
