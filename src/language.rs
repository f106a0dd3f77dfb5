use tracing::instrument;

use crate::{dictionary::Language, TextBox};

/// Number of vocabulary spellings of `language` found inside the fragments.
pub fn language_score(language: Language, fragments: &[TextBox]) -> usize {
    let dictionary = language.dictionary();
    fragments
        .iter()
        .map(|fragment| {
            let text = fragment.text.to_lowercase();
            dictionary
                .vocabulary()
                .filter(|spelling| text.contains(spelling))
                .count()
        })
        .sum()
}

/// Picks the language whose vocabulary occurs most often in the fragments. Ties go to the
/// language listed first in [`Language::ALL`]; no hits at all fall back to
/// [`Language::FALLBACK`].
#[instrument(level = "debug", skip(fragments), fields(fragments = fragments.len()))]
pub fn detect_language(fragments: &[TextBox]) -> Language {
    let mut best = (Language::FALLBACK, 0);
    for language in Language::ALL {
        let score = language_score(language, fragments);
        log::trace!("{language:?} scored {score}");
        if score > best.1 {
            best = (language, score);
        }
    }
    log::debug!("Detected {:?} with score {}", best.0, best.1);
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragments(texts: &[&str]) -> Vec<TextBox> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| TextBox::from_xywh(*text, 0.1, 0.1 * i as f32, 0.5, 0.05))
            .collect()
    }

    #[test]
    fn empty_input_falls_back() {
        assert_eq!(detect_language(&[]), Language::FALLBACK);
        assert_eq!(detect_language(&fragments(&["12345", "xyz"])), Language::FALLBACK);
    }

    #[test]
    fn tie_goes_to_first_scanned_language() {
        let fragments = fragments(&["Protein", "Kalorien"]);
        assert_eq!(language_score(Language::English, &fragments), 1);
        assert_eq!(language_score(Language::German, &fragments), 1);
        assert_eq!(detect_language(&fragments), Language::English);
    }

    #[test]
    fn higher_score_wins() {
        let german = fragments(&["Protein 3g", "Kalorien", "Kohlenhydrate 12g", "Ballaststoffe"]);
        assert_eq!(detect_language(&german), Language::German);
        let french = fragments(&["Glucides", "Protéines", "Matières grasses"]);
        assert_eq!(detect_language(&french), Language::French);
    }
}
