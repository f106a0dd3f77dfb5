use std::{cell::RefCell, collections::HashMap};

use geo::{coord, Rect};
use image::{DynamicImage, GenericImageView, Rgba};
use nutrilabel::{
    parse_label, region::RegionSelector, CharacterBox, Language, NutritionAmount, NutritionItem,
    NutritionScannerBuilder, ParserOptions, RecognitionLevel, RectangleObservation, Region,
    RegionOptions, ServingSize, TextBox, TextRecognizer,
};

#[derive(Debug, thiserror::Error)]
#[error("recogniser offline")]
struct Offline;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Call {
    Text(u32, u32, RecognitionLevel),
    Characters(u32, u32),
}

/// Answers fast passes by image size and every accurate pass with the same label text.
#[derive(Default)]
struct ScriptedRecognizer {
    fast: HashMap<(u32, u32), Vec<TextBox>>,
    accurate: Vec<TextBox>,
    characters: Vec<CharacterBox>,
    offline: bool,
    calls: RefCell<Vec<Call>>,
    /// Top-left pixel of every image read at the accurate level.
    accurate_corners: RefCell<Vec<Rgba<u8>>>,
}

impl ScriptedRecognizer {
    fn fast(mut self, size: (u32, u32), texts: &[&str]) -> Self {
        let fragments = texts
            .iter()
            .enumerate()
            .map(|(row, text)| TextBox::from_xywh(*text, 0.1, 0.1 + row as f32 * 0.1, 0.6, 0.05))
            .collect();
        self.fast.insert(size, fragments);
        self
    }

    fn accurate_calls(&self) -> Vec<(u32, u32)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Text(width, height, RecognitionLevel::Accurate) => Some((*width, *height)),
                _ => None,
            })
            .collect()
    }
}

impl TextRecognizer for ScriptedRecognizer {
    type Error = Offline;

    fn recognize_text(
        &self,
        image: &DynamicImage,
        level: RecognitionLevel,
    ) -> Result<Vec<TextBox>, Offline> {
        self.calls
            .borrow_mut()
            .push(Call::Text(image.width(), image.height(), level));
        if self.offline {
            return Err(Offline);
        }
        Ok(match level {
            RecognitionLevel::Fast => self
                .fast
                .get(&(image.width(), image.height()))
                .cloned()
                .unwrap_or_default(),
            RecognitionLevel::Accurate => {
                self.accurate_corners
                    .borrow_mut()
                    .push(image.get_pixel(0, 0));
                self.accurate.clone()
            }
        })
    }

    fn recognize_characters(&self, image: &DynamicImage) -> Result<Vec<CharacterBox>, Offline> {
        self.calls
            .borrow_mut()
            .push(Call::Characters(image.width(), image.height()));
        Ok(self.characters.clone())
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn frame() -> DynamicImage {
    DynamicImage::new_rgb8(200, 100)
}

fn quad(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> RectangleObservation {
    RectangleObservation::from_rect(Rect::new(
        coord! { x: min_x, y: min_y },
        coord! { x: max_x, y: max_y },
    ))
}

/// Glyph rows tilted by `degrees`, ten lines of ten characters.
fn tilted_glyphs(degrees: f32) -> Vec<CharacterBox> {
    let slope = degrees.to_radians().tan();
    (0..10)
        .flat_map(|line| {
            (0..10).map(move |glyph| {
                let x = 0.1 + glyph as f32 * 0.02;
                let y = 0.1 + line as f32 * 0.06 + glyph as f32 * 0.02 * slope;
                CharacterBox::from_xywh(x, y, 0.015, 0.02)
            })
        })
        .collect()
}

fn label_text() -> Vec<TextBox> {
    [
        "Serving size 30g",
        "Calories 250",
        "Total Fat 12g 15%",
        "Sodium 470mg 20%",
        "Total Carbohydrate 31g",
        "Protein 5g",
    ]
    .iter()
    .enumerate()
    .map(|(row, text)| TextBox::from_xywh(*text, 0.05, 0.05 + row as f32 * 0.1, 0.8, 0.05))
    .collect()
}

fn scripted() -> ScriptedRecognizer {
    ScriptedRecognizer {
        accurate: label_text(),
        ..Default::default()
    }
}

#[test]
fn parses_a_complete_label() {
    init_logging();

    let label = parse_label(&label_text(), &ParserOptions::default())
        .unwrap()
        .expect("label should be accepted");
    assert_eq!(label.language, Language::English);
    assert_eq!(
        label.serving_size,
        Some(ServingSize::Amount {
            amount: NutritionAmount::Solid(30_000.0)
        })
    );
    assert_eq!(
        label.get(NutritionItem::Calories),
        Some(&NutritionAmount::Energy(250.0))
    );
    assert_eq!(
        label.get(NutritionItem::Fat),
        Some(&NutritionAmount::Solid(12_000.0))
    );
    assert_eq!(
        label.get(NutritionItem::Sodium),
        Some(&NutritionAmount::Solid(470.0))
    );
    assert_eq!(
        label.get(NutritionItem::Protein),
        Some(&NutritionAmount::Solid(5_000.0))
    );
    assert!(label.is_valid());
}

#[test]
fn sparse_text_is_rejected() {
    init_logging();

    let fragments = &label_text()[..2];
    assert!(parse_label(fragments, &ParserOptions::default())
        .unwrap()
        .is_none());

    let lenient = ParserOptions {
        min_valid_score: 2,
        ..ParserOptions::default()
    };
    assert!(parse_label(fragments, &lenient).unwrap().is_some());
}

#[test]
fn scan_reads_the_candidate_with_most_keywords() {
    init_logging();

    let recognizer = scripted().fast((100, 50), &["Total Fat"]).fast(
        (160, 80),
        &[
            "Nutrition Facts",
            "Calories 250",
            "Total Fat 12g",
            "Sodium 470mg",
            "Protein 5g",
        ],
    );
    let scanner = NutritionScannerBuilder::new().build(recognizer);
    let candidates = [quad(0.0, 0.0, 0.5, 0.5), quad(0.1, 0.1, 0.9, 0.9)];

    let label = scanner.scan(&frame(), &candidates).unwrap();
    assert!(label.is_some_and(|label| label.is_valid()));
    assert_eq!(scanner.recognizer().accurate_calls(), vec![(160, 80)]);
}

#[test]
fn keyword_ties_prefer_the_smaller_candidate() {
    init_logging();

    let texts = ["Calories 250", "Protein 5g"];
    let recognizer = scripted().fast((200, 100), &texts).fast((100, 50), &texts);
    let scanner = NutritionScannerBuilder::new().build(recognizer);
    let candidates = [quad(0.0, 0.0, 1.0, 1.0), quad(0.0, 0.0, 0.5, 0.5)];

    scanner.scan(&frame(), &candidates).unwrap();
    assert_eq!(scanner.recognizer().accurate_calls(), vec![(100, 50)]);
}

#[test]
fn falls_back_to_keyword_bounds() {
    init_logging();

    let mut recognizer = scripted().fast((100, 50), &["Best before 2030"]);
    recognizer.fast.insert(
        (200, 100),
        vec![
            TextBox::from_xywh("Calories 250", 0.2, 0.2, 0.4, 0.1),
            TextBox::from_xywh("Lot 4711", 0.7, 0.8, 0.2, 0.1),
            TextBox::from_xywh("Protein 5g", 0.2, 0.4, 0.4, 0.1),
        ],
    );
    let selector = RegionSelector::new(&recognizer, RegionOptions::default());
    let selection = selector
        .select(&frame(), &[quad(0.0, 0.0, 0.5, 0.5)])
        .unwrap()
        .expect("keywords should yield a fallback region");

    let Region::Fallback { rect } = selection.region else {
        panic!("expected a fallback region, got {:?}", selection.region);
    };
    assert!((rect.min().x - 0.18).abs() < 1e-4);
    assert!((rect.min().y - 0.185).abs() < 1e-4);
    assert!((rect.width() - 0.44).abs() < 1e-4);
    assert!((rect.height() - 0.33).abs() < 1e-4);
    assert_eq!(selection.language, Language::English);
    assert!(selection.keyword_count >= 2);
}

#[test]
fn no_keywords_anywhere_finds_no_label() {
    init_logging();

    let recognizer = scripted()
        .fast((100, 50), &["Best before 2030"])
        .fast((200, 100), &["Lot 4711"]);
    let scanner = NutritionScannerBuilder::new().build(recognizer);

    let label = scanner.scan(&frame(), &[quad(0.0, 0.0, 0.5, 0.5)]).unwrap();
    assert!(label.is_none());
    assert!(scanner.recognizer().accurate_calls().is_empty());
}

#[test]
fn degenerate_candidates_are_skipped() {
    init_logging();

    let recognizer = scripted().fast((200, 100), &["Calories 250", "Protein 5g"]);
    let scanner = NutritionScannerBuilder::new().build(recognizer);

    let label = scanner.scan(&frame(), &[quad(0.5, 0.0, 0.5, 1.0)]).unwrap();
    assert!(label.is_some());
    let calls = scanner.recognizer().calls.borrow().clone();
    assert_eq!(calls[0], Call::Text(200, 100, RecognitionLevel::Fast));
}

#[test]
fn deskew_reads_glyphs_of_the_region_only_when_enabled() {
    init_logging();

    let texts = ["Calories 250", "Protein 5g"];
    let candidates = [quad(0.0, 0.0, 0.5, 0.5)];

    let scanner = NutritionScannerBuilder::new().build(scripted().fast((100, 50), &texts));
    scanner.scan(&frame(), &candidates).unwrap();
    assert!(scanner
        .recognizer()
        .calls
        .borrow()
        .contains(&Call::Characters(100, 50)));

    let scanner = NutritionScannerBuilder::new()
        .deskew(false)
        .build(scripted().fast((100, 50), &texts));
    scanner.scan(&frame(), &candidates).unwrap();
    assert!(!scanner
        .recognizer()
        .calls
        .borrow()
        .iter()
        .any(|call| matches!(call, Call::Characters(..))));
}

#[test]
fn tilted_glyphs_rotate_the_region_before_reading() {
    init_logging();

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    let texts = ["Calories 250", "Protein 5g"];
    let candidates = [quad(0.0, 0.0, 0.5, 0.5)];

    let tilted = ScriptedRecognizer {
        characters: tilted_glyphs(5.0),
        ..scripted().fast((100, 50), &texts)
    };
    let scanner = NutritionScannerBuilder::new().build(tilted);
    let label = scanner.scan(&frame(), &candidates).unwrap();
    assert!(label.is_some());
    // Rotation pulls the corner in from outside the region, where the fill is white.
    assert_eq!(*scanner.recognizer().accurate_corners.borrow(), vec![WHITE]);

    let level = ScriptedRecognizer {
        characters: tilted_glyphs(0.0),
        ..scripted().fast((100, 50), &texts)
    };
    let scanner = NutritionScannerBuilder::new().build(level);
    scanner.scan(&frame(), &candidates).unwrap();
    let corners = scanner.recognizer().accurate_corners.borrow().clone();
    assert_eq!(corners.len(), 1);
    assert_ne!(corners[0], WHITE);
}

#[test]
fn recognition_failures_propagate() {
    init_logging();

    let recognizer = ScriptedRecognizer {
        offline: true,
        ..Default::default()
    };
    let scanner = NutritionScannerBuilder::new().build(recognizer);

    let error = scanner
        .scan(&frame(), &[quad(0.0, 0.0, 0.5, 0.5)])
        .unwrap_err();
    assert!(!error.is_internal());
    assert!(error.to_string().contains("recogniser offline"));
}
