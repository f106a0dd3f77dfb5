use float_ord::FloatOrd;
use geo::Coord;
use nalgebra::{Matrix2, Vector2};
use tracing::instrument;

use crate::CharacterBox;

const HISTOGRAM_RANGE: i32 = 90;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkewOptions {
    /// Squared distance limit between consecutive glyph centres of a line.
    pub max_link_distance_squared: f32,
    /// Largest turn allowed between consecutive links of a line.
    pub angle_tolerance_degrees: f32,
    /// Lines shorter than this are too noisy to vote.
    pub min_line_length: f32,
    /// Half width, in degrees, of the histogram smoothing window.
    pub histogram_window: i32,
    /// Average votes per bucket the winning window needs.
    pub min_confidence: f32,
    /// Angles at or below this are not worth correcting.
    pub min_rotation_degrees: f32,
}

impl Default for SkewOptions {
    fn default() -> Self {
        Self {
            max_link_distance_squared: 0.0025,
            angle_tolerance_degrees: 15.0,
            min_line_length: 0.02,
            histogram_window: 2,
            min_confidence: 1.0,
            min_rotation_degrees: 1.0,
        }
    }
}

/// Angle of the text lines in degrees, clockwise positive in image coordinates. Zero when there is
/// no confident, significant skew. Rotating the image by the negated angle levels the text.
#[instrument(level = "debug", skip(characters, options), fields(characters = characters.len()))]
pub fn estimate_skew(characters: &[CharacterBox], options: &SkewOptions) -> f32 {
    let centers = characters
        .iter()
        .map(|character| character.bounds.center())
        .collect::<Vec<_>>();
    let angles = chain_lines(&centers, options)
        .iter()
        .filter_map(|line| line_angle(line, options))
        .collect::<Vec<_>>();
    log::debug!("{} lines voted for skew", angles.len());
    dominant_angle(&angles, options)
}

fn direction_degrees(delta: Coord<f32>) -> f32 {
    delta.y.atan2(delta.x).to_degrees()
}

pub(crate) fn chain_lines(centers: &[Coord<f32>], options: &SkewOptions) -> Vec<Vec<Coord<f32>>> {
    let mut order = (0..centers.len()).collect::<Vec<_>>();
    order.sort_by_key(|&i| FloatOrd(centers[i].x));
    let mut used = vec![false; centers.len()];
    let mut lines = Vec::new();

    for start in order {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut line = vec![centers[start]];
        loop {
            let last = line[line.len() - 1];
            let previous =
                (line.len() >= 2).then(|| direction_degrees(last - line[line.len() - 2]));
            let next = (0..centers.len())
                .filter(|&i| !used[i])
                .map(|i| (i, centers[i] - last))
                .filter(|(_, delta)| {
                    delta.x > 0.0
                        && delta.x * delta.x + delta.y * delta.y
                            < options.max_link_distance_squared
                })
                .filter(|(_, delta)| {
                    previous.map_or(true, |previous| {
                        (direction_degrees(*delta) - previous).abs()
                            < options.angle_tolerance_degrees
                    })
                })
                .min_by_key(|(_, delta)| FloatOrd(delta.x * delta.x + delta.y * delta.y));
            match next {
                Some((i, _)) => {
                    used[i] = true;
                    line.push(centers[i]);
                }
                None => break,
            }
        }
        if line.len() >= 2 {
            lines.push(line);
        }
    }
    lines
}

/// Direction of a chained line in degrees, or `None` when the line is too short to trust.
pub(crate) fn line_angle(line: &[Coord<f32>], options: &SkewOptions) -> Option<f32> {
    let first = *line.first()?;
    let last = *line.last()?;
    let direction = if line.len() == 2 {
        last - first
    } else {
        fit_direction(line).unwrap_or(last - first)
    };
    let length = direction.x.hypot(direction.y);
    if length < options.min_line_length {
        log::trace!("Dropping line of length {length}");
        return None;
    }
    Some(direction_degrees(direction))
}

/// Least-squares fit of `y = slope * x + intercept`, returned as the vector between the fitted
/// line's endpoints.
fn fit_direction(line: &[Coord<f32>]) -> Option<Coord<f32>> {
    let n = line.len() as f32;
    let (sum_x, sum_y, sum_xx, sum_xy) = line.iter().fold((0.0, 0.0, 0.0, 0.0), |acc, c| {
        (acc.0 + c.x, acc.1 + c.y, acc.2 + c.x * c.x, acc.3 + c.x * c.y)
    });
    let normal = Matrix2::new(sum_xx, sum_x, sum_x, n);
    let solution = normal.try_inverse()? * Vector2::new(sum_xy, sum_y);
    let slope = solution[0];
    let span = line[line.len() - 1].x - line[0].x;
    Some(Coord {
        x: span,
        y: slope * span,
    })
}

fn dominant_angle(angles: &[f32], options: &SkewOptions) -> f32 {
    let bucket_count = (2 * HISTOGRAM_RANGE + 1) as usize;
    let mut histogram = vec![0u32; bucket_count];
    for angle in angles {
        let bucket = (angle.round() as i32).clamp(-HISTOGRAM_RANGE, HISTOGRAM_RANGE);
        histogram[(bucket + HISTOGRAM_RANGE) as usize] += 1;
    }

    let window = options.histogram_window.max(0);
    let window_size = (2 * window + 1) as f32;
    // Neighbouring windows share votes; the bucket's own count settles equal averages.
    let mut best = (0, 0.0, 0);
    for angle in -HISTOGRAM_RANGE..=HISTOGRAM_RANGE {
        let votes = (angle - window..=angle + window)
            .filter(|a| a.abs() <= HISTOGRAM_RANGE)
            .map(|a| histogram[(a + HISTOGRAM_RANGE) as usize])
            .sum::<u32>();
        let average = votes as f32 / window_size;
        let own = histogram[(angle + HISTOGRAM_RANGE) as usize];
        if average > best.1 || (average == best.1 && own > best.2) {
            best = (angle, average, own);
        }
    }

    let (angle, confidence, _) = best;
    log::debug!("Best skew window at {angle} degrees with confidence {confidence}");
    if confidence > options.min_confidence && angle.abs() as f32 > options.min_rotation_degrees {
        angle as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPACING: f32 = 0.02;

    fn text_lines(count: usize, glyphs: usize, degrees: f32) -> Vec<CharacterBox> {
        let slope = degrees.to_radians().tan();
        (0..count)
            .flat_map(|line| {
                (0..glyphs).map(move |glyph| {
                    let x = 0.1 + glyph as f32 * SPACING;
                    let y = 0.1 + line as f32 * 0.06 + glyph as f32 * SPACING * slope;
                    CharacterBox::from_xywh(x, y, 0.015, 0.02)
                })
            })
            .collect()
    }

    #[test]
    fn level_text_needs_no_rotation() {
        let characters = text_lines(10, 10, 0.0);
        assert_eq!(estimate_skew(&characters, &SkewOptions::default()), 0.0);
    }

    #[test]
    fn detects_consistent_skew() {
        let characters = text_lines(10, 10, 5.0);
        assert_eq!(estimate_skew(&characters, &SkewOptions::default()), 5.0);
        let characters = text_lines(10, 10, -4.0);
        assert_eq!(estimate_skew(&characters, &SkewOptions::default()), -4.0);
    }

    #[test]
    fn few_lines_are_not_confident() {
        let characters = text_lines(2, 10, 5.0);
        assert_eq!(estimate_skew(&characters, &SkewOptions::default()), 0.0);
        assert_eq!(estimate_skew(&[], &SkewOptions::default()), 0.0);
    }

    #[test]
    fn chains_stop_at_sharp_turns() {
        let centers = [
            Coord { x: 0.0, y: 0.5 },
            Coord { x: 0.02, y: 0.5 },
            Coord { x: 0.04, y: 0.5 },
            Coord { x: 0.06, y: 0.53 },
        ];
        let lines = chain_lines(&centers, &SkewOptions::default());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 3);
    }

    #[test]
    fn short_lines_are_dropped() {
        let options = SkewOptions::default();
        let short = [Coord { x: 0.0, y: 0.0 }, Coord { x: 0.01, y: 0.0 }];
        assert_eq!(line_angle(&short, &options), None);
        let pair = [Coord { x: 0.0, y: 0.0 }, Coord { x: 0.1, y: 0.1 }];
        let angle = line_angle(&pair, &options).unwrap();
        assert!((angle - 45.0).abs() < 1e-4);
    }

    #[test]
    fn longer_lines_use_the_fitted_slope() {
        let options = SkewOptions::default();
        let noisy = [
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.1, y: 0.02 },
            Coord { x: 0.2, y: 0.0 },
        ];
        let angle = line_angle(&noisy, &options).unwrap();
        assert!(angle.abs() < 1e-3, "{angle}");
    }
}
