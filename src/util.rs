use geo::{coord, Coord, EuclideanDistance, Point, Rect, Scale};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{
    rotate_about_center, warp_into, Interpolation, Projection,
};
use tracing::instrument;

use crate::RectangleObservation;

pub(crate) fn distance(a: Coord<f32>, b: Coord<f32>) -> f32 {
    Point::from(a).euclidean_distance(&Point::from(b))
}

/// Bounds of the characters `start..end` of a fragment `len` characters long, assuming the glyphs
/// are spread evenly over the fragment's width.
pub(crate) fn sub_bounds(bounds: &Rect<f32>, start: usize, end: usize, len: usize) -> Rect<f32> {
    if len == 0 {
        return *bounds;
    }
    let min = bounds.min();
    let max = bounds.max();
    let step = bounds.width() / len as f32;
    Rect::new(
        coord! { x: min.x + step * start as f32, y: min.y },
        coord! { x: min.x + step * end as f32, y: max.y },
    )
}

pub(crate) fn union(rects: impl IntoIterator<Item = Rect<f32>>) -> Option<Rect<f32>> {
    rects.into_iter().reduce(|acc, rect| {
        Rect::new(
            coord! { x: acc.min().x.min(rect.min().x), y: acc.min().y.min(rect.min().y) },
            coord! { x: acc.max().x.max(rect.max().x), y: acc.max().y.max(rect.max().y) },
        )
    })
}

/// Grows `rect` around its centre by `ratio` of its size and keeps it inside the unit frame.
pub(crate) fn expand(rect: Rect<f32>, ratio: f32) -> Rect<f32> {
    clamp_to_frame(rect.scale(1.0 + ratio))
}

pub(crate) fn clamp_to_frame(rect: Rect<f32>) -> Rect<f32> {
    let clamp = |c: Coord<f32>| coord! { x: c.x.clamp(0.0, 1.0), y: c.y.clamp(0.0, 1.0) };
    Rect::new(clamp(rect.min()), clamp(rect.max()))
}

/// Warps the quadrilateral into an upright image. `None` when the quad collapses to a line.
#[instrument(level = "debug", skip(image))]
pub fn correct_perspective(
    image: &DynamicImage,
    quad: &RectangleObservation,
) -> Option<DynamicImage> {
    let (width, height) = (image.width() as f32, image.height() as f32);
    let [top_left, top_right, bottom_right, bottom_left] =
        quad.corners().map(|c| coord! { x: c.x * width, y: c.y * height });
    let target_width = distance(top_left, top_right)
        .max(distance(bottom_left, bottom_right))
        .round();
    let target_height = distance(top_left, bottom_left)
        .max(distance(top_right, bottom_right))
        .round();
    if target_width < 1.0 || target_height < 1.0 {
        return None;
    }
    let projection = Projection::from_control_points(
        [top_left, top_right, bottom_right, bottom_left].map(|c| (c.x, c.y)),
        [
            (0.0, 0.0),
            (target_width, 0.0),
            (target_width, target_height),
            (0.0, target_height),
        ],
    )?;
    let mut upright = RgbaImage::new(target_width as u32, target_height as u32);
    warp_into(
        &image.to_rgba8(),
        &projection,
        Interpolation::Bilinear,
        Rgba([0, 0, 0, 0]),
        &mut upright,
    );
    log::trace!("Warped region to {}x{}", upright.width(), upright.height());
    Some(DynamicImage::ImageRgba8(upright))
}

/// Axis-aligned crop of a normalised rect.
pub fn crop_region(image: &DynamicImage, rect: &Rect<f32>) -> DynamicImage {
    let rect = clamp_to_frame(*rect);
    let x = ((rect.min().x * image.width() as f32) as u32).min(image.width());
    let y = ((rect.min().y * image.height() as f32) as u32).min(image.height());
    let width = ((rect.width() * image.width() as f32) as u32).clamp(0, image.width() - x);
    let height = ((rect.height() * image.height() as f32) as u32).clamp(0, image.height() - y);
    log::trace!("Slicing subimage to {rect:?}");
    image.crop_imm(x, y, width, height)
}

/// Rotates the image clockwise by `degrees` about its centre.
pub fn rotate(image: &DynamicImage, degrees: f32) -> DynamicImage {
    DynamicImage::ImageRgba8(rotate_about_center(
        &image.to_rgba8(),
        degrees.to_radians(),
        Interpolation::Bilinear,
        Rgba([255, 255, 255, 255]),
    ))
}
