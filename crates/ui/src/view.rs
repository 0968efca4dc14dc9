use image::imageops::FilterType;
use image::{DynamicImage, Pixel as _, Rgba, RgbaImage};
use monocle_core::{Point, TransformState};
use ratatui::layout::Rect;
use unicode_width::UnicodeWidthChar;

/// Largest edge a zoomed surface may be resized to before compositing.
const MAX_SCALED_EDGE_PX: u32 = 8192;

/// Lays a surface out in a viewport of the given pixel size: rotated by
/// whole quarter turns, fitted, scaled, shifted by the pan offset (percent
/// of the viewport), then turned by the remaining angle about its center.
/// Uncovered pixels take `background`.
pub(crate) fn compose_surface(
    full: &DynamicImage,
    transform: &TransformState,
    viewport_w_px: u32,
    viewport_h_px: u32,
    background: Rgba<u8>,
) -> DynamicImage {
    let viewport_w_px = viewport_w_px.max(1);
    let viewport_h_px = viewport_h_px.max(1);

    let rotated = match transform.quarter_turns() {
        1 => full.rotate90(),
        2 => full.rotate180(),
        3 => full.rotate270(),
        _ => full.clone(),
    };

    let img_w = rotated.width().max(1);
    let img_h = rotated.height().max(1);
    let fit = (f64::from(viewport_w_px) / f64::from(img_w))
        .min(f64::from(viewport_h_px) / f64::from(img_h));
    let factor = fit * transform.scale;
    let scaled_w = scaled_edge(img_w, factor);
    let scaled_h = scaled_edge(img_h, factor);
    let scaled = if (scaled_w, scaled_h) == (img_w, img_h) {
        rotated
    } else {
        rotated.resize_exact(scaled_w, scaled_h, FilterType::Triangle)
    };

    let mut viewport = RgbaImage::from_pixel(viewport_w_px, viewport_h_px, background);

    let pan_x = transform.pan_offset.x / 100.0 * f64::from(viewport_w_px);
    let pan_y = transform.pan_offset.y / 100.0 * f64::from(viewport_h_px);
    let residual = transform.residual_degrees();
    if residual.abs() < 0.01 {
        let dest_x = (i64::from(viewport_w_px) - i64::from(scaled_w)) / 2 + pan_x.round() as i64;
        let dest_y = (i64::from(viewport_h_px) - i64::from(scaled_h)) / 2 + pan_y.round() as i64;
        image::imageops::overlay(&mut viewport, &scaled.to_rgba8(), dest_x, dest_y);
    } else {
        let center_x = f64::from(viewport_w_px) / 2.0 + pan_x;
        let center_y = f64::from(viewport_h_px) / 2.0 + pan_y;
        overlay_rotated(&mut viewport, &scaled.to_rgba8(), center_x, center_y, residual);
    }

    viewport.into()
}

/// Blends `image`, turned clockwise by `degrees` about its center placed at
/// `(center_x, center_y)`, onto `viewport`. Each viewport pixel is mapped
/// back into the source and sampled nearest-neighbour.
fn overlay_rotated(
    viewport: &mut RgbaImage,
    image: &RgbaImage,
    center_x: f64,
    center_y: f64,
    degrees: f64,
) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let src_w = f64::from(image.width());
    let src_h = f64::from(image.height());
    for (x, y, pixel) in viewport.enumerate_pixels_mut() {
        let dx = f64::from(x) + 0.5 - center_x;
        let dy = f64::from(y) + 0.5 - center_y;
        let src_x = dx * cos + dy * sin + src_w / 2.0;
        let src_y = -dx * sin + dy * cos + src_h / 2.0;
        if src_x < 0.0 || src_y < 0.0 || src_x >= src_w || src_y >= src_h {
            continue;
        }
        pixel.blend(image.get_pixel(src_x as u32, src_y as u32));
    }
}

fn scaled_edge(edge: u32, factor: f64) -> u32 {
    let scaled = (f64::from(edge) * factor).round();
    if !scaled.is_finite() {
        return 1;
    }
    (scaled as u32).clamp(1, MAX_SCALED_EDGE_PX)
}

/// Maps a terminal cell to a pointer position in percent of `area`, the
/// unit drag offsets are kept in. `None` when the cell lies outside.
pub(crate) fn pointer_in(area: Rect, column: u16, row: u16) -> Option<Point> {
    if area.width == 0 || area.height == 0 {
        return None;
    }
    let inside = column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height);
    if !inside {
        return None;
    }
    let x = f64::from(column - area.x) * 100.0 / f64::from(area.width);
    let y = f64::from(row - area.y) * 100.0 / f64::from(area.height);
    Some(Point::new(x, y))
}

/// Cuts `text` to at most `max_width` display columns, marking the cut
/// with an ellipsis.
pub(crate) fn fit_width(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if unicode_width::UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut width = 0usize;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w + 1 > max_width {
            break;
        }
        out.push(ch);
        width += w;
    }
    out.push('…');
    out
}
