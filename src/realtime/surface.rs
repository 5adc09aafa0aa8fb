use tiny_skia::{Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::db::WhiteboardPoint;

pub type Rgba = [u8; 4];

pub const TRANSPARENT: Rgba = [0, 0, 0, 0];
pub const BLACK: Rgba = [0, 0, 0, 255];

/// Parses `#rgb` or `#rrggbb`.
pub fn parse_color(color: &str) -> Option<Rgba> {
    let hex = color.trim().strip_prefix('#').filter(|h| h.is_ascii())?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();

    match hex.len() {
        3 => {
            let mut rgba = BLACK;
            for i in 0..3 {
                rgba[i] = channel(&hex[i..i + 1])? * 17;
            }
            Some(rgba)
        }
        6 => Some([channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?, 255]),
        _ => None,
    }
}

/// Something strokes can be painted on. Resizing loses whatever was drawn.
pub trait Surface {
    fn size(&self) -> (u32, u32);
    fn resize(&mut self, width: u32, height: u32);
    fn clear(&mut self);
    /// One polyline with round caps and joins. Fewer than two points paints
    /// nothing.
    fn stroke(&mut self, points: &[WhiteboardPoint], color: Rgba, width: f32);
}

/// RGBA pixmap. A zero-sized raster has no pixmap and ignores strokes.
#[derive(Debug, Clone)]
pub struct Raster {
    width: u32,
    height: u32,
    pixmap: Option<Pixmap>,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixmap: Pixmap::new(width, height),
        }
    }

    /// Unpremultiplied colour at a pixel, `None` outside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        let c = self.pixmap.as_ref()?.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    pub fn painted(&self) -> usize {
        self.pixmap
            .as_ref()
            .map_or(0, |p| p.pixels().iter().filter(|px| px.alpha() != 0).count())
    }
}

impl Surface for Raster {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        *self = Raster::new(width, height);
    }

    fn clear(&mut self) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(Color::TRANSPARENT);
        }
    }

    fn stroke(&mut self, points: &[WhiteboardPoint], color: Rgba, width: f32) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        let [first, rest @ ..] = points else {
            return;
        };
        if rest.is_empty() {
            return;
        }

        let mut pb = PathBuilder::new();
        pb.move_to(first.x, first.y);
        for p in rest {
            pb.line_to(p.x, p.y);
        }
        let Some(path) = pb.finish() else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
        // hard edges keep replays pixel-identical
        paint.anti_alias = false;

        let stroke = Stroke {
            width: width.max(1.0),
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f32, y: f32) -> WhiteboardPoint {
        WhiteboardPoint::new(x, y)
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_color("#000000"), Some(BLACK));
        assert_eq!(parse_color("#ff8000"), Some([255, 128, 0, 255]));
        assert_eq!(parse_color("#0f0"), Some([0, 255, 0, 255]));
        assert_eq!(parse_color("red"), None);
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#aééb"), None);
    }

    #[test]
    fn stroke_covers_segment_with_round_caps() {
        let mut raster = Raster::new(20, 20);
        raster.stroke(&[pt(5.0, 10.0), pt(15.0, 10.0)], BLACK, 4.0);

        assert_eq!(raster.pixel(10, 10), Some(BLACK));
        assert_eq!(raster.pixel(4, 10), Some(BLACK));
        assert_eq!(raster.pixel(10, 2), Some(TRANSPARENT));
        assert_eq!(raster.pixel(19, 19), Some(TRANSPARENT));
    }

    #[test]
    fn single_point_paints_nothing() {
        let mut raster = Raster::new(10, 10);
        raster.stroke(&[pt(5.0, 5.0)], BLACK, 4.0);
        raster.stroke(&[], BLACK, 4.0);
        assert_eq!(raster.painted(), 0);
    }

    #[test]
    fn off_surface_points_are_clipped() {
        let mut raster = Raster::new(10, 10);
        raster.stroke(&[pt(-50.0, 5.0), pt(50.0, 5.0)], BLACK, 2.0);
        assert_eq!(raster.pixel(0, 5), Some(BLACK));
        assert_eq!(raster.pixel(9, 5), Some(BLACK));
        assert_eq!(raster.pixel(10, 5), None);
    }

    #[test]
    fn resize_drops_paint() {
        let mut raster = Raster::new(10, 10);
        raster.stroke(&[pt(1.0, 1.0), pt(8.0, 8.0), pt(1.0, 8.0)], BLACK, 2.0);
        assert!(raster.painted() > 0);

        raster.resize(30, 12);
        assert_eq!(raster.size(), (30, 12));
        assert_eq!(raster.painted(), 0);
    }

    #[test]
    fn zero_sized_raster_ignores_strokes() {
        let mut raster = Raster::new(0, 0);
        raster.stroke(&[pt(0.0, 0.0), pt(5.0, 5.0)], BLACK, 2.0);
        raster.clear();
        assert_eq!(raster.pixel(0, 0), None);
        assert_eq!(raster.painted(), 0);
    }
}
