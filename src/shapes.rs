//! Shape model: every drawable object on a sheet.
//!
//! Shapes are plain data. Rendering belongs to whatever front end hosts
//! this crate; here they only know their geometry, style, bounds and how
//! to answer hit tests.

use serde::{Deserialize, Serialize};

use crate::geometry::{point_in_polygon, point_segment_distance, Point, Rect};

/// Extra tolerance in pixels applied to outline hit tests so thin shapes
/// stay clickable.
const HIT_SLACK: f64 = 2.0;

/// Estimated glyph cell for text extent, matching a default 12pt face.
const CHAR_WIDTH: f64 = 8.0;
const LINE_HEIGHT: f64 = 18.0;

/// An RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    pub const BLACK: Colour = Colour { r: 0, g: 0, b: 0 };
    pub const WHITE: Colour = Colour { r: 255, g: 255, b: 255 };

    /// Parse a `#rrggbb` hex string.
    pub fn from_hex(s: &str) -> Option<Colour> {
        let hex = s.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Colour { r, g, b })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for Colour {
    fn default() -> Self {
        Colour::BLACK
    }
}

/// Stroke and fill style shared by all shapes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub colour: Colour,
    pub thickness: u32,
    /// `None` means a transparent background (outline only).
    pub background: Option<Colour>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            colour: Colour::BLACK,
            thickness: 1,
            background: None,
        }
    }
}

impl Style {
    fn half_stroke(&self) -> f64 {
        self.thickness as f64 / 2.0
    }
}

/// Identifiers for the tool palette. `Select` and `BitmapSelect` are
/// transient interaction tools and never produce a persisted shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tool {
    Pen,
    Eraser,
    Rectangle,
    RoundedRect,
    Ellipse,
    Circle,
    Polygon,
    Line,
    Arrow,
    Text,
    Note,
    Image,
    Media,
    Select,
    BitmapSelect,
}

impl Tool {
    /// Display name for a status bar.
    pub fn name(self) -> &'static str {
        match self {
            Tool::Pen => "Pen",
            Tool::Eraser => "Eraser",
            Tool::Rectangle => "Rectangle",
            Tool::RoundedRect => "Rounded Rect",
            Tool::Ellipse => "Ellipse",
            Tool::Circle => "Circle",
            Tool::Polygon => "Polygon",
            Tool::Line => "Line",
            Tool::Arrow => "Arrow",
            Tool::Text => "Text",
            Tool::Note => "Note",
            Tool::Image => "Image",
            Tool::Media => "Media",
            Tool::Select => "Select",
            Tool::BitmapSelect => "Bitmap Select",
        }
    }
}

/// A drawable object. List order on a sheet is z-order: later is on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Freehand stroke.
    Pen { points: Vec<Point>, style: Style },
    /// Freehand stroke drawn in the background colour.
    Eraser { points: Vec<Point>, style: Style },
    Rectangle { rect: Rect, style: Style },
    RoundedRect { rect: Rect, style: Style },
    Ellipse { rect: Rect, style: Style },
    Circle { center: Point, radius: f64, style: Style },
    /// Closed polygon, vertices in order.
    Polygon { points: Vec<Point>, style: Style },
    Line { start: Point, end: Point, style: Style },
    Arrow { start: Point, end: Point, style: Style },
    Text {
        pos: Point,
        content: String,
        /// Native font description string, opaque to the core.
        font: String,
        style: Style,
    },
    /// A sticky note: text with a filled background.
    Note {
        pos: Point,
        content: String,
        font: String,
        style: Style,
    },
    /// A placed bitmap. The payload lives in the image store, keyed by
    /// content hash; the shape only references it.
    Image {
        pos: Point,
        hash: String,
        size: (u32, u32),
        style: Style,
    },
    /// An embedded media file, positioned like an image.
    Media {
        pos: Point,
        path: std::path::PathBuf,
        size: (u32, u32),
        style: Style,
    },
}

impl Shape {
    pub fn tool(&self) -> Tool {
        match self {
            Shape::Pen { .. } => Tool::Pen,
            Shape::Eraser { .. } => Tool::Eraser,
            Shape::Rectangle { .. } => Tool::Rectangle,
            Shape::RoundedRect { .. } => Tool::RoundedRect,
            Shape::Ellipse { .. } => Tool::Ellipse,
            Shape::Circle { .. } => Tool::Circle,
            Shape::Polygon { .. } => Tool::Polygon,
            Shape::Line { .. } => Tool::Line,
            Shape::Arrow { .. } => Tool::Arrow,
            Shape::Text { .. } => Tool::Text,
            Shape::Note { .. } => Tool::Note,
            Shape::Image { .. } => Tool::Image,
            Shape::Media { .. } => Tool::Media,
        }
    }

    pub fn style(&self) -> &Style {
        match self {
            Shape::Pen { style, .. }
            | Shape::Eraser { style, .. }
            | Shape::Rectangle { style, .. }
            | Shape::RoundedRect { style, .. }
            | Shape::Ellipse { style, .. }
            | Shape::Circle { style, .. }
            | Shape::Polygon { style, .. }
            | Shape::Line { style, .. }
            | Shape::Arrow { style, .. }
            | Shape::Text { style, .. }
            | Shape::Note { style, .. }
            | Shape::Image { style, .. }
            | Shape::Media { style, .. } => style,
        }
    }

    pub fn style_mut(&mut self) -> &mut Style {
        match self {
            Shape::Pen { style, .. }
            | Shape::Eraser { style, .. }
            | Shape::Rectangle { style, .. }
            | Shape::RoundedRect { style, .. }
            | Shape::Ellipse { style, .. }
            | Shape::Circle { style, .. }
            | Shape::Polygon { style, .. }
            | Shape::Line { style, .. }
            | Shape::Arrow { style, .. }
            | Shape::Text { style, .. }
            | Shape::Note { style, .. }
            | Shape::Image { style, .. }
            | Shape::Media { style, .. } => style,
        }
    }

    /// Bounding box of the shape's geometry, ignoring stroke width.
    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Pen { points, .. } | Shape::Eraser { points, .. } => points_bounds(points),
            Shape::Rectangle { rect, .. }
            | Shape::RoundedRect { rect, .. }
            | Shape::Ellipse { rect, .. } => *rect,
            Shape::Circle { center, radius, .. } => Rect::new(
                center.x - radius,
                center.y - radius,
                2.0 * radius,
                2.0 * radius,
            ),
            Shape::Polygon { points, .. } => points_bounds(points),
            Shape::Line { start, end, .. } | Shape::Arrow { start, end, .. } => {
                Rect::from_corners(*start, *end)
            }
            Shape::Text { pos, content, .. } | Shape::Note { pos, content, .. } => {
                text_bounds(*pos, content)
            }
            Shape::Image { pos, size, .. } | Shape::Media { pos, size, .. } => {
                Rect::new(pos.x, pos.y, size.0 as f64, size.1 as f64)
            }
        }
    }

    /// Whether `p` hits this shape. Filled shapes hit anywhere inside;
    /// outline-only shapes hit near their border, with a little slack so
    /// thin strokes stay selectable.
    pub fn hit_test(&self, p: Point) -> bool {
        let style = self.style();
        let half = style.half_stroke();
        match self {
            Shape::Pen { points, .. } | Shape::Eraser { points, .. } => {
                hit_polyline(p, points, half + HIT_SLACK)
            }
            Shape::Rectangle { rect, .. } | Shape::RoundedRect { rect, .. } => {
                if style.background.is_some() {
                    rect.inflated(half).contains(p)
                } else {
                    // Outline band: inside the grown rect but not the
                    // shrunk one. A zero-area rect collapses the inner
                    // band away entirely, so its outline still hits.
                    rect.inflated(half + HIT_SLACK).contains(p)
                        && !rect.inflated(-(half + HIT_SLACK)).contains(p)
                }
            }
            Shape::Ellipse { rect, .. } => hit_ellipse(p, rect, style, half),
            Shape::Circle { center, radius, .. } => {
                let d = p.distance(*center);
                if style.background.is_some() {
                    d <= radius + half
                } else {
                    (d - radius).abs() <= half + HIT_SLACK
                }
            }
            Shape::Polygon { points, .. } => {
                if points.is_empty() {
                    return false;
                }
                if style.background.is_some() && point_in_polygon(p, points) {
                    return true;
                }
                // Check the closed outline, including the last edge back
                // to the first vertex.
                let mut edges: Vec<Point> = points.clone();
                edges.push(points[0]);
                hit_polyline(p, &edges, half + HIT_SLACK)
            }
            Shape::Line { start, end, .. } | Shape::Arrow { start, end, .. } => {
                point_segment_distance(p, *start, *end) <= half + HIT_SLACK
            }
            Shape::Text { .. } | Shape::Note { .. } | Shape::Image { .. } | Shape::Media { .. } => {
                self.bounds().contains(p)
            }
        }
    }

    /// A copy of this shape moved by `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> Shape {
        let mut moved = self.clone();
        match &mut moved {
            Shape::Pen { points, .. }
            | Shape::Eraser { points, .. }
            | Shape::Polygon { points, .. } => {
                for pt in points.iter_mut() {
                    *pt = pt.translated(dx, dy);
                }
            }
            Shape::Rectangle { rect, .. }
            | Shape::RoundedRect { rect, .. }
            | Shape::Ellipse { rect, .. } => {
                rect.x += dx;
                rect.y += dy;
            }
            Shape::Circle { center, .. } => *center = center.translated(dx, dy),
            Shape::Line { start, end, .. } | Shape::Arrow { start, end, .. } => {
                *start = start.translated(dx, dy);
                *end = end.translated(dx, dy);
            }
            Shape::Text { pos, .. }
            | Shape::Note { pos, .. }
            | Shape::Image { pos, .. }
            | Shape::Media { pos, .. } => *pos = pos.translated(dx, dy),
        }
        moved
    }
}

fn points_bounds(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::default();
    };
    let mut bounds = Rect::new(first.x, first.y, 0.0, 0.0);
    for p in &points[1..] {
        bounds = bounds.union(&Rect::new(p.x, p.y, 0.0, 0.0));
    }
    bounds
}

fn text_bounds(pos: Point, content: &str) -> Rect {
    let lines = content.lines().count().max(1);
    let widest = content.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    Rect::new(
        pos.x,
        pos.y,
        widest as f64 * CHAR_WIDTH,
        lines as f64 * LINE_HEIGHT,
    )
}

/// Hit test against an open polyline within `tolerance` of any segment.
/// A single point acts as a dot of the same tolerance.
fn hit_polyline(p: Point, points: &[Point], tolerance: f64) -> bool {
    match points {
        [] => false,
        [only] => p.distance(*only) <= tolerance,
        _ => points
            .windows(2)
            .any(|seg| point_segment_distance(p, seg[0], seg[1]) <= tolerance),
    }
}

fn hit_ellipse(p: Point, rect: &Rect, style: &Style, half: f64) -> bool {
    let rx = rect.width / 2.0;
    let ry = rect.height / 2.0;
    if rx <= 0.0 || ry <= 0.0 {
        // Degenerate ellipse: fall back to the outline band of its rect.
        return rect.inflated(half + HIT_SLACK).contains(p);
    }
    let c = rect.center();
    let norm = |rx: f64, ry: f64| ((p.x - c.x) / rx).powi(2) + ((p.y - c.y) / ry).powi(2);
    if style.background.is_some() {
        norm(rx + half, ry + half) <= 1.0
    } else {
        let pad = half + HIT_SLACK;
        let outer = norm(rx + pad, ry + pad) <= 1.0;
        let inner_rx = rx - pad;
        let inner_ry = ry - pad;
        let inside_inner = inner_rx > 0.0 && inner_ry > 0.0 && norm(inner_rx, inner_ry) < 1.0;
        outer && !inside_inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> Style {
        Style {
            background: Some(Colour::WHITE),
            ..Style::default()
        }
    }

    #[test]
    fn colour_hex_round_trip() {
        let c = Colour { r: 0xcd, g: 0x00, b: 0x7f };
        assert_eq!(Colour::from_hex(&c.to_hex()), Some(c));
        assert_eq!(Colour::from_hex("cd007f"), None);
        assert_eq!(Colour::from_hex("#cd00"), None);
    }

    #[test]
    fn rectangle_outline_vs_fill() {
        let rect = Rect::new(10.0, 10.0, 100.0, 50.0);
        let outline = Shape::Rectangle { rect, style: Style::default() };
        let fill = Shape::Rectangle { rect, style: filled() };
        let center = Point::new(60.0, 35.0);
        let edge = Point::new(10.0, 35.0);

        assert!(!outline.hit_test(center));
        assert!(outline.hit_test(edge));
        assert!(fill.hit_test(center));
        assert!(fill.hit_test(edge));
    }

    #[test]
    fn zero_area_rectangle_still_hits_outline() {
        let shape = Shape::Rectangle {
            rect: Rect::new(5.0, 5.0, 0.0, 0.0),
            style: Style::default(),
        };
        assert!(shape.hit_test(Point::new(5.0, 5.0)));
        assert!(!shape.hit_test(Point::new(50.0, 50.0)));
    }

    #[test]
    fn circle_hit() {
        let shape = Shape::Circle {
            center: Point::new(0.0, 0.0),
            radius: 10.0,
            style: Style::default(),
        };
        assert!(shape.hit_test(Point::new(10.0, 0.0)));
        assert!(!shape.hit_test(Point::new(0.0, 0.0)));
        let fill = Shape::Circle {
            center: Point::new(0.0, 0.0),
            radius: 10.0,
            style: filled(),
        };
        assert!(fill.hit_test(Point::new(0.0, 0.0)));
    }

    #[test]
    fn ellipse_hit() {
        let rect = Rect::new(0.0, 0.0, 40.0, 20.0);
        let outline = Shape::Ellipse { rect, style: Style::default() };
        assert!(outline.hit_test(Point::new(40.0, 10.0)));
        assert!(!outline.hit_test(Point::new(20.0, 10.0)));
        let fill = Shape::Ellipse { rect, style: filled() };
        assert!(fill.hit_test(Point::new(20.0, 10.0)));
        assert!(!fill.hit_test(Point::new(0.0, 0.0)));
    }

    #[test]
    fn polygon_hit() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(10.0, 20.0),
        ];
        let fill = Shape::Polygon { points: points.clone(), style: filled() };
        assert!(fill.hit_test(Point::new(10.0, 5.0)));
        assert!(!fill.hit_test(Point::new(19.0, 19.0)));

        let outline = Shape::Polygon { points: points.clone(), style: Style::default() };
        // Closing edge from (10,20) back to (0,0).
        assert!(outline.hit_test(Point::new(5.0, 10.0)));
        assert!(!outline.hit_test(Point::new(10.0, 5.0)));

        let empty = Shape::Polygon { points: vec![], style: filled() };
        assert!(!empty.hit_test(Point::new(0.0, 0.0)));
    }

    #[test]
    fn line_hit_respects_thickness() {
        let thin = Shape::Line {
            start: Point::new(0.0, 0.0),
            end: Point::new(100.0, 0.0),
            style: Style::default(),
        };
        let thick = Shape::Line {
            start: Point::new(0.0, 0.0),
            end: Point::new(100.0, 0.0),
            style: Style { thickness: 12, ..Style::default() },
        };
        let p = Point::new(50.0, 5.0);
        assert!(!thin.hit_test(p));
        assert!(thick.hit_test(p));
    }

    #[test]
    fn one_point_pen_hits_within_thickness() {
        let dot = Shape::Pen {
            points: vec![Point::new(7.0, 7.0)],
            style: Style { thickness: 4, ..Style::default() },
        };
        assert!(dot.hit_test(Point::new(9.0, 7.0)));
        assert!(!dot.hit_test(Point::new(20.0, 7.0)));
    }

    #[test]
    fn translated_moves_every_variant_bounds() {
        let shapes = vec![
            Shape::Pen {
                points: vec![Point::new(1.0, 1.0), Point::new(4.0, 2.0)],
                style: Style::default(),
            },
            Shape::Rectangle { rect: Rect::new(0.0, 0.0, 10.0, 10.0), style: Style::default() },
            Shape::Circle { center: Point::new(5.0, 5.0), radius: 3.0, style: Style::default() },
            Shape::Text {
                pos: Point::new(2.0, 2.0),
                content: "hi".into(),
                font: String::new(),
                style: Style::default(),
            },
        ];
        for shape in shapes {
            let before = shape.bounds();
            let after = shape.translated(3.0, -2.0).bounds();
            assert!((after.x - before.x - 3.0).abs() < 1e-9);
            assert!((after.y - before.y + 2.0).abs() < 1e-9);
            assert!((after.width - before.width).abs() < 1e-9);
        }
    }

    #[test]
    fn text_bounds_scale_with_content() {
        let short = Shape::Text {
            pos: Point::default(),
            content: "ab".into(),
            font: String::new(),
            style: Style::default(),
        };
        let long = Shape::Text {
            pos: Point::default(),
            content: "abcdef\ngh".into(),
            font: String::new(),
            style: Style::default(),
        };
        assert!(long.bounds().width > short.bounds().width);
        assert!(long.bounds().height > short.bounds().height);
    }
}
