//! Annotations authored alongside a scene by the embedding page.
//!
//! In-world annotations are a tagged union so every consumer (render geometry,
//! hit-test geometry, normalization) matches on all kinds exhaustively.

use serde::{Deserialize, Serialize};

/// Linear RGBA colour, components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const MAGENTA: Color = Color::rgb(1.0, 0.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parses `#rgb`, `#rrggbb`, `#rrggbbaa` or a basic CSS colour name.
    pub fn parse(text: &str) -> Option<Color> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return parse_hex(hex);
        }
        let named = match text.to_ascii_lowercase().as_str() {
            "white" => Color::WHITE,
            "black" => Color::BLACK,
            "red" => Color::RED,
            "green" => Color::rgb(0.0, 128.0 / 255.0, 0.0),
            "lime" => Color::rgb(0.0, 1.0, 0.0),
            "blue" => Color::rgb(0.0, 0.0, 1.0),
            "yellow" => Color::rgb(1.0, 1.0, 0.0),
            "cyan" | "aqua" => Color::rgb(0.0, 1.0, 1.0),
            "magenta" | "fuchsia" => Color::MAGENTA,
            "orange" => Color::rgb(1.0, 165.0 / 255.0, 0.0),
            "gray" | "grey" => Color::rgb(128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0),
            _ => return None,
        };
        Some(named)
    }

    /// Scales the colour channels, keeping alpha.
    pub fn scaled(self, factor: f32) -> Color {
        Color {
            r: self.r * factor,
            g: self.g * factor,
            b: self.b * factor,
            a: self.a,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_hex(self) -> String {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        if self.a >= 1.0 {
            format!("#{:02x}{:02x}{:02x}", c(self.r), c(self.g), c(self.b))
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", c(self.r), c(self.g), c(self.b), c(self.a))
        }
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digits: Vec<u8> = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()?;
    let channel = |hi: u8, lo: u8| f32::from(hi * 16 + lo) / 255.0;
    match digits.as_slice() {
        [r, g, b] => Some(Color::rgb(channel(*r, *r), channel(*g, *g), channel(*b, *b))),
        [r1, r2, g1, g2, b1, b2] => Some(Color::rgb(channel(*r1, *r2), channel(*g1, *g2), channel(*b1, *b2))),
        [r1, r2, g1, g2, b1, b2, a1, a2] => Some(Color {
            r: channel(*r1, *r2),
            g: channel(*g1, *g2),
            b: channel(*b1, *b2),
            a: channel(*a1, *a2),
        }),
        _ => None,
    }
}

impl From<String> for Color {
    fn from(text: String) -> Self {
        Color::parse(&text).unwrap_or_else(|| {
            log::warn!("Unrecognized colour {text:?}, using white");
            Color::WHITE
        })
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// A marker occupying scene space, occluded by geometry unless pinned on top.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InWorldAnnotation {
    #[serde(rename_all = "camelCase")]
    Box {
        min_corner: [f32; 3],
        max_corner: [f32; 3],
        color: Color,
        #[serde(default)]
        thickness: Option<f32>,
        #[serde(default)]
        content: String,
        #[serde(default)]
        always_on_top: bool,
    },
    #[serde(rename_all = "camelCase")]
    Line {
        from: [f32; 3],
        to: [f32; 3],
        color: Color,
        #[serde(default)]
        thickness: Option<f32>,
        #[serde(default)]
        content: String,
        #[serde(default)]
        always_on_top: bool,
    },
}

impl InWorldAnnotation {
    pub fn color(&self) -> Color {
        match self {
            InWorldAnnotation::Box { color, .. } | InWorldAnnotation::Line { color, .. } => *color,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            InWorldAnnotation::Box { content, .. } | InWorldAnnotation::Line { content, .. } => content,
        }
    }

    pub fn always_on_top(&self) -> bool {
        match self {
            InWorldAnnotation::Box { always_on_top, .. }
            | InWorldAnnotation::Line { always_on_top, .. } => *always_on_top,
        }
    }

    pub fn thickness(&self) -> Option<f32> {
        match self {
            InWorldAnnotation::Box { thickness, .. } | InWorldAnnotation::Line { thickness, .. } => *thickness,
        }
    }

    /// Orders box corners so that `min <= max` on every axis. Lines are unchanged.
    pub fn normalized(&self) -> InWorldAnnotation {
        match self {
            InWorldAnnotation::Box {
                min_corner,
                max_corner,
                ..
            } => {
                let mut out = self.clone();
                if let InWorldAnnotation::Box {
                    min_corner: out_min,
                    max_corner: out_max,
                    ..
                } = &mut out
                {
                    for axis in 0..3 {
                        out_min[axis] = min_corner[axis].min(max_corner[axis]);
                        out_max[axis] = min_corner[axis].max(max_corner[axis]);
                    }
                }
                out
            }
            InWorldAnnotation::Line { .. } => self.clone(),
        }
    }
}

/// A billboard marker drawn above all geometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayAnnotation {
    pub position: [f32; 3],
    pub color: Color,
    #[serde(default)]
    pub content: String,
}

/// The annotation a scene node was built from, for tooltip lookup.
#[derive(Clone, Debug, PartialEq)]
pub enum Annotation {
    InWorld(InWorldAnnotation),
    Overlay(OverlayAnnotation),
}

impl Annotation {
    pub fn content(&self) -> &str {
        match self {
            Annotation::InWorld(annotation) => annotation.content(),
            Annotation::Overlay(annotation) => &annotation.content,
        }
    }

    pub fn has_content(&self) -> bool {
        !self.content().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_names() {
        assert_eq!(Color::parse("#ff0000"), Some(Color::RED));
        assert_eq!(Color::parse("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse("Magenta"), Some(Color::MAGENTA));
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(Color::parse("#ff000080").map(|c| c.a), Some(128.0 / 255.0));
    }

    #[test]
    fn deserializes_tagged_annotations() {
        let json = r##"[
            {"type": "box", "minCorner": [1, 0, 0], "maxCorner": [0, 1, 1], "color": "#ff0000"},
            {"type": "line", "from": [0, 0, 0], "to": [0, 2, 0], "color": "blue", "content": "pipe", "alwaysOnTop": true}
        ]"##;
        let annotations: Vec<InWorldAnnotation> = serde_json::from_str(json).unwrap();
        assert_eq!(annotations[0].content(), "");
        assert!(annotations[1].always_on_top());
        let InWorldAnnotation::Box { min_corner, max_corner, .. } = annotations[0].normalized() else {
            panic!("expected a box");
        };
        assert_eq!(min_corner, [0.0, 0.0, 0.0]);
        assert_eq!(max_corner, [1.0, 1.0, 1.0]);
    }
}
