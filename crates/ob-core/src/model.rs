//! Core data model: obstacles, colors, bounds, and field patches.
//!
//! An [`Obstacle`] is the canonical record of one rectangle. It lives only
//! in the store; rendering backends hold opaque handles keyed by
//! [`ObstacleId`](crate::id::ObstacleId) and never see these records
//! directly.

use crate::id::ObstacleId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ─── Color ───────────────────────────────────────────────────────────────

/// 24-bit RGB color. Parsed from and emitted as `#RRGGBB` hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Parse a single hex digit.
fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a packed 24-bit value (`0xRRGGBB`).
    pub const fn from_rgb24(v: u32) -> Self {
        Self {
            r: ((v >> 16) & 0xFF) as u8,
            g: ((v >> 8) & 0xFF) as u8,
            b: (v & 0xFF) as u8,
        }
    }

    pub const fn to_rgb24(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Parse `#RGB` or `#RRGGBB`. The leading `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        match bytes.len() {
            3 => {
                let r = hex_val(bytes[0])?;
                let g = hex_val(bytes[1])?;
                let b = hex_val(bytes[2])?;
                Some(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 => {
                let r = hex_val(bytes[0])? << 4 | hex_val(bytes[1])?;
                let g = hex_val(bytes[2])? << 4 | hex_val(bytes[3])?;
                let b = hex_val(bytes[4])? << 4 | hex_val(bytes[5])?;
                Some(Self::rgb(r, g, b))
            }
            _ => None,
        }
    }

    /// Emit as `#RRGGBB`.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hex color {s:?}")))
    }
}

// ─── Geometry ────────────────────────────────────────────────────────────

/// A point in canvas-local or screen pixels, depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// An axis-aligned rectangle: position plus size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

// ─── Obstacle ────────────────────────────────────────────────────────────

/// One rectangle record in the canonical store.
///
/// `width` and `height` are strictly positive once the obstacle has been
/// admitted to the store; drafts under construction live only in the
/// rendering backend until finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: Color,
}

impl Obstacle {
    pub fn new(id: ObstacleId, x: f32, y: f32, width: f32, height: f32, color: Color) -> Self {
        Self {
            id,
            x,
            y,
            width,
            height,
            color,
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }
}

// ─── Patches ─────────────────────────────────────────────────────────────

/// A partial obstacle update: only the fields present are applied.
///
/// Used by `Store::update`, by field-level reconciliation diffs, and as the
/// wire shape of edit-form field changes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ObstaclePatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub color: Option<Color>,
}

impl ObstaclePatch {
    pub fn is_empty(&self) -> bool {
        self.x.is_none()
            && self.y.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.color.is_none()
    }

    /// Position-only patch (the drag hot path).
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Full-frame patch (drag/resize finalization).
    pub fn frame(b: Bounds) -> Self {
        Self {
            x: Some(b.x),
            y: Some(b.y),
            width: Some(b.width),
            height: Some(b.height),
            color: None,
        }
    }

    /// Everything except the id.
    pub fn all_of(ob: &Obstacle) -> Self {
        Self {
            x: Some(ob.x),
            y: Some(ob.y),
            width: Some(ob.width),
            height: Some(ob.height),
            color: Some(ob.color),
        }
    }

    /// Merge the present fields into `target`.
    pub fn apply_to(&self, target: &mut Obstacle) {
        if let Some(x) = self.x {
            target.x = x;
        }
        if let Some(y) = self.y {
            target.y = y;
        }
        if let Some(w) = self.width {
            target.width = w;
        }
        if let Some(h) = self.height {
            target.height = h;
        }
        if let Some(c) = self.color {
            target.color = c;
        }
    }

    /// Fields of `next` that differ from `prev`. Empty when the two are
    /// equal, which is what makes reconciliation idempotent.
    pub fn diff(prev: &Obstacle, next: &Obstacle) -> Self {
        Self {
            x: (prev.x != next.x).then_some(next.x),
            y: (prev.y != next.y).then_some(next.y),
            width: (prev.width != next.width).then_some(next.width),
            height: (prev.height != next.height).then_some(next.height),
            color: (prev.color != next.color).then_some(next.color),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hex_roundtrip() {
        let c = Color::from_hex("#00FFFF").unwrap();
        assert_eq!(c, Color::rgb(0, 255, 255));
        assert_eq!(c.to_hex(), "#00FFFF");

        // Short form and missing '#'
        assert_eq!(Color::from_hex("f0a").unwrap(), Color::rgb(255, 0, 170));
        assert_eq!(Color::from_hex("1a2b3c").unwrap(), Color::rgb(26, 43, 60));
    }

    #[test]
    fn hex_rejects_garbage() {
        assert_eq!(Color::from_hex("#12345"), None);
        assert_eq!(Color::from_hex("zzzzzz"), None);
        assert_eq!(Color::from_hex(""), None);
    }

    #[test]
    fn color_serde_is_hex_string() {
        let c = Color::from_rgb24(0x123456);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"#123456\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn bounds_contains_and_intersects() {
        let b = Bounds::new(10.0, 10.0, 50.0, 50.0);
        assert!(b.contains(10.0, 10.0));
        assert!(b.contains(59.9, 59.9));
        assert!(!b.contains(60.0, 30.0));

        let other = Bounds::new(55.0, 55.0, 10.0, 10.0);
        assert!(b.intersects(&other));
        assert!(!b.intersects(&Bounds::new(100.0, 100.0, 5.0, 5.0)));
    }

    #[test]
    fn patch_diff_is_minimal() {
        let id = crate::id::ObstacleId::from_raw(1);
        let a = Obstacle::new(id, 10.0, 10.0, 50.0, 50.0, Color::rgb(0, 255, 255));
        let mut b = a.clone();
        b.x = 30.0;
        b.y = 40.0;

        let patch = ObstaclePatch::diff(&a, &b);
        assert_eq!(patch.x, Some(30.0));
        assert_eq!(patch.y, Some(40.0));
        assert_eq!(patch.width, None);
        assert_eq!(patch.height, None);
        assert_eq!(patch.color, None);

        assert!(ObstaclePatch::diff(&a, &a).is_empty());
    }

    #[test]
    fn patch_apply_merges_only_present_fields() {
        let id = crate::id::ObstacleId::from_raw(7);
        let mut ob = Obstacle::new(id, 0.0, 0.0, 20.0, 20.0, Color::rgb(1, 2, 3));
        ObstaclePatch::position(5.0, 6.0).apply_to(&mut ob);
        assert_eq!(ob.x, 5.0);
        assert_eq!(ob.y, 6.0);
        assert_eq!(ob.width, 20.0);
        assert_eq!(ob.color, Color::rgb(1, 2, 3));
    }
}
