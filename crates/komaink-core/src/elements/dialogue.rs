//! Dialogue bubble style and outline geometry.

use super::{FontSpec, SerializableColor};
use kurbo::{BezPath, Circle, Ellipse, Point, Rect, Shape as KurboShape, Vec2};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Kind of speech bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BubbleType {
    #[default]
    Speech,
    Thought,
    Shout,
    Whisper,
    /// Rectangular caption box without a tail.
    Narration,
}

impl BubbleType {
    pub const ALL: [BubbleType; 5] = [
        BubbleType::Speech,
        BubbleType::Thought,
        BubbleType::Shout,
        BubbleType::Whisper,
        BubbleType::Narration,
    ];

    /// Map the digit keys 1-5 to bubble types.
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            1..=5 => Some(Self::ALL[(digit - 1) as usize]),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BubbleType::Speech => "Speech",
            BubbleType::Thought => "Thought",
            BubbleType::Shout => "Shout",
            BubbleType::Whisper => "Whisper",
            BubbleType::Narration => "Narration",
        }
    }

    /// Whether bubbles of this type carry a tail.
    pub fn has_tail(self) -> bool {
        !matches!(self, BubbleType::Narration)
    }
}

/// Bubble tail pointing at the speaker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tail {
    /// Tip position relative to the bubble center, in half-extents
    /// (`(0, 1)` is the middle of the bottom edge).
    pub tip: Vec2,
    /// Width of the tail where it meets the bubble, in document units.
    pub base_width: f64,
}

impl Default for Tail {
    fn default() -> Self {
        Self {
            tip: Vec2::new(-0.35, 1.45),
            base_width: 18.0,
        }
    }
}

impl Tail {
    /// Tip in document coordinates for a bubble occupying `rect`.
    pub fn tip_point(&self, rect: Rect) -> Point {
        let c = rect.center();
        Point::new(
            c.x + self.tip.x * rect.width() / 2.0,
            c.y + self.tip.y * rect.height() / 2.0,
        )
    }
}

/// Appearance and content of a dialogue bubble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueStyle {
    pub bubble_type: BubbleType,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail: Option<Tail>,
    #[serde(default)]
    pub font: FontSpec,
    pub fill_color: SerializableColor,
    pub border_color: SerializableColor,
    pub border_width: f64,
}

impl Default for DialogueStyle {
    fn default() -> Self {
        Self::new(BubbleType::Speech)
    }
}

impl DialogueStyle {
    /// Empty bubble of the given type with default colors and tail.
    pub fn new(bubble_type: BubbleType) -> Self {
        Self {
            bubble_type,
            text: String::new(),
            tail: bubble_type.has_tail().then(Tail::default),
            font: FontSpec::default(),
            fill_color: SerializableColor::white(),
            border_color: SerializableColor::black(),
            border_width: 2.0,
        }
    }

    /// Change the bubble type, adding or dropping the tail as needed.
    /// Text, font and colors are kept.
    pub fn set_bubble_type(&mut self, bubble_type: BubbleType) {
        self.bubble_type = bubble_type;
        if !bubble_type.has_tail() {
            self.tail = None;
        } else if self.tail.is_none() {
            self.tail = Some(Tail::default());
        }
    }

    /// Whisper bubbles draw a dashed border.
    pub fn dashed_border(&self) -> bool {
        self.bubble_type == BubbleType::Whisper
    }

    /// Outline path for a bubble occupying `rect`, tail included.
    pub fn outline(&self, rect: Rect) -> BezPath {
        let mut path = match self.bubble_type {
            BubbleType::Speech | BubbleType::Whisper => {
                Ellipse::from_rect(rect).to_path(0.1)
            }
            BubbleType::Thought => cloud_path(rect),
            BubbleType::Shout => burst_path(rect),
            BubbleType::Narration => rect.to_path(0.1),
        };

        if let Some(tail) = &self.tail {
            match self.bubble_type {
                BubbleType::Thought => append_thought_trail(&mut path, rect, tail),
                BubbleType::Narration => {}
                _ => append_tail(&mut path, rect, tail),
            }
        }
        path
    }
}

/// Wedge from the bubble center towards the tip.
fn append_tail(path: &mut BezPath, rect: Rect, tail: &Tail) {
    let center = rect.center();
    let tip = tail.tip_point(rect);
    let dir = tip - center;
    let len = dir.hypot();
    if len < f64::EPSILON {
        return;
    }
    let normal = Vec2::new(-dir.y, dir.x) / len * (tail.base_width / 2.0);
    // The base sits halfway to the edge so the wedge overlaps the body.
    let base = center + dir * (0.5 / tail.tip.hypot().max(1.0));
    path.move_to(base + normal);
    path.line_to(tip);
    path.line_to(base - normal);
    path.close_path();
}

/// Three shrinking circles leading to the tip.
fn append_thought_trail(path: &mut BezPath, rect: Rect, tail: &Tail) {
    let center = rect.center();
    let tip = tail.tip_point(rect);
    let radius = tail.base_width / 2.0;
    for (i, t) in [0.55, 0.75, 0.95].iter().enumerate() {
        let c = center.lerp(tip, *t);
        let r = radius / (i as f64 + 1.0);
        path.extend(Circle::new(c, r).path_elements(0.1));
    }
}

/// Scalloped cloud outline around the inscribed ellipse.
fn cloud_path(rect: Rect) -> BezPath {
    const BUMPS: usize = 10;
    let c = rect.center();
    let (rx, ry) = (rect.width() / 2.0, rect.height() / 2.0);
    let on_ellipse = |angle: f64, scale: f64| {
        Point::new(c.x + rx * scale * angle.cos(), c.y + ry * scale * angle.sin())
    };

    let mut path = BezPath::new();
    let step = TAU / BUMPS as f64;
    path.move_to(on_ellipse(0.0, 0.9));
    for i in 0..BUMPS {
        let a0 = i as f64 * step;
        path.quad_to(on_ellipse(a0 + step / 2.0, 1.15), on_ellipse(a0 + step, 0.9));
    }
    path.close_path();
    path
}

/// Spiky burst alternating between the ellipse and an inner ring.
fn burst_path(rect: Rect) -> BezPath {
    const SPIKES: usize = 14;
    let c = rect.center();
    let (rx, ry) = (rect.width() / 2.0, rect.height() / 2.0);

    let mut path = BezPath::new();
    for i in 0..SPIKES * 2 {
        let angle = i as f64 * TAU / (SPIKES * 2) as f64;
        let scale = if i % 2 == 0 { 1.0 } else { 0.72 };
        let p = Point::new(c.x + rx * scale * angle.cos(), c.y + ry * scale * angle.sin());
        if i == 0 {
            path.move_to(p);
        } else {
            path.line_to(p);
        }
    }
    path.close_path();
    path
}
