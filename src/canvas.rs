//! # Drawing Surface
//!
//! Render is the only phase that touches a [`Canvas`]. The engine ships one
//! implementation, [`DrawList`], which records calls in order so a page can
//! be handed to any backend (or serialized to JSON) after layout finishes.

use serde::Serialize;

use crate::font::FontHandle;
use crate::geometry::{Point, Rect};
use crate::style::Color;

/// A 2D immediate-mode drawing surface.
pub trait Canvas {
    /// Draw a run of text with its baseline starting at `origin`.
    fn draw_text(&mut self, text: &str, origin: Point, font: &FontHandle, size: f64, color: Color);

    fn draw_image(&mut self, src: &str, rect: Rect);

    fn draw_rect(&mut self, rect: Rect, fill: Option<Color>, stroke: Option<Stroke>);

    fn draw_line(&mut self, from: Point, to: Point, stroke: Stroke);

    /// Intersect the current clip with `rect` until the matching `restore`.
    fn clip_rect(&mut self, rect: Rect);

    fn save(&mut self);

    fn restore(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
}

impl Stroke {
    pub fn new(color: Color, width: f64) -> Self {
        Self { color, width }
    }
}

/// One recorded canvas call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawCall {
    #[serde(rename_all = "camelCase")]
    Text {
        text: String,
        x: f64,
        y: f64,
        font_family: String,
        font_face: String,
        font_size: f64,
        color: Color,
    },
    Image {
        src: String,
        rect: Rect,
    },
    Rect {
        rect: Rect,
        #[serde(skip_serializing_if = "Option::is_none")]
        fill: Option<Color>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stroke: Option<Stroke>,
    },
    Line {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    Clip {
        rect: Rect,
    },
    Save,
    Restore,
}

/// A canvas that records every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DrawList {
    calls: Vec<DrawCall>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn into_calls(self) -> Vec<DrawCall> {
        self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Concatenated text of every text call, in drawing order.
    pub fn text_content(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Move another list's calls onto the end of this one.
    pub fn append(&mut self, other: DrawList) {
        self.calls.extend(other.calls);
    }

    /// Replay the recorded calls onto another canvas.
    pub fn replay(&self, canvas: &mut dyn Canvas) {
        for call in &self.calls {
            match call {
                DrawCall::Text {
                    text,
                    x,
                    y,
                    font_family,
                    font_face,
                    font_size,
                    color,
                } => {
                    // Weight and style are already folded into the face name.
                    let font = FontHandle {
                        family: font_family.clone(),
                        weight: 400,
                        italic: false,
                        face: font_face.clone(),
                    };
                    canvas.draw_text(text, Point::new(*x, *y), &font, *font_size, *color);
                }
                DrawCall::Image { src, rect } => canvas.draw_image(src, *rect),
                DrawCall::Rect { rect, fill, stroke } => canvas.draw_rect(*rect, *fill, *stroke),
                DrawCall::Line { from, to, stroke } => canvas.draw_line(*from, *to, *stroke),
                DrawCall::Clip { rect } => canvas.clip_rect(*rect),
                DrawCall::Save => canvas.save(),
                DrawCall::Restore => canvas.restore(),
            }
        }
    }
}

impl Canvas for DrawList {
    fn draw_text(&mut self, text: &str, origin: Point, font: &FontHandle, size: f64, color: Color) {
        self.calls.push(DrawCall::Text {
            text: text.to_string(),
            x: origin.x,
            y: origin.y,
            font_family: font.family.clone(),
            font_face: font.face.clone(),
            font_size: size,
            color,
        });
    }

    fn draw_image(&mut self, src: &str, rect: Rect) {
        self.calls.push(DrawCall::Image {
            src: src.to_string(),
            rect,
        });
    }

    fn draw_rect(&mut self, rect: Rect, fill: Option<Color>, stroke: Option<Stroke>) {
        self.calls.push(DrawCall::Rect { rect, fill, stroke });
    }

    fn draw_line(&mut self, from: Point, to: Point, stroke: Stroke) {
        self.calls.push(DrawCall::Line { from, to, stroke });
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.calls.push(DrawCall::Clip { rect });
    }

    fn save(&mut self) {
        self.calls.push(DrawCall::Save);
    }

    fn restore(&mut self) {
        self.calls.push(DrawCall::Restore);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let mut list = DrawList::new();
        list.save();
        list.clip_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        list.draw_rect(Rect::new(1.0, 1.0, 2.0, 2.0), Some(Color::RED), None);
        list.restore();
        assert_eq!(list.len(), 4);
        assert_eq!(list.calls()[0], DrawCall::Save);
        assert_eq!(list.calls()[3], DrawCall::Restore);
    }

    #[test]
    fn serializes_with_op_tag() {
        let mut list = DrawList::new();
        list.draw_line(
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Stroke::new(Color::BLACK, 1.0),
        );
        let json = serde_json::to_value(list.calls()).unwrap();
        assert_eq!(json[0]["op"], "line");
        assert_eq!(json[0]["stroke"]["width"], 1.0);
    }

    #[test]
    fn replay_copies_calls() {
        let mut source = DrawList::new();
        let font = FontHandle {
            family: "Courier".to_string(),
            weight: 400,
            italic: false,
            face: "Courier".to_string(),
        };
        source.draw_text("hi", Point::new(3.0, 4.0), &font, 10.0, Color::BLACK);
        source.draw_image("./a.png", Rect::new(0.0, 0.0, 1.0, 1.0));
        let mut target = DrawList::new();
        source.replay(&mut target);
        assert_eq!(source, target);
        assert_eq!(target.text_content(), vec!["hi"]);
    }
}
