// Stroke capture: turns a pointer drag into an ordered list of strokes.
// Pure data; nothing in here knows about pixels or windows.

use crate::types::{Color, Point};

/// One continuous drag: a fixed color and the points it passed through.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    color: Color,
    points: Vec<Point>,
}

impl Stroke {
    fn new(color: Color) -> Self {
        Self { color, points: Vec::new() }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Points in drawing order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

/// Ordered strokes (oldest first = painted first) plus the color for the next one.
///
/// Only the last stroke is ever appended to. The list grows by one in
/// [`begin_stroke`](Self::begin_stroke), shrinks by one in [`undo`](Self::undo)
/// and empties in [`clear`](Self::clear). Nothing else touches it.
#[derive(Clone, Debug)]
pub struct StrokeModel {
    strokes: Vec<Stroke>,
    active_color: Color,
}

impl StrokeModel {
    pub fn new(active_color: Color) -> Self {
        Self { strokes: Vec::new(), active_color }
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn active_color(&self) -> Color {
        self.active_color
    }

    /// Start a new, empty stroke in the current color. It becomes the active one.
    pub fn begin_stroke(&mut self) {
        self.strokes.push(Stroke::new(self.active_color));
    }

    /// Append to the newest stroke. Without any stroke this does nothing.
    pub fn extend_active_stroke(&mut self, point: Point) {
        if let Some(active) = self.strokes.last_mut() {
            active.points.push(point);
        }
    }

    /// Drop the newest stroke, if there is one.
    pub fn undo(&mut self) -> Option<Stroke> {
        self.strokes.pop()
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    /// Color for strokes started from now on. Existing strokes keep theirs.
    pub fn set_color(&mut self, color: Color) {
        self.active_color = color;
    }
}

impl Default for StrokeModel {
    fn default() -> Self {
        Self::new(Color::WHITE)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Drawing,
}

/// A stroke model driven by pointer events, with a "needs repaint" flag the
/// renderer clears once it has caught up.
#[derive(Debug)]
pub struct Canvas {
    model: StrokeModel,
    state: GestureState,
    needs_display: bool,
}

impl Canvas {
    pub fn new(initial_color: Color) -> Self {
        Self { model: StrokeModel::new(initial_color), state: GestureState::Idle, needs_display: true }
    }

    pub fn model(&self) -> &StrokeModel {
        &self.model
    }

    #[cfg(test)]
    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn needs_display(&self) -> bool {
        self.needs_display
    }

    /// Called by whoever repainted the strokes.
    pub fn mark_displayed(&mut self) {
        self.needs_display = false;
    }

    /// Pointer went down on the canvas: always starts a fresh stroke.
    /// A second press while already drawing simply starts another one; only
    /// the newest stroke ever receives points.
    pub fn pointer_down(&mut self) {
        if self.state == GestureState::Drawing {
            log::debug!("pointer down while drawing; starting a new stroke");
        }
        self.model.begin_stroke();
        self.state = GestureState::Drawing;
        log::debug!("stroke #{} begun", self.model.strokes().len());
    }

    /// Pointer moved. Dropped while idle or when the location is unknown.
    pub fn pointer_move(&mut self, point: Option<Point>) {
        let Some(point) = point else { return };
        if self.state != GestureState::Drawing {
            return;
        }
        self.model.extend_active_stroke(point);
        self.needs_display = true;
    }

    /// Pointer released. The active stroke simply stops growing.
    pub fn pointer_up(&mut self) {
        self.state = GestureState::Idle;
    }

    pub fn undo(&mut self) {
        if self.model.undo().is_some() {
            log::debug!("undo ({} strokes left)", self.model.strokes().len());
            self.needs_display = true;
        }
    }

    pub fn clear(&mut self) {
        self.model.clear();
        self.needs_display = true;
        log::debug!("canvas cleared");
    }

    pub fn set_color(&mut self, color: Color) {
        self.model.set_color(color);
    }
}
