// Everything that is visible in the window, as a stack of layers:
// background picture, ink, and the transient buttons on top.

use crate::controls::{Action, Controls};
use crate::draw::PointerEvent;
use crate::render::CanvasRenderer;
use crate::scene::{self, Scene};
use crate::stroke::Canvas;
use crate::types::{Color, FrameBuffer, Layer};
use image::DynamicImage;
use std::ops::{Deref, DerefMut};

pub struct Stage {
    background: Layer,
    ink: Layer,
    controls_layer: Layer,
    controls: Controls,
    controls_visible: bool,
    canvas: Canvas,
    renderer: CanvasRenderer,
    /// The current press started on a button; ignore it until release.
    press_on_control: bool,
}

impl Stage {
    /// `background` decides the canvas size.
    pub fn new(background: Layer, renderer: CanvasRenderer, palette: &[Color], initial_color: Color) -> Self {
        let (w, h) = (background.width, background.height);
        let mut stage = Self {
            ink: Layer::transparent(w, h),
            controls_layer: Layer::transparent(w, h),
            controls: Controls::new(w, h, palette),
            controls_visible: true,
            canvas: Canvas::new(initial_color),
            renderer,
            background,
            press_on_control: false,
        };
        stage.refresh_controls();
        stage
    }

    #[cfg(test)]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    #[cfg(test)]
    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    /// Feed one pointer event. A press on a visible button yields its action
    /// instead of starting a stroke. A press only opens a stroke; points
    /// arrive with the moves that follow.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<Action> {
        match event {
            PointerEvent::Down(pos) => {
                let hit = pos.filter(|_| self.controls_visible).and_then(|p| self.controls.hit(p));
                if hit.is_some() {
                    self.press_on_control = true;
                    return hit;
                }
                self.canvas.pointer_down();
            }
            PointerEvent::Move(p) => {
                if !self.press_on_control {
                    self.canvas.pointer_move(Some(p));
                }
            }
            PointerEvent::Up => {
                self.press_on_control = false;
                self.canvas.pointer_up();
            }
        }
        None
    }

    /// Apply everything except `Save`, which needs a sink; that one is handed back.
    pub fn apply(&mut self, action: Action) -> Option<Action> {
        match action {
            Action::Undo => self.canvas.undo(),
            Action::Clear => self.canvas.clear(),
            Action::Color(i) => {
                if let Some(&color) = self.controls.palette().get(i) {
                    self.canvas.set_color(color);
                    self.refresh_controls();
                }
            }
            Action::Save => return Some(Action::Save),
        }
        None
    }

    /// Take the buttons off the stage until the guard is dropped.
    pub fn hide_controls(&mut self) -> ControlsHidden<'_> {
        self.controls_visible = false;
        ControlsHidden { stage: self }
    }

    /// Flattened background + ink, never the buttons.
    pub fn export(&mut self, scale: u32) -> DynamicImage {
        let lut = self.renderer.shared_lut();
        let mut hidden = self.hide_controls();
        let image = scene::capture_flattened_image(&mut *hidden, &lut, scale);
        drop(hidden);
        image
    }

    /// Catch up on pending repaints and composite into the window buffer.
    pub fn present_into(&mut self, fb: &mut FrameBuffer) {
        self.flush();
        scene::present_into(&*self, self.renderer.lut(), fb);
    }

    fn refresh_controls(&mut self) {
        self.controls.render(&mut self.controls_layer, self.canvas.model().active_color());
    }
}

impl Scene for Stage {
    fn size(&self) -> (usize, usize) {
        (self.background.width, self.background.height)
    }

    fn is_opaque(&self) -> bool {
        self.background.is_opaque()
    }

    fn flush(&mut self) {
        if self.canvas.needs_display() && self.renderer.repaint(&mut self.ink, self.canvas.model()) {
            self.canvas.mark_displayed();
        }
    }

    fn layers(&self) -> Vec<&Layer> {
        let mut layers = vec![&self.background, &self.ink];
        if self.controls_visible {
            layers.push(&self.controls_layer);
        }
        layers
    }
}

/// Buttons stay hidden while this is alive and come back when it drops.
pub struct ControlsHidden<'a> {
    stage: &'a mut Stage,
}

impl Deref for ControlsHidden<'_> {
    type Target = Stage;
    fn deref(&self) -> &Stage {
        &*self.stage
    }
}

impl DerefMut for ControlsHidden<'_> {
    fn deref_mut(&mut self) -> &mut Stage {
        &mut *self.stage
    }
}

impl Drop for ControlsHidden<'_> {
    fn drop(&mut self) {
        self.stage.controls_visible = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::DEFAULT_STROKE_WIDTH;
    use crate::types::Point;

    fn stage(w: usize, h: usize) -> Stage {
        Stage::new(
            Layer::filled(w, h, Color::rgb(0x20, 0x40, 0x60)),
            CanvasRenderer::new(DEFAULT_STROKE_WIDTH),
            &[Color::RED, Color::WHITE, Color::BLACK],
            Color::WHITE,
        )
    }

    fn drag(stage: &mut Stage, points: &[(f32, f32)]) {
        let mut events = points.iter().map(|&(x, y)| Point::new(x, y));
        stage.handle_pointer(PointerEvent::Down(events.next()));
        for p in events {
            stage.handle_pointer(PointerEvent::Move(p));
        }
        stage.handle_pointer(PointerEvent::Up);
    }

    #[test]
    fn drag_on_canvas_makes_a_stroke() {
        let mut stage = stage(200, 200);
        drag(&mut stage, &[(100.0, 100.0), (110.0, 100.0), (120.0, 105.0)]);
        let strokes = stage.canvas().model().strokes();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].points(), &[Point::new(110.0, 100.0), Point::new(120.0, 105.0)]);
    }

    #[test]
    fn click_without_moving_paints_nothing() {
        let mut stage = stage(200, 200);
        stage.apply(Action::Color(0));
        drag(&mut stage, &[(100.0, 100.0)]);
        let strokes = stage.canvas().model().strokes();
        assert_eq!(strokes.len(), 1);
        assert!(strokes[0].points().is_empty());

        let image = stage.export(1).to_rgb8();
        assert_eq!(image.get_pixel(100, 100).0, [0x20, 0x40, 0x60]);
    }

    #[test]
    fn press_on_button_does_not_draw() {
        let mut stage = stage(800, 600);
        let action = stage.handle_pointer(PointerEvent::Down(Some(Point::new(30.0, 10.0))));
        assert_eq!(action, Some(Action::Save));
        stage.handle_pointer(PointerEvent::Move(Point::new(200.0, 200.0)));
        stage.handle_pointer(PointerEvent::Up);
        assert!(stage.canvas().model().strokes().is_empty());
    }

    #[test]
    fn actions_reach_the_canvas() {
        let mut stage = stage(800, 600);
        assert_eq!(stage.apply(Action::Color(0)), None);
        drag(&mut stage, &[(100.0, 100.0), (150.0, 100.0)]);
        assert_eq!(stage.canvas().model().strokes()[0].color(), Color::RED);
        stage.apply(Action::Color(2));
        drag(&mut stage, &[(100.0, 200.0), (150.0, 200.0)]);
        stage.apply(Action::Undo);
        assert_eq!(stage.canvas().model().strokes().len(), 1);
        stage.apply(Action::Clear);
        assert!(stage.canvas().model().strokes().is_empty());
        assert_eq!(stage.apply(Action::Save), Some(Action::Save));
        // Out-of-range swatch is ignored.
        stage.apply(Action::Color(7));
        assert_eq!(stage.canvas().model().active_color(), Color::BLACK);
    }

    #[test]
    fn export_leaves_out_controls_and_restores_them() {
        let mut stage = stage(200, 100);
        // The save button covers the top-left corner on screen...
        let mut fb = FrameBuffer::new(200, 100);
        stage.present_into(&mut fb);
        assert_ne!(fb.pixels[5 * 200 + 30], 0x0020_4060);

        // ...but not in the export.
        let image = stage.export(1).to_rgb8();
        assert_eq!(image.get_pixel(30, 5).0, [0x20, 0x40, 0x60]);
        assert_eq!(image.get_pixel(100, 95).0, [0x20, 0x40, 0x60]);
        assert!(stage.controls_visible());
    }

    #[test]
    fn export_includes_pending_strokes() {
        let mut stage = stage(100, 100);
        stage.apply(Action::Color(0));
        drag(&mut stage, &[(10.0, 50.0), (11.0, 50.0), (90.0, 50.0)]);
        // No present in between: the export has to repaint by itself.
        let image = stage.export(1).to_rgb8();
        assert_eq!(image.get_pixel(50, 50).0, [0xFF, 0, 0]);
        assert_eq!(image.get_pixel(50, 20).0, [0x20, 0x40, 0x60]);
    }

    #[test]
    fn hidden_controls_do_not_catch_presses() {
        let mut stage = stage(800, 600);
        let mut hidden = stage.hide_controls();
        assert_eq!(hidden.handle_pointer(PointerEvent::Down(Some(Point::new(30.0, 10.0)))), None);
        hidden.handle_pointer(PointerEvent::Up);
        drop(hidden);
        assert_eq!(stage.canvas().model().strokes().len(), 1);
    }
}
