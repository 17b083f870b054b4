// On-screen buttons. They live in their own layer so a save can leave them out.
// Visual: a bar along the bottom (Undo | color swatches | Clear) and a Save
// button in the top-left corner.

use crate::draw::{self, GLYPH_HEIGHT};
use crate::types::{Color, Layer, Point};
use minifb::Key;

const MARGIN: i32 = 20;
const BAR_HEIGHT: i32 = 44;
const SAVE_WIDTH: i32 = 60;
const SAVE_HEIGHT: i32 = 32;
const BUTTON_FILL: Color = Color::DARK_GRAY;

/// What a button (or its shortcut) asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Undo,
    Clear,
    /// Index into the palette.
    Color(usize),
    Save,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn contains(&self, p: Point) -> bool {
        let (x, y) = (p.x.floor() as i32, p.y.floor() as i32);
        x >= self.x && y >= self.y && x < self.x + self.w && y < self.y + self.h
    }
}

#[derive(Clone, Debug)]
pub struct Button {
    pub rect: Rect,
    pub action: Action,
    pub label: Option<&'static str>,
    pub fill: Color,
}

pub struct Controls {
    buttons: Vec<Button>,
    palette: Vec<Color>,
}

impl Controls {
    /// Lay out the buttons for a canvas of `width x height`.
    pub fn new(width: usize, height: usize, palette: &[Color]) -> Self {
        let (w, h) = (width as i32, height as i32);
        let mut buttons = Vec::new();

        // Bottom bar: Undo, one swatch per palette color, Clear. Equal widths.
        let slots = palette.len() as i32 + 2;
        let bar_w = (w - 2 * MARGIN).max(slots);
        let slot_w = bar_w / slots;
        let bar_y = h - BAR_HEIGHT;
        let slot = |i: i32| Rect { x: MARGIN + i * slot_w, y: bar_y, w: slot_w, h: BAR_HEIGHT };

        buttons.push(Button { rect: slot(0), action: Action::Undo, label: Some("UNDO"), fill: BUTTON_FILL });
        for (i, &color) in palette.iter().enumerate() {
            buttons.push(Button { rect: slot(i as i32 + 1), action: Action::Color(i), label: None, fill: color });
        }
        buttons.push(Button { rect: slot(slots - 1), action: Action::Clear, label: Some("CLEAR"), fill: BUTTON_FILL });

        buttons.push(Button {
            rect: Rect { x: MARGIN, y: 0, w: SAVE_WIDTH, h: SAVE_HEIGHT },
            action: Action::Save,
            label: Some("SAVE"),
            fill: BUTTON_FILL,
        });

        Self { buttons, palette: palette.to_vec() }
    }

    #[cfg(test)]
    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    pub fn palette(&self) -> &[Color] {
        &self.palette
    }

    /// The action of the button under `p`, if any.
    pub fn hit(&self, p: Point) -> Option<Action> {
        self.buttons.iter().find(|b| b.rect.contains(p)).map(|b| b.action)
    }

    /// Keyboard equivalent of a button: Z undo, C clear, S save, 1..9 palette.
    pub fn shortcut(&self, key: Key) -> Option<Action> {
        let digit = match key {
            Key::Z => return Some(Action::Undo),
            Key::C => return Some(Action::Clear),
            Key::S => return Some(Action::Save),
            Key::Key1 => 0,
            Key::Key2 => 1,
            Key::Key3 => 2,
            Key::Key4 => 3,
            Key::Key5 => 4,
            Key::Key6 => 5,
            Key::Key7 => 6,
            Key::Key8 => 7,
            Key::Key9 => 8,
            _ => return None,
        };
        (digit < self.palette.len()).then_some(Action::Color(digit))
    }

    /// Keys worth polling for [`shortcut`](Self::shortcut).
    pub const SHORTCUT_KEYS: [Key; 12] = [
        Key::Z, Key::C, Key::S,
        Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5,
        Key::Key6, Key::Key7, Key::Key8, Key::Key9,
    ];

    /// Paint the buttons into `layer`, which is cleared first.
    /// `active` is the current stroke color; its swatch gets a white frame.
    pub fn render(&self, layer: &mut Layer, active: Color) {
        layer.pixels.fill(0);
        for button in &self.buttons {
            let Rect { x, y, w, h } = button.rect;
            draw::fill_rect(layer, x, y, w, h, button.fill.to_argb());
            if let Some(label) = button.label {
                let tx = x + (w - draw::text_width(label)) / 2;
                let ty = y + (h - GLYPH_HEIGHT) / 2;
                draw::draw_text_5x7(layer, tx, ty, label, Color::WHITE.to_argb());
            }
            if matches!(button.action, Action::Color(_)) {
                let frame = if button.fill == active { Color::WHITE } else { BUTTON_FILL };
                draw::stroke_rect(layer, x, y, w, h, frame.to_argb());
                draw::stroke_rect(layer, x + 1, y + 1, w - 2, h - 2, frame.to_argb());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> Vec<Color> {
        vec![Color::RED, Color::WHITE, Color::BLACK]
    }

    #[test]
    fn bar_has_undo_swatches_clear() {
        let controls = Controls::new(800, 600, &palette());
        let actions: Vec<Action> = controls.buttons().iter().map(|b| b.action).collect();
        assert_eq!(
            actions,
            vec![Action::Undo, Action::Color(0), Action::Color(1), Action::Color(2), Action::Clear, Action::Save]
        );
    }

    #[test]
    fn hit_testing() {
        let controls = Controls::new(800, 600, &palette());
        // Bar spans 20..780 in 5 slots of 152px, along the bottom 44px.
        assert_eq!(controls.hit(Point::new(25.0, 590.0)), Some(Action::Undo));
        assert_eq!(controls.hit(Point::new(180.0, 590.0)), Some(Action::Color(0)));
        assert_eq!(controls.hit(Point::new(700.0, 570.0)), Some(Action::Clear));
        assert_eq!(controls.hit(Point::new(30.0, 10.0)), Some(Action::Save));
        assert_eq!(controls.hit(Point::new(400.0, 300.0)), None);
        assert_eq!(controls.hit(Point::new(5.0, 590.0)), None);
    }

    #[test]
    fn shortcuts_respect_palette_size() {
        let controls = Controls::new(800, 600, &palette());
        assert_eq!(controls.shortcut(Key::Z), Some(Action::Undo));
        assert_eq!(controls.shortcut(Key::Key3), Some(Action::Color(2)));
        assert_eq!(controls.shortcut(Key::Key4), None);
        assert_eq!(controls.shortcut(Key::Q), None);
    }

    #[test]
    fn render_paints_only_button_areas() {
        let controls = Controls::new(200, 100, &palette());
        let mut layer = Layer::transparent(200, 100);
        controls.render(&mut layer, Color::RED);
        // Middle of the canvas stays see-through.
        assert_eq!(layer.get(100, 40), 0);
        // Save button and bar are opaque.
        assert_eq!(layer.get(MARGIN as usize + 1, 30) >> 24, 0xFF);
        assert_eq!(layer.get(100, 99) >> 24, 0xFF);
    }
}
