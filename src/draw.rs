// Window + software drawing utilities.
// Visual effects provided here:
// 1) A window that shows the background with your ink on top.
// 2) Pointer events (press / drag / release) turned out of polled mouse state.
// 3) A crosshair and a tiny 5x7 bitmap font for the on-screen buttons.

use crate::error::Error;
use crate::types::{FrameBuffer, Layer, Point};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

/// One step of a drag, in canvas coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    /// Button went down; the location is unknown if the cursor is outside.
    Down(Option<Point>),
    Move(Point),
    Up,
}

pub struct Drawer {
    window: Window, // the on-screen window you see
    was_down: bool,
    last_pos: Option<Point>,
}

impl Drawer {
    /// Create a window of the canvas size.
    /// Visual: a new empty window appears with your chosen title.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_target_fps(60);
        Ok(Self { window, was_down: false, last_pos: None })
    }

    /// Push the pixels for this frame to the screen.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    /// Current mouse position, or `None` while the cursor is outside the window.
    pub fn mouse_pos(&self) -> Option<Point> {
        self.window
            .get_mouse_pos(MouseMode::Discard)
            .map(|(x, y)| Point::new(x, y))
    }

    pub fn key_pressed_once(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }

    /// Turn this frame's mouse state into pointer events.
    /// Moves are only reported while the button is held and the cursor actually moved.
    pub fn poll_pointer(&mut self) -> Vec<PointerEvent> {
        let down = self.window.get_mouse_down(MouseButton::Left);
        let pos = self.mouse_pos();
        let mut events = Vec::new();

        match (self.was_down, down) {
            (false, true) => events.push(PointerEvent::Down(pos)),
            (true, true) => {
                if let Some(p) = pos {
                    if self.last_pos != Some(p) {
                        events.push(PointerEvent::Move(p));
                    }
                }
            }
            (true, false) => events.push(PointerEvent::Up),
            (false, false) => {}
        }

        self.was_down = down;
        self.last_pos = pos;
        events
    }
}

/* ---------- Software drawing: pixels, rectangles, crosshair, tiny bitmap font ---------- */

/// Anything we can put raw pixels into.
pub trait PixelTarget {
    fn size(&self) -> (usize, usize);
    fn set(&mut self, idx: usize, color: u32);

    /// Put a pixel if (x,y) is inside bounds.
    #[inline]
    fn put_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        let (w, h) = self.size();
        if x >= w || y >= h {
            return;
        }
        self.set(y * w + x, color);
    }
}

impl PixelTarget for FrameBuffer {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }
    fn set(&mut self, idx: usize, color: u32) {
        // minifb ignores the top byte; keep it clean anyway.
        self.pixels[idx] = color & 0x00FF_FFFF;
    }
}

impl PixelTarget for Layer {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }
    fn set(&mut self, idx: usize, color: u32) {
        self.pixels[idx] = color;
    }
}

/// Draw a thin line between (x0,y0) and (x1,y1) using Bresenham.
fn draw_line<T: PixelTarget + ?Sized>(fb: &mut T, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    let (mut x0, mut y0) = (x0, y0);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        fb.put_pixel(x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Solid rectangle, clipped to the target.
pub fn fill_rect<T: PixelTarget + ?Sized>(fb: &mut T, x: i32, y: i32, w: i32, h: i32, color: u32) {
    for yy in y..y + h {
        for xx in x..x + w {
            fb.put_pixel(xx, yy, color);
        }
    }
}

/// 1-pixel rectangle outline.
pub fn stroke_rect<T: PixelTarget + ?Sized>(fb: &mut T, x: i32, y: i32, w: i32, h: i32, color: u32) {
    if w <= 0 || h <= 0 {
        return;
    }
    draw_line(fb, x, y, x + w - 1, y, color);
    draw_line(fb, x, y + h - 1, x + w - 1, y + h - 1, color);
    draw_line(fb, x, y, x, y + h - 1, color);
    draw_line(fb, x + w - 1, y, x + w - 1, y + h - 1, color);
}

/// Draw a small crosshair centered at (cx,cy).
/// Visual: a "+" shape (with a tiny gap at the center) follows your mouse.
pub fn draw_crosshair<T: PixelTarget + ?Sized>(fb: &mut T, cx: i32, cy: i32, size: i32, color: u32) {
    draw_line(fb, cx - size, cy, cx - 2, cy, color);
    draw_line(fb, cx + 2, cy, cx + size, cy, color);
    draw_line(fb, cx, cy - size, cx, cy - 2, color);
    draw_line(fb, cx, cy + 2, cx, cy + size, color);
    fb.put_pixel(cx, cy, color);
}

/* ---------- 5x7 bitmap font (ASCII subset for the button labels) ---------- */

pub const GLYPH_ADVANCE: i32 = 6; // 5 pixels glyph width + 1 pixel spacing
pub const GLYPH_HEIGHT: i32 = 7;

/// Return a 5x7 glyph bitmap for a limited character set.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'N' => g!(0b10001,0b11001,0b10101,0b10011,0b10001,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),

        _ => None,
    }
}

/// Draw a single 5x7 character at (x,y) with a 1-pixel black shadow.
fn draw_char_5x7<T: PixelTarget + ?Sized>(fb: &mut T, x: i32, y: i32, ch: char, color: u32) {
    let Some(rows) = glyph5x7(ch) else { return };
    for (shadow, ink) in [(1, 0xFF00_0000), (0, color)] {
        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..5 {
                if (rowbits & (1 << (4 - rx))) != 0 {
                    fb.put_pixel(x + rx + shadow, y + ry as i32 + shadow, ink);
                }
            }
        }
    }
}

/// Draw a text string using 5x7 glyphs.
pub fn draw_text_5x7<T: PixelTarget + ?Sized>(fb: &mut T, mut x: i32, y: i32, text: &str, color: u32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color);
        x += GLYPH_ADVANCE;
    }
}

/// Pixel width of `text` in the 5x7 font.
pub fn text_width(text: &str) -> i32 {
    (text.chars().count() as i32 * GLYPH_ADVANCE - 1).max(0)
}
