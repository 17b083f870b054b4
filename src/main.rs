// What you SEE:
// • Your picture fills the window (or a plain backdrop if none was given).
// • Hold Left Mouse and drag: you draw strokes on top of it.
// • Bottom bar: UNDO | color swatches | CLEAR.  Top-left: SAVE.
// • Keys: Z undo, C clear, 1..9 pick a color, S save, ESC quits.
// • Saved images contain the picture and your strokes, never the buttons.
//
// Usage: draw-on-image [--config <file.toml>] [background-image]

mod background;
mod config;
mod controls;
mod draw;
mod error;
mod gamma;
mod render;
mod scene;
mod sink;
mod stage;
mod stroke;
mod types;

use config::Config;
use controls::{Action, Controls};
use draw::{Drawer, draw_crosshair};
use error::Error;
use render::CanvasRenderer;
use sink::{ImageSink, PngDirSink};
use stage::Stage;
use std::path::PathBuf;
use types::FrameBuffer;

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    background: Option<PathBuf>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = std::ffi::OsString>) -> Result<Self, Error> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            if arg == "--config" {
                let path = args.next().ok_or_else(|| Error::Config("--config needs a path".into()))?;
                parsed.config = Some(path.into());
            } else if parsed.background.is_none() {
                parsed.background = Some(arg.into());
            } else {
                return Err(Error::Config(format!("unexpected argument {}", arg.to_string_lossy())));
            }
        }
        Ok(parsed)
    }
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse(std::env::args_os().skip(1))?;
    let config_path = args.config.clone().or_else(Config::default_path);
    let config = Config::load_or_default(config_path.as_deref());
    // First run: leave an editable copy of the defaults behind.
    if let (None, Some(path)) = (&args.config, &config_path) {
        if !path.exists() {
            match config.save(path) {
                Ok(()) => log::info!("wrote default settings to {}", path.display()),
                Err(e) => log::warn!("could not write default settings: {e}"),
            }
        }
    }

    /* --- Canvas + window setup ---
       Visual: window opens showing the background picture. */
    let (w, h) = (config.window_width, config.window_height);
    let background = match &args.background {
        Some(path) => background::load(path, w, h)?,
        None => {
            log::info!("no background given, drawing on a plain backdrop");
            background::solid(w, h, config.backdrop)
        }
    };
    let mut drawer = Drawer::new("Draw on Image", w, h)?;

    let renderer = CanvasRenderer::new(config.stroke_width);
    log::info!("stroke width {}px, export scale {}x", renderer.stroke_width(), config.export_scale);
    let mut stage = Stage::new(background, renderer, &config.palette, config.initial_color);
    let saver = PngDirSink::new(config.output_dir());
    log::info!("drawings will be saved to {}", saver.dir().display());

    let mut screen = FrameBuffer::new(w, h);

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        /* 1) Pointer: press starts a stroke (or hits a button), drag extends it. */
        let mut actions: Vec<Action> = Vec::new();
        for event in drawer.poll_pointer() {
            actions.extend(stage.handle_pointer(event));
        }

        /* 2) Keyboard shortcuts mirror the buttons. */
        for key in Controls::SHORTCUT_KEYS {
            if drawer.key_pressed_once(key) {
                actions.extend(stage.controls().shortcut(key));
            }
        }

        /* 3) Apply. Save = hide buttons, flatten, restore, hand off to the sink. */
        for action in actions {
            if stage.apply(action) == Some(Action::Save) {
                let image = stage.export(config.export_scale);
                saver.persist(image, sink::log_outcome());
            }
        }

        /* 4) Repaint what changed and show it, with a crosshair at the cursor. */
        stage.present_into(&mut screen);
        if let Some(p) = drawer.mouse_pos() {
            draw_crosshair(&mut screen, p.x as i32, p.y as i32, 8, 0x00_FF_CC_33);
        }
        drawer.present(&screen)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn parse(args: &[&str]) -> Result<Args, Error> {
        Args::parse(args.iter().map(OsString::from))
    }

    #[test]
    fn args_background_and_config() {
        let args = parse(&["--config", "c.toml", "corn.jpg"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("c.toml")));
        assert_eq!(args.background, Some(PathBuf::from("corn.jpg")));
        assert_eq!(parse(&[]).unwrap(), Args::default());
    }

    #[test]
    fn args_errors() {
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["a.png", "b.png"]).is_err());
    }
}
