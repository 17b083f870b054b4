// User settings, read from `<preference dir>/draw-on-image/config.toml`.
// Anything missing falls back to the defaults below; an unreadable file is
// reported and ignored, never fatal.

use crate::error::Error;
use crate::render::DEFAULT_STROKE_WIDTH;
use crate::types::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DOCUMENTATION: &str = r##"# draw-on-image settings. Colors are written "#RRGGBB" or "#RRGGBBAA".
# Delete this file to go back to the defaults.

"##;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Width of every stroke, in pixels.
    pub stroke_width: f32,
    /// Colors offered by the swatches (and keys 1..9).
    pub palette: Vec<Color>,
    /// Color of the first stroke.
    pub initial_color: Color,
    pub window_width: usize,
    pub window_height: usize,
    /// Saved images are this many times the canvas size.
    pub export_scale: u32,
    /// Where saved drawings go. Defaults to the user's pictures folder.
    pub output_dir: Option<PathBuf>,
    /// Canvas color when no background picture is given.
    pub backdrop: Color,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stroke_width: DEFAULT_STROKE_WIDTH,
            palette: vec![Color::RED, Color::WHITE, Color::BLACK],
            initial_color: Color::WHITE,
            window_width: 800,
            window_height: 600,
            export_scale: 1,
            output_dir: None,
            backdrop: Color::rgb(0x30, 0x30, 0x30),
        }
    }
}

#[must_use]
pub fn preferences_dir() -> Option<PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

impl Config {
    const FILENAME: &'static str = "config.toml";
    pub const MAX_EXPORT_SCALE: u32 = 16;

    /// Default location of the settings file.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        preferences_dir().map(|dir| dir.join(Self::FILENAME))
    }

    pub fn from_toml(text: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validated()
    }

    /// Read `path`, or use the defaults if that fails for any reason.
    #[must_use]
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            log::warn!("No preferences dir found, using default settings.");
            return Self::default();
        };
        let loaded = std::fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|text| Self::from_toml(&text));
        match loaded {
            Ok(config) => {
                log::info!("settings loaded from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("settings at {} not used ({e}), using defaults.", path.display());
                Self::default()
            }
        }
    }

    /// Write the settings to `path`, with a short header.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = toml::ser::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, DOCUMENTATION.to_owned() + &body)?;
        Ok(())
    }

    /// Where saved drawings go: the configured dir, else Pictures, else the working dir.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(dirs::picture_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn validated(self) -> Result<Self, Error> {
        if !(self.stroke_width.is_finite() && self.stroke_width > 0.0) {
            return Err(Error::Config(format!("stroke_width must be positive, got {}", self.stroke_width)));
        }
        if self.palette.is_empty() || self.palette.len() > 9 {
            return Err(Error::Config(format!("palette needs 1 to 9 colors, got {}", self.palette.len())));
        }
        if !(1..=Self::MAX_EXPORT_SCALE).contains(&self.export_scale) {
            return Err(Error::Config(format!(
                "export_scale must be 1 to {}, got {}",
                Self::MAX_EXPORT_SCALE,
                self.export_scale
            )));
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(Error::Config("window size must be non-zero".into()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_file_overrides_some_fields() {
        let config = Config::from_toml(
            r##"
stroke_width = 9.5
palette = ["#00FF00", "#0000ff80"]
initial_color = "#00FF00"
"##,
        )
        .unwrap();
        assert_eq!(config.stroke_width, 9.5);
        assert_eq!(config.palette, vec![Color::rgb(0, 0xFF, 0), Color { r: 0, g: 0, b: 0xFF, a: 0x80 }]);
        assert_eq!(config.initial_color, Color::rgb(0, 0xFF, 0));
        assert_eq!(config.window_width, 800);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(Config::from_toml("stroke_width = 0.0").is_err());
        assert!(Config::from_toml("export_scale = 0").is_err());
        assert!(Config::from_toml("export_scale = 17").is_err());
        assert!(Config::from_toml("export_scale = 2000000000").is_err());
        assert_eq!(Config::from_toml("export_scale = 16").unwrap().export_scale, 16);
        assert!(Config::from_toml("palette = []").is_err());
        assert!(Config::from_toml(r##"backdrop = "#nothex""##).is_err());
    }

    #[test]
    fn missing_file_falls_back() {
        let config = Config::load_or_default(Some(Path::new("/definitely/not/here.toml")));
        assert_eq!(config, Config::default());
        assert_eq!(Config::load_or_default(None), Config::default());
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("draw-on-image-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        let config = Config { stroke_width: 3.0, export_scale: 2, ..Config::default() };
        config.save(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("# draw-on-image settings."));
        assert_eq!(Config::load_or_default(Some(&path)), config);
        let _ = std::fs::remove_dir_all(dir);
    }
}
