// Where a saved drawing ends up.
// Saving happens off the UI thread; the outcome comes back through a callback.
// A failed save is only reported, the canvas is never touched.

use crate::error::Error;
use image::{DynamicImage, ImageFormat};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;

/// Called once with the outcome of a save.
pub type Completion = Box<dyn FnOnce(Result<PathBuf, Error>) + Send + 'static>;

pub trait ImageSink {
    /// Start persisting `image`. Returns immediately; `done` runs when finished.
    fn persist(&self, image: DynamicImage, done: Completion);
}

/// Writes `drawing-<timestamp>.png` files into one directory.
pub struct PngDirSink {
    dir: PathBuf,
}

impl PngDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn timestamp() -> String {
        chrono::Local::now().format("%Y%m%d-%H%M%S%.3f").to_string()
    }

    /// `drawing-<stamp>.png`, or `drawing-<stamp>-<n>.png` for the n-th clash.
    fn file_name(stamp: &str, n: u32) -> String {
        if n == 0 {
            format!("drawing-{stamp}.png")
        } else {
            format!("drawing-{stamp}-{n}.png")
        }
    }

    /// Create a file that did not exist before. Existing drawings are never replaced.
    fn create_unique(dir: &Path, stamp: &str) -> Result<(PathBuf, File), Error> {
        for n in 0..1000 {
            let path = dir.join(Self::file_name(stamp, n));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(Error::ImageEncode(format!("no free file name for drawing-{stamp} in {}", dir.display())))
    }

    fn write(dir: &Path, stamp: &str, image: &DynamicImage) -> Result<PathBuf, Error> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::ImageEncode("capture is empty".into()));
        }
        std::fs::create_dir_all(dir)?;
        let (path, file) = Self::create_unique(dir, stamp)?;
        let mut out = BufWriter::new(file);
        let written = image
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| Error::ImageEncode(format!("{}: {e}", path.display())))
            .and_then(|()| out.flush().map_err(Error::from));
        if let Err(e) = written {
            drop(out);
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }
        Ok(path)
    }
}

impl ImageSink for PngDirSink {
    fn persist(&self, image: DynamicImage, done: Completion) {
        let dir = self.dir.clone();
        let spawned = thread::Builder::new()
            .name("png-sink".into())
            .spawn(move || done(Self::write(&dir, &Self::timestamp(), &image)));
        if let Err(e) = spawned {
            log::error!("could not start the save thread: {e}");
        }
    }
}

/// The usual completion: log and move on.
pub fn log_outcome() -> Completion {
    Box::new(|outcome| match outcome {
        Ok(path) => log::info!("saved {}", path.display()),
        Err(e) => log::error!("save failed: {e}"),
    })
}
