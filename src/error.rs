// One error type for the whole app.
// Every variant states *where* things went wrong. Only bootstrapping and the
// save sink ever produce these; stroke capture and painting never fail.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("window init error: {0}")]
    WindowInit(String), // Creating the window failed
    #[error("window update error: {0}")]
    WindowUpdate(String), // Pushing the framebuffer failed
    #[error("background load error: {0}")]
    BackgroundLoad(#[from] image::ImageError), // Opening/decoding the background failed
    #[error("image encode error: {0}")]
    ImageEncode(String), // Turning the flattened capture into a file failed
    #[error("config error: {0}")]
    Config(String), // Settings file unreadable or malformed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
