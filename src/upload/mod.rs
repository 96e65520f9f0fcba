//! Upload module for chunked uploads and progress display

pub mod chunked;
pub mod progress;

pub use chunked::{ChunkedUploader, UploadSession};
pub use progress::{Display, Palette, Render};
