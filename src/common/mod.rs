//! Common module - stream primitives and protocol role traits shared across the crate

pub mod streams;
pub mod traits;

pub use streams::{
    named, read_full, Named, NamedReader, ProgressReader, ProgressWriter, SeekRead, Sizer,
    TeeWriter, Tick,
};
pub use traits::{BlobPuller, BlobPusher, BlobSource, ManifestPuller, ManifestPusher};
