//! Host-side I/O for the viewer: manifest loading and image decoding.
//!
//! Both run on worker threads so the UI event loop never blocks; results
//! are picked up by polling.

mod images;
mod loader;

pub use images::{ImageState, ImageStore};
pub use loader::{ManifestLoader, ManifestSender, load_manifest, parse_manifest, read_location};
