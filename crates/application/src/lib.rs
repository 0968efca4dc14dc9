//! Application orchestration layer for Monocle.
//!
//! The [`ViewerController`] owns all mutable viewer state (loaded manifests,
//! [`SurfaceNavigator`], [`PanelState`], transform) and is driven one event
//! at a time by the hosting UI. I/O happens behind the collaborator traits in
//! [`ports`].

mod config;
mod controller;
mod navigator;
mod panel;
pub mod ports;

pub use config::ViewerConfig;
pub use controller::{ViewerBuilder, ViewerController, ViewerSnapshot};
pub use navigator::SurfaceNavigator;
pub use panel::{PanelState, PanelTransition};
pub use ports::{
    FetchError, ImagePreloader, ListingItem, Manifest, ManifestFetcher, ManifestKind,
    ManifestRequest, ManifestResponse, MetadataView, RenderPort, RequestToken, SurfaceView,
    Thumbnail,
};

use monocle_core::Panel;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewerError {
    #[error("surface not found: {url}")]
    SurfaceNotFound { url: String },

    #[error("surface index {index} out of range ({len} surfaces)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("listing entry {index} out of range")]
    ListingEntryOutOfRange { index: usize },

    #[error("no facsimile loaded")]
    FacsimileNotLoaded,

    #[error("no listing loaded")]
    ListingNotLoaded,

    #[error("no surface selected")]
    NoSurfaceSelected,

    #[error("cannot enter panel {0}")]
    InvalidTransition(Panel),

    #[error("missing required binding: {0}")]
    MissingBinding(&'static str),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ViewerError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SurfaceNotFound { .. }
                | Self::IndexOutOfRange { .. }
                | Self::ListingEntryOutOfRange { .. }
        )
    }
}
