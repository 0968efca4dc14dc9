//! Collaborator interfaces the controller is wired to by its host.

use monocle_core::{Facsimile, Listing, Panel, SurfaceLink, Theme, TransformState};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    Facsimile,
    Listing,
}

impl ManifestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestKind::Facsimile => "facsimile",
            ManifestKind::Listing => "listing",
        }
    }
}

impl std::fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic id of a manifest request. Only the latest token issued for a
/// [`ManifestKind`] is honoured on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRequest {
    pub token: RequestToken,
    pub kind: ManifestKind,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Manifest {
    Facsimile(Facsimile),
    Listing(Listing),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load {location}: {message}")]
pub struct FetchError {
    pub location: String,
    pub message: String,
}

impl FetchError {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestResponse {
    pub token: RequestToken,
    pub kind: ManifestKind,
    pub location: String,
    pub result: Result<Manifest, FetchError>,
}

impl ManifestResponse {
    pub fn for_request(request: &ManifestRequest, result: Result<Manifest, FetchError>) -> Self {
        Self {
            token: request.token,
            kind: request.kind,
            location: request.location.clone(),
            result,
        }
    }
}

/// Retrieves manifests without blocking; completions are handed back to
/// [`crate::ViewerController::complete`] by the host.
pub trait ManifestFetcher {
    fn fetch(&mut self, request: ManifestRequest);
}

/// Best-effort background loading of full-resolution images. Failures are
/// never reported back.
pub trait ImagePreloader {
    fn preload(&mut self, url: &str);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataView {
    pub title: String,
    pub rows: Vec<(String, String)>,
    pub listing_origin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub index: usize,
    pub image_url: String,
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    pub index: usize,
    pub title: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceView {
    pub index: usize,
    pub count: usize,
    pub image_url: String,
    pub src: String,
    pub links: Vec<SurfaceLink>,
}

/// What the controller needs from whatever draws the viewer. The renderer
/// translates state into visuals one way; it never feeds visuals back.
pub trait RenderPort {
    fn show_panel(&mut self, panel: Panel);
    fn render_metadata(&mut self, view: &MetadataView);
    fn render_listing(&mut self, items: &[ListingItem]);
    fn render_thumbnails(&mut self, thumbnails: &[Thumbnail]);
    fn render_surface(&mut self, view: &SurfaceView);
    fn render_transform(&mut self, transform: &TransformState);
    fn render_error(&mut self, message: &str);

    fn set_metadata_visible(&mut self, _visible: bool) {}

    fn apply_theme(&mut self, _theme: Theme) {}
}
