//! Test helpers and fixtures.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context as _;
use monocle_application::{
    FetchError, ImagePreloader, ListingItem, Manifest, ManifestFetcher, ManifestKind,
    ManifestRequest, ManifestResponse, MetadataView, RenderPort, SurfaceView, Thumbnail,
    ViewerController, ViewerError,
};
use monocle_core::{
    Facsimile, Listing, ListingEntry, Panel, Surface, Theme, TransformState, ViewerSettings,
};

pub fn make_settings() -> ViewerSettings {
    ViewerSettings::default()
}

pub fn make_facsimile(title: &str, image_urls: &[&str]) -> Facsimile {
    Facsimile {
        title: title.to_string(),
        text_metadata: [
            ("authority", "Example Press"),
            ("source", "Box 4, folder 2"),
            ("imageBaseUrl", "images/"),
            ("thumbnailBaseUrl", "thumbs/"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect(),
        surfaces: image_urls
            .iter()
            .map(|url| Surface {
                image_url: url.to_string(),
                thumbnail_url: url.to_string(),
                links: Vec::new(),
            })
            .collect(),
    }
}

pub fn make_listing(facs_base_url: &str, entries: &[(&str, &str)]) -> Listing {
    Listing {
        facs_base_url: facs_base_url.to_string(),
        facsimiles: entries
            .iter()
            .map(|(title, url)| ListingEntry {
                title: title.to_string(),
                url: url.to_string(),
            })
            .collect(),
    }
}

/// A facsimile manifest as published, using the legacy `facsTitleMain`
/// title key and per-surface links.
pub fn sample_facsimile_json() -> &'static str {
    r#"{
        "facsTitleMain": "Letters, 1841",
        "textMetadata": {
            "authority": "Example Press",
            "availability": "Public domain",
            "imageBaseUrl": "images/",
            "thumbnailBaseUrl": "thumbs/"
        },
        "surfaces": [
            {"imageUrl": "a.jpg", "thumbnailUrl": "a_t.jpg"},
            {
                "imageUrl": "b.jpg",
                "thumbnailUrl": "b_t.jpg",
                "links": [{"caption": "Transcription", "href": "b.html"}]
            },
            {"imageUrl": "c.jpg", "thumbnailUrl": "c_t.jpg"}
        ]
    }"#
}

/// A scratch directory unique to this process and `name`.
pub fn temp_dir(name: &str) -> anyhow::Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("monocle-test-{}-{name}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Everything the controller pushed to its renderer, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Panel(Panel),
    Metadata(MetadataView),
    Listing(Vec<ListingItem>),
    Thumbnails(Vec<Thumbnail>),
    Surface(SurfaceView),
    Transform(TransformState),
    Error(String),
    MetadataVisible(bool),
    Theme(Theme),
}

#[derive(Debug, Clone, Default)]
pub struct RecordingFetcher(pub Rc<RefCell<Vec<ManifestRequest>>>);

impl ManifestFetcher for RecordingFetcher {
    fn fetch(&mut self, request: ManifestRequest) {
        self.0.borrow_mut().push(request);
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer(pub Rc<RefCell<Vec<RenderCall>>>);

impl RecordingRenderer {
    fn push(&self, call: RenderCall) {
        self.0.borrow_mut().push(call);
    }
}

impl RenderPort for RecordingRenderer {
    fn show_panel(&mut self, panel: Panel) {
        self.push(RenderCall::Panel(panel));
    }

    fn render_metadata(&mut self, view: &MetadataView) {
        self.push(RenderCall::Metadata(view.clone()));
    }

    fn render_listing(&mut self, items: &[ListingItem]) {
        self.push(RenderCall::Listing(items.to_vec()));
    }

    fn render_thumbnails(&mut self, thumbnails: &[Thumbnail]) {
        self.push(RenderCall::Thumbnails(thumbnails.to_vec()));
    }

    fn render_surface(&mut self, view: &SurfaceView) {
        self.push(RenderCall::Surface(view.clone()));
    }

    fn render_transform(&mut self, transform: &TransformState) {
        self.push(RenderCall::Transform(*transform));
    }

    fn render_error(&mut self, message: &str) {
        self.push(RenderCall::Error(message.to_string()));
    }

    fn set_metadata_visible(&mut self, visible: bool) {
        self.push(RenderCall::MetadataVisible(visible));
    }

    fn apply_theme(&mut self, theme: Theme) {
        self.push(RenderCall::Theme(theme));
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingPreloader(pub Rc<RefCell<Vec<String>>>);

impl ImagePreloader for RecordingPreloader {
    fn preload(&mut self, url: &str) {
        self.0.borrow_mut().push(url.to_string());
    }
}

/// A controller wired to recording collaborators. Manifest requests are
/// answered by hand through the `respond_*` helpers.
pub struct ViewerHarness {
    pub controller: ViewerController,
    pub requests: RecordingFetcher,
    pub renders: RecordingRenderer,
    pub preloads: RecordingPreloader,
}

impl ViewerHarness {
    pub fn new() -> Result<Self, ViewerError> {
        Self::with_settings(make_settings())
    }

    pub fn with_settings(settings: ViewerSettings) -> Result<Self, ViewerError> {
        let requests = RecordingFetcher::default();
        let renders = RecordingRenderer::default();
        let preloads = RecordingPreloader::default();
        let controller = ViewerController::builder()
            .settings(settings)
            .fetcher(requests.clone())
            .renderer(renders.clone())
            .preloader(preloads.clone())
            .build()?;
        Ok(Self {
            controller,
            requests,
            renders,
            preloads,
        })
    }

    /// Latest request of `kind`, if any was issued.
    pub fn last_request(&self, kind: ManifestKind) -> Option<ManifestRequest> {
        self.requests
            .0
            .borrow()
            .iter()
            .rev()
            .find(|request| request.kind == kind)
            .cloned()
    }

    pub fn respond(
        &mut self,
        request: &ManifestRequest,
        result: Result<Manifest, FetchError>,
    ) -> Result<(), ViewerError> {
        self.controller
            .complete(ManifestResponse::for_request(request, result))
    }

    /// Answers the latest facsimile request.
    pub fn respond_facsimile(&mut self, facsimile: Facsimile) -> anyhow::Result<()> {
        let request = self
            .last_request(ManifestKind::Facsimile)
            .context("no facsimile request was issued")?;
        self.respond(&request, Ok(Manifest::Facsimile(facsimile)))?;
        Ok(())
    }

    /// Answers the latest listing request.
    pub fn respond_listing(&mut self, listing: Listing) -> anyhow::Result<()> {
        let request = self
            .last_request(ManifestKind::Listing)
            .context("no listing request was issued")?;
        self.respond(&request, Ok(Manifest::Listing(listing)))?;
        Ok(())
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.renders.0.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.renders.0.borrow_mut().clear();
    }

    pub fn panels_shown(&self) -> Vec<Panel> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RenderCall::Panel(panel) => Some(panel),
                _ => None,
            })
            .collect()
    }

    pub fn preloaded(&self) -> Vec<String> {
        self.preloads.0.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_carry_base_urls() {
        let facsimile = make_facsimile("Letters", &["a.jpg"]);
        assert_eq!(facsimile.image_base_url(), "images/");
        assert_eq!(facsimile.image_url(&facsimile.surfaces[0]), "images/a.jpg");
    }

    #[test]
    fn facsimile_fixture_round_trips_through_json() {
        let facsimile = make_facsimile("Letters", &["a.jpg", "b.jpg"]);
        let json = serde_json::to_string(&facsimile).unwrap();
        assert!(json.contains("\"imageUrl\":\"a.jpg\""));
        let back: Facsimile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, facsimile);
    }

    #[test]
    fn harness_records_requests() -> anyhow::Result<()> {
        let mut harness = ViewerHarness::new()?;
        harness.controller.load_listing("lists/all.json");
        let request = harness.last_request(ManifestKind::Listing).unwrap();
        assert_eq!(request.location, "lists/all.json");
        assert!(harness.respond_facsimile(Facsimile::default()).is_err());
        Ok(())
    }
}
