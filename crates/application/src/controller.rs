use std::collections::HashMap;

use monocle_core::{
    Facsimile, Listing, Panel, Point, Theme, TransformState, ViewerSettings, ZoomStep,
    resolve_url,
};
use tracing::{debug, error, info, warn};

use crate::ports::{
    FetchError, ImagePreloader, ListingItem, Manifest, ManifestFetcher, ManifestKind,
    ManifestRequest, ManifestResponse, MetadataView, RenderPort, RequestToken, SurfaceView,
    Thumbnail,
};
use crate::{PanelState, SurfaceNavigator, ViewerConfig, ViewerError};

/// Read-only view of controller state for hosts.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerSnapshot {
    pub panel: Panel,
    pub metadata_visible: bool,
    pub current_index: Option<usize>,
    pub surface_count: usize,
    pub transform: TransformState,
    pub loading: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
struct Loaded<T> {
    value: T,
    location: String,
}

#[derive(Default)]
pub struct ViewerBuilder {
    settings: ViewerSettings,
    fetcher: Option<Box<dyn ManifestFetcher>>,
    renderer: Option<Box<dyn RenderPort>>,
    preloader: Option<Box<dyn ImagePreloader>>,
}

impl ViewerBuilder {
    pub fn settings(mut self, settings: ViewerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn fetcher(mut self, fetcher: impl ManifestFetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    pub fn renderer(mut self, renderer: impl RenderPort + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    pub fn preloader(mut self, preloader: impl ImagePreloader + 'static) -> Self {
        self.preloader = Some(Box::new(preloader));
        self
    }

    /// Fails when a required collaborator is missing. Without a preloader
    /// the viewer runs degraded: images load only when displayed.
    pub fn build(self) -> Result<ViewerController, ViewerError> {
        let fetcher = self
            .fetcher
            .ok_or(ViewerError::MissingBinding("manifest fetcher"))?;
        let renderer = self
            .renderer
            .ok_or(ViewerError::MissingBinding("renderer"))?;
        if self.preloader.is_none() {
            warn!("no image preloader bound; surfaces load on demand");
        }
        let mut settings = self.settings;
        settings.normalize();

        Ok(ViewerController {
            settings,
            fetcher,
            renderer,
            preloader: self.preloader,
            facsimile: None,
            listing: None,
            navigator: SurfaceNavigator::default(),
            panel: PanelState::new(),
            transform: TransformState::default(),
            initial_surface: None,
            next_token: 0,
            pending: HashMap::new(),
            last_error: None,
            metadata_revealed: false,
        })
    }
}

pub struct ViewerController {
    settings: ViewerSettings,
    fetcher: Box<dyn ManifestFetcher>,
    renderer: Box<dyn RenderPort>,
    preloader: Option<Box<dyn ImagePreloader>>,
    facsimile: Option<Loaded<Facsimile>>,
    listing: Option<Loaded<Listing>>,
    navigator: SurfaceNavigator,
    panel: PanelState,
    transform: TransformState,
    initial_surface: Option<String>,
    next_token: u64,
    pending: HashMap<ManifestKind, RequestToken>,
    last_error: Option<String>,
    metadata_revealed: bool,
}

impl ViewerController {
    pub fn builder() -> ViewerBuilder {
        ViewerBuilder::default()
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    pub fn panel(&self) -> Panel {
        self.panel.active()
    }

    pub fn panel_state(&self) -> &PanelState {
        &self.panel
    }

    pub fn navigator(&self) -> &SurfaceNavigator {
        &self.navigator
    }

    pub fn transform(&self) -> &TransformState {
        &self.transform
    }

    pub fn facsimile(&self) -> Option<&Facsimile> {
        self.facsimile.as_ref().map(|loaded| &loaded.value)
    }

    pub fn facsimile_location(&self) -> Option<&str> {
        self.facsimile.as_ref().map(|loaded| loaded.location.as_str())
    }

    pub fn listing(&self) -> Option<&Listing> {
        self.listing.as_ref().map(|loaded| &loaded.value)
    }

    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        ViewerSnapshot {
            panel: self.panel.active(),
            metadata_visible: self.panel.metadata_visible(),
            current_index: self.navigator.current_index(),
            surface_count: self.navigator.len(),
            transform: self.transform,
            loading: self.is_loading(),
            last_error: self.last_error.clone(),
        }
    }

    pub fn initialize(&mut self, config: ViewerConfig) {
        if config.is_empty() {
            warn!("no facsimile or listing configured");
            self.renderer
                .render_error("No facsimile or listing was specified.");
            return;
        }
        self.initial_surface = config.initial_surface;
        if let Some(location) = config.facsimile_source {
            self.load_facsimile(location);
        }
        if let Some(location) = config.listing_source {
            self.load_listing(location);
        }
    }

    pub fn load_facsimile(&mut self, location: impl Into<String>) -> RequestToken {
        self.request(ManifestKind::Facsimile, location.into())
    }

    pub fn load_listing(&mut self, location: impl Into<String>) -> RequestToken {
        self.request(ManifestKind::Listing, location.into())
    }

    /// Loads the facsimile behind a listing entry, replacing any pending
    /// facsimile request.
    pub fn open_listing_entry(&mut self, index: usize) -> Result<RequestToken, ViewerError> {
        let listing = self.listing.as_ref().ok_or(ViewerError::ListingNotLoaded)?;
        let entry = listing
            .value
            .facsimiles
            .get(index)
            .ok_or(ViewerError::ListingEntryOutOfRange { index })?;
        let location = resolve_url(&listing.location, &entry.url);
        Ok(self.load_facsimile(location))
    }

    fn request(&mut self, kind: ManifestKind, location: String) -> RequestToken {
        self.next_token += 1;
        let token = RequestToken(self.next_token);
        if let Some(previous) = self.pending.insert(kind, token) {
            debug!(%kind, superseded = previous.0, "superseding pending request");
        }
        info!(%kind, %location, token = token.0, "requesting manifest");
        self.fetcher.fetch(ManifestRequest {
            token,
            kind,
            location,
        });
        token
    }

    /// Applies a finished manifest request. Responses to superseded
    /// requests are dropped. A failure is shown through the renderer and
    /// leaves every piece of viewer state as it was.
    pub fn complete(&mut self, response: ManifestResponse) -> Result<(), ViewerError> {
        if self.pending.get(&response.kind) != Some(&response.token) {
            debug!(
                kind = %response.kind,
                token = response.token.0,
                "ignoring stale manifest response"
            );
            return Ok(());
        }
        self.pending.remove(&response.kind);

        let manifest = match response.result {
            Ok(manifest) => manifest,
            Err(err) => return Err(self.fail(err)),
        };

        match (response.kind, manifest) {
            (ManifestKind::Facsimile, Manifest::Facsimile(facsimile)) => {
                self.install_facsimile(facsimile, response.location);
            }
            (ManifestKind::Listing, Manifest::Listing(listing)) => {
                self.install_listing(listing, response.location);
            }
            (kind, _) => {
                let err = FetchError::new(response.location, format!("expected a {kind} manifest"));
                return Err(self.fail(err));
            }
        }
        Ok(())
    }

    fn fail(&mut self, err: FetchError) -> ViewerError {
        error!(location = %err.location, message = %err.message, "manifest load failed");
        let message = err.to_string();
        self.renderer.render_error(&message);
        self.last_error = Some(message);
        ViewerError::Fetch(err)
    }

    fn install_facsimile(&mut self, facsimile: Facsimile, location: String) {
        info!(
            %location,
            title = %facsimile.title,
            surfaces = facsimile.surfaces.len(),
            "facsimile loaded"
        );
        self.navigator = SurfaceNavigator::new(facsimile.surfaces.clone());
        self.transform.reset();
        self.last_error = None;
        self.facsimile = Some(Loaded {
            value: facsimile,
            location,
        });
        let thumbnails = self.thumbnails();
        self.renderer.render_thumbnails(&thumbnails);
        self.display();
    }

    fn install_listing(&mut self, listing: Listing, location: String) {
        info!(%location, entries = listing.facsimiles.len(), "listing loaded");
        self.last_error = None;
        self.listing = Some(Loaded {
            value: listing,
            location,
        });
        let items = self.listing_items();
        self.renderer.render_listing(&items);
        if self.facsimile.is_none() {
            self.display();
        } else {
            self.show_metadata();
        }
    }

    /// Refreshes metadata, then picks the panel: the requested initial
    /// surface if there is one, else the collection, else the listing.
    /// Finally queues every surface image for preloading.
    pub fn display(&mut self) {
        self.show_metadata();

        let mut shown = false;
        if self.facsimile.is_some()
            && let Some(target) = self.initial_surface.take()
        {
            match self.select_surface_by_url(&target) {
                Ok(()) => shown = true,
                Err(err) => warn!(%target, %err, "initial surface unavailable"),
            }
        }

        if !shown {
            let result = if self.facsimile.is_some() {
                self.show_collection()
            } else if self.listing.is_some() {
                self.show_listing()
            } else {
                Ok(())
            };
            if let Err(err) = result {
                warn!(%err, "no panel could be shown");
            }
        }

        self.preload_surfaces();
    }

    /// Re-renders the metadata content. The side panel is revealed on the
    /// first call only; after that its visibility belongs to the user.
    fn show_metadata(&mut self) {
        let view = self.metadata_view();
        self.renderer.render_metadata(&view);
        if !self.metadata_revealed {
            self.metadata_revealed = true;
            self.panel.set_metadata_visible(true);
            self.renderer.set_metadata_visible(true);
        }
    }

    fn preload_surfaces(&mut self) {
        let Some(facsimile) = self.facsimile.as_ref() else {
            return;
        };
        let Some(preloader) = self.preloader.as_mut() else {
            debug!("preloading skipped: no preloader");
            return;
        };
        for surface in &facsimile.value.surfaces {
            let url = resolve_url(&facsimile.location, &facsimile.value.image_url(surface));
            preloader.preload(&url);
        }
    }

    fn metadata_view(&self) -> MetadataView {
        let (title, rows) = match self.facsimile() {
            Some(facsimile) => (facsimile.title.clone(), facsimile.metadata_rows()),
            None => (String::new(), Vec::new()),
        };
        MetadataView {
            title,
            rows,
            listing_origin: self.listing.as_ref().map(|loaded| loaded.location.clone()),
        }
    }

    fn thumbnails(&self) -> Vec<Thumbnail> {
        let Some(loaded) = self.facsimile.as_ref() else {
            return Vec::new();
        };
        loaded
            .value
            .surfaces
            .iter()
            .enumerate()
            .map(|(index, surface)| Thumbnail {
                index,
                image_url: surface.image_url.clone(),
                src: resolve_url(&loaded.location, &loaded.value.thumbnail_url(surface)),
            })
            .collect()
    }

    fn listing_items(&self) -> Vec<ListingItem> {
        let Some(listing) = self.listing() else {
            return Vec::new();
        };
        listing
            .facsimiles
            .iter()
            .enumerate()
            .map(|(index, entry)| ListingItem {
                index,
                title: entry.title.clone(),
                href: entry.href(&listing.facs_base_url),
            })
            .collect()
    }

    fn surface_view(&self, index: usize) -> Option<SurfaceView> {
        let loaded = self.facsimile.as_ref()?;
        let surface = self.navigator.surfaces().get(index)?;
        Some(SurfaceView {
            index,
            count: self.navigator.len(),
            image_url: surface.image_url.clone(),
            src: resolve_url(&loaded.location, &loaded.value.image_url(surface)),
            links: surface.links.clone(),
        })
    }

    fn enter_panel(&mut self, target: Panel) -> Result<(), ViewerError> {
        let transition = self
            .panel
            .enter(target, self.navigator.current_index())?;
        if transition.leaves(Panel::OneSurface) {
            self.transform.reset();
            self.renderer.render_transform(&self.transform);
        }
        self.renderer.show_panel(target);
        Ok(())
    }

    pub fn show_listing(&mut self) -> Result<(), ViewerError> {
        if self.listing.is_none() {
            return Err(ViewerError::ListingNotLoaded);
        }
        self.enter_panel(Panel::Listing)
    }

    pub fn show_collection(&mut self) -> Result<(), ViewerError> {
        if self.facsimile.is_none() {
            return Err(ViewerError::FacsimileNotLoaded);
        }
        self.enter_panel(Panel::Collection)
    }

    pub fn show_surface_by_index(&mut self, index: usize) -> Result<(), ViewerError> {
        if self.facsimile.is_none() {
            return Err(ViewerError::FacsimileNotLoaded);
        }
        let previous = self.navigator.current_index();
        if let Err(err) = self.navigator.select(index) {
            warn!(index, %err, "surface index rejected");
            return Err(err);
        }
        self.present_surface(previous)
    }

    pub fn select_surface_by_url(&mut self, image_url: &str) -> Result<(), ViewerError> {
        if self.facsimile.is_none() {
            return Err(ViewerError::FacsimileNotLoaded);
        }
        let Some(index) = self.navigator.index_of(image_url) else {
            warn!(%image_url, "surface not found");
            return Err(ViewerError::SurfaceNotFound {
                url: image_url.to_string(),
            });
        };
        self.show_surface_by_index(index)
    }

    pub fn switch_surface(&mut self, delta: i32) -> Result<(), ViewerError> {
        if self.facsimile.is_none() {
            debug!(delta, "switch ignored: no facsimile loaded");
            return Err(ViewerError::FacsimileNotLoaded);
        }
        let previous = self.navigator.current_index();
        self.navigator.step(delta)?;
        self.present_surface(previous)
    }

    fn present_surface(&mut self, previous: Option<usize>) -> Result<(), ViewerError> {
        let current = self.navigator.current_index();
        if current != previous {
            self.transform.reset();
        }
        self.enter_panel(Panel::OneSurface)?;
        if let Some(view) = current.and_then(|index| self.surface_view(index)) {
            info!(index = view.index, image_url = %view.image_url, "showing surface");
            self.renderer.render_surface(&view);
        }
        self.renderer.render_transform(&self.transform);
        Ok(())
    }

    fn transform_allowed(&self, op: &'static str) -> bool {
        // Panel state can change between event dispatches, so this is
        // checked on every call.
        if self.panel.is_active(Panel::OneSurface) {
            return true;
        }
        debug!(op, panel = %self.panel.active(), "transform ignored outside single-surface view");
        false
    }

    pub fn zoom_by(&mut self, step: ZoomStep) -> bool {
        if !self.transform_allowed("zoom") {
            return false;
        }
        self.transform.zoom_by(step, &self.settings);
        self.renderer.render_transform(&self.transform);
        true
    }

    pub fn rotate_step(&mut self) -> bool {
        if !self.transform_allowed("rotate") {
            return false;
        }
        self.transform.rotate_step(&self.settings);
        self.renderer.render_transform(&self.transform);
        true
    }

    pub fn pan_by(&mut self, dx: i32, dy: i32) -> bool {
        if !self.transform_allowed("pan") {
            return false;
        }
        self.transform.pan_by(dx, dy, &self.settings);
        self.renderer.render_transform(&self.transform);
        true
    }

    pub fn begin_drag(&mut self, pointer: Point) -> bool {
        if !self.transform_allowed("begin_drag") {
            return false;
        }
        self.transform.begin_drag(pointer);
        true
    }

    pub fn continue_drag(&mut self, pointer: Point) -> bool {
        if !self.transform_allowed("continue_drag") || !self.transform.continue_drag(pointer) {
            return false;
        }
        self.renderer.render_transform(&self.transform);
        true
    }

    pub fn end_drag(&mut self) {
        self.transform.end_drag();
    }

    /// Pointer left the image; same effect as releasing it.
    pub fn cancel_drag(&mut self) {
        self.end_drag();
    }

    pub fn reset_transform(&mut self) {
        self.transform.reset();
        self.renderer.render_transform(&self.transform);
    }

    pub fn toggle_metadata(&mut self) -> bool {
        let visible = self.panel.toggle_metadata();
        self.renderer.set_metadata_visible(visible);
        visible
    }

    pub fn cycle_theme(&mut self) -> Theme {
        self.settings.cycle_theme();
        self.renderer.apply_theme(self.settings.theme);
        self.settings.theme
    }
}
