use std::cell::RefCell;
use std::rc::Rc;

use monocle_application::{ListingItem, MetadataView, RenderPort, SurfaceView, Thumbnail};
use monocle_core::{Panel, Theme, TransformState};

/// Everything the terminal draws, as last pushed by the controller.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Screen {
    pub panel: Panel,
    pub metadata: MetadataView,
    pub metadata_visible: bool,
    pub listing: Vec<ListingItem>,
    pub thumbnails: Vec<Thumbnail>,
    pub surface: Option<SurfaceView>,
    pub transform: TransformState,
    pub error: Option<String>,
    pub theme: Theme,
    pub dirty: bool,
}

impl Screen {
    pub fn new(theme: Theme) -> Self {
        Self {
            panel: Panel::None,
            metadata: MetadataView::default(),
            metadata_visible: false,
            listing: Vec::new(),
            thumbnails: Vec::new(),
            surface: None,
            transform: TransformState::default(),
            error: None,
            theme,
            dirty: true,
        }
    }

    /// Returns whether anything changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

/// [`RenderPort`] that records into a shared [`Screen`]; the event loop
/// draws from the same model.
#[derive(Debug, Clone)]
pub(crate) struct TerminalRenderer {
    screen: Rc<RefCell<Screen>>,
}

impl TerminalRenderer {
    pub fn new(screen: Rc<RefCell<Screen>>) -> Self {
        Self { screen }
    }

    fn update(&self, f: impl FnOnce(&mut Screen)) {
        let mut screen = self.screen.borrow_mut();
        f(&mut screen);
        screen.dirty = true;
    }
}

impl RenderPort for TerminalRenderer {
    fn show_panel(&mut self, panel: Panel) {
        self.update(|screen| {
            screen.panel = panel;
            if panel != Panel::None {
                screen.error = None;
            }
        });
    }

    fn render_metadata(&mut self, view: &MetadataView) {
        self.update(|screen| screen.metadata = view.clone());
    }

    fn render_listing(&mut self, items: &[ListingItem]) {
        self.update(|screen| screen.listing = items.to_vec());
    }

    fn render_thumbnails(&mut self, thumbnails: &[Thumbnail]) {
        self.update(|screen| {
            screen.thumbnails = thumbnails.to_vec();
            screen.surface = None;
        });
    }

    fn render_surface(&mut self, view: &SurfaceView) {
        self.update(|screen| screen.surface = Some(view.clone()));
    }

    fn render_transform(&mut self, transform: &TransformState) {
        self.update(|screen| screen.transform = *transform);
    }

    fn render_error(&mut self, message: &str) {
        self.update(|screen| screen.error = Some(message.to_string()));
    }

    fn set_metadata_visible(&mut self, visible: bool) {
        self.update(|screen| screen.metadata_visible = visible);
    }

    fn apply_theme(&mut self, theme: Theme) {
        self.update(|screen| screen.theme = theme);
    }
}
