use monocle_core::Panel;
use tracing::debug;

use crate::ViewerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelTransition {
    pub from: Panel,
    pub to: Panel,
}

impl PanelTransition {
    pub fn leaves(&self, panel: Panel) -> bool {
        self.from == panel && self.to != panel
    }
}

/// Tracks the single active [`Panel`] and the metadata side panel, which
/// is shown alongside any of them.
#[derive(Debug, Clone, Default)]
pub struct PanelState {
    active: Panel,
    metadata_visible: bool,
}

impl PanelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Panel {
        self.active
    }

    pub fn is_active(&self, panel: Panel) -> bool {
        self.active == panel
    }

    pub fn metadata_visible(&self) -> bool {
        self.metadata_visible
    }

    pub fn set_metadata_visible(&mut self, visible: bool) {
        self.metadata_visible = visible;
    }

    pub fn toggle_metadata(&mut self) -> bool {
        self.metadata_visible = !self.metadata_visible;
        self.metadata_visible
    }

    /// Activates `target`. `Panel::None` is never a legal target, and
    /// `Panel::OneSurface` needs a current surface. A rejected transition
    /// leaves the active panel untouched.
    pub fn enter(
        &mut self,
        target: Panel,
        selection: Option<usize>,
    ) -> Result<PanelTransition, ViewerError> {
        match target {
            Panel::None => return Err(ViewerError::InvalidTransition(target)),
            Panel::OneSurface if selection.is_none() => {
                return Err(ViewerError::NoSurfaceSelected);
            }
            _ => {}
        }
        let transition = PanelTransition {
            from: self.active,
            to: target,
        };
        self.active = target;
        debug!(from = %transition.from, to = %transition.to, "panel transition");
        Ok(transition)
    }
}
