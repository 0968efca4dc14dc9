use std::sync::Arc;

use monocle_core::Surface;

use crate::ViewerError;

/// Ordered surfaces of the active facsimile plus the current position.
#[derive(Debug, Clone)]
pub struct SurfaceNavigator {
    surfaces: Arc<[Surface]>,
    current: Option<usize>,
}

impl Default for SurfaceNavigator {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl SurfaceNavigator {
    pub fn new(surfaces: impl Into<Arc<[Surface]>>) -> Self {
        Self {
            surfaces: surfaces.into(),
            current: None,
        }
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_surface(&self) -> Option<&Surface> {
        self.current.and_then(|idx| self.surfaces.get(idx))
    }

    pub fn index_of(&self, image_url: &str) -> Option<usize> {
        self.surfaces
            .iter()
            .position(|surface| surface.image_url == image_url)
    }

    pub fn select(&mut self, index: usize) -> Result<usize, ViewerError> {
        if index >= self.surfaces.len() {
            return Err(ViewerError::IndexOutOfRange {
                index,
                len: self.surfaces.len(),
            });
        }
        self.current = Some(index);
        Ok(index)
    }

    pub fn select_by_url(&mut self, image_url: &str) -> Result<usize, ViewerError> {
        let index = self
            .index_of(image_url)
            .ok_or_else(|| ViewerError::SurfaceNotFound {
                url: image_url.to_string(),
            })?;
        self.select(index)
    }

    /// Moves by `delta` with wraparound: past the end lands on the first
    /// surface, before the start lands on the last. With nothing selected
    /// the step is taken from just before the first surface.
    pub fn step(&mut self, delta: i32) -> Result<usize, ViewerError> {
        let len = self.surfaces.len();
        if len == 0 {
            return Err(ViewerError::FacsimileNotLoaded);
        }
        let current = self.current.map_or(-1, |idx| idx as i64);
        let mut next = current + i64::from(delta);
        if next >= len as i64 {
            next = 0;
        }
        if next < 0 {
            next = len as i64 - 1;
        }
        self.select(next as usize)
    }
}
