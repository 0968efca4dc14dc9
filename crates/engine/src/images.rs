use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use anyhow::Context as _;
use image::DynamicImage;
use monocle_application::ImagePreloader;
use tracing::{debug, trace};

use crate::loader::location_path;

const DEFAULT_CAPACITY: usize = 24;

/// Decoded surface images keyed by URL, filled in the background.
///
/// Preload failures are remembered (as many as there are image slots) so the
/// same URL is not retried; [`ImageStore::request`] reports them when the
/// image is actually needed.
#[derive(Debug, Clone)]
pub struct ImageStore {
    cache: Arc<Mutex<ImageCache>>,
    jobs: mpsc::Sender<String>,
}

/// Where an image stands in an [`ImageStore`].
#[derive(Debug, Clone)]
pub enum ImageState {
    Ready(Arc<DynamicImage>),
    Pending,
    Failed(String),
}

#[derive(Debug, Default)]
struct ImageCache {
    capacity: usize,
    images: HashMap<String, Arc<DynamicImage>>,
    order: VecDeque<String>,
    queued: HashSet<String>,
    failed: HashMap<String, String>,
    failed_order: VecDeque<String>,
    generation: u64,
}

impl ImageCache {
    fn insert(&mut self, url: String, image: Arc<DynamicImage>) {
        self.queued.remove(&url);
        self.forget_failure(&url);
        if self.images.insert(url.clone(), image).is_some() {
            self.order.retain(|u| u != &url);
        }
        self.order.push_back(url);
        while self.order.len() > self.capacity.max(1) {
            if let Some(evicted) = self.order.pop_front() {
                self.images.remove(&evicted);
            }
        }
        self.generation += 1;
    }

    fn record_failure(&mut self, url: String, message: String) {
        self.queued.remove(&url);
        if self.failed.insert(url.clone(), message).is_some() {
            self.failed_order.retain(|u| u != &url);
        }
        self.failed_order.push_back(url);
        while self.failed_order.len() > self.capacity.max(1) {
            if let Some(evicted) = self.failed_order.pop_front() {
                self.failed.remove(&evicted);
            }
        }
        self.generation += 1;
    }

    fn forget_failure(&mut self, url: &str) {
        if self.failed.remove(url).is_some() {
            self.failed_order.retain(|u| u != url);
        }
    }

    fn touch(&mut self, url: &str) {
        if let Some(pos) = self.order.iter().position(|u| u == url)
            && let Some(entry) = self.order.remove(pos)
        {
            self.order.push_back(entry);
        }
    }
}

impl ImageStore {
    pub fn spawn() -> anyhow::Result<Self> {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> anyhow::Result<Self> {
        let cache = Arc::new(Mutex::new(ImageCache {
            capacity,
            ..ImageCache::default()
        }));
        let (tx, rx) = mpsc::channel::<String>();

        let worker_cache = Arc::clone(&cache);
        thread::Builder::new()
            .name("monocle-images".into())
            .spawn(move || {
                for url in rx {
                    match decode(&url) {
                        Ok(image) => {
                            trace!(%url, "preloaded");
                            lock(&worker_cache).insert(url, Arc::new(image));
                        }
                        Err(err) => {
                            let error = format!("{err:#}");
                            debug!(%url, %error, "preload failed");
                            lock(&worker_cache).record_failure(url, error);
                        }
                    }
                }
            })
            .context("spawn image preload thread")?;

        Ok(Self { cache, jobs: tx })
    }

    pub fn get(&self, url: &str) -> Option<Arc<DynamicImage>> {
        let mut cache = lock(&self.cache);
        let image = cache.images.get(url).cloned()?;
        cache.touch(url);
        Some(image)
    }

    /// Non-blocking lookup: a cached image, a remembered failure, or
    /// `Pending` after queueing the decode on the worker.
    pub fn request(&self, url: &str) -> ImageState {
        if let Some(image) = self.get(url) {
            return ImageState::Ready(image);
        }
        if let Some(message) = lock(&self.cache).failed.get(url) {
            return ImageState::Failed(message.clone());
        }
        self.enqueue(url);
        ImageState::Pending
    }

    /// Bumped whenever the worker stores an image or a failure.
    pub fn generation(&self) -> u64 {
        lock(&self.cache).generation
    }

    pub fn len(&self) -> usize {
        lock(&self.cache).images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn enqueue(&self, url: &str) {
        {
            let mut cache = lock(&self.cache);
            if cache.images.contains_key(url)
                || cache.failed.contains_key(url)
                || !cache.queued.insert(url.to_string())
            {
                return;
            }
        }
        if self.jobs.send(url.to_string()).is_err() {
            debug!(%url, "image preload thread is gone");
        }
    }
}

impl ImagePreloader for ImageStore {
    fn preload(&mut self, url: &str) {
        self.enqueue(url);
    }
}

fn lock(cache: &Mutex<ImageCache>) -> MutexGuard<'_, ImageCache> {
    cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn decode(url: &str) -> anyhow::Result<DynamicImage> {
    let path = location_path(url)?;
    image::open(&path).with_context(|| format!("decode image {}", path.display()))
}
