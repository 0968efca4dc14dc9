use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::Context as _;
use monocle_application::{
    FetchError, Manifest, ManifestFetcher, ManifestKind, ManifestRequest, ManifestResponse,
};
use monocle_core::{Facsimile, Listing};
use tracing::{debug, warn};
use url::Url;

/// Background manifest reader. Requests go in through a [`ManifestSender`],
/// completions come out of [`ManifestLoader::poll`].
#[derive(Debug)]
pub struct ManifestLoader {
    jobs: mpsc::Sender<ManifestRequest>,
    done_tx: mpsc::Sender<ManifestResponse>,
    done: mpsc::Receiver<ManifestResponse>,
}

/// Cloneable request side of a [`ManifestLoader`].
#[derive(Debug, Clone)]
pub struct ManifestSender {
    jobs: mpsc::Sender<ManifestRequest>,
    done: mpsc::Sender<ManifestResponse>,
}

impl ManifestLoader {
    pub fn spawn() -> anyhow::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<ManifestRequest>();
        let (done_tx, done_rx) = mpsc::channel::<ManifestResponse>();

        let worker_tx = done_tx.clone();
        thread::Builder::new()
            .name("monocle-manifest".into())
            .spawn(move || {
                for request in job_rx {
                    let response = load_manifest(&request);
                    if worker_tx.send(response).is_err() {
                        break;
                    }
                }
                debug!("manifest loader stopped");
            })
            .context("spawn manifest loader thread")?;

        Ok(Self {
            jobs: job_tx,
            done_tx,
            done: done_rx,
        })
    }

    pub fn sender(&self) -> ManifestSender {
        ManifestSender {
            jobs: self.jobs.clone(),
            done: self.done_tx.clone(),
        }
    }

    /// Completed responses, oldest first. Never blocks.
    pub fn poll(&self) -> Vec<ManifestResponse> {
        self.done.try_iter().collect()
    }
}

impl ManifestFetcher for ManifestSender {
    fn fetch(&mut self, request: ManifestRequest) {
        if let Err(mpsc::SendError(request)) = self.jobs.send(request) {
            warn!(location = %request.location, "manifest loader is gone");
            let err = FetchError::new(&request.location, "manifest loader stopped");
            let _ = self
                .done
                .send(ManifestResponse::for_request(&request, Err(err)));
        }
    }
}

/// Reads and parses the manifest a request points at.
pub fn load_manifest(request: &ManifestRequest) -> ManifestResponse {
    let result = read_location(&request.location)
        .and_then(|text| parse_manifest(request.kind, &text))
        .map_err(|err| FetchError::new(&request.location, format!("{err:#}")));
    ManifestResponse::for_request(request, result)
}

pub fn parse_manifest(kind: ManifestKind, text: &str) -> anyhow::Result<Manifest> {
    let manifest = match kind {
        ManifestKind::Facsimile => Manifest::Facsimile(
            serde_json::from_str::<Facsimile>(text).context("parse facsimile manifest")?,
        ),
        ManifestKind::Listing => Manifest::Listing(
            serde_json::from_str::<Listing>(text).context("parse listing manifest")?,
        ),
    };
    Ok(manifest)
}

/// Reads a local location: a plain path or a `file://` URL.
pub fn read_location(location: &str) -> anyhow::Result<String> {
    let path = location_path(location)?;
    std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
}

pub(crate) fn location_path(location: &str) -> anyhow::Result<PathBuf> {
    let location = location.trim();
    if location.is_empty() {
        anyhow::bail!("empty location");
    }
    match Url::parse(location) {
        // Single-letter schemes are drive prefixes of Windows paths.
        Ok(url) if url.scheme().len() == 1 => Ok(PathBuf::from(location)),
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|()| anyhow::anyhow!("not a local file url: {location}")),
        Ok(url) => anyhow::bail!(
            "unsupported scheme {}: only local files can be read",
            url.scheme()
        ),
        Err(_) => Ok(PathBuf::from(location)),
    }
}
