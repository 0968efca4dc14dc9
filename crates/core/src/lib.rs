//! Core domain types for Monocle.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

mod transform;

pub use transform::{Point, TransformState, ZoomStep};

/// Metadata keys shown in the facsimile metadata table, in display order.
pub const METADATA_KEYS: [&str; 3] = ["authority", "availability", "source"];

pub const IMAGE_BASE_URL_KEY: &str = "imageBaseUrl";
pub const THUMBNAIL_BASE_URL_KEY: &str = "thumbnailBaseUrl";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub scale_factor: f64,
    pub rotate_factor: f64,
    pub pan_factor: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub theme: Theme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Theme {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            _ => Err("unknown theme"),
        }
    }
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            scale_factor: 0.2,
            rotate_factor: 45.0,
            pan_factor: 5.0,
            min_scale: 0.2,
            max_scale: 8.0,
            theme: Theme::Dark,
        }
    }
}

impl ViewerSettings {
    pub fn normalize(&mut self) {
        let defaults = Self::default();
        if !self.scale_factor.is_finite() {
            self.scale_factor = defaults.scale_factor;
        }
        self.scale_factor = self.scale_factor.clamp(0.01, 4.0);
        if !self.rotate_factor.is_finite() {
            self.rotate_factor = defaults.rotate_factor;
        }
        self.rotate_factor = self.rotate_factor.rem_euclid(360.0);
        if self.rotate_factor == 0.0 {
            self.rotate_factor = defaults.rotate_factor;
        }
        if !self.pan_factor.is_finite() {
            self.pan_factor = defaults.pan_factor;
        }
        self.pan_factor = self.pan_factor.clamp(0.1, 100.0);
        if !self.min_scale.is_finite() || self.min_scale <= 0.0 {
            self.min_scale = defaults.min_scale;
        }
        if !self.max_scale.is_finite() {
            self.max_scale = defaults.max_scale;
        }
        if self.max_scale < self.min_scale {
            std::mem::swap(&mut self.min_scale, &mut self.max_scale);
        }
        self.min_scale = self.min_scale.max(0.01);
    }

    pub fn cycle_theme(&mut self) {
        self.theme = match self.theme {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        };
    }
}

/// Top-level view mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Panel {
    #[default]
    None,
    Listing,
    Collection,
    OneSurface,
}

impl Panel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Panel::None => "none",
            Panel::Listing => "listing",
            Panel::Collection => "collection",
            Panel::OneSurface => "onesurface",
        }
    }
}

impl std::fmt::Display for Panel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Panel {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Panel::None),
            "listing" => Ok(Panel::Listing),
            "collection" => Ok(Panel::Collection),
            "onesurface" | "one-surface" => Ok(Panel::OneSurface),
            _ => Err("unknown panel"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceLink {
    pub caption: String,
    pub href: String,
}

/// One page image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Surface {
    pub image_url: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub links: Vec<SurfaceLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facsimile {
    #[serde(default, alias = "facsTitleMain")]
    pub title: String,
    #[serde(default)]
    pub text_metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub surfaces: Vec<Surface>,
}

impl Facsimile {
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.text_metadata.get(key).map(String::as_str)
    }

    pub fn image_base_url(&self) -> &str {
        self.metadata(IMAGE_BASE_URL_KEY).unwrap_or_default()
    }

    pub fn thumbnail_base_url(&self) -> &str {
        self.metadata(THUMBNAIL_BASE_URL_KEY).unwrap_or_default()
    }

    pub fn image_url(&self, surface: &Surface) -> String {
        format!("{}{}", self.image_base_url(), surface.image_url)
    }

    pub fn thumbnail_url(&self, surface: &Surface) -> String {
        format!("{}{}", self.thumbnail_base_url(), surface.thumbnail_url)
    }

    /// Caption/value pairs for the metadata table. Missing keys render empty.
    pub fn metadata_rows(&self) -> Vec<(String, String)> {
        METADATA_KEYS
            .iter()
            .map(|key| {
                (
                    caption_for_key(key),
                    self.metadata(key).unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub title: String,
    pub url: String,
}

impl ListingEntry {
    /// Link target for this entry: the viewer page with `facs` pointing at it.
    pub fn href(&self, facs_base_url: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("facs", &self.url)
            .finish();
        format!("{facs_base_url}?{query}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(default)]
    pub facs_base_url: String,
    #[serde(default)]
    pub facsimiles: Vec<ListingEntry>,
}

/// Turns a camelCase property name into a caption: the first lower/upper
/// boundary gets a space and the first letter is upper-cased.
pub fn caption_for_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 1);
    let mut split_done = false;
    for (i, ch) in chars.iter().enumerate() {
        if i == 0 {
            out.extend(ch.to_uppercase());
            continue;
        }
        if !split_done && ch.is_ascii_uppercase() && chars[i - 1].is_ascii_lowercase() {
            out.push(' ');
            split_done = true;
        }
        out.push(*ch);
    }
    out
}

/// Resolves `href` against the location of the document it came from.
/// Absolute URLs pass through. URL origins are joined per RFC 3986; plain
/// path origins are joined lexically, keeping `..` that climbs above them.
pub fn resolve_url(origin: &str, href: &str) -> String {
    if href.is_empty() || is_absolute_url(href) {
        return href.to_string();
    }
    if is_absolute_url(origin) {
        return match Url::parse(origin).and_then(|base| base.join(href)) {
            Ok(url) => url.into(),
            Err(_) => href.to_string(),
        };
    }
    join_path(origin, href)
}

/// Single-letter schemes are Windows drive prefixes, not URLs.
fn is_absolute_url(value: &str) -> bool {
    Url::parse(value).is_ok_and(|url| url.scheme().len() > 1)
}

fn join_path(origin: &str, href: &str) -> String {
    let base = Path::new(origin).parent().unwrap_or(Path::new(""));
    let mut out = PathBuf::new();
    for component in base.join(href).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out.to_string_lossy().into_owned()
}
