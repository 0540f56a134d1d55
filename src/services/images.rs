//! Image providers for tile faces.
//!
//! Every source hands out distinct image URLs. A source either returns
//! exactly `count` images or an error; it never pads with duplicates.
//! [`WithFallback`] swaps any error for a fixed placeholder set.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::Rng;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::http;
use crate::game::tile::ImageId;

const CATS_URL: &str = "https://cataas.com/cat?json=true";
const PICSUM_URL: &str = "https://picsum.photos/v2/list";
const PICSUM_PAGES: u32 = 30;
const DOGS_URL: &str = "https://dog.ceo/api/breeds/image/random";

/// Enough placeholders for a 6x6 board.
const PLACEHOLDER_COLORS: [&str; 18] = [
    "3498db", "e74c3c", "2ecc71", "f39c12", "9b59b6", "1abc9c", "34495e", "e67e22", "95a5a6",
    "16a085", "27ae60", "2980b9", "8e44ad", "f1c40f", "e67e22", "3498db", "e74c3c", "2ecc71",
];

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ImageSourceKind {
    #[default]
    Cats,
    Picsum,
    Dogs,
}

impl ImageSourceKind {
    pub const ALL: [ImageSourceKind; 3] = [
        ImageSourceKind::Cats,
        ImageSourceKind::Picsum,
        ImageSourceKind::Dogs,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ImageSourceKind::Cats => "Cats",
            ImageSourceKind::Picsum => "Random Photos",
            ImageSourceKind::Dogs => "Dogs",
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {url}: {reason}")]
    Malformed { url: String, reason: String },

    #[error("only {got} of {wanted} distinct images available")]
    Exhausted { wanted: usize, got: usize },

    #[error("no image source registered for {0}")]
    Unregistered(ImageSourceKind),

    #[error("image fetch was interrupted")]
    Interrupted,
}

impl SourceError {
    fn http(url: &str, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.to_string(),
            source,
        }
    }

    fn malformed(url: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

pub trait ImageSource: Send + Sync {
    fn kind(&self) -> ImageSourceKind;

    /// Returns exactly `count` distinct images, or an error.
    fn fetch(&self, count: usize) -> Result<Vec<ImageId>, SourceError>;
}

/// Runs `batch` for the missing amount, then once more for whatever is
/// still missing. Duplicates are dropped.
fn collect_distinct<F>(count: usize, mut batch: F) -> Result<Vec<ImageId>, SourceError>
where
    F: FnMut(usize) -> Vec<Result<ImageId, SourceError>>,
{
    let mut seen = HashSet::new();
    let mut images = Vec::with_capacity(count);
    let mut last_error = None;

    for attempt in 0..2 {
        let missing = count - images.len();
        if missing == 0 {
            break;
        }
        if attempt > 0 {
            debug!(missing, "retrying for missing images");
        }
        for result in batch(missing) {
            match result {
                Ok(image) => {
                    if images.len() < count && seen.insert(image.clone()) {
                        images.push(image);
                    }
                }
                Err(err) => {
                    warn!("image request failed: {err}");
                    last_error = Some(err);
                }
            }
        }
    }

    if images.len() == count {
        return Ok(images);
    }
    match last_error {
        Some(err) if images.is_empty() => Err(err),
        _ => Err(SourceError::Exhausted {
            wanted: count,
            got: images.len(),
        }),
    }
}

pub struct CatImages {
    client: Client,
}

impl CatImages {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn fetch_one(&self) -> Result<ImageId, SourceError> {
        let body: Value =
            http::get_json(&self.client, CATS_URL).map_err(|e| SourceError::http(CATS_URL, e))?;
        cat_image_from(&body).ok_or_else(|| SourceError::malformed(CATS_URL, "missing `_id`"))
    }
}

impl ImageSource for CatImages {
    fn kind(&self) -> ImageSourceKind {
        ImageSourceKind::Cats
    }

    fn fetch(&self, count: usize) -> Result<Vec<ImageId>, SourceError> {
        collect_distinct(count, |missing| (0..missing).map(|_| self.fetch_one()).collect())
    }
}

fn cat_image_from(body: &Value) -> Option<ImageId> {
    let id = body
        .get("_id")
        .or_else(|| body.get("id"))
        .and_then(Value::as_str)?;
    Some(ImageId::new(format!(
        "https://cataas.com/cat/{id}?width=200&height=200"
    )))
}

pub struct PicsumImages {
    client: Client,
}

impl PicsumImages {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn fetch_page(&self, limit: usize) -> Result<Vec<ImageId>, SourceError> {
        let page = rand::rng().random_range(1..=PICSUM_PAGES);
        let url = format!("{PICSUM_URL}?page={page}&limit={limit}");
        let body: Value = http::get_json(&self.client, &url).map_err(|e| SourceError::http(&url, e))?;
        picsum_images_from(&body).ok_or_else(|| SourceError::malformed(&url, "expected a list"))
    }
}

impl ImageSource for PicsumImages {
    fn kind(&self) -> ImageSourceKind {
        ImageSourceKind::Picsum
    }

    fn fetch(&self, count: usize) -> Result<Vec<ImageId>, SourceError> {
        collect_distinct(count, |missing| match self.fetch_page(missing) {
            Ok(images) => images.into_iter().map(Ok).collect(),
            Err(err) => vec![Err(err)],
        })
    }
}

fn picsum_images_from(body: &Value) -> Option<Vec<ImageId>> {
    let entries = body.as_array()?;
    Some(
        entries
            .iter()
            .filter_map(|entry| match entry.get("id")? {
                Value::String(id) => Some(id.clone()),
                Value::Number(id) => Some(id.to_string()),
                _ => None,
            })
            .map(|id| ImageId::new(format!("https://picsum.photos/id/{id}/200/200")))
            .collect(),
    )
}

pub struct DogImages {
    client: Client,
}

impl DogImages {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn fetch_batch(&self, count: usize) -> Result<Vec<ImageId>, SourceError> {
        let url = format!("{DOGS_URL}/{count}");
        let body: Value = http::get_json(&self.client, &url).map_err(|e| SourceError::http(&url, e))?;
        dog_images_from(&body).ok_or_else(|| SourceError::malformed(&url, "status was not success"))
    }
}

impl ImageSource for DogImages {
    fn kind(&self) -> ImageSourceKind {
        ImageSourceKind::Dogs
    }

    fn fetch(&self, count: usize) -> Result<Vec<ImageId>, SourceError> {
        collect_distinct(count, |missing| match self.fetch_batch(missing) {
            Ok(images) => images.into_iter().map(Ok).collect(),
            Err(err) => vec![Err(err)],
        })
    }
}

fn dog_images_from(body: &Value) -> Option<Vec<ImageId>> {
    if body.get("status").and_then(Value::as_str) != Some("success") {
        return None;
    }
    let urls = body.get("message")?.as_array()?;
    Some(
        urls.iter()
            .filter_map(Value::as_str)
            .map(ImageId::from)
            .collect(),
    )
}

/// In-memory source for offline play and tests.
#[derive(Clone, Debug)]
pub struct FixedImages {
    kind: ImageSourceKind,
    images: Vec<ImageId>,
}

impl FixedImages {
    pub fn new(kind: ImageSourceKind, images: Vec<ImageId>) -> Self {
        Self { kind, images }
    }

    /// `{prefix}-0`, `{prefix}-1`, ...
    pub fn numbered(prefix: &str, count: usize) -> Self {
        let images = (0..count)
            .map(|i| ImageId::new(format!("{prefix}-{i}")))
            .collect();
        Self::new(ImageSourceKind::default(), images)
    }
}

impl ImageSource for FixedImages {
    fn kind(&self) -> ImageSourceKind {
        self.kind
    }

    fn fetch(&self, count: usize) -> Result<Vec<ImageId>, SourceError> {
        let images = self.images.clone();
        collect_distinct(count, move |_| images.iter().cloned().map(Ok).collect())
    }
}

pub fn placeholder_images(count: usize) -> Result<Vec<ImageId>, SourceError> {
    if count > PLACEHOLDER_COLORS.len() {
        return Err(SourceError::Exhausted {
            wanted: count,
            got: PLACEHOLDER_COLORS.len(),
        });
    }
    Ok(PLACEHOLDER_COLORS
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, color)| {
            ImageId::new(format!(
                "https://via.placeholder.com/200x200/{color}/ffffff?text=Cat+{}",
                i + 1
            ))
        })
        .collect())
}

/// Falls back to [`placeholder_images`] when the wrapped source fails.
pub struct WithFallback<S> {
    inner: S,
}

impl<S: ImageSource> WithFallback<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: ImageSource> ImageSource for WithFallback<S> {
    fn kind(&self) -> ImageSourceKind {
        self.inner.kind()
    }

    fn fetch(&self, count: usize) -> Result<Vec<ImageId>, SourceError> {
        self.inner.fetch(count).or_else(|err| {
            warn!(source = %self.inner.kind(), "using placeholder images: {err}");
            placeholder_images(count)
        })
    }
}

/// One source per kind.
#[derive(Clone, Default)]
pub struct ImageLibrary {
    sources: HashMap<ImageSourceKind, Arc<dyn ImageSource>>,
}

impl ImageLibrary {
    /// The three network sources, each behind [`WithFallback`].
    pub fn online(client: Client) -> Self {
        Self::default()
            .with(WithFallback::new(CatImages::new(client.clone())))
            .with(WithFallback::new(PicsumImages::new(client.clone())))
            .with(WithFallback::new(DogImages::new(client)))
    }

    pub fn with(mut self, source: impl ImageSource + 'static) -> Self {
        self.sources.insert(source.kind(), Arc::new(source));
        self
    }

    pub fn get(&self, kind: ImageSourceKind) -> Option<Arc<dyn ImageSource>> {
        self.sources.get(&kind).cloned()
    }
}
