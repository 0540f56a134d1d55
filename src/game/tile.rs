use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub usize);

impl TileId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque image identifier, usually a URL handed out by an image source.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ImageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileStatus {
    Hidden,
    Flipped,
    Matched,
}

#[derive(Clone, Debug)]
pub struct Tile {
    id: TileId,
    image: ImageId,
    status: TileStatus,
}

impl Tile {
    pub fn new(id: TileId, image: ImageId) -> Self {
        Self {
            id,
            image,
            status: TileStatus::Hidden,
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn image(&self) -> &ImageId {
        &self.image
    }

    pub fn status(&self) -> TileStatus {
        self.status
    }

    pub fn is_matched(&self) -> bool {
        self.status == TileStatus::Matched
    }

    /// Hidden -> Flipped. Returns whether the status changed.
    pub fn flip(&mut self) -> bool {
        if self.status != TileStatus::Hidden {
            return false;
        }
        self.status = TileStatus::Flipped;
        true
    }

    /// Flipped -> Hidden. Matched tiles stay matched.
    pub fn hide(&mut self) -> bool {
        if self.status != TileStatus::Flipped {
            return false;
        }
        self.status = TileStatus::Hidden;
        true
    }

    /// Matched is terminal; calling this again is a no-op.
    pub fn mark_matched(&mut self) -> bool {
        if self.status == TileStatus::Matched {
            return false;
        }
        self.status = TileStatus::Matched;
        true
    }

    /// Pairs are decided by image, never by tile identity.
    pub fn pairs_with(&self, other: &Tile) -> bool {
        self.image == other.image
    }
}
