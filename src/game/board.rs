use std::collections::HashSet;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::BoardError;
use super::tile::{ImageId, Tile, TileId, TileStatus};
use crate::config::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BoardSize {
    #[default]
    Four,
    Six,
}

impl BoardSize {
    pub const ALL: [BoardSize; 2] = [BoardSize::Four, BoardSize::Six];

    pub fn dimension(self) -> u8 {
        match self {
            BoardSize::Four => 4,
            BoardSize::Six => 6,
        }
    }

    pub fn tile_count(self) -> usize {
        let n = self.dimension() as usize;
        n * n
    }

    /// Distinct images needed to fill the grid.
    pub fn pair_count(self) -> usize {
        self.tile_count() / 2
    }

    pub fn label(self) -> &'static str {
        match self {
            BoardSize::Four => "4x4",
            BoardSize::Six => "6x6",
        }
    }
}

impl TryFrom<u8> for BoardSize {
    type Error = BoardError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(BoardSize::Four),
            6 => Ok(BoardSize::Six),
            other => Err(BoardError::UnsupportedBoardSize(other)),
        }
    }
}

impl From<BoardSize> for u8 {
    fn from(size: BoardSize) -> Self {
        size.dimension()
    }
}

impl fmt::Display for BoardSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// N x N grid of tiles for one round. Rebuilt wholesale between rounds.
#[derive(Clone, Debug)]
pub struct Board {
    size: BoardSize,
    tiles: Vec<Tile>,
    matched_color: Color,
}

impl Board {
    pub fn new(size: BoardSize) -> Self {
        Self {
            size,
            tiles: Vec::new(),
            matched_color: Color::default_matched(),
        }
    }

    pub fn size(&self) -> BoardSize {
        self.size
    }

    pub fn matched_color(&self) -> &Color {
        &self.matched_color
    }

    pub fn set_matched_color(&mut self, color: Color) {
        self.matched_color = color;
    }

    /// Lays out two tiles per image in a uniformly shuffled order.
    ///
    /// Validation happens before any tile is built, so a failed call leaves
    /// the board empty.
    pub fn initialize<R: Rng + ?Sized>(
        &mut self,
        images: &[ImageId],
        matched_color: Color,
        rng: &mut R,
    ) -> Result<(), BoardError> {
        self.reset();

        let expected = self.size.pair_count();
        if images.len() != expected {
            return Err(BoardError::ImageCount {
                dimension: self.size.dimension(),
                expected,
                actual: images.len(),
            });
        }
        let mut seen = HashSet::with_capacity(images.len());
        for image in images {
            if !seen.insert(image) {
                return Err(BoardError::DuplicateImage(image.clone()));
            }
        }

        let mut deck: Vec<ImageId> = Vec::with_capacity(self.size.tile_count());
        for image in images {
            deck.push(image.clone());
            deck.push(image.clone());
        }
        shuffle(&mut deck, rng);

        self.tiles = deck
            .into_iter()
            .enumerate()
            .map(|(index, image)| Tile::new(TileId(index), image))
            .collect();
        self.matched_color = matched_color;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.tiles.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.index())
    }

    pub(crate) fn tile_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.tiles.get_mut(id.index())
    }

    /// An empty board is never "all matched".
    pub fn all_matched(&self) -> bool {
        !self.tiles.is_empty() && self.tiles.iter().all(Tile::is_matched)
    }

    pub fn tiles_by_status(&self, status: TileStatus) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().filter(move |t| t.status() == status)
    }

    pub fn flipped_count(&self) -> usize {
        self.tiles_by_status(TileStatus::Flipped).count()
    }

    pub fn matched_count(&self) -> usize {
        self.tiles_by_status(TileStatus::Matched).count()
    }
}

/// Fisher-Yates: walk from the last slot down to 1 and swap each slot with
/// a uniformly chosen index in `0..=i`.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn images(count: usize) -> Vec<ImageId> {
        (0..count).map(|i| ImageId::new(format!("img-{i}"))).collect()
    }

    fn built(size: BoardSize, seed: u64) -> Board {
        let mut board = Board::new(size);
        let mut rng = StdRng::seed_from_u64(seed);
        board
            .initialize(&images(size.pair_count()), Color::default_matched(), &mut rng)
            .expect("board should initialize");
        board
    }

    #[test]
    fn every_image_appears_exactly_twice() {
        for size in BoardSize::ALL {
            let board = built(size, 7);
            assert_eq!(board.tiles().len(), size.tile_count());

            let mut counts: HashMap<&ImageId, usize> = HashMap::new();
            for tile in board.tiles() {
                *counts.entry(tile.image()).or_default() += 1;
            }
            assert_eq!(counts.len(), size.pair_count());
            assert!(counts.values().all(|&c| c == 2));
            assert_eq!(board.flipped_count(), 0);
            assert_eq!(board.matched_count(), 0);
        }
    }

    #[test]
    fn tile_ids_follow_board_order() {
        let board = built(BoardSize::Four, 1);
        for (index, tile) in board.tiles().iter().enumerate() {
            assert_eq!(tile.id(), TileId(index));
        }
    }

    #[test]
    fn different_seeds_produce_different_orders() {
        let a: Vec<_> = built(BoardSize::Six, 1).tiles().iter().map(|t| t.image().clone()).collect();
        let b: Vec<_> = built(BoardSize::Six, 2).tiles().iter().map(|t| t.image().clone()).collect();
        assert_ne!(a, b);

        let mut sorted_a = a.clone();
        let mut sorted_b = b.clone();
        sorted_a.sort();
        sorted_b.sort();
        assert_eq!(sorted_a, sorted_b);
    }

    #[test]
    fn wrong_image_count_is_rejected_before_building() {
        let mut board = Board::new(BoardSize::Four);
        let mut rng = StdRng::seed_from_u64(0);
        let err = board
            .initialize(&images(7), Color::default_matched(), &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            BoardError::ImageCount {
                dimension: 4,
                expected: 8,
                actual: 7
            }
        );
        assert!(board.is_empty());
    }

    #[test]
    fn duplicate_images_are_rejected() {
        let mut board = Board::new(BoardSize::Four);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ids = images(7);
        ids.push(ImageId::from("img-3"));
        let err = board
            .initialize(&ids, Color::default_matched(), &mut rng)
            .unwrap_err();
        assert_eq!(err, BoardError::DuplicateImage(ImageId::from("img-3")));
    }

    #[test]
    fn unsupported_sizes_fail() {
        assert_eq!(BoardSize::try_from(5), Err(BoardError::UnsupportedBoardSize(5)));
        assert_eq!(BoardSize::try_from(6), Ok(BoardSize::Six));
    }

    #[test]
    fn all_matched_requires_tiles() {
        let mut board = built(BoardSize::Four, 3);
        assert!(!board.all_matched());
        for index in 0..board.tiles().len() {
            board.tile_mut(TileId(index)).unwrap().mark_matched();
        }
        assert!(board.all_matched());

        board.reset();
        assert!(board.is_empty());
        assert!(!board.all_matched());
    }

    #[test]
    fn shuffle_keeps_every_element() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut items: Vec<u32> = (0..50).collect();
        shuffle(&mut items, &mut rng);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }
}
