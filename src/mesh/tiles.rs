use crate::mesh::{BoxArray, DistributionMap, IndexBox, IntVect};
use std::collections::BTreeMap;

/// `(box_id, tile_id)`; the key of a tile in the particle store.
pub type TileKey = (usize, usize);

/// One independently schedulable piece of a box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    pub box_id: usize,
    /// index of the tile among the tiles of its box
    pub tile_id: usize,
    pub tile_box: IndexBox,
    pub valid_box: IndexBox,
}

impl Tile {
    pub fn key(&self) -> TileKey {
        (self.box_id, self.tile_id)
    }
}

/// Where the tiles of one local box start in the directory.
#[derive(Clone, Copy, Debug)]
struct BoxTiles {
    valid_box: IndexBox,
    first: usize,
    ntiles: [usize; 3],
}

/// The tiles owned by one rank, in a fixed order: boxes in box array
/// order, tiles of a box x fastest.
#[derive(Clone, Debug)]
pub struct TileDirectory {
    tiles: Vec<Tile>,
    tile_size: [usize; 3],
    slots: BTreeMap<TileKey, usize>,
    boxes: Vec<BoxTiles>,
}

impl TileDirectory {
    pub fn new(
        boxes: &BoxArray,
        dmap: &DistributionMap,
        rank: usize,
        tile_size: [usize; 3],
    ) -> TileDirectory {
        if !cfg!(feature = "unchecked") {
            assert_eq!(boxes.len(), dmap.len());
        }
        let tile_size = tile_size.map(|n| n.max(1));
        let mut tiles = Vec::new();
        let mut slots = BTreeMap::new();
        let mut local = Vec::new();
        for (box_id, valid_box) in boxes.iter().enumerate() {
            if dmap.owner(box_id) != rank || valid_box.is_empty() {
                continue;
            }
            local.push(BoxTiles {
                valid_box: *valid_box,
                first: tiles.len(),
                ntiles: [0, 1, 2].map(|d| (valid_box.length(d) + tile_size[d] - 1) / tile_size[d]),
            });
            for (tile_id, tile_box) in valid_box.chop(tile_size).into_iter().enumerate() {
                slots.insert((box_id, tile_id), tiles.len());
                tiles.push(Tile {
                    box_id,
                    tile_id,
                    tile_box,
                    valid_box: *valid_box,
                });
            }
        }
        TileDirectory {
            tiles,
            tile_size,
            slots,
            boxes: local,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tile> {
        self.tiles.iter()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile_size(&self) -> [usize; 3] {
        self.tile_size
    }

    pub fn get(&self, key: TileKey) -> Option<&Tile> {
        self.slots.get(&key).map(|&n| &self.tiles[n])
    }

    /// The local tile containing cell `iv`. Tiles of a box are laid out
    /// in steps of `tile_size` from its lower corner, so only the box is
    /// searched for.
    pub fn tile_at(&self, iv: IntVect) -> Option<&Tile> {
        let bt = self.boxes.iter().find(|bt| bt.valid_box.contains(iv))?;
        let mut t = [0; 3];
        for d in 0..3 {
            t[d] = (iv[d] - bt.valid_box.lo[d]) as usize / self.tile_size[d];
        }
        let n = t[0] + bt.ntiles[0] * (t[1] + bt.ntiles[1] * t[2]);
        self.tiles.get(bt.first + n)
    }

    pub fn tiles_of_box(&self, box_id: usize) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().filter(move |t| t.box_id == box_id)
    }

    /// Ids of the local boxes, ascending.
    pub fn local_boxes(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self.tiles.iter().map(|t| t.box_id).collect();
        ids.dedup();
        ids
    }
}
