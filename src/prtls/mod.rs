use crate::mesh::tiles::TileKey;
use crate::mesh::RealVect;
use crate::Float;
use std::collections::BTreeMap;

pub mod deposit;
pub mod gather;
pub mod init;
pub mod push;
pub mod redistribute;

/// One particle record, used when records move between tiles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub id: u64,
    pub cpu: u32,
    pub pos: RealVect,
    pub u: RealVect,
    pub w: Float,
    pub ginv: Float,
}

/// The particles of one tile, stored as a structure of arrays.
///
/// Every attribute vector has the same length. `ex..bz` and `ginv` are
/// scratch written by the gather and the pushers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleTile {
    pub id: Vec<u64>,
    pub cpu: Vec<u32>,
    pub x: Vec<Float>,
    pub y: Vec<Float>,
    pub z: Vec<Float>,
    pub ux: Vec<Float>,
    pub uy: Vec<Float>,
    pub uz: Vec<Float>,
    pub w: Vec<Float>,
    pub ex: Vec<Float>,
    pub ey: Vec<Float>,
    pub ez: Vec<Float>,
    pub bx: Vec<Float>,
    pub by: Vec<Float>,
    pub bz: Vec<Float>,
    pub ginv: Vec<Float>,
}

impl ParticleTile {
    pub fn new() -> ParticleTile {
        ParticleTile::default()
    }

    pub fn with_capacity(n: usize) -> ParticleTile {
        let mut tile = ParticleTile::default();
        tile.reserve(n);
        tile
    }

    fn real_attribs_mut(&mut self) -> [&mut Vec<Float>; 14] {
        [
            &mut self.x,
            &mut self.y,
            &mut self.z,
            &mut self.ux,
            &mut self.uy,
            &mut self.uz,
            &mut self.w,
            &mut self.ex,
            &mut self.ey,
            &mut self.ez,
            &mut self.bx,
            &mut self.by,
            &mut self.bz,
            &mut self.ginv,
        ]
    }

    pub fn reserve(&mut self, n: usize) {
        self.id.reserve(n);
        self.cpu.reserve(n);
        for attr in self.real_attribs_mut() {
            attr.reserve(n);
        }
    }

    pub fn len(&self) -> usize {
        self.id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    /// True if all attribute vectors have the same length.
    pub fn is_consistent(&self) -> bool {
        let n = self.id.len();
        let reals = [
            &self.x, &self.y, &self.z, &self.ux, &self.uy, &self.uz, &self.w, &self.ex, &self.ey,
            &self.ez, &self.bx, &self.by, &self.bz, &self.ginv,
        ];
        self.cpu.len() == n && reals.iter().all(|v| v.len() == n)
    }

    /// Append one record; the gathered field scratch starts at zero.
    pub fn push(&mut self, p: Particle) {
        self.id.push(p.id);
        self.cpu.push(p.cpu);
        self.x.push(p.pos[0]);
        self.y.push(p.pos[1]);
        self.z.push(p.pos[2]);
        self.ux.push(p.u[0]);
        self.uy.push(p.u[1]);
        self.uz.push(p.u[2]);
        self.w.push(p.w);
        self.ginv.push(p.ginv);
        for attr in [
            &mut self.ex,
            &mut self.ey,
            &mut self.ez,
            &mut self.bx,
            &mut self.by,
            &mut self.bz,
        ] {
            attr.push(0.0);
        }
    }

    pub fn get(&self, i: usize) -> Particle {
        Particle {
            id: self.id[i],
            cpu: self.cpu[i],
            pos: [self.x[i], self.y[i], self.z[i]],
            u: [self.ux[i], self.uy[i], self.uz[i]],
            w: self.w[i],
            ginv: self.ginv[i],
        }
    }

    pub fn position(&self, i: usize) -> RealVect {
        [self.x[i], self.y[i], self.z[i]]
    }

    /// Move every record of `other` to the end of `self`, keeping order.
    pub fn append(&mut self, other: &mut ParticleTile) {
        self.id.append(&mut other.id);
        self.cpu.append(&mut other.cpu);
        for (dst, src) in self
            .real_attribs_mut()
            .into_iter()
            .zip(other.real_attribs_mut())
        {
            dst.append(src);
        }
    }

    /// Remove and return the records for which `pred` holds. The order of
    /// both the kept and the removed records is preserved.
    pub fn extract<F>(&mut self, pred: F) -> ParticleTile
    where
        F: Fn(&Particle) -> bool,
    {
        let n = self.len();
        let mut out = ParticleTile::new();
        let mut keep = ParticleTile::with_capacity(n);
        for i in 0..n {
            let p = self.get(i);
            if pred(&p) {
                out.push(p);
            } else {
                keep.push(p);
            }
        }
        if !out.is_empty() {
            *self = keep;
        }
        out
    }
}

/// Particle buffers keyed by `(box_id, tile_id)`. Tiles never share
/// storage; moving a particle is an explicit take from one entry and
/// append to another.
#[derive(Clone, Debug, Default)]
pub struct ParticleStore {
    tiles: BTreeMap<TileKey, ParticleTile>,
}

impl ParticleStore {
    pub fn new() -> ParticleStore {
        ParticleStore::default()
    }

    pub fn get(&self, key: TileKey) -> Option<&ParticleTile> {
        self.tiles.get(&key)
    }

    pub fn get_mut(&mut self, key: TileKey) -> Option<&mut ParticleTile> {
        self.tiles.get_mut(&key)
    }

    /// The entry for `key`, created empty if missing.
    pub fn tile_mut(&mut self, key: TileKey) -> &mut ParticleTile {
        self.tiles.entry(key).or_default()
    }

    pub fn take(&mut self, key: TileKey) -> Option<ParticleTile> {
        self.tiles.remove(&key)
    }

    pub fn insert(&mut self, key: TileKey, tile: ParticleTile) -> Option<ParticleTile> {
        self.tiles.insert(key, tile)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TileKey, &ParticleTile)> {
        self.tiles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&TileKey, &mut ParticleTile)> {
        self.tiles.iter_mut()
    }

    pub(crate) fn map(&self) -> &BTreeMap<TileKey, ParticleTile> {
        &self.tiles
    }

    pub(crate) fn map_mut(&mut self) -> &mut BTreeMap<TileKey, ParticleTile> {
        &mut self.tiles
    }

    pub fn keys(&self) -> Vec<TileKey> {
        self.tiles.keys().copied().collect()
    }

    pub fn num_particles(&self) -> usize {
        self.tiles.values().map(|t| t.len()).sum()
    }

    pub fn counts(&self) -> Vec<(TileKey, usize)> {
        self.tiles.iter().map(|(k, t)| (*k, t.len())).collect()
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    fn prtl(id: u64, x: Float) -> Particle {
        Particle {
            id,
            cpu: 0,
            pos: [x, 0.5, 0.5],
            u: [1.0, 2.0, 3.0],
            w: 4.0,
            ginv: 1.0,
        }
    }

    #[test]
    fn push_keeps_attributes_aligned() {
        let mut tile = ParticleTile::new();
        assert!(tile.is_empty());
        for i in 0..5 {
            tile.push(prtl(i, i as Float));
        }
        assert_eq!(tile.len(), 5);
        assert!(tile.is_consistent());
        assert_eq!(tile.get(3), prtl(3, 3.0));
        assert_eq!(tile.ex, vec![0.0; 5]);
    }

    #[test]
    fn append_moves_in_order() {
        let mut a = ParticleTile::new();
        let mut b = ParticleTile::new();
        a.push(prtl(0, 0.0));
        b.push(prtl(1, 1.0));
        b.push(prtl(2, 2.0));
        a.append(&mut b);
        assert!(b.is_empty());
        assert!(b.is_consistent());
        assert_eq!(a.id, vec![0, 1, 2]);
        assert_eq!(a.x, vec![0.0, 1.0, 2.0]);
        assert!(a.is_consistent());
    }

    #[test]
    fn extract_splits_records() {
        let mut tile = ParticleTile::new();
        for i in 0..6 {
            tile.push(prtl(i, i as Float));
        }
        let out = tile.extract(|p| p.pos[0] >= 3.5);
        assert_eq!(out.id, vec![4, 5]);
        assert_eq!(tile.id, vec![0, 1, 2, 3]);
        assert!(tile.is_consistent() && out.is_consistent());
        let none = tile.extract(|_| false);
        assert!(none.is_empty());
        assert_eq!(tile.len(), 4);
    }

    #[test]
    fn store_take_and_insert() {
        let mut store = ParticleStore::new();
        store.tile_mut((0, 1)).push(prtl(7, 0.0));
        store.tile_mut((0, 0));
        assert_eq!(store.counts(), vec![((0, 0), 0), ((0, 1), 1)]);
        let moved = store.take((0, 1)).unwrap();
        assert!(store.get((0, 1)).is_none());
        store.insert((1, 0), moved);
        assert_eq!(store.num_particles(), 1);
        assert_eq!(store.get((1, 0)).map(|t| t.id[0]), Some(7));
    }
}
