use crate::mesh::tiles::{TileDirectory, TileKey};
use crate::mesh::{Geometry, RealBox};
use crate::prtls::{ParticleStore, ParticleTile};
use crate::Float;
use std::collections::BTreeMap;

/// Fold `x` back into `[lo, hi)`.
#[inline(always)]
pub fn wrap_coord(x: Float, lo: Float, hi: Float) -> Float {
    let len = hi - lo;
    let mut r = (x - lo).rem_euclid(len);
    // rounding can land a tiny negative offset exactly on `len`
    if r >= len {
        r -= len;
    }
    let wrapped = lo + r;
    if wrapped >= hi {
        lo
    } else {
        wrapped
    }
}

/// Apply periodic boundaries to every particle of the tile.
pub fn wrap_periodic(prtls: &mut ParticleTile, domain: &RealBox) {
    for (d, xs) in [&mut prtls.x, &mut prtls.y, &mut prtls.z].into_iter().enumerate() {
        let (lo, hi) = (domain.lo[d], domain.hi[d]);
        for x in xs.iter_mut() {
            if *x < lo || *x >= hi {
                *x = wrap_coord(*x, lo, hi);
            }
        }
    }
}

/// The local tile whose cells contain `pos`, if any.
pub fn owning_tile(tiles: &TileDirectory, geom: &Geometry, pos: [Float; 3]) -> Option<TileKey> {
    tiles.tile_at(geom.cell_index(pos)).map(|t| t.key())
}

/// Move every particle into the tile that owns its position.
///
/// Particles are taken out of their old buffer and appended to the new
/// one; source tiles are visited in key order so the result does not
/// depend on the execution policy. Particles with no local owner are
/// dropped. Returns `(moved, dropped)`.
pub fn redistribute(
    store: &mut ParticleStore,
    tiles: &TileDirectory,
    geom: &Geometry,
) -> (usize, usize) {
    let mut outgoing: BTreeMap<TileKey, ParticleTile> = BTreeMap::new();
    let mut dropped = 0;

    for key in store.keys() {
        let leaving = match store.get_mut(key) {
            Some(prtls) => prtls.extract(|p| owning_tile(tiles, geom, p.pos) != Some(key)),
            None => continue,
        };
        for i in 0..leaving.len() {
            let p = leaving.get(i);
            match owning_tile(tiles, geom, p.pos) {
                Some(dest) => outgoing.entry(dest).or_default().push(p),
                None => dropped += 1,
            }
        }
    }

    let mut moved = 0;
    for (dest, mut prtls) in outgoing {
        moved += prtls.len();
        store.tile_mut(dest).append(&mut prtls);
    }
    if dropped > 0 {
        log::warn!("{} particles left the local boxes and were dropped", dropped);
    }
    (moved, dropped)
}
