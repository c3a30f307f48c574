use crate::error::Result;
use crate::flds::field::{Centering, Field};
use crate::flds::{EmFields, Flds, MultiField};
use crate::mesh::loops::Exec;
use crate::mesh::tiles::{Tile, TileDirectory, TileKey};
use crate::mesh::{BoxArray, DistributionMap, Geometry, RealBox, RealVect};
use crate::prtls::deposit::{self, CurrentDeposition};
use crate::prtls::gather::{gather_electric_field, gather_magnetic_field};
use crate::prtls::init::{init_tile, GaussianSource, Injection, SamplingMode};
use crate::prtls::push::{push_momentum_boris, push_position, set_gamma};
use crate::prtls::redistribute::{redistribute, wrap_periodic};
use crate::prtls::{ParticleStore, ParticleTile};
use crate::Float;
use log::{debug, info};
use rayon::prelude::*;

/// Per step constants shared by every tile kernel.
#[derive(Clone, Copy)]
struct TileKernel {
    plo: RealVect,
    dx: RealVect,
    charge: Float,
    mass: Float,
    deposition: CurrentDeposition,
}

impl TileKernel {
    fn gather_and_push_momenta(&self, tile: &Tile, prtls: &mut ParticleTile, em: &EmFields, dt: Float) {
        let e = [
            em.e[0].get(tile.box_id).view(),
            em.e[1].get(tile.box_id).view(),
            em.e[2].get(tile.box_id).view(),
        ];
        let b = [
            em.b[0].get(tile.box_id).view(),
            em.b[1].get(tile.box_id).view(),
            em.b[2].get(tile.box_id).view(),
        ];
        gather_electric_field(prtls, e, self.plo, self.dx);
        gather_magnetic_field(prtls, b, self.plo, self.dx);
        push_momentum_boris(
            &mut prtls.ux,
            &mut prtls.uy,
            &mut prtls.uz,
            &mut prtls.ginv,
            &prtls.ex,
            &prtls.ey,
            &prtls.ez,
            &prtls.bx,
            &prtls.by,
            &prtls.bz,
            self.charge,
            self.mass,
            dt,
        );
    }

    fn push_positions(&self, prtls: &mut ParticleTile, dt: Float) {
        push_position(
            &mut prtls.x,
            &mut prtls.y,
            &mut prtls.z,
            &prtls.ux,
            &prtls.uy,
            &prtls.uz,
            &prtls.ginv,
            dt,
        );
    }

    /// Gather, push and deposit one tile. The current goes into buffers
    /// covering the tile grown by `n_ghost`.
    fn push_and_deposit(
        &self,
        tile: &Tile,
        prtls: &mut ParticleTile,
        em: &EmFields,
        n_ghost: usize,
        dt: Float,
    ) -> [Field; 3] {
        self.gather_and_push_momenta(tile, prtls, em, dt);
        let old = match self.deposition {
            CurrentDeposition::Esirkepov => Some([prtls.x.clone(), prtls.y.clone(), prtls.z.clone()]),
            CurrentDeposition::Direct => None,
        };
        self.push_positions(prtls, dt);

        let c = Centering::electric();
        let mut j = [
            Field::new("j_x", tile.tile_box, n_ghost, c[0]),
            Field::new("j_y", tile.tile_box, n_ghost, c[1]),
            Field::new("j_z", tile.tile_box, n_ghost, c[2]),
        ];
        let [jx, jy, jz] = &mut j;
        match old {
            None => deposit::deposit_current_direct(
                &mut jx.view_mut(),
                &mut jy.view_mut(),
                &mut jz.view_mut(),
                &prtls.x,
                &prtls.y,
                &prtls.z,
                &prtls.ux,
                &prtls.uy,
                &prtls.uz,
                &prtls.ginv,
                &prtls.w,
                self.charge,
                dt,
                self.plo,
                self.dx,
            ),
            Some([xo, yo, zo]) => deposit::deposit_current_esirkepov(
                &mut jx.view_mut(),
                &mut jy.view_mut(),
                &mut jz.view_mut(),
                [xo.as_slice(), yo.as_slice(), zo.as_slice()],
                [prtls.x.as_slice(), prtls.y.as_slice(), prtls.z.as_slice()],
                &prtls.w,
                self.charge,
                dt,
                self.plo,
                self.dx,
            ),
        }
        j
    }

    fn deposit_charge(&self, tile: &Tile, prtls: &ParticleTile, n_ghost: usize) -> Field {
        let mut rho = Field::new("rho", tile.tile_box, n_ghost, Centering::NODAL);
        deposit::deposit_charge(
            &mut rho.view_mut(),
            &prtls.x,
            &prtls.y,
            &prtls.z,
            &prtls.w,
            self.charge,
            self.plo,
            self.dx,
        );
        rho
    }
}

/// Run `f` on every non empty tile of the store, in tile key order for
/// `Seq` and `Vector` and on the rayon pool for `Threads`. The results
/// come back in key order either way.
fn for_each_tile<F, R>(exec: Exec, tiles: &TileDirectory, store: &mut ParticleStore, f: F) -> Vec<R>
where
    F: Fn(&Tile, &mut ParticleTile) -> R + Send + Sync,
    R: Send,
{
    let visit = |(key, prtls): (&TileKey, &mut ParticleTile)| {
        if prtls.is_empty() {
            return None;
        }
        tiles.get(*key).map(|tile| f(tile, prtls))
    };
    match exec {
        Exec::Threads => store.map_mut().par_iter_mut().filter_map(visit).collect(),
        Exec::Seq | Exec::Vector => store.map_mut().iter_mut().filter_map(visit).collect(),
    }
}

/// One kind of particle together with the tiles it lives on.
///
/// The species owns its particle store and id counter. Fields are
/// borrowed per call; E and B are only read and J is only added to.
#[derive(Clone, Debug)]
pub struct Species {
    pub name: String,
    pub charge: Float,
    pub mass: Float,
    /// how tiles are scheduled
    pub exec: Exec,
    pub deposition: CurrentDeposition,
    geom: Geometry,
    tiles: TileDirectory,
    store: ParticleStore,
    rank: usize,
    next_id: u64,
}

impl Species {
    pub fn new(
        geom: Geometry,
        boxes: &BoxArray,
        dmap: &DistributionMap,
        rank: usize,
        tile_size: [usize; 3],
        charge: Float,
        mass: Float,
    ) -> Species {
        let tiles = TileDirectory::new(boxes, dmap, rank, tile_size);
        let mut store = ParticleStore::new();
        for tile in tiles.iter() {
            store.tile_mut(tile.key());
        }
        Species {
            name: String::from("species"),
            charge,
            mass,
            exec: Exec::default(),
            deposition: CurrentDeposition::default(),
            geom,
            tiles,
            store,
            rank,
            next_id: 0,
        }
    }

    fn kernel(&self) -> TileKernel {
        TileKernel {
            plo: self.geom.prob_lo(),
            dx: self.geom.cell_size,
            charge: self.charge,
            mass: self.mass,
            deposition: self.deposition,
        }
    }

    /// Seed `ppc` particles into every cell of every local tile, keeping
    /// those that fall inside `bounds`. Tiles are filled one after the
    /// other so the draws from `rng` happen in a fixed order.
    #[allow(clippy::too_many_arguments)]
    pub fn init_particles<G>(
        &mut self,
        ppc: [usize; 3],
        u_std: Float,
        u_mean: Float,
        density: Float,
        bounds: RealBox,
        mode: SamplingMode,
        rng: &mut G,
    ) -> Result<()>
    where
        G: GaussianSource + ?Sized,
    {
        let inj = Injection {
            ppc,
            u_std,
            u_mean,
            density,
            bounds,
            mode,
        };
        inj.validate()?;

        let before = self.store.num_particles();
        for tile in self.tiles.iter() {
            let mut batch = init_tile(
                &tile.tile_box,
                &self.geom,
                &inj,
                self.rank as u32,
                &mut self.next_id,
                rng,
            );
            debug!("{}: tile {:?} got {} particles", self.name, tile.key(), batch.len());
            if !batch.is_empty() {
                self.store.tile_mut(tile.key()).append(&mut batch);
            }
        }
        info!(
            "{}: injected {} particles",
            self.name,
            self.store.num_particles() - before
        );
        Ok(())
    }

    /// Gather E and B, push momenta and positions and deposit the current
    /// of every tile. Tile buffers are added into `flds.j_*` afterwards,
    /// in tile order.
    pub fn push_and_deposit_particles(&mut self, flds: &mut Flds, dt: Float) {
        let kernel = self.kernel();
        let (em, cur) = flds.split_mut();
        let n_ghost = cur.j[0].n_ghost();
        let bufs = for_each_tile(self.exec, &self.tiles, &mut self.store, |tile, prtls| {
            (tile.box_id, kernel.push_and_deposit(tile, prtls, &em, n_ghost, dt))
        });
        debug!("{}: merging {} tile current buffers", self.name, bufs.len());
        let [jx, jy, jz] = cur.j;
        for (box_id, [bx, by, bz]) in bufs {
            jx.get_mut(box_id).add_from(&bx);
            jy.get_mut(box_id).add_from(&by);
            jz.get_mut(box_id).add_from(&bz);
        }
    }

    /// Gather E and B and push the momenta. Positions are left alone.
    pub fn push_particle_momenta(&mut self, flds: &Flds, dt: Float) {
        let kernel = self.kernel();
        let em = flds.em();
        for_each_tile(self.exec, &self.tiles, &mut self.store, |tile, prtls| {
            kernel.gather_and_push_momenta(tile, prtls, &em, dt)
        });
    }

    /// Recompute 1/γ from the momenta and move the particles.
    pub fn push_particle_positions(&mut self, dt: Float) {
        let kernel = self.kernel();
        for_each_tile(self.exec, &self.tiles, &mut self.store, |_, prtls| {
            set_gamma(&prtls.ux, &prtls.uy, &prtls.uz, &mut prtls.ginv);
            kernel.push_positions(prtls, dt);
        });
    }

    /// Add the charge density of the species into `rho`.
    pub fn deposit_charge(&self, rho: &mut MultiField) {
        let kernel = self.kernel();
        let n_ghost = rho.n_ghost();
        let visit = |(key, prtls): (&TileKey, &ParticleTile)| {
            if prtls.is_empty() {
                return None;
            }
            self.tiles
                .get(*key)
                .map(|tile| (tile.box_id, kernel.deposit_charge(tile, prtls, n_ghost)))
        };
        let bufs: Vec<(usize, Field)> = match self.exec {
            Exec::Threads => self.store.map().par_iter().filter_map(visit).collect(),
            Exec::Seq | Exec::Vector => self.store.map().iter().filter_map(visit).collect(),
        };
        for (box_id, buf) in bufs {
            rho.get_mut(box_id).add_from(&buf);
        }
    }

    /// Wrap positions back into the problem domain and move every
    /// particle to the tile that owns it. Single rank only.
    pub fn redistribute_periodic(&mut self) {
        let domain = self.geom.prob_domain;
        for_each_tile(self.exec, &self.tiles, &mut self.store, |_, prtls| {
            wrap_periodic(prtls, &domain)
        });
        let (moved, dropped) = redistribute(&mut self.store, &self.tiles, &self.geom);
        debug!(
            "{}: redistribution moved {} and dropped {} particles",
            self.name, moved, dropped
        );
    }

    pub fn num_particles(&self) -> usize {
        self.store.num_particles()
    }

    /// Number of particles per tile, in tile key order.
    pub fn tile_counts(&self) -> Vec<(TileKey, usize)> {
        self.store.counts()
    }

    pub fn tile(&self, key: TileKey) -> Option<&ParticleTile> {
        self.store.get(key)
    }

    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    pub fn tiles(&self) -> &TileDirectory {
        &self.tiles
    }

    pub fn geom(&self) -> &Geometry {
        &self.geom
    }

    /// The id the next injected particle will get.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }
}
