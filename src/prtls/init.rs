use crate::consts::C;
use crate::error::{PicError, Result};
use crate::mesh::{Geometry, IndexBox, RealBox, RealVect};
use crate::prtls::push::compute_inverse_gamma;
use crate::prtls::{Particle, ParticleTile};
use crate::Float;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::Deserialize;
use std::convert::TryFrom;
use std::str::FromStr;

/// Momentum given to the particles of the `Drift` mode, in units of c.
pub const DRIFT_MOMENTUM: RealVect = [0.01, 0.0, 0.0];

/// How the initial momenta are chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMode {
    /// independent gaussian per axis
    Thermal,
    /// the constant [`DRIFT_MOMENTUM`]
    Drift,
}

impl FromStr for SamplingMode {
    type Err = PicError;

    fn from_str(s: &str) -> Result<SamplingMode> {
        match s {
            "thermal" => Ok(SamplingMode::Thermal),
            "drift" => Ok(SamplingMode::Drift),
            _ => Err(PicError::UnknownSamplingMode(s.to_string())),
        }
    }
}

impl TryFrom<i32> for SamplingMode {
    type Error = PicError;

    /// The integer problem codes: 0 thermal, 1 drift.
    fn try_from(code: i32) -> Result<SamplingMode> {
        match code {
            0 => Ok(SamplingMode::Thermal),
            1 => Ok(SamplingMode::Drift),
            _ => Err(PicError::UnknownSamplingMode(code.to_string())),
        }
    }
}

/// Source of normally distributed deviates. Seeding is up to the caller.
pub trait GaussianSource {
    fn gaussian(&mut self, mean: Float, std: Float) -> Float;
}

impl<R: Rng + ?Sized> GaussianSource for R {
    fn gaussian(&mut self, mean: Float, std: Float) -> Float {
        let n: Float = self.sample(StandardNormal);
        mean + std * n
    }
}

/// Everything needed to seed particles into a region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Injection {
    pub ppc: [usize; 3],
    pub u_std: Float,
    pub u_mean: Float,
    pub density: Float,
    pub bounds: RealBox,
    pub mode: SamplingMode,
}

impl Injection {
    pub fn num_ppc(&self) -> usize {
        self.ppc[0] * self.ppc[1] * self.ppc[2]
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_ppc() == 0 {
            return Err(PicError::InvalidInput(format!(
                "particles per cell must be positive on every axis, got {:?}",
                self.ppc
            )));
        }
        if !(self.u_std >= 0.0) {
            return Err(PicError::InvalidInput(format!(
                "thermal spread must be non negative, got {}",
                self.u_std
            )));
        }
        Ok(())
    }
}

/// Position of sample `i_part` inside the unit cell. The samples sit at
/// the centres of an `nx * ny * nz` subdivision of the cell.
pub fn position_in_unit_cell(ppc: [usize; 3], i_part: usize) -> RealVect {
    let [nx, ny, nz] = ppc;
    let ix = i_part / (ny * nz);
    let iy = (i_part % (ny * nz)) % ny;
    let iz = (i_part % (ny * nz)) / ny;
    [
        (0.5 + ix as Float) / nx as Float,
        (0.5 + iy as Float) / ny as Float,
        (0.5 + iz as Float) / nz as Float,
    ]
}

/// Momentum of one new particle, in units of c.
pub fn sample_momentum<G>(mode: SamplingMode, u_mean: Float, u_std: Float, rng: &mut G) -> RealVect
where
    G: GaussianSource + ?Sized,
{
    match mode {
        SamplingMode::Thermal => [
            rng.gaussian(u_mean, u_std),
            rng.gaussian(u_mean, u_std),
            rng.gaussian(u_mean, u_std),
        ],
        SamplingMode::Drift => DRIFT_MOMENTUM,
    }
}

/// Seed every cell of `tile_box`. Records come out in cell order, then
/// sample order; samples falling outside of `inj.bounds` are dropped
/// without using up an id.
pub fn init_tile<G>(
    tile_box: &IndexBox,
    geom: &Geometry,
    inj: &Injection,
    rank: u32,
    next_id: &mut u64,
    rng: &mut G,
) -> ParticleTile
where
    G: GaussianSource + ?Sized,
{
    let num_ppc = inj.num_ppc();
    let plo = geom.prob_lo();
    let dx = geom.cell_size;
    let weight = inj.density * geom.cell_volume() / num_ppc as Float;

    let mut prtls = ParticleTile::with_capacity(tile_box.num_cells() * num_ppc);
    for iv in tile_box.cells() {
        for i_part in 0..num_ppc {
            let r = position_in_unit_cell(inj.ppc, i_part);
            let u = sample_momentum(inj.mode, inj.u_mean, inj.u_std, rng);

            let mut pos = [0.0; 3];
            for d in 0..3 {
                pos[d] = plo[d] + (iv[d] as Float + r[d]) * dx[d];
            }
            if !inj.bounds.contains(pos) {
                continue;
            }

            let u = [u[0] * C, u[1] * C, u[2] * C];
            prtls.push(Particle {
                id: *next_id,
                cpu: rank,
                pos,
                u,
                w: weight,
                ginv: compute_inverse_gamma(u[0], u[1], u[2]),
            });
            *next_id += 1;
        }
    }
    prtls
}
