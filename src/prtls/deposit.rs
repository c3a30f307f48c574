use crate::flds::field::{Centering, FieldViewMut};
use crate::mesh::RealVect;
use crate::prtls::gather::{cic_weights, inv_cell_size};
use crate::Float;
use itertools::izip;
use serde::Deserialize;

/// Which current deposition the species uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrentDeposition {
    /// Scatter `q w v` with the gather stencil at the mid step position.
    Direct,
    /// Charge conserving deposition from the old and new positions.
    Esirkepov,
}

impl Default for CurrentDeposition {
    fn default() -> Self {
        CurrentDeposition::Direct
    }
}

#[inline(always)]
fn scatter(fld: &mut FieldViewMut, base: [i64; 3], w: &[[Float; 2]; 3], val: Float) {
    for (c, wz) in w[2].iter().enumerate() {
        for (b, wy) in w[1].iter().enumerate() {
            let wyz = wy * wz * val;
            for (a, wx) in w[0].iter().enumerate() {
                fld.add([base[0] + a as i64, base[1] + b as i64, base[2] + c as i64], wx * wyz);
            }
        }
    }
}

/// Direct current deposition.
///
/// The particles have already been moved, so the current is evaluated at
/// `x - v dt / 2`. Each component is scattered with the same weights the
/// gather uses for the matching electric field component.
#[allow(clippy::too_many_arguments)]
pub fn deposit_current_direct<'a>(
    jx: &mut FieldViewMut<'a>,
    jy: &mut FieldViewMut<'a>,
    jz: &mut FieldViewMut<'a>,
    xp: &[Float],
    yp: &[Float],
    zp: &[Float],
    ux: &[Float],
    uy: &[Float],
    uz: &[Float],
    ginv: &[Float],
    w: &[Float],
    charge: Float,
    dt: Float,
    plo: RealVect,
    dx: RealVect,
) {
    if !cfg!(feature = "unchecked") {
        let np = xp.len();
        assert!([yp.len(), zp.len(), ux.len(), uy.len(), uz.len(), ginv.len(), w.len()]
            .iter()
            .all(|&n| n == np));
    }
    let dxi = inv_cell_size(dx);
    let inv_vol = dxi[0] * dxi[1] * dxi[2];
    let centering = Centering::electric();

    for (x, y, z, ux, uy, uz, ginv, w) in izip!(xp, yp, zp, ux, uy, uz, ginv, w) {
        let v = [ux * ginv, uy * ginv, uz * ginv];
        let xmid = [x - 0.5 * dt * v[0], y - 0.5 * dt * v[1], z - 0.5 * dt * v[2]];
        let qw = charge * w * inv_vol;
        for (d, j) in [&mut *jx, &mut *jy, &mut *jz].into_iter().enumerate() {
            let (base, wts) = cic_weights(xmid, plo, dxi, centering[d]);
            scatter(j, base, &wts, qw * v[d]);
        }
    }
}

/// Nodal charge density `q w S / (dx dy dz)` with the linear shape.
#[allow(clippy::too_many_arguments)]
pub fn deposit_charge(
    rho: &mut FieldViewMut,
    xp: &[Float],
    yp: &[Float],
    zp: &[Float],
    w: &[Float],
    charge: Float,
    plo: RealVect,
    dx: RealVect,
) {
    if !cfg!(feature = "unchecked") {
        assert_eq!(xp.len(), w.len());
        assert_eq!(yp.len(), w.len());
        assert_eq!(zp.len(), w.len());
    }
    let dxi = inv_cell_size(dx);
    let inv_vol = dxi[0] * dxi[1] * dxi[2];
    for (x, y, z, w) in izip!(xp, yp, zp, w) {
        let (base, wts) = cic_weights([*x, *y, *z], plo, dxi, Centering::NODAL);
        scatter(rho, base, &wts, charge * w * inv_vol);
    }
}

#[inline(always)]
fn shape(r: Float) -> Float {
    (1.0 - r.abs()).max(0.0)
}

/// Esirkepov's charge conserving current deposition for the linear shape.
///
/// The deposited current satisfies the discrete continuity equation
/// `(rho_new - rho_old) / dt + div J = 0` exactly for the charge deposited
/// by [`deposit_charge`]. Every particle must move less than one cell per
/// step on each axis.
#[allow(clippy::too_many_arguments)]
pub fn deposit_current_esirkepov<'a>(
    jx: &mut FieldViewMut<'a>,
    jy: &mut FieldViewMut<'a>,
    jz: &mut FieldViewMut<'a>,
    old: [&[Float]; 3],
    new: [&[Float]; 3],
    w: &[Float],
    charge: Float,
    dt: Float,
    plo: RealVect,
    dx: RealVect,
) {
    let np = w.len();
    if !cfg!(feature = "unchecked") {
        assert!(old.iter().chain(new.iter()).all(|a| a.len() == np));
    }
    let dxi = inv_cell_size(dx);
    let inv_vol = dxi[0] * dxi[1] * dxi[2];
    let third: Float = 1.0 / 3.0;
    let j = [jx, jy, jz];

    for ip in 0..np {
        // 1d shapes on the nodes i0 .. i0 + 3 around the old position
        let mut i0 = [0i64; 3];
        let mut s0 = [[0.0 as Float; 4]; 3];
        let mut ds = [[0.0 as Float; 4]; 3];
        for d in 0..3 {
            let xo = (old[d][ip] - plo[d]) * dxi[d];
            let xn = (new[d][ip] - plo[d]) * dxi[d];
            if !cfg!(feature = "unchecked") {
                assert!(
                    (xn - xo).abs() < 1.0,
                    "particle moved more than one cell in one step"
                );
            }
            i0[d] = xo.floor() as i64 - 1;
            for k in 0..4 {
                let node = (i0[d] + k as i64) as Float;
                s0[d][k] = shape(xo - node);
                ds[d][k] = shape(xn - node) - s0[d][k];
            }
        }

        let qw = charge * w[ip] * inv_vol;
        for d in 0..3 {
            // the two transverse axes
            let (a1, a2) = ((d + 1) % 3, (d + 2) % 3);
            let cons = -qw * dx[d] / dt;
            for k2 in 0..4 {
                for k1 in 0..4 {
                    let transverse = s0[a1][k1] * s0[a2][k2]
                        + 0.5 * ds[a1][k1] * s0[a2][k2]
                        + 0.5 * s0[a1][k1] * ds[a2][k2]
                        + third * ds[a1][k1] * ds[a2][k2];
                    if transverse == 0.0 {
                        continue;
                    }
                    // running sum along d; the flux past the last node is zero
                    let mut flux = 0.0;
                    for k in 0..3 {
                        flux += cons * ds[d][k] * transverse;
                        let mut iv = [0i64; 3];
                        iv[d] = i0[d] + k as i64;
                        iv[a1] = i0[a1] + k1 as i64;
                        iv[a2] = i0[a2] + k2 as i64;
                        j[d].add(iv, flux);
                    }
                }
            }
        }
    }
}
