use crate::flds::field::{Centering, FieldView};
use crate::mesh::{IntVect, RealVect};
use crate::prtls::ParticleTile;
use crate::Float;
use itertools::izip;

/// Linear (cloud in cell) shape of a particle at `pos` with respect to the
/// samples of a component with the given centering.
///
/// Returns the lower sample index and the two weights per axis; the
/// particle touches samples `base[d]` and `base[d] + 1`. The gather and
/// the direct deposition both go through this function, which is what
/// makes them exact duals of each other.
#[inline(always)]
pub fn cic_weights(
    pos: RealVect,
    plo: RealVect,
    dxi: RealVect,
    centering: Centering,
) -> (IntVect, [[Float; 2]; 3]) {
    let mut base = [0; 3];
    let mut w = [[0.0; 2]; 3];
    for d in 0..3 {
        let xi = (pos[d] - plo[d]) * dxi[d] - centering.offset[d];
        let i = xi.floor();
        let f = xi - i;
        base[d] = i as i64;
        w[d] = [1.0 - f, f];
    }
    (base, w)
}

#[inline(always)]
pub(crate) fn inv_cell_size(dx: RealVect) -> RealVect {
    [1.0 / dx[0], 1.0 / dx[1], 1.0 / dx[2]]
}

/// Interpolate one field component onto the particles. `out[i]` is
/// overwritten with the trilinear average of the 8 samples around
/// particle `i`. The field is only read.
#[allow(clippy::too_many_arguments)]
pub fn gather_field(
    xp: &[Float],
    yp: &[Float],
    zp: &[Float],
    out: &mut [Float],
    fld: FieldView,
    centering: Centering,
    plo: RealVect,
    dx: RealVect,
) {
    if !cfg!(feature = "unchecked") {
        assert_eq!(xp.len(), out.len());
        assert_eq!(yp.len(), out.len());
        assert_eq!(zp.len(), out.len());
    }
    let dxi = inv_cell_size(dx);
    for (x, y, z, out) in izip!(xp, yp, zp, out) {
        let (base, w) = cic_weights([*x, *y, *z], plo, dxi, centering);
        let mut val: Float = 0.0;
        for (c, wz) in w[2].iter().enumerate() {
            for (b, wy) in w[1].iter().enumerate() {
                let wyz = wy * wz;
                for (a, wx) in w[0].iter().enumerate() {
                    val += wx * wyz * fld.at([base[0] + a as i64, base[1] + b as i64, base[2] + c as i64]);
                }
            }
        }
        *out = val;
    }
}

/// Gather Ex, Ey, Ez into the particle scratch attributes.
pub fn gather_electric_field(
    prtls: &mut ParticleTile,
    e: [FieldView; 3],
    plo: RealVect,
    dx: RealVect,
) {
    let c = Centering::electric();
    gather_field(&prtls.x, &prtls.y, &prtls.z, &mut prtls.ex, e[0], c[0], plo, dx);
    gather_field(&prtls.x, &prtls.y, &prtls.z, &mut prtls.ey, e[1], c[1], plo, dx);
    gather_field(&prtls.x, &prtls.y, &prtls.z, &mut prtls.ez, e[2], c[2], plo, dx);
}

/// Gather Bx, By, Bz into the particle scratch attributes.
pub fn gather_magnetic_field(
    prtls: &mut ParticleTile,
    b: [FieldView; 3],
    plo: RealVect,
    dx: RealVect,
) {
    let c = Centering::magnetic();
    gather_field(&prtls.x, &prtls.y, &prtls.z, &mut prtls.bx, b[0], c[0], plo, dx);
    gather_field(&prtls.x, &prtls.y, &prtls.z, &mut prtls.by, b[1], c[1], plo, dx);
    gather_field(&prtls.x, &prtls.y, &prtls.z, &mut prtls.bz, b[2], c[2], plo, dx);
}
