use crate::consts::C;
use crate::Float;
use itertools::izip;

/// 1/γ for a momentum `u = γv`.
#[inline(always)]
pub fn compute_inverse_gamma(ux: Float, uy: Float, uz: Float) -> Float {
    let csqinv = 1. / (C * C);
    (1. + (ux * ux + uy * uy + uz * uz) * csqinv).sqrt().powi(-1)
}

/// Recompute `ginv` from the momenta.
pub fn set_gamma(ux: &[Float], uy: &[Float], uz: &[Float], ginv: &mut [Float]) {
    if !cfg!(feature = "unchecked") {
        assert_eq!(ux.len(), ginv.len());
        assert_eq!(uy.len(), ginv.len());
        assert_eq!(uz.len(), ginv.len());
    }
    for (ux, uy, uz, ginv) in izip!(ux, uy, uz, ginv) {
        *ginv = compute_inverse_gamma(*ux, *uy, *uz);
    }
}

/// Relativistic Boris push of the momenta with the gathered fields.
/// Leaves the matching 1/γ of the new momentum in `ginv`.
#[allow(clippy::too_many_arguments)]
pub fn push_momentum_boris(
    ux: &mut [Float],
    uy: &mut [Float],
    uz: &mut [Float],
    ginv: &mut [Float],
    ex: &[Float],
    ey: &[Float],
    ez: &[Float],
    bx: &[Float],
    by: &[Float],
    bz: &[Float],
    charge: Float,
    mass: Float,
    dt: Float,
) {
    let np = ux.len();
    if !cfg!(feature = "unchecked") {
        for len in &[
            uy.len(),
            uz.len(),
            ginv.len(),
            ex.len(),
            ey.len(),
            ez.len(),
            bx.len(),
            by.len(),
            bz.len(),
        ] {
            assert_eq!(*len, np);
        }
    }
    let csqinv = 1. / (C * C);
    let cons = charge * dt / (2.0 * mass);

    for (ux, uy, uz, ginv, ex, ey, ez, bx, by, bz) in
        izip!(ux, uy, uz, ginv, ex, ey, ez, bx, by, bz)
    {
        // first half electric acceleration
        let uxm = *ux + cons * ex;
        let uym = *uy + cons * ey;
        let uzm = *uz + cons * ez;

        // rotation about B
        let gt = (1. + (uxm * uxm + uym * uym + uzm * uzm) * csqinv)
            .sqrt()
            .powi(-1);
        let tx = cons * gt * bx;
        let ty = cons * gt * by;
        let tz = cons * gt * bz;
        let boris = 2.0 * (1.0 + tx * tx + ty * ty + tz * tz).powi(-1);

        let uxt = uxm + uym * tz - uzm * ty;
        let uyt = uym + uzm * tx - uxm * tz;
        let uzt = uzm + uxm * ty - uym * tx;

        let uxp = uxm + boris * (uyt * tz - uzt * ty);
        let uyp = uym + boris * (uzt * tx - uxt * tz);
        let uzp = uzm + boris * (uxt * ty - uyt * tx);

        // second half electric acceleration
        *ux = uxp + cons * ex;
        *uy = uyp + cons * ey;
        *uz = uzp + cons * ez;

        *ginv = compute_inverse_gamma(*ux, *uy, *uz);
    }
}

/// `x += u/γ dt`. No boundary handling.
#[allow(clippy::too_many_arguments)]
pub fn push_position(
    x: &mut [Float],
    y: &mut [Float],
    z: &mut [Float],
    ux: &[Float],
    uy: &[Float],
    uz: &[Float],
    ginv: &[Float],
    dt: Float,
) {
    if !cfg!(feature = "unchecked") {
        let np = x.len();
        assert!([y.len(), z.len(), ux.len(), uy.len(), uz.len(), ginv.len()]
            .iter()
            .all(|&n| n == np));
    }
    for (x, y, z, ux, uy, uz, ginv) in izip!(x, y, z, ux, uy, uz, ginv) {
        let c1 = ginv * dt;
        *x += ux * c1;
        *y += uy * c1;
        *z += uz * c1;
    }
}

#[cfg(all(test, feature = "dprec"))]
pub mod tests {
    use super::*;
    use crate::consts::{M_E, Q_E};

    fn speed(ux: Float, uy: Float, uz: Float) -> Float {
        (ux * ux + uy * uy + uz * uz).sqrt()
    }

    #[test]
    fn inverse_gamma() {
        assert_eq!(compute_inverse_gamma(0.0, 0.0, 0.0), 1.0);
        // |u| = sqrt(3) c  =>  gamma = 2
        let u = C;
        assert!((compute_inverse_gamma(u, u, u) - 0.5).abs() < 1e-12);
        let mut ginv = vec![0.0; 2];
        set_gamma(&[0.0, u], &[0.0, u], &[0.0, u], &mut ginv);
        assert!((ginv[0] - 1.0).abs() < 1e-12);
        assert!((ginv[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn magnetic_rotation_keeps_speed() {
        let np = 4;
        let mut ux = vec![0.3 * C, -0.9 * C, 2.0 * C, 0.0];
        let mut uy = vec![0.1 * C, 0.4 * C, -1.0 * C, 0.0];
        let mut uz = vec![-0.2 * C, 0.0, 0.5 * C, 0.7 * C];
        let mut ginv = vec![1.0; np];
        let zeros = vec![0.0; np];
        let bx = vec![0.2, -1.0, 3.0, 0.0];
        let by = vec![0.5, 0.1, 0.0, 0.0];
        let bz = vec![1.5, 0.7, -2.0, 4.0];
        let before: Vec<Float> = izip!(&ux, &uy, &uz)
            .map(|(a, b, c)| speed(*a, *b, *c))
            .collect();
        for dt in [1e-13, 1e-11, 1e-9] {
            for _ in 0..100 {
                push_momentum_boris(
                    &mut ux, &mut uy, &mut uz, &mut ginv, &zeros, &zeros, &zeros, &bx, &by, &bz,
                    -Q_E, M_E, dt,
                );
            }
        }
        for (n, (a, b, c)) in izip!(&ux, &uy, &uz).enumerate() {
            let after = speed(*a, *b, *c);
            assert!(
                (after - before[n]).abs() <= 1e-12 * before[n].max(1.0),
                "speed drifted from {} to {}",
                before[n],
                after
            );
        }
    }

    #[test]
    fn constant_electric_field_is_exact() {
        // u(t) = u0 + q E t / m for B = 0, independent of the step count
        let e = [1.0e3, -2.0e3, 5.0e2];
        let dt = 1e-12;
        let nsteps = 50;
        let mut ux = vec![0.01 * C];
        let mut uy = vec![0.0];
        let mut uz = vec![-0.02 * C];
        let mut ginv = vec![1.0];
        let zero = vec![0.0];
        for _ in 0..nsteps {
            push_momentum_boris(
                &mut ux,
                &mut uy,
                &mut uz,
                &mut ginv,
                &[e[0]],
                &[e[1]],
                &[e[2]],
                &zero,
                &zero,
                &zero,
                Q_E,
                M_E,
                dt,
            );
        }
        let t = nsteps as Float * dt;
        let expected = [
            0.01 * C + Q_E * e[0] * t / M_E,
            Q_E * e[1] * t / M_E,
            -0.02 * C + Q_E * e[2] * t / M_E,
        ];
        for (got, want) in [ux[0], uy[0], uz[0]].iter().zip(expected.iter()) {
            assert!((got - want).abs() <= 1e-9 * want.abs().max(1.0));
        }
        assert!((ginv[0] - compute_inverse_gamma(ux[0], uy[0], uz[0])).abs() < 1e-15);
    }

    #[test]
    fn position_uses_velocity() {
        let mut x = vec![0.0, 1.0];
        let mut y = vec![0.0, 1.0];
        let mut z = vec![0.0, 1.0];
        let ux = vec![0.0, C];
        let uy = vec![C, 0.0];
        let uz = vec![0.0, 0.0];
        let mut ginv = vec![0.0; 2];
        set_gamma(&ux, &uy, &uz, &mut ginv);
        let dt = 1e-9;
        push_position(&mut x, &mut y, &mut z, &ux, &uy, &uz, &ginv, dt);
        let v = C / (2.0 as Float).sqrt();
        assert!((y[0] - v * dt).abs() < 1e-12);
        assert_eq!(x[0], 0.0);
        assert!((x[1] - (1.0 + v * dt)).abs() < 1e-12);
        assert_eq!(z[1], 1.0);
    }
}
