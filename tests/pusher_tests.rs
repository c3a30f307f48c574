#![cfg(feature = "dprec")]

mod common;

use empic_rs::consts::C;
use empic_rs::mesh::loops::Exec;
use empic_rs::mesh::RealBox;
use empic_rs::prtls::init::SamplingMode;
use empic_rs::prtls::push::compute_inverse_gamma;
use empic_rs::Float;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn momenta(sp: &empic_rs::species::Species) -> Vec<[Float; 3]> {
    sp.store()
        .iter()
        .flat_map(|(_, t)| {
            (0..t.len())
                .map(|i| [t.ux[i], t.uy[i], t.uz[i]])
                .collect::<Vec<_>>()
        })
        .collect()
}

#[test]
fn test_magnetic_rotation_keeps_speed() {
    let (mut sp, mut flds) = common::setup_species(Exec::Threads);
    let mut rng = StdRng::seed_from_u64(12);
    sp.init_particles(
        [1, 1, 1],
        0.5,
        0.0,
        1.0,
        RealBox::new([0.0; 3], [1.0; 3]),
        SamplingMode::Thermal,
        &mut rng,
    )
    .unwrap();
    flds.set_uniform(Exec::Seq, [0.0; 3], [0.3, -0.2, 1.0]);
    let speed = |u: &[Float; 3]| (u[0] * u[0] + u[1] * u[1] + u[2] * u[2]).sqrt();

    let before = momenta(&sp);
    for _ in 0..50 {
        sp.push_particle_momenta(&flds, 0.05);
    }
    let after = momenta(&sp);
    assert_eq!(before.len(), after.len());
    let mut rotated = false;
    for (u0, u1) in before.iter().zip(&after) {
        let s0 = speed(u0);
        assert!((s0 - speed(u1)).abs() <= 1e-10 * s0.max(1.0));
        rotated |= (u0[0] - u1[0]).abs() > 1e-6 * s0;
    }
    assert!(rotated);
}

#[test]
fn test_constant_electric_field() {
    let (mut sp, mut flds) = common::setup_species(Exec::Vector);
    let mut rng = StdRng::seed_from_u64(0);
    sp.init_particles(
        [1, 1, 1],
        0.0,
        0.0,
        1.0,
        RealBox::new([0.0; 3], [1.0; 3]),
        SamplingMode::Drift,
        &mut rng,
    )
    .unwrap();
    let e = [2.0, -1.0, 0.5];
    flds.set_uniform(Exec::Seq, e, [0.0; 3]);
    let (dt, nsteps) = (0.25, 40);
    for _ in 0..nsteps {
        sp.push_particle_momenta(&flds, dt);
    }
    // q = -1, m = 1
    let t = nsteps as Float * dt;
    let expected = [0.01 * C - e[0] * t, -e[1] * t, -e[2] * t];
    for u in momenta(&sp) {
        for d in 0..3 {
            assert!((u[d] - expected[d]).abs() < 1e-6, "{:?} vs {:?}", u, expected);
        }
    }
    // ginv follows the new momenta
    for (_, tile) in sp.store().iter() {
        for i in 0..tile.len() {
            let g = compute_inverse_gamma(tile.ux[i], tile.uy[i], tile.uz[i]);
            assert!((tile.ginv[i] - g).abs() < 1e-14);
        }
    }
}
