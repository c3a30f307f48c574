use empic_rs::mesh::loops::Exec;
use empic_rs::mesh::{BoxArray, DistributionMap, Geometry, IndexBox, RealBox};
use empic_rs::species::Species;
use empic_rs::{flds::Flds, Config};

#[allow(dead_code)]
pub fn setup_cfg() -> Config {
    // two boxes along x, electrons and slow drifting ions
    r#"
    [params]
    n_cell = [16, 8, 8]
    max_grid_size = [8, 8, 8]
    tile_size = [4, 4, 4]
    prob_lo = [0.0, 0.0, 0.0]
    prob_hi = [2.0, 1.0, 1.0]
    cfl = 0.9
    exec = "threads"

    [setup]
    t_final = 10
    seed = 2021

    [output]
    write_output = false
    output_interval = 5
    stride = 2

    [[species]]
    name = "electrons"
    charge = -1.0
    mass = 1.0
    ppc = [2, 2, 2]
    density = 1.0
    u_std = 0.05
    mode = "thermal"

    [[species]]
    name = "ions"
    charge = 1.0
    mass = 1836.0
    ppc = [1, 1, 1]
    density = 1.0
    u_std = 0.0
    mode = "drift"
    "#
    .parse()
    .unwrap()
}

/// A unit cube of 8^3 cells split into two boxes of four tiles each.
#[allow(dead_code)]
pub fn setup_species(exec: Exec) -> (Species, Flds) {
    let domain = IndexBox::new([0, 0, 0], [7, 7, 7]);
    let geom = Geometry::new(domain, RealBox::new([0.0; 3], [1.0; 3]));
    let ba = BoxArray::from_domain(&domain, [4, 8, 8]);
    let dm = DistributionMap::round_robin(ba.len(), 1);
    let mut sp = Species::new(geom, &ba, &dm, 0, [4, 4, 8], -1.0, 1.0);
    sp.exec = exec;
    (sp, Flds::new(&ba, &dm, 0, 2))
}
