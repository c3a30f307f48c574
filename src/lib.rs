use serde::Deserialize;
use std::fs;
use std::str::FromStr;

use anyhow::{Context, Result};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub mod consts;
pub mod error;
pub mod flds;
pub mod mesh;
pub mod prtls;
pub mod save;
pub mod species;

use crate::flds::Flds;
use crate::mesh::loops::Exec;
use crate::mesh::{BoxArray, DistributionMap, Geometry, IndexBox, RealBox, RealVect};
use crate::prtls::deposit::CurrentDeposition;
use crate::prtls::init::SamplingMode;
use crate::species::Species;

// We use a type alias for f64/Float to easily support
// double and single precision.
#[cfg(feature = "dprec")]
pub type Float = f64;

#[cfg(not(feature = "dprec"))]
pub type Float = f32;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub params: Params,
    pub setup: Setup,
    pub output: Output,
    #[serde(default)]
    pub species: Vec<SpeciesCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Setup {
    /// number of steps
    pub t_final: u32,
    pub seed: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Output {
    pub write_output: bool,
    pub output_interval: u32,
    pub stride: usize,
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

fn default_output_dir() -> String {
    String::from("output")
}

#[derive(Clone, Debug, Deserialize)]
pub struct Params {
    pub n_cell: [usize; 3],
    pub max_grid_size: [usize; 3],
    pub tile_size: [usize; 3],
    pub prob_lo: RealVect,
    pub prob_hi: RealVect,
    #[serde(default = "default_n_ghost")]
    pub n_ghost: usize,
    /// Courant number; the time step is derived from it unless `dt` is set.
    pub cfl: Float,
    pub dt: Option<Float>,
    #[serde(default)]
    pub exec: Exec,
    #[serde(default)]
    pub deposition: CurrentDeposition,
    /// The fields are held fixed at these values.
    #[serde(default)]
    pub e_field: RealVect,
    #[serde(default)]
    pub b_field: RealVect,
}

fn default_n_ghost() -> usize {
    2
}

#[derive(Clone, Debug, Deserialize)]
pub struct SpeciesCfg {
    pub name: String,
    pub charge: Float,
    pub mass: Float,
    pub ppc: [usize; 3],
    pub density: Float,
    pub u_std: Float,
    #[serde(default)]
    pub u_mean: Float,
    pub mode: SamplingMode,
    /// Injection region, the whole problem domain if absent.
    pub bounds: Option<RealBox>,
}

impl Config {
    pub fn new() -> Result<Config> {
        let contents =
            fs::read_to_string("config.toml").context("Could not open the config.toml file")?;
        contents.parse()
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.params;
        for d in 0..3 {
            if p.n_cell[d] == 0 || p.max_grid_size[d] == 0 || p.tile_size[d] == 0 {
                return Err(anyhow::Error::msg(
                    "n_cell, max_grid_size and tile_size must be positive on every axis",
                ));
            }
            if !(p.prob_hi[d] > p.prob_lo[d]) {
                return Err(anyhow::anyhow!("prob_hi must exceed prob_lo on axis {}", d));
            }
        }
        if p.n_ghost < 2 {
            return Err(anyhow::Error::msg(
                "at least two ghost cells are needed by the gather and deposit stencils",
            ));
        }
        match p.dt {
            Some(dt) if !(dt > 0.0) => return Err(anyhow::Error::msg("dt must be positive")),
            None if !(p.cfl > 0.0 && p.cfl <= 1.0) => {
                return Err(anyhow::Error::msg("cfl must be in (0, 1]"))
            }
            _ => {}
        }
        if self.output.write_output && (self.output.output_interval == 0 || self.output.stride == 0) {
            return Err(anyhow::Error::msg(
                "output_interval and stride must be positive when writing output",
            ));
        }
        for sp in &self.species {
            if sp.mass <= 0.0 {
                return Err(anyhow::anyhow!("species {} needs a positive mass", sp.name));
            }
        }
        if let (Some(dt), CurrentDeposition::Esirkepov) = (p.dt, p.deposition) {
            let dt_max = courant_dt(&p.geometry(), 1.0);
            if dt > dt_max {
                return Err(anyhow::anyhow!(
                    "dt = {:e} lets particles cross more than one cell per step, esirkepov needs dt <= {:e}",
                    dt,
                    dt_max
                ));
            }
        }
        Ok(())
    }
}

impl Params {
    /// Index space `[0, n_cell)` mapped onto `[prob_lo, prob_hi)`.
    pub fn geometry(&self) -> Geometry {
        let n = self.n_cell;
        let domain = IndexBox::new(
            [0, 0, 0],
            [n[0] as i64 - 1, n[1] as i64 - 1, n[2] as i64 - 1],
        );
        Geometry::new(domain, RealBox::new(self.prob_lo, self.prob_hi))
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(contents: &str) -> Result<Config> {
        toml::from_str(contents).with_context(|| "Could not parse Config file")
    }
}

/// Largest stable explicit step for the given Courant number.
pub fn courant_dt(geom: &Geometry, cfl: Float) -> Float {
    let dx = geom.cell_size;
    let inv = (1.0 / (dx[0] * dx[0]) + 1.0 / (dx[1] * dx[1]) + 1.0 / (dx[2] * dx[2])).sqrt();
    cfl / (consts::C * inv)
}

/// Mesh, fields and particles of a single rank run.
pub struct Sim {
    pub geom: Geometry,
    pub boxes: BoxArray,
    pub dmap: DistributionMap,
    pub flds: Flds,
    pub species: Vec<Species>,
    pub dt: Float,
    pub exec: Exec,
}

impl Sim {
    pub fn new(cfg: &Config) -> Result<Sim> {
        cfg.validate()?;
        let p = &cfg.params;
        let geom = p.geometry();
        let boxes = BoxArray::from_domain(&geom.domain, p.max_grid_size);
        let rank = 0;
        let dmap = DistributionMap::round_robin(boxes.len(), 1);
        let dt = p.dt.unwrap_or_else(|| courant_dt(&geom, p.cfl));
        info!(
            "{} boxes, cell size {:?}, dt = {:e}",
            boxes.len(),
            geom.cell_size,
            dt
        );

        let mut flds = Flds::new(&boxes, &dmap, rank, p.n_ghost);
        flds.set_uniform(p.exec, p.e_field, p.b_field);

        let mut rng = StdRng::seed_from_u64(cfg.setup.seed);
        let mut species = Vec::with_capacity(cfg.species.len());
        for sc in &cfg.species {
            let mut sp = Species::new(
                geom.clone(),
                &boxes,
                &dmap,
                rank,
                p.tile_size,
                sc.charge,
                sc.mass,
            );
            sp.name = sc.name.clone();
            sp.exec = p.exec;
            sp.deposition = p.deposition;
            sp.init_particles(
                sc.ppc,
                sc.u_std,
                sc.u_mean,
                sc.density,
                sc.bounds.unwrap_or(geom.prob_domain),
                sc.mode,
                &mut rng,
            )
            .with_context(|| format!("Could not initialize species {}", sc.name))?;
            species.push(sp);
        }

        Ok(Sim {
            geom,
            boxes,
            dmap,
            flds,
            species,
            dt,
            exec: p.exec,
        })
    }

    /// One full step: deposit the current of every species from scratch,
    /// then put every particle back into its tile.
    pub fn step(&mut self) {
        self.flds.zero_currents(self.exec);
        for sp in self.species.iter_mut() {
            sp.push_and_deposit_particles(&mut self.flds, self.dt);
            sp.redistribute_periodic();
        }
    }

    pub fn num_particles(&self) -> usize {
        self.species.iter().map(|sp| sp.num_particles()).sum()
    }
}

pub fn run(cfg: Config) -> Result<()> {
    let mut sim = Sim::new(&cfg)?;
    info!("initialized {} particles", sim.num_particles());

    for t in 0..cfg.setup.t_final {
        if cfg.output.write_output {
            save::save_output(t, &cfg, &sim.species, &sim.flds)?;
        }
        sim.step();
        if t % 10 == 0 {
            info!("step {} of {}", t + 1, cfg.setup.t_final);
        }
    }
    if cfg.output.write_output {
        save::save_output(cfg.setup.t_final, &cfg, &sim.species, &sim.flds)?;
    }
    Ok(())
}

#[cfg(all(test, feature = "dprec"))]
pub(crate) const E_TOL: Float = 1E-10;

#[cfg(all(test, not(feature = "dprec")))]
pub(crate) const E_TOL: Float = 1E-4;

#[cfg(test)]
pub(crate) fn build_test_cfg() -> Config {
    r#"
    [params]
    n_cell = [8, 8, 8]
    max_grid_size = [4, 8, 8]
    tile_size = [4, 4, 8]
    prob_lo = [0.0, 0.0, 0.0]
    prob_hi = [1.0, 1.0, 1.0]
    cfl = 0.5
    exec = "threads"

    [setup]
    t_final = 4
    seed = 17

    [output]
    write_output = false
    output_interval = 2
    stride = 1

    [[species]]
    name = "electrons"
    charge = -1.602176634e-19
    mass = 9.1093837015e-31
    ppc = [1, 1, 2]
    density = 1e20
    u_std = 0.01
    mode = "thermal"
    "#
    .parse()
    .unwrap()
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn parse_config() {
        let cfg = build_test_cfg();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.params.n_ghost, 2);
        assert_eq!(cfg.params.deposition, CurrentDeposition::Direct);
        assert_eq!(cfg.params.exec, Exec::Threads);
        assert_eq!(cfg.output.dir, "output");
        assert_eq!(cfg.species[0].mode, SamplingMode::Thermal);
        assert!(cfg.species[0].bounds.is_none());
    }

    #[test]
    fn unknown_mode_fails_to_parse() {
        let text = r#"
        [params]
        n_cell = [8, 8, 8]
        max_grid_size = [8, 8, 8]
        tile_size = [8, 8, 8]
        prob_lo = [0.0, 0.0, 0.0]
        prob_hi = [1.0, 1.0, 1.0]
        cfl = 0.5
        [setup]
        t_final = 1
        seed = 0
        [output]
        write_output = false
        output_interval = 1
        stride = 1
        [[species]]
        name = "ions"
        charge = 1.0
        mass = 1.0
        ppc = [1, 1, 1]
        density = 1.0
        u_std = 0.0
        mode = "waterbag"
        "#;
        assert!(text.parse::<Config>().is_err());
    }

    #[test]
    fn validation() {
        let mut cfg = build_test_cfg();
        cfg.params.n_ghost = 1;
        assert!(cfg.validate().is_err());

        let mut cfg = build_test_cfg();
        cfg.params.tile_size = [4, 0, 8];
        assert!(cfg.validate().is_err());

        let mut cfg = build_test_cfg();
        cfg.params.cfl = 1.5;
        assert!(cfg.validate().is_err());
        cfg.params.dt = Some(1e-12);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn esirkepov_step_limit() {
        // dx = 1/8, so light crosses a cell in about 4e-10 s
        let mut cfg = build_test_cfg();
        cfg.params.dt = Some(1e-9);
        assert!(cfg.validate().is_ok());
        cfg.params.deposition = CurrentDeposition::Esirkepov;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("esirkepov"));
        assert!(Sim::new(&cfg).is_err());
        cfg.params.dt = Some(1e-11);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn courant_step() {
        let cfg = build_test_cfg();
        let sim = Sim::new(&cfg).unwrap();
        // dx = 1/8 on every axis
        let expected = 0.5 / (consts::C * (3.0 as Float * 64.0).sqrt());
        assert!((sim.dt - expected).abs() < E_TOL * expected);
    }

    #[test]
    fn sim_steps_keep_particles() {
        let cfg = build_test_cfg();
        let mut sim = Sim::new(&cfg).unwrap();
        assert_eq!(sim.boxes.len(), 2);
        assert_eq!(sim.num_particles(), 8 * 8 * 8 * 2);
        for _ in 0..cfg.setup.t_final {
            sim.step();
        }
        assert_eq!(sim.num_particles(), 1024);
        assert!(sim.flds.j_x.sum().is_finite());
    }
}
