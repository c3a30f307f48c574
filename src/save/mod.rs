use crate::flds::field::Field;
use crate::flds::Flds;
use crate::prtls::ParticleTile;
use crate::species::Species;
use crate::{Config, Float};

use anyhow::{Context, Result};
use log::info;

/// The samples of `fld` on the nodes of its valid box, x fastest.
pub fn valid_samples(fld: &Field) -> Vec<Float> {
    let nodes = fld.valid_box().surrounding_nodes();
    let nx = nodes.length(0);
    let mut out_vec: Vec<Float> = Vec::with_capacity(nodes.num_cells());
    for k in nodes.lo[2]..=nodes.hi[2] {
        for j in nodes.lo[1]..=nodes.hi[1] {
            let ij = fld.array_box().offset([nodes.lo[0], j, k]);
            out_vec.extend_from_slice(&fld.data[ij..ij + nx]);
        }
    }
    out_vec
}

pub(crate) fn save_fld(fld: &Field, box_id: usize, outdir: &str) -> Result<()> {
    npy::to_file(
        format!("{}/flds/{}_{}.npy", outdir, fld.name, box_id),
        valid_samples(fld),
    )
    .context(format!("Could not save {} data to file", fld.name))?;
    Ok(())
}

/// Every `stride`-th value of one attribute, over all tiles in key order.
fn strided<'a, F>(sp: &'a Species, stride: usize, attr: F) -> Vec<Float>
where
    F: Fn(&'a ParticleTile) -> &'a [Float],
{
    sp.store()
        .iter()
        .flat_map(|(_, prtls)| attr(prtls).iter())
        .step_by(stride)
        .copied()
        .collect()
}

pub fn save_output(t: u32, cfg: &Config, species: &[Species], flds: &Flds) -> Result<()> {
    if t % cfg.output.output_interval != 0 {
        return Ok(());
    }
    let output_prefix = format!("{}/dat_{:05}", cfg.output.dir, t / cfg.output.output_interval);
    std::fs::create_dir_all(&output_prefix).context("Unable to create output directory")?;
    std::fs::create_dir_all(format!("{}/flds", &output_prefix))
        .context("Unable to create output directory")?;
    info!("saving output at step {} to {}", t, output_prefix);

    let stride = cfg.output.stride;
    for sp in species {
        let attrs: [(&str, Vec<Float>); 7] = [
            ("x", strided(sp, stride, |p| p.x.as_slice())),
            ("y", strided(sp, stride, |p| p.y.as_slice())),
            ("z", strided(sp, stride, |p| p.z.as_slice())),
            ("ux", strided(sp, stride, |p| p.ux.as_slice())),
            ("uy", strided(sp, stride, |p| p.uy.as_slice())),
            ("uz", strided(sp, stride, |p| p.uz.as_slice())),
            ("w", strided(sp, stride, |p| p.w.as_slice())),
        ];
        for (attr, vals) in attrs {
            npy::to_file(format!("{}/{}_{}.npy", output_prefix, sp.name, attr), vals)
                .context(format!("Could not save {} {} data to file", sp.name, attr))?;
        }
    }

    for mf in &[&flds.j_x, &flds.j_y, &flds.j_z] {
        for (box_id, fld) in mf.iter() {
            save_fld(fld, *box_id, &output_prefix)?;
        }
    }
    Ok(())
}
