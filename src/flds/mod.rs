use crate::mesh::loops::Exec;
use crate::mesh::{BoxArray, DistributionMap, RealVect};
use crate::Float;
use std::collections::BTreeMap;

pub mod field;
use crate::flds::field::{Centering, Field};

/// One field component over every local box, keyed by box id.
#[derive(Clone, Debug)]
pub struct MultiField {
    pub name: String,
    pub centering: Centering,
    n_ghost: usize,
    fabs: BTreeMap<usize, Field>,
}

impl MultiField {
    pub fn new(
        name: &str,
        boxes: &BoxArray,
        dmap: &DistributionMap,
        rank: usize,
        n_ghost: usize,
        centering: Centering,
    ) -> MultiField {
        let fabs = boxes
            .iter()
            .enumerate()
            .filter(|(box_id, _)| dmap.owner(*box_id) == rank)
            .map(|(box_id, bx)| (box_id, Field::new(name, *bx, n_ghost, centering)))
            .collect();
        MultiField {
            name: name.to_string(),
            centering,
            n_ghost,
            fabs,
        }
    }

    pub fn n_ghost(&self) -> usize {
        self.n_ghost
    }

    /// Panics if the box is not local.
    pub fn get(&self, box_id: usize) -> &Field {
        &self.fabs[&box_id]
    }

    pub fn get_mut(&mut self, box_id: usize) -> &mut Field {
        self.fabs
            .get_mut(&box_id)
            .unwrap_or_else(|| panic!("box {} of {} is not local", box_id, self.name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &Field)> {
        self.fabs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&usize, &mut Field)> {
        self.fabs.iter_mut()
    }

    pub fn set_val(&mut self, exec: Exec, val: Float) {
        for fld in self.fabs.values_mut() {
            fld.set_val(exec, val);
        }
    }

    pub fn sum(&self) -> Float {
        self.fabs.values().map(|f| f.sum()).sum()
    }
}

/// Electric and magnetic field, read by the gather.
pub struct EmFields<'a> {
    pub e: [&'a MultiField; 3],
    pub b: [&'a MultiField; 3],
}

/// Current density, written by the deposition.
pub struct CurrentFields<'a> {
    pub j: [&'a mut MultiField; 3],
}

pub struct Flds {
    // The struct that holds all the fields.
    pub e_x: MultiField,
    pub e_y: MultiField,
    pub e_z: MultiField,
    pub b_x: MultiField,
    pub b_y: MultiField,
    pub b_z: MultiField,
    pub j_x: MultiField,
    pub j_y: MultiField,
    pub j_z: MultiField,
    pub rho: MultiField,
}

impl Flds {
    pub fn new(boxes: &BoxArray, dmap: &DistributionMap, rank: usize, n_ghost: usize) -> Flds {
        let mk = |name: &str, c: Centering| MultiField::new(name, boxes, dmap, rank, n_ghost, c);
        Flds {
            e_x: mk("e_x", Centering::EX),
            e_y: mk("e_y", Centering::EY),
            e_z: mk("e_z", Centering::EZ),
            b_x: mk("b_x", Centering::BX),
            b_y: mk("b_y", Centering::BY),
            b_z: mk("b_z", Centering::BZ),
            j_x: mk("j_x", Centering::EX),
            j_y: mk("j_y", Centering::EY),
            j_z: mk("j_z", Centering::EZ),
            rho: mk("rho", Centering::NODAL),
        }
    }

    pub fn em(&self) -> EmFields<'_> {
        EmFields {
            e: [&self.e_x, &self.e_y, &self.e_z],
            b: [&self.b_x, &self.b_y, &self.b_z],
        }
    }

    /// Borrow E and B for reading and J for writing at the same time.
    pub fn split_mut(&mut self) -> (EmFields<'_>, CurrentFields<'_>) {
        (
            EmFields {
                e: [&self.e_x, &self.e_y, &self.e_z],
                b: [&self.b_x, &self.b_y, &self.b_z],
            },
            CurrentFields {
                j: [&mut self.j_x, &mut self.j_y, &mut self.j_z],
            },
        )
    }

    /// Set E and B to the same value everywhere, ghosts included.
    pub fn set_uniform(&mut self, exec: Exec, e: RealVect, b: RealVect) {
        for (fld, val) in [&mut self.e_x, &mut self.e_y, &mut self.e_z]
            .into_iter()
            .zip(e)
        {
            fld.set_val(exec, val);
        }
        for (fld, val) in [&mut self.b_x, &mut self.b_y, &mut self.b_z]
            .into_iter()
            .zip(b)
        {
            fld.set_val(exec, val);
        }
    }

    pub fn zero_currents(&mut self, exec: Exec) {
        for fld in [&mut self.j_x, &mut self.j_y, &mut self.j_z, &mut self.rho] {
            fld.set_val(exec, 0.0);
        }
    }
}
