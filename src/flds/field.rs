use crate::mesh::loops::{map_cells, Exec};
use crate::mesh::{IndexBox, IntVect};
use crate::Float;
use itertools::izip;

/// Where the samples of a field component sit inside a cell, per axis:
/// 0.5 for cell centred axes and 0 for nodal axes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Centering {
    pub offset: [Float; 3],
}

impl Centering {
    // Yee staggering. The currents live where the electric field lives.
    pub const EX: Centering = Centering { offset: [0.5, 0.0, 0.0] };
    pub const EY: Centering = Centering { offset: [0.0, 0.5, 0.0] };
    pub const EZ: Centering = Centering { offset: [0.0, 0.0, 0.5] };
    pub const BX: Centering = Centering { offset: [0.0, 0.5, 0.5] };
    pub const BY: Centering = Centering { offset: [0.5, 0.0, 0.5] };
    pub const BZ: Centering = Centering { offset: [0.5, 0.5, 0.0] };
    pub const NODAL: Centering = Centering { offset: [0.0; 3] };
    pub const CELL: Centering = Centering { offset: [0.5; 3] };

    pub fn electric() -> [Centering; 3] {
        [Centering::EX, Centering::EY, Centering::EZ]
    }

    pub fn magnetic() -> [Centering; 3] {
        [Centering::BX, Centering::BY, Centering::BZ]
    }
}

/// Read only window onto a field array, addressed by cell index.
#[derive(Clone, Copy)]
pub struct FieldView<'a> {
    pub data: &'a [Float],
    pub bx: IndexBox,
}

impl<'a> FieldView<'a> {
    pub fn new(data: &'a [Float], bx: IndexBox) -> FieldView<'a> {
        if !cfg!(feature = "unchecked") {
            assert_eq!(data.len(), bx.num_cells());
        }
        FieldView { data, bx }
    }

    #[inline(always)]
    pub fn at(&self, iv: IntVect) -> Float {
        self.data[self.bx.offset(iv)]
    }
}

/// Accumulating window onto a field array.
pub struct FieldViewMut<'a> {
    pub data: &'a mut [Float],
    pub bx: IndexBox,
}

impl<'a> FieldViewMut<'a> {
    pub fn new(data: &'a mut [Float], bx: IndexBox) -> FieldViewMut<'a> {
        if !cfg!(feature = "unchecked") {
            assert_eq!(data.len(), bx.num_cells());
        }
        FieldViewMut { data, bx }
    }

    #[inline(always)]
    pub fn add(&mut self, iv: IntVect, val: Float) {
        let ij = self.bx.offset(iv);
        self.data[ij] += val;
    }
}

/// One component of a field on one box (or one tile), including its ghost
/// halo.
///
/// The array covers `valid_box.grow(n_ghost)` plus one extra node on each
/// axis, so nodal and staggered components share the same extent.
#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub data: Vec<Float>,
    pub centering: Centering,
    bx: IndexBox,
    valid_box: IndexBox,
    n_ghost: usize,
}

impl Field {
    pub fn new(name: &str, valid_box: IndexBox, n_ghost: usize, centering: Centering) -> Field {
        let bx = valid_box.grow(n_ghost as i64).surrounding_nodes();
        Field {
            name: name.to_string(),
            data: vec![0.0; bx.num_cells()],
            centering,
            bx,
            valid_box,
            n_ghost,
        }
    }

    /// The index range covered by `data`.
    pub fn array_box(&self) -> &IndexBox {
        &self.bx
    }

    pub fn valid_box(&self) -> &IndexBox {
        &self.valid_box
    }

    pub fn n_ghost(&self) -> usize {
        self.n_ghost
    }

    pub fn get(&self, iv: IntVect) -> Float {
        self.data[self.bx.offset(iv)]
    }

    pub fn get_mut(&mut self, iv: IntVect) -> &mut Float {
        let ij = self.bx.offset(iv);
        &mut self.data[ij]
    }

    pub fn view(&self) -> FieldView<'_> {
        FieldView {
            data: &self.data,
            bx: self.bx,
        }
    }

    pub fn view_mut(&mut self) -> FieldViewMut<'_> {
        FieldViewMut {
            data: &mut self.data,
            bx: self.bx,
        }
    }

    pub fn set_val(&mut self, exec: Exec, val: Float) {
        let bx = self.bx;
        map_cells(exec, &bx, 1, &mut self.data, |_, _, v| *v = val);
    }

    /// Set every point, ghosts included, to `f(index)`.
    pub fn fill<F>(&mut self, exec: Exec, f: F)
    where
        F: Fn(IntVect) -> Float + Send + Sync,
    {
        let bx = self.bx;
        map_cells(exec, &bx, 1, &mut self.data, |_, iv, v| *v = f(iv));
    }

    /// Add the overlapping part of `other` into `self`. Used to fold tile
    /// local deposition buffers into the box arrays.
    pub fn add_from(&mut self, other: &Field) {
        let region = match self.bx.intersect(&other.bx) {
            Some(region) => region,
            None => return,
        };
        let nx = region.length(0);
        for k in region.lo[2]..=region.hi[2] {
            for j in region.lo[1]..=region.hi[1] {
                let dst = self.bx.offset([region.lo[0], j, k]);
                let src = other.bx.offset([region.lo[0], j, k]);
                for (d, s) in izip!(&mut self.data[dst..dst + nx], &other.data[src..src + nx]) {
                    *d += *s;
                }
            }
        }
    }

    pub fn sum(&self) -> Float {
        self.data.iter().sum()
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::E_TOL;

    #[test]
    fn field_init() {
        // checks that the field covers the grown node box and is zeroed
        let valid = IndexBox::new([0, 0, 0], [3, 2, 1]);
        let fld = Field::new("j_x", valid, 2, Centering::EX);
        assert_eq!(fld.array_box().lo, [-2, -2, -2]);
        assert_eq!(fld.array_box().hi, [6, 5, 4]);
        assert_eq!(fld.data.len(), 9 * 8 * 7);
        assert!(fld.data.iter().all(|&v| v == 0.0));
        assert_eq!(*fld.valid_box(), valid);
        assert_eq!(fld.n_ghost(), 2);
    }

    #[test]
    fn fill_and_index() {
        let valid = IndexBox::new([1, 1, 1], [2, 2, 2]);
        let mut fld = Field::new("e_x", valid, 1, Centering::EX);
        fld.fill(Exec::Threads, |iv| (iv[0] + 10 * iv[1] + 100 * iv[2]) as Float);
        assert_eq!(fld.get([0, 0, 0]), 0.0);
        assert_eq!(fld.get([3, 2, 1]), 123.0);
        assert_eq!(fld.view().at([4, 4, 4]), 444.0);
        *fld.get_mut([1, 1, 1]) += 0.5;
        assert!((fld.get([1, 1, 1]) - 111.5).abs() < E_TOL);
        fld.set_val(Exec::Vector, 2.0);
        assert!(fld.data.iter().all(|&v| v == 2.0));
    }

    #[test]
    fn tile_buffer_folds_into_box() {
        let valid = IndexBox::new([0, 0, 0], [7, 3, 3]);
        let mut box_fld = Field::new("j_y", valid, 2, Centering::EY);
        let tile = IndexBox::new([4, 0, 0], [7, 3, 3]);
        let mut tile_fld = Field::new("j_y", tile, 2, Centering::EY);
        tile_fld.set_val(Exec::Seq, 1.0);
        box_fld.add_from(&tile_fld);
        box_fld.add_from(&tile_fld);
        assert!((box_fld.sum() - 2.0 * tile_fld.sum()).abs() < E_TOL);
        assert_eq!(box_fld.get([2, 0, 0]), 2.0);
        assert_eq!(box_fld.get([1, 0, 0]), 0.0);
        assert_eq!(box_fld.get([10, 6, 6]), 2.0);
    }
}
