use crate::Float;
use serde::Deserialize;

pub mod loops;
pub mod tiles;

/// Integer cell coordinate, x first.
pub type IntVect = [i64; 3];
pub type RealVect = [Float; 3];

/// Inclusive, axis aligned range of cell indices `[lo, hi]`.
///
/// Boxes are never mutated in place; every operation returns a new box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct IndexBox {
    pub lo: IntVect,
    pub hi: IntVect,
}

impl IndexBox {
    pub fn new(lo: IntVect, hi: IntVect) -> IndexBox {
        IndexBox { lo, hi }
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|d| self.hi[d] < self.lo[d])
    }

    pub fn length(&self, dim: usize) -> usize {
        if self.hi[dim] < self.lo[dim] {
            0
        } else {
            (self.hi[dim] - self.lo[dim] + 1) as usize
        }
    }

    pub fn size(&self) -> [usize; 3] {
        [self.length(0), self.length(1), self.length(2)]
    }

    pub fn num_cells(&self) -> usize {
        self.length(0) * self.length(1) * self.length(2)
    }

    pub fn contains(&self, iv: IntVect) -> bool {
        (0..3).all(|d| iv[d] >= self.lo[d] && iv[d] <= self.hi[d])
    }

    pub fn contains_box(&self, other: &IndexBox) -> bool {
        other.is_empty() || (self.contains(other.lo) && self.contains(other.hi))
    }

    pub fn grow(&self, n: i64) -> IndexBox {
        IndexBox {
            lo: [self.lo[0] - n, self.lo[1] - n, self.lo[2] - n],
            hi: [self.hi[0] + n, self.hi[1] + n, self.hi[2] + n],
        }
    }

    /// The box of nodes surrounding these cells, i.e. one more point on
    /// every axis.
    pub fn surrounding_nodes(&self) -> IndexBox {
        IndexBox {
            lo: self.lo,
            hi: [self.hi[0] + 1, self.hi[1] + 1, self.hi[2] + 1],
        }
    }

    pub fn intersect(&self, other: &IndexBox) -> Option<IndexBox> {
        let bx = IndexBox {
            lo: [
                self.lo[0].max(other.lo[0]),
                self.lo[1].max(other.lo[1]),
                self.lo[2].max(other.lo[2]),
            ],
            hi: [
                self.hi[0].min(other.hi[0]),
                self.hi[1].min(other.hi[1]),
                self.hi[2].min(other.hi[2]),
            ],
        };
        if bx.is_empty() {
            None
        } else {
            Some(bx)
        }
    }

    /// Linear position of `iv` in an array laid out over this box with x
    /// varying fastest.
    #[inline(always)]
    pub fn offset(&self, iv: IntVect) -> usize {
        if !cfg!(feature = "unchecked") {
            assert!(self.contains(iv), "{:?} is outside of {:?}", iv, self);
        }
        let nx = self.length(0);
        let ny = self.length(1);
        let i = (iv[0] - self.lo[0]) as usize;
        let j = (iv[1] - self.lo[1]) as usize;
        let k = (iv[2] - self.lo[2]) as usize;
        (k * ny + j) * nx + i
    }

    /// Every cell of the box, z slowest and x fastest.
    pub fn cells(&self) -> Cells {
        Cells {
            bx: *self,
            next: if self.is_empty() { None } else { Some(self.lo) },
        }
    }

    /// Split into sub boxes of at most `max_size` cells per axis. The
    /// pieces are listed with x varying fastest and the last piece on
    /// each axis takes the remainder.
    pub fn chop(&self, max_size: [usize; 3]) -> Vec<IndexBox> {
        if self.is_empty() {
            return Vec::new();
        }
        let cuts: Vec<Vec<(i64, i64)>> = (0..3)
            .map(|d| {
                let step = max_size[d].max(1) as i64;
                let mut pieces = Vec::new();
                let mut lo = self.lo[d];
                while lo <= self.hi[d] {
                    let hi = (lo + step - 1).min(self.hi[d]);
                    pieces.push((lo, hi));
                    lo = hi + 1;
                }
                pieces
            })
            .collect();

        let mut boxes = Vec::with_capacity(cuts[0].len() * cuts[1].len() * cuts[2].len());
        for &(zlo, zhi) in &cuts[2] {
            for &(ylo, yhi) in &cuts[1] {
                for &(xlo, xhi) in &cuts[0] {
                    boxes.push(IndexBox::new([xlo, ylo, zlo], [xhi, yhi, zhi]));
                }
            }
        }
        boxes
    }
}

pub struct Cells {
    bx: IndexBox,
    next: Option<IntVect>,
}

impl Iterator for Cells {
    type Item = IntVect;

    fn next(&mut self) -> Option<IntVect> {
        let cur = self.next?;
        let mut nxt = cur;
        nxt[0] += 1;
        if nxt[0] > self.bx.hi[0] {
            nxt[0] = self.bx.lo[0];
            nxt[1] += 1;
            if nxt[1] > self.bx.hi[1] {
                nxt[1] = self.bx.lo[1];
                nxt[2] += 1;
            }
        }
        self.next = if nxt[2] > self.bx.hi[2] { None } else { Some(nxt) };
        Some(cur)
    }
}

/// A physical, half open region `[lo, hi)`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct RealBox {
    pub lo: RealVect,
    pub hi: RealVect,
}

impl RealBox {
    pub fn new(lo: RealVect, hi: RealVect) -> RealBox {
        RealBox { lo, hi }
    }

    pub fn contains(&self, pos: RealVect) -> bool {
        (0..3).all(|d| pos[d] >= self.lo[d] && pos[d] < self.hi[d])
    }
}

/// Maps the index space of the problem domain onto physical space.
#[derive(Clone, Debug)]
pub struct Geometry {
    pub domain: IndexBox,
    pub prob_domain: RealBox,
    pub cell_size: RealVect,
}

impl Geometry {
    pub fn new(domain: IndexBox, prob_domain: RealBox) -> Geometry {
        let mut cell_size = [0.0; 3];
        for d in 0..3 {
            cell_size[d] = (prob_domain.hi[d] - prob_domain.lo[d]) / domain.length(d) as Float;
        }
        Geometry {
            domain,
            prob_domain,
            cell_size,
        }
    }

    pub fn prob_lo(&self) -> RealVect {
        self.prob_domain.lo
    }

    pub fn prob_length(&self, dim: usize) -> Float {
        self.prob_domain.hi[dim] - self.prob_domain.lo[dim]
    }

    pub fn cell_volume(&self) -> Float {
        self.cell_size[0] * self.cell_size[1] * self.cell_size[2]
    }

    /// Index of the cell holding `pos`. Positions outside of the domain
    /// give indices outside of `domain`.
    pub fn cell_index(&self, pos: RealVect) -> IntVect {
        let plo = self.prob_lo();
        let mut iv = [0; 3];
        for d in 0..3 {
            iv[d] = ((pos[d] - plo[d]) / self.cell_size[d]).floor() as i64;
            // the quotient rounds up to n just below the upper face
            if pos[d] < self.prob_domain.hi[d] {
                iv[d] = iv[d].min(self.domain.hi[d]);
            }
        }
        iv
    }
}

/// The boxes making up one mesh level.
#[derive(Clone, Debug)]
pub struct BoxArray {
    boxes: Vec<IndexBox>,
}

impl BoxArray {
    pub fn new(boxes: Vec<IndexBox>) -> BoxArray {
        BoxArray { boxes }
    }

    pub fn from_domain(domain: &IndexBox, max_grid_size: [usize; 3]) -> BoxArray {
        BoxArray {
            boxes: domain.chop(max_grid_size),
        }
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn get(&self, box_id: usize) -> &IndexBox {
        &self.boxes[box_id]
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexBox> {
        self.boxes.iter()
    }
}

/// Which rank owns which box.
#[derive(Clone, Debug)]
pub struct DistributionMap {
    owners: Vec<usize>,
}

impl DistributionMap {
    pub fn new(owners: Vec<usize>) -> DistributionMap {
        DistributionMap { owners }
    }

    pub fn round_robin(nboxes: usize, nranks: usize) -> DistributionMap {
        let nranks = nranks.max(1);
        DistributionMap {
            owners: (0..nboxes).map(|i| i % nranks).collect(),
        }
    }

    pub fn owner(&self, box_id: usize) -> usize {
        self.owners[box_id]
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
