use crate::mesh::{IndexBox, IntVect};
use crate::Float;
use rayon::prelude::*;
use serde::Deserialize;

/// How a loop over an index range may be executed.
///
/// `Seq` keeps the fixed order (component outermost, then z, y and x
/// fastest). `Vector` and `Threads` promise the body does not care about
/// order and that no two iterations write the same location; `Vector`
/// stays on the calling thread and walks contiguous x rows, `Threads`
/// hands (component, z plane) slabs to the rayon pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exec {
    Seq,
    Vector,
    Threads,
}

impl Default for Exec {
    fn default() -> Self {
        Exec::Seq
    }
}

#[inline(always)]
fn plane_loop<F>(bx: &IndexBox, n: usize, k: i64, body: &F)
where
    F: Fn(usize, IntVect),
{
    for j in bx.lo[1]..=bx.hi[1] {
        for i in bx.lo[0]..=bx.hi[0] {
            body(n, [i, j, k]);
        }
    }
}

/// Calls `body(component, cell)` once for every cell of `bx` and every
/// component in `0..ncomp`.
pub fn for_each_cell<F>(exec: Exec, bx: &IndexBox, ncomp: usize, body: F)
where
    F: Fn(usize, IntVect) + Send + Sync,
{
    if bx.is_empty() {
        return;
    }
    match exec {
        Exec::Seq => {
            for n in 0..ncomp {
                for iv in bx.cells() {
                    body(n, iv);
                }
            }
        }
        Exec::Vector => {
            for n in 0..ncomp {
                for k in bx.lo[2]..=bx.hi[2] {
                    plane_loop(bx, n, k, &body);
                }
            }
        }
        Exec::Threads => {
            let nz = bx.length(2);
            (0..ncomp * nz).into_par_iter().for_each(|slab| {
                let k = bx.lo[2] + (slab % nz) as i64;
                plane_loop(bx, slab / nz, k, &body);
            });
        }
    }
}

#[inline(always)]
fn map_plane<F>(bx: &IndexBox, slab: usize, plane: &mut [Float], body: &F)
where
    F: Fn(usize, IntVect, &mut Float),
{
    let nz = bx.length(2);
    let n = slab / nz;
    let k = bx.lo[2] + (slab % nz) as i64;
    for (jj, row) in plane.chunks_mut(bx.length(0)).enumerate() {
        let j = bx.lo[1] + jj as i64;
        for (ii, v) in row.iter_mut().enumerate() {
            body(n, [bx.lo[0] + ii as i64, j, k], v);
        }
    }
}

/// Like [`for_each_cell`], but hands every iteration its own slot of
/// `out`. `out` is laid out component major, then z, y, x over `bx`.
pub fn map_cells<F>(exec: Exec, bx: &IndexBox, ncomp: usize, out: &mut [Float], body: F)
where
    F: Fn(usize, IntVect, &mut Float) + Send + Sync,
{
    if !cfg!(feature = "unchecked") {
        assert_eq!(out.len(), ncomp * bx.num_cells());
    }
    if bx.is_empty() {
        return;
    }
    let plane_len = bx.length(0) * bx.length(1);
    match exec {
        Exec::Seq => {
            for (n, comp) in out.chunks_mut(bx.num_cells()).enumerate() {
                for (iv, v) in bx.cells().zip(comp.iter_mut()) {
                    body(n, iv, v);
                }
            }
        }
        Exec::Vector => {
            for (slab, plane) in out.chunks_mut(plane_len).enumerate() {
                map_plane(bx, slab, plane, &body);
            }
        }
        Exec::Threads => {
            out.par_chunks_mut(plane_len)
                .enumerate()
                .for_each(|(slab, plane)| map_plane(bx, slab, plane, &body));
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn test_box() -> IndexBox {
        IndexBox::new([-1, 0, 2], [2, 2, 4])
    }

    #[test]
    fn seq_order() {
        let bx = test_box();
        let seen = Mutex::new(Vec::new());
        for_each_cell(Exec::Seq, &bx, 2, |n, iv| seen.lock().unwrap().push((n, iv)));
        let seen = seen.into_inner().unwrap();
        let expected: Vec<(usize, IntVect)> = (0..2)
            .flat_map(|n| bx.cells().map(move |iv| (n, iv)))
            .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn every_policy_visits_each_cell_once() {
        let bx = test_box();
        let ncomp = 3;
        for exec in [Exec::Seq, Exec::Vector, Exec::Threads] {
            let hits: Vec<AtomicUsize> = (0..ncomp * bx.num_cells())
                .map(|_| AtomicUsize::new(0))
                .collect();
            for_each_cell(exec, &bx, ncomp, |n, iv| {
                hits[n * bx.num_cells() + bx.offset(iv)].fetch_add(1, Ordering::Relaxed);
            });
            assert!(hits.iter().all(|h| h.load(Ordering::Relaxed) == 1));
        }
    }

    #[test]
    fn map_cells_writes_own_slot() {
        let bx = test_box();
        let ncomp = 2;
        for exec in [Exec::Seq, Exec::Vector, Exec::Threads] {
            let mut out = vec![0.0; ncomp * bx.num_cells()];
            map_cells(exec, &bx, ncomp, &mut out, |n, iv, v| {
                *v = (n * 1000) as Float + (iv[0] + 10 * iv[1] + 100 * iv[2]) as Float;
            });
            for n in 0..ncomp {
                for iv in bx.cells() {
                    let expected = (n * 1000) as Float + (iv[0] + 10 * iv[1] + 100 * iv[2]) as Float;
                    assert_eq!(out[n * bx.num_cells() + bx.offset(iv)], expected);
                }
            }
        }
    }

    #[test]
    fn empty_range_is_a_no_op() {
        let bx = IndexBox::new([0, 0, 0], [-1, -1, -1]);
        let count = AtomicUsize::new(0);
        for_each_cell(Exec::Threads, &bx, 4, |_, _| {
            count.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(count.load(Ordering::Relaxed), 0);
        map_cells(Exec::Vector, &bx, 4, &mut [], |_, _, _| unreachable!());
    }
}
