//! Morphological growth of a mask with a square all-ones kernel.
//!
//! A kernel of side `r` is anchored at `r / 2`, so output pixel `(x, y)`
//! is active when any input pixel `(x + dx, y + dy)` is active for
//! `dx, dy` in `[-(r / 2), r - 1 - r / 2]`. Even sides therefore grow one
//! pixel more toward the bottom-right than toward the top-left. The square
//! kernel is separable, so the dilation runs as a row pass followed by a
//! column pass, each using prefix counts.

use tracing::debug;

use crate::mask::Mask;

/// Grow `mask` by a single dilation with a `radius x radius` kernel.
///
/// `radius == 0` returns an identical copy.
pub fn pad(mask: &Mask, radius: u32) -> Mask {
    if radius == 0 || mask.is_empty() {
        return mask.clone();
    }

    let (width, height) = mask.dimensions();
    let (w, h) = (width as usize, height as usize);
    let (before, after) = kernel_reach(radius);

    let source = mask.bits();
    let mut rows = vec![false; source.len()];
    for y in 0..h {
        let line = &source[y * w..(y + 1) * w];
        dilate_line(line, before, after, &mut rows[y * w..(y + 1) * w]);
    }

    let mut output = vec![false; source.len()];
    let mut column = vec![false; h];
    let mut grown = vec![false; h];
    for x in 0..w {
        for y in 0..h {
            column[y] = rows[y * w + x];
        }
        dilate_line(&column, before, after, &mut grown);
        for y in 0..h {
            output[y * w + x] = grown[y];
        }
    }

    debug!(radius, width, height, "padded mask");
    Mask::from_bits(width, height, &output)
}

/// Pixels the kernel reaches before and after its anchor along one axis
fn kernel_reach(radius: u32) -> (usize, usize) {
    let before = (radius / 2) as usize;
    let after = (radius as usize) - 1 - before;
    (before, after)
}

/// `out[i]` is set when any `line[j]` is set for `j` in `[i - before, i + after]`
fn dilate_line(line: &[bool], before: usize, after: usize, out: &mut [bool]) {
    let n = line.len();
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0usize);
    for &bit in line {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + usize::from(bit));
    }
    for (i, slot) in out.iter_mut().enumerate().take(n) {
        let lo = i.saturating_sub(before);
        let hi = (i + after).min(n - 1);
        *slot = prefix[hi + 1] > prefix[lo];
    }
}
