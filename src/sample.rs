// SPDX: CC0-1.0

use crate::Number;
use core::num::NonZeroUsize;

/// Evenly spaced boundary points of `count` intervals over `[x_min, x_max]`.
///
/// The points come out largest first: `x_min + k * step` for `k = count`
/// down to `0`. Curves keep this order all the way to the renderer, which
/// connects samples in the order given.
pub fn generate_points(count: NonZeroUsize, x_min: Number, x_max: Number) -> Vec<Number> {
    let count = count.get();
    let step = (x_max - x_min) / count as Number;
    (0..=count)
        .rev()
        .map(|k| x_min + k as Number * step)
        .collect()
}
