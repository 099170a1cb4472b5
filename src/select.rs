//! Nearest-paint candidate selection.

use crate::catalog::{Palette, Paint};
use crate::color::{Perceptual, distance};

/// The `max_paints` catalog paints closest to `target`, nearest first.
///
/// Equal distances keep catalog order.
pub fn select_candidates(palette: &Palette, target: Perceptual, max_paints: usize) -> Vec<&Paint> {
    rank_by_distance(palette.paints().iter(), target)
        .into_iter()
        .take(max_paints)
        .collect()
}

/// Stable ascending sort of `paints` by distance to `target`.
pub(crate) fn rank_by_distance<'p>(
    paints: impl Iterator<Item = &'p Paint>,
    target: Perceptual,
) -> Vec<&'p Paint> {
    let mut ranked: Vec<(f64, &Paint)> = paints
        .map(|paint| (distance(paint.perceptual(), target), paint))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
    ranked.into_iter().map(|(_, paint)| paint).collect()
}
