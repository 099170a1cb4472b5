//! Rule-based mixing ratios for shading variants.
//!
//! A mix is built as a fixed pyramid: a dominant base paint, a secondary
//! paint, then up to two small tints. The black anchor is kept out of lighter
//! mixes and the white anchor out of darker ones. The pyramid total is then
//! pulled into `[MIN_TOTAL, MAX_TOTAL]`.

use serde::{Deserialize, Serialize};

use crate::catalog::{Anchor, Paint, Palette};
use crate::color::Perceptual;
use crate::mix::MixRatio;
use crate::select::rank_by_distance;

pub const LIGHT_BASE_RATIO: f64 = 0.5;
pub const DARK_BASE_RATIO: f64 = 0.55;
pub const SECONDARY_RATIO: f64 = 0.2;
pub const TINT_RATIOS: [f64; 2] = [0.1, 0.05];

pub const MIN_TOTAL: f64 = 0.80;
pub const MAX_TOTAL: f64 = 0.95;

/// How the tint slots after base and secondary are filled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TintOrder {
    /// First unused paint in catalog order.
    #[default]
    Catalog,
    /// Nearest unused paint to the target.
    Nearest,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeuristicMix<'p> {
    pub ratios: MixRatio<'p>,
    /// Paints in the order their slots were filled.
    pub order: Vec<&'p Paint>,
}

/// Build a pyramid mix around `target`. Never fails; with `max_paints == 0`
/// the mix is empty.
pub fn heuristic<'p>(
    palette: &'p Palette,
    target: Perceptual,
    light_mix: bool,
    max_paints: usize,
    tint_order: TintOrder,
) -> HeuristicMix<'p> {
    let excluded = if light_mix {
        palette.anchor(Anchor::Black)
    } else {
        palette.anchor(Anchor::White)
    };
    let allowed: Vec<&Paint> = palette
        .paints()
        .iter()
        .filter(|paint| paint.name() != excluded.name())
        .collect();
    let nearest = rank_by_distance(allowed.iter().copied(), target);
    let tint_source = match tint_order {
        TintOrder::Catalog => &allowed,
        TintOrder::Nearest => &nearest,
    };

    let base_ratio = if light_mix {
        LIGHT_BASE_RATIO
    } else {
        DARK_BASE_RATIO
    };
    let slots = [
        (&nearest, base_ratio),
        (&nearest, SECONDARY_RATIO),
        (tint_source, TINT_RATIOS[0]),
        (tint_source, TINT_RATIOS[1]),
    ];

    let mut order: Vec<&Paint> = Vec::with_capacity(slots.len());
    let mut ratios = MixRatio::new();
    for (source, ratio) in slots {
        if order.len() >= max_paints {
            break;
        }
        let Some(paint) = source
            .iter()
            .copied()
            .find(|paint| !order.iter().any(|used| used.name() == paint.name()))
        else {
            break;
        };
        order.push(paint);
        ratios.add(paint, ratio);
    }

    rescale(&mut ratios);
    tracing::debug!(light_mix, recipe = %ratios, "heuristic mix");
    HeuristicMix { ratios, order }
}

/// Spread a shortfall below `MIN_TOTAL` evenly, or scale an excess above
/// `MAX_TOTAL` down proportionally.
fn rescale(ratios: &mut MixRatio<'_>) {
    if ratios.is_empty() {
        return;
    }
    let total = ratios.total();
    if total < MIN_TOTAL {
        ratios.spread((MIN_TOTAL - total) / ratios.len() as f64);
    } else if total > MAX_TOTAL {
        ratios.scale(MAX_TOTAL / total);
    }
}
