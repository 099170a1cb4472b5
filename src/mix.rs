//! Mixing ratios and the subtractive compositor.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::catalog::Paint;
use crate::color::DeviceColor;

/// Paints and their fractions of a mix, in insertion order.
///
/// Every stored fraction is strictly positive; zero entries never make it in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MixRatio<'p> {
    entries: Vec<(&'p Paint, f64)>,
}

impl<'p> MixRatio<'p> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mix of exactly one paint at ratio 1.
    pub fn single(paint: &'p Paint) -> Self {
        Self {
            entries: vec![(paint, 1.0)],
        }
    }

    /// Add `ratio` of `paint`, merging with an existing entry of the same
    /// paint. Non-positive or non-finite ratios are ignored.
    pub fn add(&mut self, paint: &'p Paint, ratio: f64) {
        if !(ratio.is_finite() && ratio > 0.0) {
            return;
        }
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.name() == paint.name())
        {
            Some((_, existing)) => *existing += ratio,
            None => self.entries.push((paint, ratio)),
        }
    }

    pub(crate) fn as_slice(&self) -> &[(&'p Paint, f64)] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'p Paint, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(paint, _)| paint.name() == name)
            .map(|&(_, ratio)| ratio)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all fractions.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|&(_, ratio)| ratio).sum()
    }

    /// Multiply every fraction by `factor`, dropping entries that stop being
    /// positive.
    pub(crate) fn scale(&mut self, factor: f64) {
        for (_, ratio) in &mut self.entries {
            *ratio *= factor;
        }
        self.entries.retain(|&(_, ratio)| ratio > 0.0);
    }

    /// Add `amount` to every entry.
    pub(crate) fn spread(&mut self, amount: f64) {
        for (_, ratio) in &mut self.entries {
            *ratio += amount;
        }
        self.entries.retain(|&(_, ratio)| ratio > 0.0);
    }
}

impl<'p> FromIterator<(&'p Paint, f64)> for MixRatio<'p> {
    fn from_iter<I: IntoIterator<Item = (&'p Paint, f64)>>(iter: I) -> Self {
        let mut mix = Self::new();
        for (paint, ratio) in iter {
            mix.add(paint, ratio);
        }
        mix
    }
}

/// Renders the recipe, e.g. `55% Mars Black, 20% Burnt Umber`.
impl fmt::Display for MixRatio<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (paint, ratio)) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:.0}% {}", ratio * 100.0, paint.name())?;
        }
        Ok(())
    }
}

/// Serialized as an ordered `{ name: fraction }` object.
impl Serialize for MixRatio<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (paint, ratio) in self.iter() {
            map.serialize_entry(paint.name(), &ratio)?;
        }
        map.end()
    }
}

/// Per-channel subtractive mix on the unit scale, before rounding.
///
/// Ratios are normalized to sum to one; each paint then removes
/// `channel * ratio` of the light still passing through:
/// `1 - Π(1 - channel_i * ratio_i)`.
pub(crate) fn subtractive_channels(entries: &[(&Paint, f64)]) -> [f64; 3] {
    let total: f64 = entries.iter().map(|&(_, ratio)| ratio).sum();
    if total <= 0.0 {
        return [0.0; 3];
    }

    let mut transmitted = [1.0_f64; 3];
    for &(paint, ratio) in entries {
        let weight = ratio / total;
        for (t, channel) in transmitted.iter_mut().zip(paint.color().channels()) {
            *t *= 1.0 - f64::from(channel) / 255.0 * weight;
        }
    }
    transmitted.map(|t| (1.0 - t).clamp(0.0, 1.0))
}

/// The device colour of a physical mix.
///
/// Colour channels follow [`subtractive_channels`]; alpha is the weighted mean
/// of the paints' alphas, capped at one and rounded to two decimals. An empty
/// mix is transparent black.
pub fn composite(ratios: &MixRatio<'_>) -> DeviceColor {
    let total = ratios.total();
    if total <= 0.0 {
        return DeviceColor::new(0, 0, 0, 0.0);
    }

    // Each channel lies in [0, 255] after scaling.
    let [red, green, blue] =
        subtractive_channels(ratios.as_slice()).map(|c| (c * 255.0).round() as u8);
    let alpha: f64 = ratios
        .iter()
        .map(|(paint, ratio)| paint.color().alpha * ratio / total)
        .sum();

    DeviceColor::new(red, green, blue, round_to(alpha.min(1.0), 2))
}

/// Ratio-weighted mean lightfastness, rounded to one decimal. Zero for an
/// empty mix.
pub fn lightfastness(ratios: &MixRatio<'_>) -> f64 {
    let total = ratios.total();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = ratios
        .iter()
        .map(|(paint, ratio)| f64::from(paint.lightfastness()) * ratio)
        .sum();
    round_to(weighted / total, 1)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round() / scale
}
