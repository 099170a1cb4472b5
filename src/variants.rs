//! Lighter, actual and darker mixes for one target colour.

use serde::{Deserialize, Serialize};

use crate::catalog::Palette;
use crate::color::{DeviceColor, Perceptual, adjust_lightness, to_perceptual};
use crate::error::ConfigError;
use crate::heuristic::{TintOrder, heuristic};
use crate::mix::{MixRatio, composite, lightfastness};
use crate::optimize::{OptimizerConfig, optimize};
use crate::select::select_candidates;

/// Solver settings. Every field has a default, so a config file only needs
/// the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Most paints in any one mix.
    pub max_paints: usize,
    /// Lightness shift of the lighter and darker targets.
    pub lightness_factor: f64,
    pub tint_order: TintOrder,
    pub optimizer: OptimizerConfig,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            max_paints: 4,
            lightness_factor: 0.05,
            tint_order: TintOrder::Catalog,
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl MixerConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_paints == 0 {
            return Err(ConfigError::NoPaintsAllowed);
        }
        if !(0.0..=1.0).contains(&self.lightness_factor) {
            return Err(ConfigError::LightnessFactor(self.lightness_factor));
        }
        self.optimizer.validate()
    }
}

/// Which path produced a mix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MixMethod {
    Optimized,
    Heuristic,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MixResult<'p> {
    pub ratios: MixRatio<'p>,
    pub mixed_color: DeviceColor,
    pub lightfastness: f64,
    pub method: MixMethod,
}

impl<'p> MixResult<'p> {
    fn new(ratios: MixRatio<'p>, method: MixMethod) -> Self {
        Self {
            mixed_color: composite(&ratios),
            lightfastness: lightfastness(&ratios),
            ratios,
            method,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariantBundle<'p> {
    pub lighter_mix: MixResult<'p>,
    pub actual_mix: MixResult<'p>,
    pub darker_mix: MixResult<'p>,
}

/// Runs the mixing pipelines against one catalog.
#[derive(Clone, Debug)]
pub struct Mixer<'p> {
    palette: &'p Palette,
    config: MixerConfig,
}

impl<'p> Mixer<'p> {
    pub fn new(palette: &'p Palette) -> Self {
        Self {
            palette,
            config: MixerConfig::default(),
        }
    }

    pub fn with_config(palette: &'p Palette, config: MixerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { palette, config })
    }

    pub fn generate_variants(&self, target: DeviceColor) -> VariantBundle<'p> {
        let coordinate = to_perceptual(target);
        tracing::debug!(%target, l = coordinate.l, a = coordinate.a, b = coordinate.b, "mixing");

        VariantBundle {
            lighter_mix: self.shaded_mix(coordinate, true),
            actual_mix: self.actual_mix(coordinate),
            darker_mix: self.shaded_mix(coordinate, false),
        }
    }

    /// Heuristic mix for a target moved toward white (`lighten`) or black.
    pub fn shaded_mix(&self, target: Perceptual, lighten: bool) -> MixResult<'p> {
        let shifted = adjust_lightness(target, lighten, self.config.lightness_factor);
        MixResult::new(self.heuristic_ratios(shifted, lighten), MixMethod::Heuristic)
    }

    /// Best-match mix, falling back to the heuristic when the optimizer
    /// cannot settle.
    pub fn actual_mix(&self, target: Perceptual) -> MixResult<'p> {
        let candidates = select_candidates(self.palette, target, self.config.max_paints);
        tracing::debug!(
            candidates = ?candidates.iter().map(|paint| paint.name()).collect::<Vec<_>>(),
            "selected candidates"
        );

        match optimize(target, &candidates, &self.config.optimizer) {
            Ok(ratios) => MixResult::new(ratios, MixMethod::Optimized),
            Err(reason) => {
                tracing::warn!(%reason, "optimizer infeasible, using heuristic mix");
                MixResult::new(self.heuristic_ratios(target, true), MixMethod::Heuristic)
            }
        }
    }

    fn heuristic_ratios(&self, target: Perceptual, light_mix: bool) -> MixRatio<'p> {
        heuristic(
            self.palette,
            target,
            light_mix,
            self.config.max_paints,
            self.config.tint_order,
        )
        .ratios
    }
}

/// [`Mixer::generate_variants`] with default settings.
pub fn generate_variants(palette: &Palette, target: DeviceColor) -> VariantBundle<'_> {
    Mixer::new(palette).generate_variants(target)
}
