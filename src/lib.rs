//! Paint mixing recipes for digital colours.
//!
//! Given a target colour, [`generate_variants`] returns three physical mixes
//! from a fixed paint catalog: a best match found by constrained optimization
//! and slightly lighter and darker heuristic mixes for shading. The same
//! pipeline is exported to JavaScript through `wasm-bindgen`.

use std::fmt::Display;
use std::sync::LazyLock;

use js_sys::Array;
use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod catalog;
pub mod color;
pub mod error;
pub mod heuristic;
pub mod mix;
pub mod optimize;
pub mod sample;
pub mod select;
pub mod variants;

pub use catalog::{Anchor, Paint, PaintEntry, Palette, PaletteBuilder};
pub use color::{DeviceColor, Perceptual, adjust_lightness, distance, to_perceptual};
pub use error::{CatalogError, ConfigError, ParseColorError, SampleError};
pub use heuristic::{HeuristicMix, TintOrder, heuristic};
pub use mix::{MixRatio, composite};
pub use optimize::{Infeasible, OptimizerConfig, optimize};
pub use sample::{DominantColor, dominant_colors, sample_pixel};
pub use select::select_candidates;
pub use variants::{MixMethod, MixResult, Mixer, MixerConfig, VariantBundle, generate_variants};

static STANDARD_PALETTE: LazyLock<Result<Palette, CatalogError>> =
    LazyLock::new(Palette::standard);

fn js_error(err: impl Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn standard_palette() -> Result<&'static Palette, JsValue> {
    STANDARD_PALETTE.as_ref().map_err(js_error)
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(value).map_err(js_error)?;
    js_sys::JSON::parse(&json)
}

/// Lighter, actual and darker mixes for an `rgba(r, g, b, a)` colour.
///
/// Resolves to `{ lighter_mix, actual_mix, darker_mix }`, each holding
/// `ratios` (paint name → fraction), `mixed_color` (`[r, g, b, a]`),
/// `lightfastness` and `method`.
#[wasm_bindgen]
pub fn mix_variants(colour: &str) -> Result<JsValue, JsValue> {
    let target: DeviceColor = colour.parse().map_err(js_error)?;
    let palette = standard_palette()?;
    to_js(&generate_variants(palette, target))
}

/// The built-in paint catalog as a list of `{ name, rgba, lightfastness }`.
#[wasm_bindgen]
pub fn paint_catalog() -> Result<JsValue, JsValue> {
    to_js(&standard_palette()?.entries())
}

/// The `rgba(...)` string of one pixel of an encoded image.
#[wasm_bindgen]
pub fn sample_colour(input: Vec<u8>, x: u32, y: u32) -> Result<String, JsValue> {
    let color = sample_pixel(&input, x, y).map_err(js_error)?;
    Ok(color.to_string())
}

/// The `n_colors` dominant colours of an encoded image as `rgba(...)`
/// strings, most common first.
#[wasm_bindgen]
pub fn dominant_colours(
    input: Vec<u8>,
    n_colors: usize,
    downscale: Option<u32>,
) -> Result<Array, JsValue> {
    let clusters = dominant_colors(&input, n_colors, downscale).map_err(js_error)?;
    let colours = Array::new();
    for cluster in clusters {
        colours.push(&JsValue::from_str(&cluster.color.to_string()));
    }
    Ok(colours)
}
