//! Error types for catalog setup, solver configuration, colour parsing and
//! image sampling.

use thiserror::Error;

/// A malformed paint catalog. Raised while building a [`Palette`](crate::Palette),
/// i.e. at startup, never while serving a request.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog needs at least two paints, got {0}")]
    TooFewPaints(usize),

    #[error("paint name must not be empty")]
    EmptyName,

    #[error("paint {0:?} appears more than once")]
    DuplicateName(String),

    #[error("paint {name:?}: {channel} channel {value} is not an integer in 0..=255")]
    ChannelOutOfRange {
        name: String,
        channel: &'static str,
        value: f64,
    },

    #[error("paint {name:?}: alpha {value} is not in [0, 1]")]
    AlphaOutOfRange { name: String, value: f64 },

    #[error("paint {name:?}: lightfastness {value} is not in 1..=10")]
    LightfastnessOutOfRange { name: String, value: i64 },

    #[error("both {first:?} and {second:?} claim the {role} anchor")]
    DuplicateAnchor {
        role: &'static str,
        first: String,
        second: String,
    },

    #[error("paint {0:?} cannot be both the black and the white anchor")]
    SharedAnchor(String),

    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Solver settings that cannot be used.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("max_paints must be at least 1")]
    NoPaintsAllowed,

    #[error("lightness_factor {0} is not in [0, 1]")]
    LightnessFactor(f64),

    #[error("optimizer {field} must be a finite non-negative number, got {value}")]
    Optimizer { field: &'static str, value: f64 },
}

/// A target colour string that could not be read.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseColorError {
    #[error("expected rgba(r, g, b, a), rgb(r, g, b) or #rrggbb, got {0:?}")]
    UnknownFormat(String),

    #[error("expected {expected} components, found {found}")]
    ComponentCount { expected: usize, found: usize },

    #[error("component {0:?} is not a number")]
    InvalidNumber(String),

    #[error("{channel} channel {value} is out of range 0..=255")]
    ChannelOutOfRange { channel: &'static str, value: i64 },

    #[error("alpha {0} is out of range [0, 1]")]
    AlphaOutOfRange(f64),
}

/// Failure to pick colours out of an image.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("unable to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("pixel ({x}, {y}) lies outside the {width}x{height} image")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("image has no opaque pixels")]
    NoOpaquePixels,

    #[error("number of colours must be at least 1")]
    NoColors,
}
