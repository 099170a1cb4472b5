//! Device colours, their CIE Lab representation and the distance between them.

use std::fmt;
use std::str::FromStr;

use palette::white_point::D65;
use palette::{IntoColor, Lab, LinSrgb, Srgb};
use serde::{Serialize, Serializer};

use crate::error::ParseColorError;

/// Upper end of the lightness axis.
pub const MAX_LIGHTNESS: f64 = 100.0;

/// An sRGB colour with 8-bit channels and a normalized alpha.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: f64,
}

impl DeviceColor {
    pub const fn new(red: u8, green: u8, blue: u8, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub fn channels(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }
}

/// Serialized as the `[r, g, b, a]` tuple clients already consume.
impl Serialize for DeviceColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.red, self.green, self.blue, self.alpha).serialize(serializer)
    }
}

impl fmt::Display for DeviceColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rgba({}, {}, {}, {})",
            self.red, self.green, self.blue, self.alpha
        )
    }
}

impl FromStr for DeviceColor {
    type Err = ParseColorError;

    /// Accepts `rgba(r, g, b, a)`, `rgb(r, g, b)` and `#rrggbb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        let unknown = || ParseColorError::UnknownFormat(trimmed.to_owned());

        if let Some(hex) = lower.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(unknown);
        }

        let (body, expected) = if let Some(body) = lower.strip_prefix("rgba(") {
            (body, 4)
        } else if let Some(body) = lower.strip_prefix("rgb(") {
            (body, 3)
        } else {
            return Err(unknown());
        };
        let body = body.strip_suffix(')').ok_or_else(unknown)?;

        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != expected {
            return Err(ParseColorError::ComponentCount {
                expected,
                found: parts.len(),
            });
        }

        let red = parse_channel("red", parts[0])?;
        let green = parse_channel("green", parts[1])?;
        let blue = parse_channel("blue", parts[2])?;
        let alpha = match parts.get(3) {
            Some(part) => parse_alpha(part)?,
            None => 1.0,
        };

        Ok(Self::new(red, green, blue, alpha))
    }
}

fn parse_channel(channel: &'static str, part: &str) -> Result<u8, ParseColorError> {
    let value: i64 = part
        .parse()
        .map_err(|_| ParseColorError::InvalidNumber(part.to_owned()))?;
    u8::try_from(value).map_err(|_| ParseColorError::ChannelOutOfRange { channel, value })
}

fn parse_alpha(part: &str) -> Result<f64, ParseColorError> {
    let value: f64 = part
        .parse()
        .map_err(|_| ParseColorError::InvalidNumber(part.to_owned()))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ParseColorError::AlphaOutOfRange(value))
    }
}

fn parse_hex(hex: &str) -> Option<DeviceColor> {
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(DeviceColor::new(r, g, b, 1.0))
}

/// A point in CIE L\*a\*b\* (D65). `l` is lightness in `0..=100`, `a` and `b`
/// are the chromatic axes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Perceptual {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

/// Map a device colour into Lab. Alpha does not take part.
pub fn to_perceptual(color: DeviceColor) -> Perceptual {
    perceptual_from_channels(color.channels().map(f64::from))
}

/// Same as [`to_perceptual`] for fractional channels on the 0–255 scale.
/// Channels outside that range are clamped first.
pub fn perceptual_from_channels(rgb: [f64; 3]) -> Perceptual {
    let [r, g, b] = rgb.map(|c| c.clamp(0.0, 255.0) / 255.0);
    let linear: LinSrgb<f64> = Srgb::new(r, g, b).into_linear();
    let lab: Lab<D65, f64> = linear.into_color();
    Perceptual {
        l: lab.l,
        a: lab.a,
        b: lab.b,
    }
}

/// Euclidean distance in Lab, i.e. CIE76 ΔE.
pub fn distance(x: Perceptual, y: Perceptual) -> f64 {
    let dl = x.l - y.l;
    let da = x.a - y.a;
    let db = x.b - y.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// Move lightness toward white (`lighten`) or black by `factor` of the
/// remaining distance, keeping both chromatic axes.
pub fn adjust_lightness(coordinate: Perceptual, lighten: bool, factor: f64) -> Perceptual {
    let factor = factor.clamp(0.0, 1.0);
    let l = if lighten {
        coordinate.l + (MAX_LIGHTNESS - coordinate.l) * factor
    } else {
        coordinate.l - coordinate.l * factor
    };
    Perceptual {
        l: l.clamp(0.0, MAX_LIGHTNESS),
        ..coordinate
    }
}
