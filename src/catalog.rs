//! The fixed paint catalog.
//!
//! A [`Palette`] is built once at startup, either from the built-in
//! [`STANDARD_PAINTS`] table or from a JSON list of [`PaintEntry`] values, and
//! is read-only afterwards. Every paint's Lab coordinate is computed during
//! [`PaletteBuilder::build`] and cached on the [`Paint`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::color::{DeviceColor, Perceptual, to_perceptual};
use crate::error::CatalogError;

/// The two catalog paints the heuristic keeps out of lighter and darker mixes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Black,
    White,
}

impl Anchor {
    fn as_str(self) -> &'static str {
        match self {
            Anchor::Black => "black",
            Anchor::White => "white",
        }
    }
}

/// One raw catalog row, as written in code or in a JSON catalog file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaintEntry {
    pub name: String,
    pub rgba: [f64; 4],
    pub lightfastness: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
}

/// A validated catalog paint.
#[derive(Clone, Debug, PartialEq)]
pub struct Paint {
    name: String,
    color: DeviceColor,
    lightfastness: u8,
    perceptual: Perceptual,
}

impl Paint {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> DeviceColor {
        self.color
    }

    /// Resistance to fading, 1 (poor) to 10 (excellent).
    pub fn lightfastness(&self) -> u8 {
        self.lightfastness
    }

    pub fn perceptual(&self) -> Perceptual {
        self.perceptual
    }
}

/// An immutable, ordered catalog of paints.
#[derive(Debug)]
pub struct Palette {
    paints: Vec<Paint>,
    by_name: HashMap<String, usize>,
    black: usize,
    white: usize,
}

impl Palette {
    pub fn builder() -> PaletteBuilder {
        PaletteBuilder::default()
    }

    /// The built-in ten-paint acrylic set.
    pub fn standard() -> Result<Self, CatalogError> {
        STANDARD_PAINTS
            .iter()
            .fold(Self::builder(), |builder, &(name, rgba, lightfastness, anchor)| {
                builder.entry(PaintEntry {
                    name: name.to_owned(),
                    rgba,
                    lightfastness,
                    anchor,
                })
            })
            .build()
    }

    /// Build a catalog from a JSON array of [`PaintEntry`] objects.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let entries: Vec<PaintEntry> = serde_json::from_str(json)?;
        PaletteBuilder { entries }.build()
    }

    /// Paints in catalog order.
    pub fn paints(&self) -> &[Paint] {
        &self.paints
    }

    pub fn get(&self, name: &str) -> Option<&Paint> {
        self.by_name.get(name).map(|&index| &self.paints[index])
    }

    pub fn len(&self) -> usize {
        self.paints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paints.is_empty()
    }

    pub fn anchor(&self, anchor: Anchor) -> &Paint {
        match anchor {
            Anchor::Black => &self.paints[self.black],
            Anchor::White => &self.paints[self.white],
        }
    }

    /// Catalog rows in the same shape they were loaded from.
    pub fn entries(&self) -> Vec<PaintEntry> {
        self.paints
            .iter()
            .enumerate()
            .map(|(index, paint)| {
                let color = paint.color;
                PaintEntry {
                    name: paint.name.clone(),
                    rgba: [
                        f64::from(color.red),
                        f64::from(color.green),
                        f64::from(color.blue),
                        color.alpha,
                    ],
                    lightfastness: i64::from(paint.lightfastness),
                    anchor: if index == self.black {
                        Some(Anchor::Black)
                    } else if index == self.white {
                        Some(Anchor::White)
                    } else {
                        None
                    },
                }
            })
            .collect()
    }
}

/// Collects catalog rows and validates them into a [`Palette`].
#[derive(Clone, Debug, Default)]
pub struct PaletteBuilder {
    entries: Vec<PaintEntry>,
}

impl PaletteBuilder {
    #[must_use]
    pub fn entry(mut self, entry: PaintEntry) -> Self {
        self.entries.push(entry);
        self
    }

    #[must_use]
    pub fn paint(self, name: impl Into<String>, rgba: [f64; 4], lightfastness: i64) -> Self {
        self.entry(PaintEntry {
            name: name.into(),
            rgba,
            lightfastness,
            anchor: None,
        })
    }

    #[must_use]
    pub fn anchored_paint(
        self,
        name: impl Into<String>,
        rgba: [f64; 4],
        lightfastness: i64,
        anchor: Anchor,
    ) -> Self {
        self.entry(PaintEntry {
            name: name.into(),
            rgba,
            lightfastness,
            anchor: Some(anchor),
        })
    }

    pub fn build(self) -> Result<Palette, CatalogError> {
        if self.entries.len() < 2 {
            return Err(CatalogError::TooFewPaints(self.entries.len()));
        }

        let mut paints = Vec::with_capacity(self.entries.len());
        let mut by_name = HashMap::with_capacity(self.entries.len());
        let mut black = None;
        let mut white = None;

        for (index, entry) in self.entries.into_iter().enumerate() {
            let paint = validate(&entry)?;
            if by_name.insert(paint.name.clone(), index).is_some() {
                return Err(CatalogError::DuplicateName(paint.name));
            }

            if let Some(anchor) = entry.anchor {
                let slot = match anchor {
                    Anchor::Black => &mut black,
                    Anchor::White => &mut white,
                };
                if let Some(previous) = *slot {
                    let first: &Paint = &paints[previous];
                    return Err(CatalogError::DuplicateAnchor {
                        role: anchor.as_str(),
                        first: first.name.clone(),
                        second: paint.name,
                    });
                }
                *slot = Some(index);
            }
            paints.push(paint);
        }

        let black = black.unwrap_or_else(|| extreme_lightness(&paints, |l, best| l < best));
        let white = white.unwrap_or_else(|| extreme_lightness(&paints, |l, best| l > best));
        if black == white {
            return Err(CatalogError::SharedAnchor(paints[black].name.clone()));
        }

        tracing::debug!(
            paints = paints.len(),
            black = %paints[black].name,
            white = %paints[white].name,
            "built paint catalog"
        );

        Ok(Palette {
            paints,
            by_name,
            black,
            white,
        })
    }
}

/// Index of the first paint whose lightness beats all others under `better`.
fn extreme_lightness(paints: &[Paint], better: impl Fn(f64, f64) -> bool) -> usize {
    let mut best = 0;
    for (index, paint) in paints.iter().enumerate().skip(1) {
        if better(paint.perceptual.l, paints[best].perceptual.l) {
            best = index;
        }
    }
    best
}

fn validate(entry: &PaintEntry) -> Result<Paint, CatalogError> {
    if entry.name.trim().is_empty() {
        return Err(CatalogError::EmptyName);
    }

    let [r, g, b, alpha] = entry.rgba;
    let channel = |channel: &'static str, value: f64| -> Result<u8, CatalogError> {
        if value.fract() == 0.0 && (0.0..=255.0).contains(&value) {
            // Integral and in range, so the cast is exact.
            Ok(value as u8)
        } else {
            Err(CatalogError::ChannelOutOfRange {
                name: entry.name.clone(),
                channel,
                value,
            })
        }
    };
    let red = channel("red", r)?;
    let green = channel("green", g)?;
    let blue = channel("blue", b)?;

    if !(0.0..=1.0).contains(&alpha) {
        return Err(CatalogError::AlphaOutOfRange {
            name: entry.name.clone(),
            value: alpha,
        });
    }

    let lightfastness = u8::try_from(entry.lightfastness)
        .ok()
        .filter(|value| (1..=10).contains(value))
        .ok_or_else(|| CatalogError::LightfastnessOutOfRange {
            name: entry.name.clone(),
            value: entry.lightfastness,
        })?;

    let color = DeviceColor::new(red, green, blue, alpha);
    Ok(Paint {
        name: entry.name.clone(),
        color,
        lightfastness,
        perceptual: to_perceptual(color),
    })
}

/// Name, rgba, lightfastness and anchor role of the built-in catalog.
pub const STANDARD_PAINTS: [(&str, [f64; 4], i64, Option<Anchor>); 10] = [
    ("Mars Black", [16.0, 8.0, 1.0, 1.0], 10, Some(Anchor::Black)),
    ("Titanium White", [236.0, 242.0, 249.0, 1.0], 10, Some(Anchor::White)),
    ("Emerald", [0.0, 123.0, 38.0, 0.9], 7, None),
    ("Lemon Yellow", [238.0, 222.0, 0.0, 0.9], 7, None),
    ("Ultramarine", [12.0, 65.0, 155.0, 0.9], 10, None),
    ("Crimson", [192.0, 0.0, 32.0, 0.9], 7, None),
    ("Yellow Ochre", [209.0, 128.0, 0.0, 0.9], 10, None),
    ("Cadmium Yellow", [246.0, 210.0, 5.0, 0.9], 7, None),
    ("Burnt Umber", [50.0, 23.0, 0.0, 1.0], 10, None),
    ("Cadmium Red", [222.0, 42.0, 34.0, 0.9], 7, None),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn two_paints() -> PaletteBuilder {
        Palette::builder()
            .paint("Ink", [10.0, 10.0, 10.0, 1.0], 8)
            .paint("Chalk", [240.0, 240.0, 240.0, 1.0], 8)
    }

    #[test]
    fn standard_catalog_is_valid() {
        let palette = Palette::standard().unwrap();
        assert_eq!(palette.len(), 10);
        assert_eq!(palette.paints()[0].name(), "Mars Black");
        assert_eq!(palette.anchor(Anchor::Black).name(), "Mars Black");
        assert_eq!(palette.anchor(Anchor::White).name(), "Titanium White");

        let emerald = palette.get("Emerald").unwrap();
        assert_eq!(emerald.color(), DeviceColor::new(0, 123, 38, 0.9));
        assert_eq!(emerald.lightfastness(), 7);
        assert!(palette.get("Phthalo Blue").is_none());
    }

    #[test]
    fn perceptual_coordinate_is_cached_from_the_device_color() {
        let palette = Palette::standard().unwrap();
        for paint in palette.paints() {
            assert_eq!(paint.perceptual(), to_perceptual(paint.color()));
        }
    }

    #[test]
    fn anchors_default_to_lightness_extremes() {
        let palette = Palette::builder()
            .paint("Grey", [128.0, 128.0, 128.0, 1.0], 5)
            .paint("Chalk", [240.0, 240.0, 240.0, 1.0], 8)
            .paint("Ink", [10.0, 10.0, 10.0, 1.0], 8)
            .build()
            .unwrap();
        assert_eq!(palette.anchor(Anchor::Black).name(), "Ink");
        assert_eq!(palette.anchor(Anchor::White).name(), "Chalk");
    }

    #[test]
    fn rejects_malformed_entries() {
        assert!(matches!(
            Palette::builder().paint("Ink", [0.0, 0.0, 0.0, 1.0], 8).build(),
            Err(CatalogError::TooFewPaints(1))
        ));
        assert!(matches!(
            two_paints().paint("Ink", [1.0, 1.0, 1.0, 1.0], 8).build(),
            Err(CatalogError::DuplicateName(name)) if name == "Ink"
        ));
        assert!(matches!(
            two_paints().paint(" ", [1.0, 1.0, 1.0, 1.0], 8).build(),
            Err(CatalogError::EmptyName)
        ));
        assert!(matches!(
            two_paints().paint("Hot", [256.0, 0.0, 0.0, 1.0], 8).build(),
            Err(CatalogError::ChannelOutOfRange { channel: "red", .. })
        ));
        assert!(matches!(
            two_paints().paint("Half", [0.0, 12.5, 0.0, 1.0], 8).build(),
            Err(CatalogError::ChannelOutOfRange { channel: "green", .. })
        ));
        assert!(matches!(
            two_paints().paint("Ghost", [0.0, 0.0, 0.0, 1.2], 8).build(),
            Err(CatalogError::AlphaOutOfRange { .. })
        ));
        assert!(matches!(
            two_paints().paint("Fugitive", [0.0, 0.0, 0.0, 1.0], 0).build(),
            Err(CatalogError::LightfastnessOutOfRange { value: 0, .. })
        ));
    }

    #[test]
    fn rejects_conflicting_anchors() {
        let result = two_paints()
            .anchored_paint("Lamp Black", [0.0, 0.0, 0.0, 1.0], 9, Anchor::Black)
            .anchored_paint("Ivory Black", [5.0, 5.0, 5.0, 1.0], 9, Anchor::Black)
            .build();
        assert!(matches!(
            result,
            Err(CatalogError::DuplicateAnchor { role: "black", .. })
        ));

        let result = Palette::builder()
            .anchored_paint("Only", [90.0, 90.0, 90.0, 1.0], 9, Anchor::White)
            .paint("Shadow", [200.0, 200.0, 200.0, 1.0], 9)
            .anchored_paint("Also", [10.0, 10.0, 10.0, 1.0], 9, Anchor::White)
            .build();
        assert!(matches!(result, Err(CatalogError::DuplicateAnchor { .. })));
    }

    #[test]
    fn rejects_a_paint_holding_both_anchors() {
        let result = Palette::builder()
            .paint("Grey", [128.0, 128.0, 128.0, 1.0], 5)
            .paint("Same Grey", [128.0, 128.0, 128.0, 1.0], 5)
            .build();
        assert!(matches!(result, Err(CatalogError::SharedAnchor(name)) if name == "Grey"));
    }

    #[test]
    fn loads_json_catalogs() {
        let json = r#"[
            {"name": "Ink", "rgba": [10, 10, 10, 1.0], "lightfastness": 8, "anchor": "black"},
            {"name": "Chalk", "rgba": [240, 240, 240, 1.0], "lightfastness": 8},
            {"name": "Cobalt", "rgba": [0, 71, 171, 0.9], "lightfastness": 9}
        ]"#;
        let palette = Palette::from_json(json).unwrap();
        assert_eq!(palette.len(), 3);
        assert_eq!(palette.anchor(Anchor::Black).name(), "Ink");
        assert_eq!(palette.anchor(Anchor::White).name(), "Chalk");
        assert_eq!(palette.get("Cobalt").unwrap().lightfastness(), 9);

        assert!(matches!(
            Palette::from_json("{\"name\": 1}"),
            Err(CatalogError::Json(_))
        ));
    }

    #[test]
    fn entries_round_trip_through_the_builder() {
        let palette = Palette::standard().unwrap();
        let rebuilt = PaletteBuilder {
            entries: palette.entries(),
        }
        .build()
        .unwrap();
        assert_eq!(rebuilt.paints(), palette.paints());
        assert_eq!(rebuilt.anchor(Anchor::White).name(), "Titanium White");
    }
}
