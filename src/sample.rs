//! Picking target colours out of reference images.

use image::{DynamicImage, GenericImageView, imageops::FilterType};
use kmeans_colors::get_kmeans;
use palette::{IntoColor, Lab, Srgb};
use serde::Serialize;

use crate::color::DeviceColor;
use crate::error::SampleError;

const KMEANS_MAX_ITER: usize = 20;
const KMEANS_CONVERGE: f32 = 1e-4;
const KMEANS_SEED: u64 = 0;

/// One k-means cluster of an image.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DominantColor {
    pub color: DeviceColor,
    /// Fraction of the opaque pixels in this cluster.
    pub share: f64,
}

/// The colour of a single pixel, with alpha scaled to `[0, 1]`.
pub fn sample_pixel(input: &[u8], x: u32, y: u32) -> Result<DeviceColor, SampleError> {
    let img = image::load_from_memory(input)?;
    let (width, height) = img.dimensions();
    if x >= width || y >= height {
        return Err(SampleError::OutOfBounds {
            x,
            y,
            width,
            height,
        });
    }

    let [r, g, b, a] = img.get_pixel(x, y).0;
    Ok(DeviceColor::new(r, g, b, f64::from(a) / 255.0))
}

/// Cluster the opaque pixels of an image in Lab and return the cluster
/// colours, most common first.
///
/// `downscale` bounds the longest side before clustering, which keeps large
/// photos fast.
pub fn dominant_colors(
    input: &[u8],
    n_colors: usize,
    downscale: Option<u32>,
) -> Result<Vec<DominantColor>, SampleError> {
    if n_colors == 0 {
        return Err(SampleError::NoColors);
    }

    let img = image::load_from_memory(input)?;
    let working_img: DynamicImage = if let Some(scale) = downscale {
        let (orig_w, orig_h) = img.dimensions();
        let max_side = orig_w.max(orig_h) as f32;
        let ratio = scale as f32 / max_side;
        let w = ((orig_w as f32) * ratio).round().max(1.0) as u32;
        let h = ((orig_h as f32) * ratio).round().max(1.0) as u32;
        DynamicImage::ImageRgba8(image::imageops::resize(&img, w, h, FilterType::Nearest))
    } else {
        img
    };

    let raw = working_img.to_rgba8().into_raw();
    let mut lab_pixels: Vec<Lab> = Vec::new();
    let mut alphas: Vec<u8> = Vec::new();
    for chunk in raw.chunks(4) {
        if chunk[3] == 0 {
            continue;
        }
        let srgb = Srgb::<u8>::new(chunk[0], chunk[1], chunk[2]);
        lab_pixels.push(srgb.into_linear().into_color());
        alphas.push(chunk[3]);
    }
    if lab_pixels.is_empty() {
        return Err(SampleError::NoOpaquePixels);
    }

    let k = n_colors.min(lab_pixels.len());
    let kmeans = get_kmeans(
        k,
        KMEANS_MAX_ITER,
        KMEANS_CONVERGE,
        false,
        &lab_pixels,
        KMEANS_SEED,
    );

    let mut counts = vec![0_usize; kmeans.centroids.len()];
    let mut alpha_sums = vec![0_u64; kmeans.centroids.len()];
    for (&cluster, &alpha) in kmeans.indices.iter().zip(&alphas) {
        let cluster = usize::from(cluster);
        if let Some(count) = counts.get_mut(cluster) {
            *count += 1;
            alpha_sums[cluster] += u64::from(alpha);
        }
    }

    let total = lab_pixels.len() as f64;
    let mut clusters: Vec<DominantColor> = kmeans
        .centroids
        .iter()
        .zip(counts.iter().zip(&alpha_sums))
        .filter(|(_, (count, _))| **count > 0)
        .map(|(&lab, (&count, &alpha_sum))| {
            let rgb_f32: Srgb<f32> = Srgb::from_linear(lab.into_color());
            let c: Srgb<u8> = rgb_f32.into_format::<u8>();
            let alpha = alpha_sum as f64 / count as f64 / 255.0;
            DominantColor {
                color: DeviceColor::new(c.red, c.green, c.blue, (alpha * 100.0).round() / 100.0),
                share: count as f64 / total,
            }
        })
        .collect();
    clusters.sort_by(|a, b| b.share.total_cmp(&a.share));

    tracing::debug!(clusters = clusters.len(), pixels = lab_pixels.len(), "dominant colours");
    Ok(clusters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(img: RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    /// Left three quarters red, right quarter blue, top-left pixel transparent.
    fn two_tone() -> Vec<u8> {
        let img = RgbaImage::from_fn(8, 4, |x, y| match (x, y) {
            (0, 0) => Rgba([0, 0, 0, 0]),
            (0..=5, _) => Rgba([200, 30, 30, 255]),
            _ => Rgba([20, 40, 220, 255]),
        });
        png(img)
    }

    #[test]
    fn samples_single_pixels() {
        let bytes = two_tone();
        assert_eq!(
            sample_pixel(&bytes, 1, 1).unwrap(),
            DeviceColor::new(200, 30, 30, 1.0)
        );
        assert_eq!(
            sample_pixel(&bytes, 7, 3).unwrap(),
            DeviceColor::new(20, 40, 220, 1.0)
        );
        assert_eq!(sample_pixel(&bytes, 0, 0).unwrap().alpha, 0.0);
    }

    #[test]
    fn rejects_out_of_bounds_and_garbage() {
        let bytes = two_tone();
        assert!(matches!(
            sample_pixel(&bytes, 8, 0),
            Err(SampleError::OutOfBounds { width: 8, height: 4, .. })
        ));
        assert!(matches!(
            sample_pixel(b"not an image", 0, 0),
            Err(SampleError::Decode(_))
        ));
    }

    #[test]
    fn dominant_colors_are_sorted_by_share() {
        let clusters = dominant_colors(&two_tone(), 2, None).unwrap();
        assert_eq!(clusters.len(), 2);
        assert!(clusters[0].share > clusters[1].share);
        assert!((clusters.iter().map(|c| c.share).sum::<f64>() - 1.0).abs() < 1e-9);

        let reddest = clusters[0].color;
        assert!(reddest.red > reddest.blue);
    }

    #[test]
    fn dominant_colors_need_opaque_pixels() {
        let clear = png(RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 0])));
        assert!(matches!(
            dominant_colors(&clear, 3, None),
            Err(SampleError::NoOpaquePixels)
        ));
        assert!(matches!(
            dominant_colors(&clear, 0, None),
            Err(SampleError::NoColors)
        ));
    }
}
