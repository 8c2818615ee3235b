//! SSIMULACRA2 comparison, via the `ssimulacra2` crate.
//!
//! The crate's native scale is higher-is-better (100 = identical); see
//! [`super::compare`] for the inversion applied before this value reaches
//! the search engine.

use ssimulacra2::{ColorPrimaries, Rgb as Ssim2Rgb, TransferCharacteristic, compute_frame_ssimulacra2};

use crate::error::{Error, MetricError, Result};
use crate::raster::ReferenceRaster;

/// Raw SSIMULACRA2 score (higher is better, 100 = identical).
///
/// # Errors
///
/// Returns [`MetricError::Dimension`] on a size mismatch, or
/// [`MetricError::Calculation`] if the underlying crate rejects the input.
pub fn calculate_ssimulacra2(reference: &ReferenceRaster, candidate: &ReferenceRaster) -> Result<f64> {
    if reference.width() != candidate.width() || reference.height() != candidate.height() {
        return Err(Error::Metric(MetricError::Dimension {
            expected: (reference.width(), reference.height()),
            actual: (candidate.width(), candidate.height()),
        }));
    }

    let ref_img = to_ssim2_image(reference)?;
    let cand_img = to_ssim2_image(candidate)?;

    compute_frame_ssimulacra2(ref_img, cand_img).map_err(|e| {
        Error::Metric(MetricError::Calculation {
            metric: "ssimulacra2",
            reason: format!("{e}"),
        })
    })
}

fn to_ssim2_image(raster: &ReferenceRaster) -> Result<Ssim2Rgb> {
    let rgb = raster.to_rgb8();
    let pixels: Vec<[f32; 3]> = rgb
        .chunks_exact(3)
        .map(|c| [f32::from(c[0]) / 255.0, f32::from(c[1]) / 255.0, f32::from(c[2]) / 255.0])
        .collect();

    Ssim2Rgb::new(
        pixels,
        raster.width() as usize,
        raster.height() as usize,
        TransferCharacteristic::SRGB,
        ColorPrimaries::BT709,
    )
    .map_err(|e| {
        Error::Metric(MetricError::Calculation {
            metric: "ssimulacra2",
            reason: format!("failed to build image buffer: {e}"),
        })
    })
}
