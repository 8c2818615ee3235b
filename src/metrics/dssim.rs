//! DSSIM (structural dissimilarity) comparison, via `dssim-core`.

use dssim_core::Dssim;
use imgref::ImgVec;
use rgb::RGBA;

use crate::error::{Error, MetricError, Result};
use crate::raster::ReferenceRaster;

/// Compare two rasters' pixels with DSSIM. 0.0 means identical; higher is
/// worse.
///
/// # Errors
///
/// Returns [`MetricError::Dimension`] if `reference` and `candidate` differ
/// in width or height, or [`MetricError::Calculation`] if `dssim-core`
/// rejects either image.
pub fn calculate_dssim(reference: &ReferenceRaster, candidate: &ReferenceRaster) -> Result<f64> {
    if reference.width() != candidate.width() || reference.height() != candidate.height() {
        return Err(Error::Metric(MetricError::Dimension {
            expected: (reference.width(), reference.height()),
            actual: (candidate.width(), candidate.height()),
        }));
    }

    let ref_img = to_dssim_image(reference);
    let cand_img = to_dssim_image(candidate);

    let dssim = Dssim::new();
    let ref_handle = dssim.create_image(&ref_img).ok_or_else(|| {
        Error::Metric(MetricError::Calculation {
            metric: "dssim",
            reason: "failed to create reference image".into(),
        })
    })?;
    let cand_handle = dssim.create_image(&cand_img).ok_or_else(|| {
        Error::Metric(MetricError::Calculation {
            metric: "dssim",
            reason: "failed to create candidate image".into(),
        })
    })?;

    let (value, _maps) = dssim.compare(&ref_handle, cand_handle);
    Ok(f64::from(value))
}

/// Convert a raster (RGB or RGBA, opaque alpha assumed if RGB) into the
/// float RGBA pixel buffer `dssim-core` expects.
fn to_dssim_image(raster: &ReferenceRaster) -> ImgVec<RGBA<f32>> {
    let pixels: Vec<RGBA<f32>> = if raster.has_alpha() {
        raster
            .data()
            .chunks_exact(4)
            .map(|px| RGBA {
                r: f32::from(px[0]) / 255.0,
                g: f32::from(px[1]) / 255.0,
                b: f32::from(px[2]) / 255.0,
                a: f32::from(px[3]) / 255.0,
            })
            .collect()
    } else {
        raster
            .data()
            .chunks_exact(3)
            .map(|px| RGBA {
                r: f32::from(px[0]) / 255.0,
                g: f32::from(px[1]) / 255.0,
                b: f32::from(px[2]) / 255.0,
                a: 1.0,
            })
            .collect()
    };
    ImgVec::new(pixels, raster.width() as usize, raster.height() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;

    fn solid_raster(value: u8, width: u32, height: u32) -> ReferenceRaster {
        let data = vec![value; width as usize * height as usize * 3];
        ReferenceRaster::from_parts(data, width, height, 3, Format::Png, None)
    }

    #[test]
    fn identical_images_score_near_zero() {
        let raster = solid_raster(128, 64, 64);
        let score = calculate_dssim(&raster, &raster).unwrap();
        assert!(score < 1e-3, "expected near-zero dssim, got {score}");
    }

    #[test]
    fn different_images_score_above_zero() {
        let reference = solid_raster(64, 64, 64);
        let candidate = solid_raster(192, 64, 64);
        let score = calculate_dssim(&reference, &candidate).unwrap();
        assert!(score > 0.0);
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let reference = solid_raster(128, 64, 64);
        let candidate = solid_raster(128, 32, 32);
        let result = calculate_dssim(&reference, &candidate);
        assert!(matches!(
            result,
            Err(Error::Metric(MetricError::Dimension { .. }))
        ));
    }

    #[test]
    fn rgb_vs_rgba_opaque_compares_cleanly() {
        let rgb = solid_raster(100, 4, 4);
        let rgba_data = vec![100u8, 100, 100, 255].repeat(16);
        let rgba = ReferenceRaster::from_parts(rgba_data, 4, 4, 4, Format::Png, None);
        let score = calculate_dssim(&rgb, &rgba).unwrap();
        assert!(score < 1e-3);
    }
}
