//! Temporal water-occurrence frequency.

use ward_water_core::{ensure_same_extent, FrequencySurface, Mask, RasterError};

/// Per-pixel mean of `masks`: the fraction of samples classified as water.
///
/// Masks must share one extent. Fails with [`RasterError::EmptySequence`]
/// when no mask is given.
pub fn occurrence_frequency<'a, I>(masks: I) -> Result<FrequencySurface, RasterError>
where
    I: IntoIterator<Item = &'a Mask>,
{
    let mut iter = masks.into_iter();
    let first = iter.next().ok_or(RasterError::EmptySequence)?;
    let extent = first.extent();

    let mut hits: Vec<u32> = first.data.iter().map(|&v| u32::from(v)).collect();
    let mut n = 1u32;
    for mask in iter {
        ensure_same_extent(extent, mask.extent())?;
        for (h, &v) in hits.iter_mut().zip(&mask.data) {
            *h += u32::from(v);
        }
        n += 1;
    }

    let data = hits.into_iter().map(|h| h as f32 / n as f32).collect();
    FrequencySurface::new(extent.0, extent.1, data)
}

/// Pixels whose occurrence frequency is at least `cutoff`.
///
/// `cutoff` must lie in `[0, 1]`.
pub fn permanent_water_mask(
    frequency: &FrequencySurface,
    cutoff: f32,
) -> Result<Mask, RasterError> {
    if !(0.0..=1.0).contains(&cutoff) {
        return Err(RasterError::InvalidCutoff { cutoff });
    }
    Mask::new(
        frequency.width,
        frequency.height,
        frequency
            .data
            .iter()
            .map(|&f| u8::from(f >= cutoff))
            .collect(),
    )
}
