//! Actual-vs-requested resolution reconciliation
//!
//! Hosts may hand back a stream in the opposite orientation from the one
//! requested. When auto-rotation is on, the observed dimensions are read
//! swapped if that explains the difference, so that a rotated stream is not
//! reported as a resolution mismatch.

use crate::camera::types::Resolution;

/// Aspect ratios closer than this are considered equal
pub const ASPECT_TOLERANCE: f64 = 0.01;

/// Decide whether the observed dimensions should be read swapped.
///
/// Swap only when a resolution was requested, auto-rotation is on, the
/// observed aspect ratio is off by more than [`ASPECT_TOLERANCE`], and
/// swapping either matches the request exactly or brings the aspect ratio
/// strictly closer to it.
pub fn should_swap_dimensions(
    requested: Option<&Resolution>,
    observed_width: u32,
    observed_height: u32,
    auto_rotate: bool,
) -> bool {
    let Some(requested) = requested else {
        return false;
    };
    if !auto_rotate || observed_width == 0 || observed_height == 0 {
        return false;
    }
    let Some(requested_ratio) = requested.aspect_ratio() else {
        return false;
    };

    let current_ratio = observed_width as f64 / observed_height as f64;
    if (current_ratio - requested_ratio).abs() <= ASPECT_TOLERANCE {
        return false;
    }

    let (swapped_width, swapped_height) = (observed_height, observed_width);
    let exact = swapped_width == requested.width && swapped_height == requested.height;
    let swapped_ratio = swapped_width as f64 / swapped_height as f64;

    exact || (swapped_ratio - requested_ratio).abs() < (current_ratio - requested_ratio).abs()
}

/// Result of comparing an observed stream against the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Resolution to record as active
    pub resolution: Resolution,
    /// Whether the observed dimensions were read swapped
    pub swapped: bool,
    /// Whether the recorded resolution still differs from the request
    pub mismatch: bool,
}

/// Reconcile observed track dimensions against the requested resolution.
///
/// The result carries the requested name (or `"unknown"`). A remaining
/// mismatch is reported, never raised: the session proceeds with whatever
/// the device delivered.
pub fn reconcile_actual_resolution(
    observed_width: u32,
    observed_height: u32,
    requested: Option<&Resolution>,
    auto_rotate: bool,
) -> Reconciliation {
    let swapped = should_swap_dimensions(requested, observed_width, observed_height, auto_rotate);
    let (width, height) = if swapped {
        (observed_height, observed_width)
    } else {
        (observed_width, observed_height)
    };

    let resolution = Resolution {
        width,
        height,
        name: Some(
            requested
                .and_then(|r| r.name.clone())
                .unwrap_or_else(|| "unknown".to_string()),
        ),
    };
    let mismatch = requested.is_some_and(|r| !r.same_dimensions(&resolution));

    Reconciliation {
        resolution,
        swapped,
        mismatch,
    }
}
