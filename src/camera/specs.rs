//! Device maximum-resolution survey helpers
//!
//! A survey opens a trial stream per device with a very large ideal size,
//! records what the device actually delivered, and tears the stream down.
//! The recorded [`MaxResolution`] can then answer "would this resolution
//! work?" without touching the device again.

use crate::camera::constraints::{Constrain, MediaConstraints, VideoConstraints};
use crate::camera::types::{MaxResolution, Resolution, ResolutionSupport, standard_resolutions};

/// Ideal width requested by a survey trial stream
pub const PROBE_WIDTH: u32 = 4096;

/// Ideal height requested by a survey trial stream
pub const PROBE_HEIGHT: u32 = 2160;

/// Constraints for a survey trial stream: the device pinned by exact id,
/// dimensions as ideal values so the device answers with its best.
pub fn probe_constraints(device_id: &str) -> MediaConstraints {
    MediaConstraints {
        audio: false,
        video: Some(VideoConstraints {
            device_id: Some(Constrain::Exact(device_id.to_string())),
            width: Some(Constrain::Ideal(PROBE_WIDTH)),
            height: Some(Constrain::Ideal(PROBE_HEIGHT)),
            ..Default::default()
        }),
    }
}

/// Whether both dimensions fit inside the recorded device maximum
pub fn is_resolution_supported_from_specs(spec: &MaxResolution, width: u32, height: u32) -> bool {
    width <= spec.max_width && height <= spec.max_height
}

/// Annotate each candidate with whether the device can deliver it.
///
/// `None` uses the standard resolution table.
pub fn check_supported_resolutions_from_specs(
    spec: &MaxResolution,
    candidates: Option<&[Resolution]>,
) -> Vec<ResolutionSupport> {
    let annotate = |resolution: &Resolution| ResolutionSupport {
        is_supported: is_resolution_supported_from_specs(spec, resolution.width, resolution.height),
        resolution: resolution.clone(),
    };

    match candidates {
        Some(candidates) => candidates.iter().map(annotate).collect(),
        None => standard_resolutions().iter().map(annotate).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::types::STANDARD_RESOLUTIONS;

    fn full_hd() -> MaxResolution {
        MaxResolution {
            device_id: "cam-1".into(),
            label: "Integrated".into(),
            max_width: 1920,
            max_height: 1080,
        }
    }

    #[test]
    fn test_single_resolution_check() {
        let spec = full_hd();
        assert!(is_resolution_supported_from_specs(&spec, 1920, 1080));
        assert!(is_resolution_supported_from_specs(&spec, 640, 480));
        assert!(!is_resolution_supported_from_specs(&spec, 1080, 1920));
        assert!(!is_resolution_supported_from_specs(&spec, 2560, 1440));
    }

    #[test]
    fn test_standard_table_marks_exactly_fitting_entries() {
        for (max_width, max_height) in [(1920, 1080), (1080, 1920), (640, 480), (0, 0), (4096, 4096)] {
            let spec = MaxResolution {
                max_width,
                max_height,
                ..full_hd()
            };
            let result = check_supported_resolutions_from_specs(&spec, None);
            assert_eq!(result.len(), STANDARD_RESOLUTIONS.len());

            for (entry, &(w, h, name)) in result.iter().zip(STANDARD_RESOLUTIONS.iter()) {
                assert_eq!(entry.resolution.name.as_deref(), Some(name));
                assert_eq!(
                    entry.is_supported,
                    w <= max_width && h <= max_height,
                    "{name} against {max_width}x{max_height}"
                );
            }
        }
    }

    #[test]
    fn test_custom_candidates() {
        let candidates = [Resolution::new(800, 600), Resolution::new(3000, 2000)];
        let result = check_supported_resolutions_from_specs(&full_hd(), Some(&candidates));
        assert_eq!(
            result.iter().map(|r| r.is_supported).collect::<Vec<_>>(),
            vec![true, false]
        );
    }

    #[test]
    fn test_probe_constraints_pin_device() {
        let constraints = probe_constraints("cam-9");
        let video = constraints.video.unwrap();
        assert_eq!(video.device_id, Some(Constrain::Exact("cam-9".to_string())));
        assert_eq!(video.width, Some(Constrain::Ideal(PROBE_WIDTH)));
        assert!(video.facing_mode.is_none());
        assert!(!constraints.audio);
    }
}
