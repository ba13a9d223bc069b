use log::debug;
use serde::Serialize;

use crate::frame::StillFrame;

use super::config::EstimatorConfig;

/// Upper bound for the cosmetic landmark estimate (21 hand landmarks).
const MAX_LANDMARK_COUNT: f32 = 21.0;

/// Verdict of the local hand-presence pre-filter.
///
/// `estimated_landmark_count` is confidence scaled onto a fixed maximum; it
/// is not a real landmark detection and callers must not treat it as one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresenceVerdict {
    pub present: bool,
    pub confidence: f32,
    pub estimated_landmark_count: u32,
}

impl PresenceVerdict {
    /// The zero verdict: nothing detectable, zero confidence.
    pub fn absent() -> Self {
        Self {
            present: false,
            confidence: 0.0,
            estimated_landmark_count: 0,
        }
    }
}

impl Default for PresenceVerdict {
    fn default() -> Self {
        Self::absent()
    }
}

/// Disjoint RGB ranges approximating skin tones across light, medium and
/// dark complexions. Inclusive bounds: (r, g, b) as (min, max) pairs.
const SKIN_TONE_RANGES: [[(u8, u8); 3]; 3] = [
    [(95, 255), (40, 100), (20, 95)],
    [(45, 95), (20, 50), (5, 35)],
    [(20, 60), (10, 30), (5, 20)],
];

fn is_skin_tone(r: u8, g: u8, b: u8) -> bool {
    SKIN_TONE_RANGES.iter().any(|[(r_lo, r_hi), (g_lo, g_hi), (b_lo, b_hi)]| {
        r >= *r_lo && r <= *r_hi && g >= *g_lo && g <= *g_hi && b >= *b_lo && b <= *b_hi
    })
}

/// Cheap hand-presence check over a decoded frame.
///
/// Samples the RGBA buffer at a fixed stride, bucketing visible pixels into
/// skin-tone coverage and vertical-contrast (edge) counts, then accepts when
/// either skin coverage alone clears the floor or a slightly lower coverage
/// coincides with meaningful edge density. The disjunction deliberately
/// trades false positives for fewer false negatives: a missed hand wastes a
/// practice attempt, a spurious pass only wastes one remote call.
///
/// Never fails; anything unmeasurable collapses to [`PresenceVerdict::absent`].
pub fn estimate(frame: &StillFrame, cfg: &EstimatorConfig) -> PresenceVerdict {
    let data = frame.pixels();
    let row_bytes = frame.width() as usize * 4;
    if row_bytes == 0 || data.len() < 4 {
        return PresenceVerdict::absent();
    }

    let step = cfg.sample_stride.max(1) * 4;
    let mut skin_pixels: u32 = 0;
    let mut edge_pixels: u32 = 0;
    let mut total_pixels: u32 = 0;

    let mut i = 0;
    while i + 4 <= data.len() {
        let r = data[i];
        let g = data[i + 1];
        let b = data[i + 2];
        let alpha = data[i + 3];

        if alpha > cfg.alpha_threshold {
            total_pixels += 1;

            if is_skin_tone(r, g, b) {
                skin_pixels += 1;
            }

            // Vertical neighbor contrast on the red channel, skipping the
            // first and last rows where a neighbor is missing.
            if i >= row_bytes && i + row_bytes < data.len() {
                let above = data[i - row_bytes];
                let below = data[i + row_bytes];
                let contrast =
                    r.abs_diff(above) as u32 + r.abs_diff(below) as u32;
                if contrast > cfg.contrast_threshold {
                    edge_pixels += 1;
                }
            }
        }

        i += step;
    }

    // All-transparent frames land here; guard the division.
    if total_pixels == 0 {
        return PresenceVerdict::absent();
    }

    let skin_pct = skin_pixels as f32 / total_pixels as f32;
    let edge_pct = edge_pixels as f32 / total_pixels as f32;

    let present = skin_pct > cfg.skin_ratio_floor
        || (skin_pct > cfg.skin_ratio_with_edges && edge_pct > cfg.edge_ratio_floor);

    let confidence = if present {
        (skin_pct * cfg.skin_weight + edge_pct * cfg.edge_weight).min(1.0)
    } else {
        0.0
    };

    debug!(
        "presence estimate: skin={:.3} edges={:.3} present={} confidence={:.3}",
        skin_pct, edge_pct, present, confidence
    );

    PresenceVerdict {
        present,
        confidence,
        estimated_landmark_count: if present {
            (confidence * MAX_LANDMARK_COUNT).floor() as u32
        } else {
            0
        },
    }
}

/// Variant of [`estimate`] for still-encoded image bytes.
///
/// Undecodable input yields the absent verdict; this is a best-effort filter
/// and must never take the pipeline down.
pub fn estimate_encoded(bytes: &[u8], cfg: &EstimatorConfig) -> PresenceVerdict {
    match StillFrame::from_encoded(bytes) {
        Ok(frame) => estimate(&frame, cfg),
        Err(err) => {
            debug!("presence estimate skipped, undecodable image: {err}");
            PresenceVerdict::absent()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::StillFrame;

    fn solid_frame(width: u32, height: u32, rgba: [u8; 4]) -> StillFrame {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        StillFrame::new(width, height, pixels).unwrap()
    }

    /// Skin-toned frame with alternating row brightness so every sampled
    /// pixel sees high vertical contrast.
    fn banded_skin_frame(width: u32, height: u32) -> StillFrame {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            let r = if y % 2 == 0 { 110 } else { 220 };
            for _ in 0..width {
                pixels.extend_from_slice(&[r, 60, 50, 255]);
            }
        }
        StillFrame::new(width, height, pixels).unwrap()
    }

    #[test]
    fn all_transparent_frame_is_absent() {
        let verdict = estimate(&solid_frame(32, 32, [120, 60, 40, 0]), &EstimatorConfig::default());
        assert_eq!(verdict, PresenceVerdict::absent());
    }

    #[test]
    fn skin_with_contrast_is_present_with_confidence() {
        let verdict = estimate(&banded_skin_frame(64, 64), &EstimatorConfig::default());
        assert!(verdict.present);
        assert!(verdict.confidence > 0.3);
        assert!(verdict.confidence <= 1.0);
        assert!(verdict.estimated_landmark_count > 0);
        assert!(verdict.estimated_landmark_count <= 21);
    }

    #[test]
    fn uniform_non_skin_color_is_absent() {
        let verdict = estimate(&solid_frame(64, 64, [0, 0, 255, 255]), &EstimatorConfig::default());
        assert!(!verdict.present);
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(verdict.estimated_landmark_count, 0);
    }

    #[test]
    fn skin_coverage_alone_clears_the_gate() {
        // Solid light-skin frame: zero contrast, but coverage is 100%.
        let verdict = estimate(&solid_frame(32, 32, [120, 60, 40, 255]), &EstimatorConfig::default());
        assert!(verdict.present);
    }

    #[test]
    fn deterministic_for_identical_buffers() {
        let frame = banded_skin_frame(48, 48);
        let cfg = EstimatorConfig::default();
        assert_eq!(estimate(&frame, &cfg), estimate(&frame, &cfg));
    }

    #[test]
    fn undecodable_bytes_collapse_to_absent() {
        let verdict = estimate_encoded(b"definitely not an image", &EstimatorConfig::default());
        assert_eq!(verdict, PresenceVerdict::absent());
    }

    #[test]
    fn encoded_path_matches_raster_path() {
        let frame = banded_skin_frame(40, 40);
        let png = frame.to_png().unwrap();
        let cfg = EstimatorConfig::default();
        assert_eq!(estimate_encoded(&png, &cfg), estimate(&frame, &cfg));
    }
}
