/// Tunable thresholds for the hand-presence heuristic.
///
/// These are coarse, empirically chosen values, not calibrated constants.
/// Retuning is fine as long as the two-signal acceptance in
/// [`super::estimator::estimate`] keeps its disjunctive shape.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    /// Sample every Nth pixel of the RGBA buffer.
    pub sample_stride: usize,
    /// Pixels at or below this alpha are treated as invisible.
    pub alpha_threshold: u8,
    /// Vertical red-channel contrast above this counts as an edge pixel.
    pub contrast_threshold: u32,
    /// Skin coverage alone asserts presence above this ratio.
    pub skin_ratio_floor: f32,
    /// Lower skin ratio accepted when combined with edge density.
    pub skin_ratio_with_edges: f32,
    /// Minimum edge-pixel ratio for the combined acceptance path.
    pub edge_ratio_floor: f32,
    /// Weight of skin coverage in the confidence score.
    pub skin_weight: f32,
    /// Weight of edge density in the confidence score.
    pub edge_weight: f32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            sample_stride: 4,
            alpha_threshold: 200,
            contrast_threshold: 50,
            skin_ratio_floor: 0.02,
            skin_ratio_with_edges: 0.015,
            edge_ratio_floor: 0.01,
            skin_weight: 10.0,
            edge_weight: 5.0,
        }
    }
}
