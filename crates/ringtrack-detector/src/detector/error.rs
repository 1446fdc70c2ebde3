use ringtrack_core::FrameError;

/// Rejected detector configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RingParamsError {
    #[error("diameter ratio must lie in (0, 1), got {0}")]
    DiameterRatio(f32),
    #[error("{name} must be finite and positive, got {value}")]
    Tolerance { name: &'static str, value: f32 },
    #[error("{name} must be finite and non-negative, got {value}")]
    CenterTolerance { name: &'static str, value: f32 },
    #[error("max_regions must allow at least one outer/inner pair, got {0}")]
    MaxRegions(usize),
    #[error("min_threshold_step must be at least 1, got {0}")]
    ThresholdStep(i32),
    #[error("initial threshold {0} is outside the channel-sum range 0..=765")]
    InitialThreshold(i32),
}

/// Errors returned by [`RingDetector`](super::RingDetector).
///
/// Not finding a marker is not an error; see
/// [`RingDetection::valid`](super::RingDetection::valid).
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RingDetectError {
    #[error("frame must be at least 3x3 pixels, got {width}x{height}")]
    FrameTooSmall { width: usize, height: usize },
    #[error("detector built for {expected_width}x{expected_height} frames, got {width}x{height}")]
    FrameSizeMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("invalid detector parameters: {0}")]
    InvalidParams(#[from] RingParamsError),
}
