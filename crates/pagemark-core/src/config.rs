//! Configuration types for the recognition pipeline.
//!
//! Every tolerance used by the matcher, assembler and tracker lives in
//! [`DetectorConfig`]. The defaults were tuned on a 1280x720 webcam looking
//! at A4 pages; override them through [`DetectorConfig::builder`] rather than
//! editing constants.

// ============================================================================
// HeuristicMode: color classification precedence
// ============================================================================

/// How the raw-RGB heuristic combines with nearest-reference classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeuristicMode {
    /// Only the nearest palette reference is used.
    Disabled,
    /// The heuristic is consulted when the palette is empty or the two
    /// nearest references are within `ambiguity_margin` of each other.
    Fallback,
    /// Any heuristic rule that fires wins over the palette.
    Override,
}

// ============================================================================
// DetectorConfig: Pipeline-level configuration
// ============================================================================

/// Pipeline-level configuration for the page detector.
///
/// # Example
/// ```
/// use pagemark_core::config::DetectorConfig;
///
/// let config = DetectorConfig::builder()
///     .persist_ttl(20)
///     .adjacency_angle_tolerance(0.08)
///     .build();
/// assert_eq!(config.persist_ttl, 20);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectorConfig {
    // Spatial bucketing
    /// Frame width in pixels used to lay out the bucket grid (default: 1280).
    pub frame_width: u32,
    /// Frame height in pixels used to lay out the bucket grid (default: 720).
    pub frame_height: u32,
    /// Side length of a square bucket in pixels (default: 130).
    /// Must exceed the extent of one corner fiducial.
    pub bucket_window: f64,
    /// Offset between neighboring buckets in pixels (default: 65).
    pub bucket_stride: f64,

    // Corner matching
    /// Width of the distance bins used to pair arm dots (default: 10.0 px).
    pub distance_bucket_width: f64,
    /// Maximum deviation from a straight angle for three dots to form an arm
    /// (default: 0.2 rad).
    pub line_angle_tolerance: f64,
    /// Allowed spread between the two smallest centroid distances (default: 3.0 px).
    pub short_radius_margin: f64,
    /// Allowed spread among the remaining same-radius centroid distances
    /// (default: 6.0 px).
    pub radius_margin: f64,
    /// Allowed deviation of the long radius from twice the short radius
    /// (default: 5.0 px).
    pub radius_ratio_margin: f64,
    /// Maximum distance between a quarter-turned arm end and the other arm end
    /// (default: 10.0 px).
    pub orientation_tolerance: f64,

    // Color classification
    /// Precedence of the raw-RGB heuristic (default: `Fallback`).
    pub heuristic_mode: HeuristicMode,
    /// Squared-RGB distance margin below which the nearest reference is
    /// considered ambiguous (default: 2000).
    pub ambiguity_margin: u32,

    // Assembly
    /// Maximum angle between an arm and the direction to a neighboring corner
    /// for the two to be adjacent on a page (default: 0.05 rad).
    pub adjacency_angle_tolerance: f64,
    /// Two detections whose vertices are closer than this are the same corner
    /// seen from overlapping buckets (default: 1.0 px).
    pub corner_dedup_distance: f64,

    // Tracking
    /// Maximum vertex displacement between frames for a corner to inherit
    /// persisted colors (default: 5.0 px).
    pub persist_distance: f64,
    /// Number of frames a corner survives without being re-matched (default: 10).
    pub persist_ttl: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            frame_width: 1280,
            frame_height: 720,
            bucket_window: 130.0,
            bucket_stride: 65.0,
            distance_bucket_width: 10.0,
            line_angle_tolerance: 0.2,
            short_radius_margin: 3.0,
            radius_margin: 6.0,
            radius_ratio_margin: 5.0,
            orientation_tolerance: 10.0,
            heuristic_mode: HeuristicMode::Fallback,
            ambiguity_margin: 2_000,
            adjacency_angle_tolerance: 0.05,
            corner_dedup_distance: 1.0,
            persist_distance: 5.0,
            persist_ttl: 10,
        }
    }
}

impl DetectorConfig {
    /// Create a new builder for `DetectorConfig`.
    #[must_use]
    pub fn builder() -> DetectorConfigBuilder {
        DetectorConfigBuilder::default()
    }
}

/// Builder for [`DetectorConfig`].
#[derive(Default)]
pub struct DetectorConfigBuilder {
    frame_width: Option<u32>,
    frame_height: Option<u32>,
    bucket_window: Option<f64>,
    bucket_stride: Option<f64>,
    distance_bucket_width: Option<f64>,
    line_angle_tolerance: Option<f64>,
    short_radius_margin: Option<f64>,
    radius_margin: Option<f64>,
    radius_ratio_margin: Option<f64>,
    orientation_tolerance: Option<f64>,
    heuristic_mode: Option<HeuristicMode>,
    ambiguity_margin: Option<u32>,
    adjacency_angle_tolerance: Option<f64>,
    corner_dedup_distance: Option<f64>,
    persist_distance: Option<f64>,
    persist_ttl: Option<u32>,
}

impl DetectorConfigBuilder {
    /// Set the frame size used to lay out the bucket grid.
    #[must_use]
    pub fn frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_width = Some(width);
        self.frame_height = Some(height);
        self
    }

    /// Set the bucket window and stride.
    #[must_use]
    pub fn buckets(mut self, window: f64, stride: f64) -> Self {
        self.bucket_window = Some(window);
        self.bucket_stride = Some(stride);
        self
    }

    /// Set the width of the distance bins used to pair arm dots.
    #[must_use]
    pub fn distance_bucket_width(mut self, width: f64) -> Self {
        self.distance_bucket_width = Some(width);
        self
    }

    /// Set the straight-angle tolerance for arm detection.
    #[must_use]
    pub fn line_angle_tolerance(mut self, radians: f64) -> Self {
        self.line_angle_tolerance = Some(radians);
        self
    }

    /// Set the margin between the two smallest centroid distances.
    #[must_use]
    pub fn short_radius_margin(mut self, margin: f64) -> Self {
        self.short_radius_margin = Some(margin);
        self
    }

    /// Set the margin among the remaining same-radius centroid distances.
    #[must_use]
    pub fn radius_margin(mut self, margin: f64) -> Self {
        self.radius_margin = Some(margin);
        self
    }

    /// Set the margin for the long radius being twice the short radius.
    #[must_use]
    pub fn radius_ratio_margin(mut self, margin: f64) -> Self {
        self.radius_ratio_margin = Some(margin);
        self
    }

    /// Set the orientation tolerance in pixels.
    #[must_use]
    pub fn orientation_tolerance(mut self, pixels: f64) -> Self {
        self.orientation_tolerance = Some(pixels);
        self
    }

    /// Set the raw-RGB heuristic precedence.
    #[must_use]
    pub fn heuristic_mode(mut self, mode: HeuristicMode) -> Self {
        self.heuristic_mode = Some(mode);
        self
    }

    /// Set the palette ambiguity margin (squared RGB distance).
    #[must_use]
    pub fn ambiguity_margin(mut self, margin: u32) -> Self {
        self.ambiguity_margin = Some(margin);
        self
    }

    /// Set the adjacency angle tolerance.
    #[must_use]
    pub fn adjacency_angle_tolerance(mut self, radians: f64) -> Self {
        self.adjacency_angle_tolerance = Some(radians);
        self
    }

    /// Set the distance under which two detections are the same corner.
    #[must_use]
    pub fn corner_dedup_distance(mut self, pixels: f64) -> Self {
        self.corner_dedup_distance = Some(pixels);
        self
    }

    /// Set the maximum frame-to-frame displacement for color smoothing.
    #[must_use]
    pub fn persist_distance(mut self, pixels: f64) -> Self {
        self.persist_distance = Some(pixels);
        self
    }

    /// Set the number of frames a persisted corner survives.
    #[must_use]
    pub fn persist_ttl(mut self, frames: u32) -> Self {
        self.persist_ttl = Some(frames);
        self
    }

    /// Build the configuration, using defaults for unset fields.
    #[must_use]
    pub fn build(self) -> DetectorConfig {
        let d = DetectorConfig::default();
        DetectorConfig {
            frame_width: self.frame_width.unwrap_or(d.frame_width),
            frame_height: self.frame_height.unwrap_or(d.frame_height),
            bucket_window: self.bucket_window.unwrap_or(d.bucket_window),
            bucket_stride: self.bucket_stride.unwrap_or(d.bucket_stride),
            distance_bucket_width: self
                .distance_bucket_width
                .unwrap_or(d.distance_bucket_width),
            line_angle_tolerance: self.line_angle_tolerance.unwrap_or(d.line_angle_tolerance),
            short_radius_margin: self.short_radius_margin.unwrap_or(d.short_radius_margin),
            radius_margin: self.radius_margin.unwrap_or(d.radius_margin),
            radius_ratio_margin: self.radius_ratio_margin.unwrap_or(d.radius_ratio_margin),
            orientation_tolerance: self
                .orientation_tolerance
                .unwrap_or(d.orientation_tolerance),
            heuristic_mode: self.heuristic_mode.unwrap_or(d.heuristic_mode),
            ambiguity_margin: self.ambiguity_margin.unwrap_or(d.ambiguity_margin),
            adjacency_angle_tolerance: self
                .adjacency_angle_tolerance
                .unwrap_or(d.adjacency_angle_tolerance),
            corner_dedup_distance: self
                .corner_dedup_distance
                .unwrap_or(d.corner_dedup_distance),
            persist_distance: self.persist_distance.unwrap_or(d.persist_distance),
            persist_ttl: self.persist_ttl.unwrap_or(d.persist_ttl),
        }
    }
}
