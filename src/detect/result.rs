use serde::Serialize;

/// Axis-aligned box in frame pixels, half-open: `x0..x1`, `y0..y1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// The single object accepted for a frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CandidateRegion {
    /// Circle center, truncated to whole pixels.
    pub center_x: i32,
    pub center_y: i32,
    /// Circle radius, truncated to whole pixels.
    pub radius: i32,
    /// Square around the circle, clipped to the frame.
    pub bounds: BoundingBox,
    /// Area enclosed by the selected component's outer boundary.
    pub area: usize,
}

/// Why a frame produced no candidate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    NoForeground,
    AreaTooSmall { area: usize },
    RadiusTooSmall { radius: f64 },
    OutsideBand { center_y: i32 },
    EmptyBounds,
}

/// Per-frame detector output.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum DetectionOutcome {
    Candidate(CandidateRegion),
    Rejected(Rejection),
}

impl DetectionOutcome {
    pub fn candidate(&self) -> Option<&CandidateRegion> {
        match self {
            DetectionOutcome::Candidate(candidate) => Some(candidate),
            DetectionOutcome::Rejected(_) => None,
        }
    }
}
