use crate::geometry::Vec2;

/// Progress along the entry segment at which the lateral fan-out starts.
const ENTRY_RAMP_START: f32 = 0.6;

/// A point on the path at some traveled distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathSample {
    pub segment: usize,
    /// Fraction of the segment already covered, in `0..=1`.
    pub progress: f32,
    pub point: Vec2,
}

/// Fixed polyline the belt follows, with cumulative segment distances
/// computed once at construction.
#[derive(Clone, Debug)]
pub struct ConveyorPath {
    waypoints: Vec<Vec2>,
    cumulative: Vec<f32>,
}

impl ConveyorPath {
    pub fn new(waypoints: Vec<Vec2>) -> Self {
        let mut cumulative = Vec::with_capacity(waypoints.len().max(1));
        cumulative.push(0.0);
        for pair in waypoints.windows(2) {
            let last = cumulative.last().copied().unwrap_or(0.0);
            cumulative.push(last + pair[0].distance(pair[1]));
        }
        Self {
            waypoints,
            cumulative,
        }
    }

    pub fn waypoints(&self) -> &[Vec2] {
        &self.waypoints
    }

    pub fn cumulative_distances(&self) -> &[f32] {
        &self.cumulative
    }

    pub fn segment_count(&self) -> usize {
        self.waypoints.len().saturating_sub(1)
    }

    pub fn total_length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Locates `distance` on the path. `None` once the distance reaches the
    /// total length, or when the path has fewer than two waypoints.
    pub fn sample(&self, distance: f32) -> Option<PathSample> {
        let segments = self.segment_count();
        if segments == 0 || distance >= self.total_length() {
            return None;
        }
        let distance = distance.max(0.0);
        let segment = (0..segments)
            .find(|&idx| distance < self.cumulative[idx + 1])
            .unwrap_or(segments - 1);

        let start = self.waypoints[segment];
        let end = self.waypoints[segment + 1];
        let seg_start = self.cumulative[segment];
        let seg_len = self.cumulative[segment + 1] - seg_start;
        let progress = if seg_len <= 0.0 {
            0.0
        } else {
            ((distance - seg_start) / seg_len).clamp(0.0, 1.0)
        };

        Some(PathSample {
            segment,
            progress,
            point: start.lerp(end, progress),
        })
    }

    /// How much of an entity's lateral offset applies at this point.
    ///
    /// Entry segment: 0, ramping to 1 over its last 40%. Interior segments: 1.
    /// Exit segment (second to last): 1 down to 0. Final segment: 0. Each
    /// segment starts at the value the previous one ended on.
    pub fn lateral_blend(&self, segment: usize, progress: f32) -> f32 {
        let segments = self.segment_count();
        let progress = progress.clamp(0.0, 1.0);
        if segment == 0 {
            return if progress > ENTRY_RAMP_START {
                (progress - ENTRY_RAMP_START) / (1.0 - ENTRY_RAMP_START)
            } else {
                0.0
            };
        }

        let (exit, last) = if segments >= 3 {
            (segments - 2, Some(segments - 1))
        } else {
            (segments.saturating_sub(1), None)
        };

        if Some(segment) == last || segment >= segments {
            0.0
        } else if segment == exit {
            1.0 - progress
        } else {
            1.0
        }
    }
}
