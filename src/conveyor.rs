use crate::geometry::Vec2;
use crate::path::ConveyorPath;

/// Per-entity progress along the belt.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportState {
    /// Seconds of unpaused belt time seen by this entity.
    pub progress: f32,
    /// Path distance this entity trails the batch head by.
    pub start_offset: f32,
    /// Signed fan-out distance applied along the lateral axis.
    pub lateral_offset: f32,
}

impl TransportState {
    pub fn new(start_offset: f32, lateral_offset: f32) -> Self {
        Self {
            progress: 0.0,
            start_offset,
            lateral_offset,
        }
    }

    /// Whether the entity has worked off its start offset and is on the path.
    pub fn has_entered(&self, speed: f32) -> bool {
        speed > 0.0 && self.progress * speed >= self.start_offset
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BeltMotion {
    pub speed: f32,
    pub lateral_axis: Vec2,
}

/// Moves one entity along the belt. Returns `true` when the entity is not
/// on the belt or has run off its end; `position` is the entity's top-left
/// corner and is only written while the entity is visibly on the path.
pub fn advance(
    transport: Option<&mut TransportState>,
    position: &mut Vec2,
    size: Vec2,
    dt: f32,
    path: &ConveyorPath,
    motion: BeltMotion,
    pause: &BatchPause,
) -> bool {
    let Some(state) = transport else {
        return true;
    };
    if pause.is_paused() || motion.speed <= 0.0 {
        return false;
    }

    state.progress += dt;
    let effective = state.progress - state.start_offset / motion.speed;
    if effective < 0.0 {
        return false;
    }

    let traveled = effective * motion.speed;
    let Some(sample) = path.sample(traveled) else {
        return true;
    };

    let blend = path.lateral_blend(sample.segment, sample.progress);
    let offset = motion.lateral_axis * (state.lateral_offset * blend);
    let center = sample.point + offset;
    *position = Vec2::new(center.x - size.x / 2.0, center.y - size.y / 2.0);
    false
}

/// Pause record shared by every member of one batch.
///
/// `running -> paused -> running` happens at most once: the trigger latches
/// and the resume is permanent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchPause {
    paused: bool,
    elapsed: f32,
    triggered: bool,
}

impl BatchPause {
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn has_triggered(&self) -> bool {
        self.triggered
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Latches the pause when `coordinate` has reached `threshold`. Returns
    /// `true` only on the call that actually starts the pause.
    pub fn try_trigger(&mut self, coordinate: f32, threshold: f32) -> bool {
        if self.triggered || coordinate < threshold {
            return false;
        }
        self.paused = true;
        self.triggered = true;
        self.elapsed = 0.0;
        true
    }

    /// Accumulates pause time. Returns `true` on the tick the batch resumes.
    pub fn tick(&mut self, dt: f32, duration: f32) -> bool {
        if !self.paused {
            return false;
        }
        self.elapsed += dt;
        if self.elapsed >= duration {
            self.paused = false;
            return true;
        }
        false
    }
}
