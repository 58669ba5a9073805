use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    default_conveyor_path, get_difficulty_multiplier, BATCH_MEMBER_SPACING, CASE_ID_RANGE,
    CASE_NOTE_SIZE, CASE_NOTE_Y, COLLISION_PUSH, COLLISION_SHRINK, COLLISION_SPIN_MAX,
    CONVEYOR_PAUSE_AT_INDEX, CONVEYOR_PAUSE_DURATION, CONVEYOR_PAUSE_TRIGGER_Y, CONVEYOR_SPEED,
    CUSTOMER_INTERVAL, CUSTOMER_SLOTS, CUSTOMER_SLOT_RETRY_DELAY, CUSTOMER_SPAWN_Y,
    CUSTOMER_WAIT_TIME, CUSTOMER_WALK_SPEED, CUSTOMER_Y, DESK_AREA, DESK_ITEM_REQUEST_CHANCE,
    ITEMS_PER_BATCH, ITEM_FRICTION_RATE, ITEM_LATERAL_OFFSETS, ITEM_SPAWN_INTERVAL,
    PENALTY_CLICK, PENALTY_TIMEOUT, PENALTY_WRONG, REWARD_CASE_SOLVED, REWARD_CORRECT,
    SHIFT_DURATION_SECS, THIEF_HP, THIEF_PENALTY_HIT, THIEF_SPAWN_PROB, THIEF_WAIT_TIME,
    VELOCITY_EPSILON,
};
use crate::geometry::{Rect, Vec2};
use crate::types::Difficulty;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConveyorConfig {
    pub path: Vec<Vec2>,
    pub speed: f32,
    /// Direction the batch fan-out offset is applied along. The default is
    /// screen-vertical, which on the belt's vertical column staggers members
    /// along the direction of travel rather than across it. Set `(1, 0)` for
    /// a side-by-side fan-out there.
    pub lateral_axis: Vec2,
    pub pause_trigger_y: f32,
    pub pause_duration: f32,
    pub batch_size: usize,
    pub trigger_index: usize,
    pub lateral_offsets: Vec<f32>,
    pub member_spacing: f32,
    pub spawn_interval: f32,
}

impl Default for ConveyorConfig {
    fn default() -> Self {
        Self {
            path: default_conveyor_path()
                .into_iter()
                .map(|(x, y)| Vec2::new(x, y))
                .collect(),
            speed: CONVEYOR_SPEED,
            lateral_axis: Vec2::new(0.0, 1.0),
            pause_trigger_y: CONVEYOR_PAUSE_TRIGGER_Y,
            pause_duration: CONVEYOR_PAUSE_DURATION,
            batch_size: ITEMS_PER_BATCH,
            trigger_index: CONVEYOR_PAUSE_AT_INDEX,
            lateral_offsets: ITEM_LATERAL_OFFSETS.to_vec(),
            member_spacing: BATCH_MEMBER_SPACING,
            spawn_interval: ITEM_SPAWN_INTERVAL,
        }
    }
}

impl ConveyorConfig {
    pub fn lateral_offset(&self, index: usize) -> f32 {
        self.lateral_offsets.get(index).copied().unwrap_or(0.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VisitorConfig {
    pub spawn_interval: f32,
    pub slot_retry_delay: f32,
    pub slots: Vec<f32>,
    pub spawn_y: f32,
    pub line_y: f32,
    pub walk_speed: f32,
    pub wait_time: f32,
    pub desk_request_chance: f32,
    pub hostile_probability: f32,
    pub hostile_hp: u32,
    pub hostile_wait_time: f32,
}

impl Default for VisitorConfig {
    fn default() -> Self {
        Self {
            spawn_interval: CUSTOMER_INTERVAL,
            slot_retry_delay: CUSTOMER_SLOT_RETRY_DELAY,
            slots: CUSTOMER_SLOTS.to_vec(),
            spawn_y: CUSTOMER_SPAWN_Y,
            line_y: CUSTOMER_Y,
            walk_speed: CUSTOMER_WALK_SPEED,
            wait_time: CUSTOMER_WAIT_TIME,
            desk_request_chance: DESK_ITEM_REQUEST_CHANCE,
            hostile_probability: THIEF_SPAWN_PROB,
            hostile_hp: THIEF_HP,
            hostile_wait_time: THIEF_WAIT_TIME,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EconomyConfig {
    pub reward_correct: i64,
    pub reward_case_solved: i64,
    pub penalty_wrong: i64,
    pub penalty_timeout: i64,
    pub penalty_spray_wasted: i64,
    pub penalty_theft: i64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            reward_correct: REWARD_CORRECT,
            reward_case_solved: REWARD_CASE_SOLVED,
            penalty_wrong: PENALTY_WRONG,
            penalty_timeout: PENALTY_TIMEOUT,
            penalty_spray_wasted: PENALTY_CLICK,
            penalty_theft: THIEF_PENALTY_HIT,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicsConfig {
    pub surface: Rect,
    /// Exponential velocity decay per second.
    pub friction_rate: f32,
    pub velocity_epsilon: f32,
    pub collision_shrink: f32,
    pub push_impulse: f32,
    pub spin_impulse_max: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        let (x, y, width, height) = DESK_AREA;
        Self {
            surface: Rect::new(x, y, width, height),
            friction_rate: ITEM_FRICTION_RATE,
            velocity_epsilon: VELOCITY_EPSILON,
            collision_shrink: COLLISION_SHRINK,
            push_impulse: COLLISION_PUSH,
            spin_impulse_max: COLLISION_SPIN_MAX,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaseConfig {
    pub note_y: f32,
    pub note_width: f32,
    pub note_height: f32,
    pub case_id_min: u32,
    pub case_id_max: u32,
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            note_y: CASE_NOTE_Y,
            note_width: CASE_NOTE_SIZE.0,
            note_height: CASE_NOTE_SIZE.1,
            case_id_min: CASE_ID_RANGE.0 as u32,
            case_id_max: CASE_ID_RANGE.1 as u32,
        }
    }
}

/// Every tunable read by a session. Read-only once the engine is built.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    pub difficulty: Difficulty,
    pub shift_duration: f32,
    pub conveyor: ConveyorConfig,
    pub visitors: VisitorConfig,
    pub economy: EconomyConfig,
    pub physics: PhysicsConfig,
    pub cases: CaseConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::for_difficulty(Difficulty::Normal)
    }
}

impl SessionConfig {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            shift_duration: SHIFT_DURATION_SECS,
            conveyor: ConveyorConfig::default(),
            visitors: VisitorConfig::default(),
            economy: EconomyConfig::default(),
            physics: PhysicsConfig::default(),
            cases: CaseConfig::default(),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn visitor_wait_budget(&self) -> f32 {
        self.visitors.wait_time * get_difficulty_multiplier(self.difficulty).0
    }

    pub fn hostile_wait_budget(&self) -> f32 {
        self.visitors.hostile_wait_time * get_difficulty_multiplier(self.difficulty).1
    }

    pub fn hostile_probability(&self) -> f32 {
        (self.visitors.hostile_probability * get_difficulty_multiplier(self.difficulty).2)
            .clamp(0.0, 1.0)
    }

    /// Numeric sanity only; degenerate belt geometry is tolerated by the core.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.shift_duration > 0.0) {
            return Err(invalid("shiftDuration", "must be positive"));
        }
        if !(self.conveyor.speed > 0.0) {
            return Err(invalid("conveyor.speed", "must be positive"));
        }
        if !(self.conveyor.spawn_interval > 0.0) {
            return Err(invalid("conveyor.spawnInterval", "must be positive"));
        }
        if self.conveyor.pause_duration < 0.0 {
            return Err(invalid("conveyor.pauseDuration", "must not be negative"));
        }
        if self.conveyor.batch_size == 0 {
            return Err(invalid("conveyor.batchSize", "must be at least 1"));
        }
        if self.conveyor.trigger_index >= self.conveyor.batch_size {
            return Err(invalid(
                "conveyor.triggerIndex",
                format!("must be below batch size {}", self.conveyor.batch_size),
            ));
        }
        if self.visitors.slots.is_empty() {
            return Err(invalid("visitors.slots", "at least one slot is required"));
        }
        if !(self.visitors.spawn_interval > 0.0) {
            return Err(invalid("visitors.spawnInterval", "must be positive"));
        }
        if !(self.visitors.wait_time > 0.0) || !(self.visitors.hostile_wait_time > 0.0) {
            return Err(invalid("visitors.waitTime", "wait budgets must be positive"));
        }
        if self.visitors.hostile_hp == 0 {
            return Err(invalid("visitors.hostileHp", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.visitors.desk_request_chance) {
            return Err(invalid("visitors.deskRequestChance", "must be within 0..=1"));
        }
        if self.cases.case_id_min > self.cases.case_id_max {
            return Err(invalid("cases.caseIdMin", "must not exceed caseIdMax"));
        }
        if i32::try_from(self.cases.case_id_max).is_err() {
            return Err(invalid("cases.caseIdMax", "must fit in a signed 32-bit integer"));
        }
        if self.physics.friction_rate < 0.0 {
            return Err(invalid("physics.frictionRate", "must not be negative"));
        }
        Ok(())
    }
}

/// Per-session inputs that are not tuning: seed and carried-over state.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub seed: u32,
    pub starting_balance: i64,
    pub day: u32,
    pub shift_duration_override: Option<f32>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            seed: 1,
            starting_balance: 0,
            day: 1,
            shift_duration_override: None,
        }
    }
}
