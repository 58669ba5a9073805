use crate::types::Difficulty;

pub const TICK_RATE: u32 = 60;
pub const TICK_DT: f32 = 1.0 / TICK_RATE as f32;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const SHIFT_DURATION_SECS: f32 = 180.0;

pub const CONVEYOR_SPEED: f32 = 400.0;
pub const CONVEYOR_PAUSE_DURATION: f32 = 8.0;
pub const CONVEYOR_PAUSE_TRIGGER_Y: f32 = 270.0;
pub const ITEM_SPAWN_INTERVAL: f32 = 18.0;
pub const ITEMS_PER_BATCH: usize = 3;
pub const CONVEYOR_PAUSE_AT_INDEX: usize = 2;
pub const ITEM_LATERAL_OFFSETS: [f32; 3] = [30.0, 0.0, -30.0];
/// Path distance between consecutive batch members at spawn.
pub const BATCH_MEMBER_SPACING: f32 = 180.0;

pub const CUSTOMER_INTERVAL: f32 = 7.0;
pub const CUSTOMER_SLOT_RETRY_DELAY: f32 = 2.0;
pub const CUSTOMER_SLOTS: [f32; 3] = [750.0, 1050.0, 1350.0];
pub const CUSTOMER_SPAWN_Y: f32 = -100.0;
pub const CUSTOMER_Y: f32 = 120.0;
pub const CUSTOMER_WALK_SPEED: f32 = 400.0;
pub const CUSTOMER_WAIT_TIME: f32 = 25.0;
pub const DESK_ITEM_REQUEST_CHANCE: f32 = 0.7;

pub const THIEF_SPAWN_PROB: f32 = 0.15;
pub const THIEF_WAIT_TIME: f32 = 15.0;
pub const THIEF_HP: u32 = 10;

pub const REWARD_CORRECT: i64 = 100;
pub const REWARD_CASE_SOLVED: i64 = 150;
pub const PENALTY_WRONG: i64 = -50;
pub const PENALTY_TIMEOUT: i64 = -20;
pub const PENALTY_CLICK: i64 = -10;
pub const THIEF_PENALTY_HIT: i64 = -200;

pub const DESK_AREA: (f32, f32, f32, f32) = (270.0, 350.0, 1200.0, 500.0);
pub const CASE_NOTE_Y: f32 = 350.0;
pub const CASE_NOTE_SIZE: (f32, f32) = (55.0, 70.0);
pub const CASE_ID_RANGE: (i32, i32) = (10, 99);

/// Per-second exponential velocity decay; equals a 0.9 per-frame factor at 60 Hz.
pub const ITEM_FRICTION_RATE: f32 = 6.32;
pub const VELOCITY_EPSILON: f32 = 0.1;
pub const COLLISION_SHRINK: f32 = 0.85;
pub const COLLISION_PUSH: f32 = 90.0;
pub const COLLISION_SPIN_MAX: f32 = 60.0;

pub const TIMELINE_LIMIT: usize = 24;

/// (visitor wait multiplier, hostile wait multiplier, hostile spawn multiplier)
pub fn get_difficulty_multiplier(difficulty: Difficulty) -> (f32, f32, f32) {
    match difficulty {
        Difficulty::Casual => (1.4, 1.3, 0.5),
        Difficulty::Normal => (1.0, 1.0, 1.0),
        Difficulty::Hard => (0.8, 0.8, 1.5),
        Difficulty::Nightmare => (0.6, 0.6, 2.0),
    }
}

/// Default belt route: enters from the left above the belt, runs down the
/// belt column and leaves to the left below the surface.
pub fn default_conveyor_path() -> Vec<(f32, f32)> {
    vec![
        (-160.0, 60.0),
        (140.0, 60.0),
        (140.0, 140.0),
        (140.0, 300.0),
        (140.0, 460.0),
        (140.0, 620.0),
        (140.0, 780.0),
        (140.0, 860.0),
        (-160.0, 860.0),
    ]
}
