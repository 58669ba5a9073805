use serde::{Deserialize, Serialize};

use crate::economy::LedgerReason;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Casual,
    Normal,
    Hard,
    Nightmare,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "casual" => Some(Self::Casual),
            "normal" => Some(Self::Normal),
            "hard" => Some(Self::Hard),
            "nightmare" => Some(Self::Nightmare),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Standard,
    ClueNote,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementKind {
    Conveyor,
    Desk,
    Held,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitorKind {
    Standard,
    Case,
    Hostile,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitorPhase {
    Approaching,
    Waiting,
    Resolved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStage {
    AwaitingFile,
    AwaitingEvidence,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftEndReason {
    Timeout,
}

#[derive(Clone, Debug, Serialize)]
pub struct ItemView {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub name: String,
    pub kind: ItemKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
    pub placement: PlacementKind,
    #[serde(rename = "batchId")]
    pub batch_id: Option<u64>,
    pub selected: bool,
    #[serde(rename = "clueText", skip_serializing_if = "Option::is_none")]
    pub clue_text: Option<String>,
    #[serde(rename = "caseId", skip_serializing_if = "Option::is_none")]
    pub case_id: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct VisitorView {
    pub id: String,
    pub slot: usize,
    pub kind: VisitorKind,
    pub x: f32,
    pub y: f32,
    pub phase: VisitorPhase,
    pub patience: f32,
    #[serde(rename = "waitTime")]
    pub wait_time: f32,
    #[serde(rename = "maxWaitTime")]
    pub max_wait_time: f32,
    pub wants: Option<String>,
    pub line: String,
    #[serde(rename = "caseStage", skip_serializing_if = "Option::is_none")]
    pub case_stage: Option<CaseStage>,
    #[serde(rename = "caseId", skip_serializing_if = "Option::is_none")]
    pub case_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hp: Option<u32>,
    #[serde(rename = "canReject")]
    pub can_reject: bool,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct BatchView {
    pub id: u64,
    pub paused: bool,
    pub triggered: bool,
    #[serde(rename = "pauseElapsed")]
    pub pause_elapsed: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct TimelineEvent {
    #[serde(rename = "atSecs")]
    pub at_secs: f32,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    BatchSpawned {
        #[serde(rename = "batchId")]
        batch_id: u64,
    },
    BatchPaused {
        #[serde(rename = "batchId")]
        batch_id: u64,
    },
    BatchResumed {
        #[serde(rename = "batchId")]
        batch_id: u64,
    },
    ItemLeftBelt {
        #[serde(rename = "itemId")]
        item_id: String,
    },
    VisitorArrived {
        #[serde(rename = "visitorId")]
        visitor_id: String,
        slot: usize,
    },
    VisitorTimedOut {
        #[serde(rename = "visitorId")]
        visitor_id: String,
        slot: usize,
    },
    DeliveryAccepted {
        #[serde(rename = "visitorId")]
        visitor_id: String,
        amount: i64,
    },
    DeliveryWrong {
        #[serde(rename = "visitorId")]
        visitor_id: String,
        amount: i64,
    },
    CaseFiled {
        #[serde(rename = "visitorId")]
        visitor_id: String,
        #[serde(rename = "noteId")]
        note_id: String,
    },
    FileAccepted {
        #[serde(rename = "visitorId")]
        visitor_id: String,
        #[serde(rename = "caseId")]
        case_id: u32,
    },
    NeedCaseNote {
        #[serde(rename = "visitorId")]
        visitor_id: String,
    },
    AlreadyHasFile {
        #[serde(rename = "visitorId")]
        visitor_id: String,
    },
    CaseSolved {
        #[serde(rename = "visitorId")]
        visitor_id: String,
        amount: i64,
    },
    CaseFailed {
        #[serde(rename = "visitorId")]
        visitor_id: String,
        amount: i64,
    },
    ItemStolen {
        #[serde(rename = "visitorId")]
        visitor_id: String,
        amount: i64,
    },
    HostileHit {
        #[serde(rename = "visitorId")]
        visitor_id: String,
        hp: u32,
    },
    HostileRepelled {
        #[serde(rename = "visitorId")]
        visitor_id: String,
    },
    SprayWasted {
        amount: i64,
    },
    PoliceArrived {
        #[serde(rename = "visitorId")]
        visitor_id: String,
        slot: usize,
    },
    PoliceAlreadyHere,
    NoFreeSlot,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedSecs")]
    pub elapsed_secs: f32,
    #[serde(rename = "timeLeftSecs")]
    pub time_left_secs: f32,
    pub day: u32,
    pub balance: i64,
    #[serde(rename = "beltOffset")]
    pub belt_offset: f32,
    pub items: Vec<ItemView>,
    pub visitors: Vec<VisitorView>,
    pub batches: Vec<BatchView>,
    pub events: Vec<RuntimeEvent>,
    pub timeline: Vec<TimelineEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LedgerTotal {
    pub reason: LedgerReason,
    pub count: u32,
    pub amount: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ShiftSummary {
    pub reason: ShiftEndReason,
    pub day: u32,
    #[serde(rename = "durationSecs")]
    pub duration_secs: f32,
    #[serde(rename = "startingBalance")]
    pub starting_balance: i64,
    pub balance: i64,
    pub earned: i64,
    pub served: u32,
    #[serde(rename = "casesSolved")]
    pub cases_solved: u32,
    #[serde(rename = "timedOut")]
    pub timed_out: u32,
    #[serde(rename = "hostilesRepelled")]
    pub hostiles_repelled: u32,
    pub totals: Vec<LedgerTotal>,
    pub timeline: Vec<TimelineEvent>,
}
