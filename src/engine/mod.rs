use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::catalog::Catalog;
use crate::config::{SessionConfig, SessionOptions};
use crate::constants::TIMELINE_LIMIT;
use crate::conveyor::{BatchPause, TransportState};
use crate::economy::Ledger;
use crate::geometry::Vec2;
use crate::matching::{Delivered, VerdictKind};
use crate::path::ConveyorPath;
use crate::physics::Body;
use crate::rng::Rng;
use crate::types::{
    BatchView, ItemKind, ItemView, LedgerTotal, PlacementKind, RuntimeEvent, ShiftEndReason,
    ShiftSummary, Snapshot, TimelineEvent,
};
use crate::visitor::Visitor;

mod conveyor_system;
mod desk_system;
mod spawn_system;
mod utils;
mod visitor_system;

pub use self::desk_system::SearchHit;

/// Item type tag carried by clue notes.
pub const CASE_NOTE_TYPE: &str = "case_note";

#[derive(Clone, Debug)]
enum Placement {
    Conveyor(TransportState),
    Desk,
    /// `grab` is the pointer offset from the item's top-left corner.
    Held { grab: Vec2 },
}

impl Placement {
    fn kind(&self) -> PlacementKind {
        match self {
            Placement::Conveyor(_) => PlacementKind::Conveyor,
            Placement::Desk => PlacementKind::Desk,
            Placement::Held { .. } => PlacementKind::Held,
        }
    }
}

#[derive(Clone, Debug)]
struct CaseNote {
    target: String,
    clue: String,
    case_id: u32,
}

#[derive(Clone, Debug)]
struct ItemInternal {
    id: String,
    item_type: String,
    name: String,
    kind: ItemKind,
    body: Body,
    placement: Placement,
    batch_id: Option<u64>,
    batch_index: usize,
    note: Option<CaseNote>,
}

impl ItemInternal {
    fn is_on_conveyor(&self) -> bool {
        matches!(self.placement, Placement::Conveyor(_))
    }

    fn is_on_desk(&self) -> bool {
        matches!(self.placement, Placement::Desk)
    }

    fn is_held(&self) -> bool {
        matches!(self.placement, Placement::Held { .. })
    }

    fn delivered(&self) -> Delivered<'_> {
        match &self.note {
            Some(note) => Delivered::Note {
                target: &note.target,
                case_id: note.case_id,
            },
            None => Delivered::Item {
                item_type: &self.item_type,
            },
        }
    }

    fn to_view(&self) -> ItemView {
        ItemView {
            id: self.id.clone(),
            item_type: self.item_type.clone(),
            name: self.name.clone(),
            kind: self.kind,
            x: self.body.position.x,
            y: self.body.position.y,
            width: self.body.size.x,
            height: self.body.size.y,
            angle: self.body.angle,
            placement: self.placement.kind(),
            batch_id: self.batch_id,
            selected: self.is_held(),
            clue_text: self.note.as_ref().map(|note| note.clue.clone()),
            case_id: self.note.as_ref().map(|note| note.case_id),
        }
    }
}

#[derive(Clone, Debug, Default)]
struct ShiftStats {
    served: u32,
    cases_solved: u32,
    timed_out: u32,
    hostiles_repelled: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PickUpOutcome {
    PickedUp { item_id: String },
    AlreadyHolding,
    NothingThere,
    Ended,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DeliveryOutcome {
    Resolved {
        visitor_id: String,
        verdict: VerdictKind,
    },
    /// No visitor at the point; the item went back to the surface.
    Dropped,
    NothingHeld,
    Ended,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RejectOutcome {
    Rejected { visitor_id: String, note_id: String },
    NotRejectable,
    EmptySlot,
    Ended,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SprayOutcome {
    Hit { hits: usize, repelled: Vec<String> },
    Wasted { amount: i64 },
    Ended,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PoliceOutcome {
    Arrived { visitor_id: String, slot: usize },
    AlreadyPresent,
    NoFreeSlot,
    Ended,
}

/// One shift at the lost-and-found desk.
#[derive(Clone, Debug)]
pub struct DeskEngine {
    pub config: SessionConfig,
    catalog: Arc<Catalog>,
    path: ConveyorPath,
    rng: Rng,
    ledger: Ledger,

    items: Vec<ItemInternal>,
    batches: BTreeMap<u64, BatchPause>,
    visitors: Vec<Visitor>,
    slots: Vec<Option<String>>,
    events: Vec<RuntimeEvent>,
    timeline: Vec<TimelineEvent>,
    stats: ShiftStats,

    day: u32,
    shift_duration: f32,
    elapsed: f32,
    tick_counter: u64,
    ended: bool,
    end_reason: Option<ShiftEndReason>,
    batch_timer: f32,
    visitor_timer: f32,
    belt_offset: f32,
    next_batch_id: u64,
    next_id_counter: u64,
}

impl DeskEngine {
    pub fn new(config: SessionConfig, catalog: Arc<Catalog>, options: SessionOptions) -> Self {
        let path = ConveyorPath::new(config.conveyor.path.clone());
        let slots = vec![None; config.visitors.slots.len()];
        let shift_duration = options
            .shift_duration_override
            .filter(|secs| *secs > 0.0)
            .unwrap_or(config.shift_duration);

        let mut engine = Self {
            rng: Rng::new(options.seed),
            ledger: Ledger::new(options.starting_balance),
            config,
            catalog,
            path,
            items: Vec::new(),
            batches: BTreeMap::new(),
            visitors: Vec::new(),
            slots,
            events: Vec::new(),
            timeline: Vec::new(),
            stats: ShiftStats::default(),
            day: options.day,
            shift_duration,
            elapsed: 0.0,
            tick_counter: 0,
            ended: false,
            end_reason: None,
            batch_timer: 0.0,
            visitor_timer: 0.0,
            belt_offset: 0.0,
            next_batch_id: 1,
            next_id_counter: 1,
        };
        engine.push_timeline(format!("Day {} shift started", options.day));
        info!(
            day = options.day,
            seed = options.seed,
            difficulty = ?engine.config.difficulty,
            shift_secs = shift_duration,
            "shift started"
        );
        engine.spawn_batch();
        engine.spawn_visitor();
        engine
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn balance(&self) -> i64 {
        self.ledger.balance()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed
    }

    pub fn time_left_secs(&self) -> f32 {
        (self.shift_duration - self.elapsed).max(0.0)
    }

    pub fn held_item_id(&self) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.is_held())
            .map(|item| item.id.as_str())
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Advances the shift by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        if self.ended || !(dt > 0.0) {
            return;
        }
        self.tick_counter += 1;
        self.elapsed += dt;
        if self.elapsed >= self.shift_duration {
            self.end_shift(ShiftEndReason::Timeout);
            return;
        }

        self.update_spawn_timers(dt);
        let triggered = self.detect_pause_triggers();
        self.update_pause_timers(dt, &triggered);
        self.advance_conveyor(dt);
        self.update_visitors(dt);
        self.update_surface(dt);
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let snapshot = Snapshot {
            tick: self.tick_counter,
            elapsed_secs: self.elapsed,
            time_left_secs: self.time_left_secs(),
            day: self.day,
            balance: self.ledger.balance(),
            belt_offset: self.belt_offset,
            items: self.items.iter().map(ItemInternal::to_view).collect(),
            visitors: self.visitors.iter().map(Visitor::to_view).collect(),
            batches: self
                .batches
                .iter()
                .map(|(id, pause)| BatchView {
                    id: *id,
                    paused: pause.is_paused(),
                    triggered: pause.has_triggered(),
                    pause_elapsed: pause.elapsed(),
                })
                .collect(),
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
            timeline: self
                .timeline
                .iter()
                .rev()
                .take(TIMELINE_LIMIT)
                .cloned()
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect(),
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    pub fn build_summary(&self) -> ShiftSummary {
        let balance = self.ledger.balance();
        let starting_balance = self.ledger.starting_balance();
        ShiftSummary {
            reason: self.end_reason.unwrap_or(ShiftEndReason::Timeout),
            day: self.day,
            duration_secs: self.elapsed.min(self.shift_duration),
            starting_balance,
            balance,
            earned: balance - starting_balance,
            served: self.stats.served,
            cases_solved: self.stats.cases_solved,
            timed_out: self.stats.timed_out,
            hostiles_repelled: self.stats.hostiles_repelled,
            totals: self
                .ledger
                .totals()
                .into_iter()
                .map(|(reason, count, amount)| LedgerTotal {
                    reason,
                    count,
                    amount,
                })
                .collect(),
            timeline: self.timeline.clone(),
        }
    }

    fn end_shift(&mut self, reason: ShiftEndReason) {
        self.ended = true;
        self.end_reason = Some(reason);
        self.push_timeline("Shift over".to_string());
        info!(
            day = self.day,
            balance = self.ledger.balance(),
            served = self.stats.served,
            timed_out = self.stats.timed_out,
            "shift ended"
        );
    }

    fn push_timeline(&mut self, label: String) {
        self.timeline.push(TimelineEvent {
            at_secs: self.elapsed,
            label,
        });
    }

    fn held_index(&self) -> Option<usize> {
        self.items.iter().position(ItemInternal::is_held)
    }

    fn make_id(&mut self, prefix: &str) -> String {
        let id = format!("{}_{}", prefix, self.next_id_counter);
        self.next_id_counter = self.next_id_counter.saturating_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::catalog::Catalog;
    use crate::config::{SessionConfig, SessionOptions};
    use crate::constants::TICK_DT;
    use crate::engine::{
        DeliveryOutcome, DeskEngine, ItemInternal, Placement, PickUpOutcome, PoliceOutcome,
        RejectOutcome, SprayOutcome,
    };
    use crate::geometry::Vec2;
    use crate::matching::VerdictKind;
    use crate::physics::Body;
    use crate::types::{ItemKind, RuntimeEvent, ShiftEndReason, VisitorPhase};
    use crate::visitor::{CaseFlow, VisitorRole};

    fn make_engine(configure: impl FnOnce(&mut SessionConfig)) -> DeskEngine {
        let mut config = SessionConfig::default();
        configure(&mut config);
        DeskEngine::new(
            config,
            Arc::new(Catalog::builtin()),
            SessionOptions {
                seed: 4242,
                ..SessionOptions::default()
            },
        )
    }

    /// Engine with nothing on the belt, the desk or at the counter.
    fn quiet_engine() -> DeskEngine {
        let mut engine = make_engine(|config| {
            config.visitors.hostile_probability = 0.0;
        });
        engine.items.clear();
        engine.batches.clear();
        engine.visitors.clear();
        for slot in engine.slots.iter_mut() {
            *slot = None;
        }
        engine.events.clear();
        engine
    }

    fn seat(engine: &mut DeskEngine, slot: usize, role: VisitorRole) -> String {
        let id = engine.seat_visitor(slot, role, 25.0, "test".to_string());
        let visitor = engine
            .visitors
            .iter_mut()
            .find(|visitor| visitor.id == id)
            .expect("visitor seated");
        visitor.position.y = visitor.target_y;
        visitor.phase = VisitorPhase::Waiting;
        id
    }

    fn place_on_desk(engine: &mut DeskEngine, item_type: &str, at: Vec2) -> String {
        let spec = engine
            .catalog
            .get(item_type)
            .expect("type in catalog")
            .clone();
        let id = engine.make_id("item");
        engine.items.push(ItemInternal {
            id: id.clone(),
            item_type: spec.key,
            name: spec.name,
            kind: ItemKind::Standard,
            body: Body::new(at, Vec2::new(spec.width, spec.height)),
            placement: Placement::Desk,
            batch_id: None,
            batch_index: 0,
            note: None,
        });
        id
    }

    fn item<'a>(engine: &'a DeskEngine, id: &str) -> Option<&'a ItemInternal> {
        engine.items.iter().find(|item| item.id == id)
    }

    fn center_of(engine: &DeskEngine, id: &str) -> Vec2 {
        item(engine, id).expect("item exists").body.center()
    }

    fn visitor_point(engine: &DeskEngine, id: &str) -> Vec2 {
        engine
            .visitors
            .iter()
            .find(|visitor| visitor.id == id)
            .expect("visitor exists")
            .position
    }

    fn hand_over(engine: &mut DeskEngine, item_id: &str, visitor_id: &str) -> DeliveryOutcome {
        let grab_at = center_of(engine, item_id);
        assert!(matches!(
            engine.pick_up(grab_at),
            PickUpOutcome::PickedUp { .. }
        ));
        let point = visitor_point(engine, visitor_id);
        engine.deliver(point)
    }

    fn batch_positions(engine: &DeskEngine, batch_id: u64) -> Vec<Vec2> {
        engine
            .items
            .iter()
            .filter(|item| item.batch_id == Some(batch_id) && item.is_on_conveyor())
            .map(|item| item.body.position)
            .collect()
    }

    #[test]
    fn same_seed_produces_same_progression() {
        let mut a = make_engine(|_| {});
        let mut b = make_engine(|_| {});
        for _ in 0..1_200 {
            a.step(TICK_DT);
            b.step(TICK_DT);
            let sa = a.build_snapshot(true);
            let sb = b.build_snapshot(true);
            assert_eq!(sa.balance, sb.balance);
            assert_eq!(sa.items.len(), sb.items.len());
            assert_eq!(sa.visitors.len(), sb.visitors.len());
            assert_eq!(sa.events, sb.events);
            for (ia, ib) in sa.items.iter().zip(sb.items.iter()) {
                assert_eq!(ia.id, ib.id);
                assert_eq!(ia.item_type, ib.item_type);
                assert_eq!(ia.x.to_bits(), ib.x.to_bits());
                assert_eq!(ia.y.to_bits(), ib.y.to_bits());
            }
            for (va, vb) in sa.visitors.iter().zip(sb.visitors.iter()) {
                assert_eq!(va.id, vb.id);
                assert_eq!(va.wants, vb.wants);
                assert_eq!(va.slot, vb.slot);
            }
        }
    }

    #[test]
    fn session_starts_with_a_batch_and_a_visitor() {
        let mut engine = make_engine(|_| {});
        let snapshot = engine.build_snapshot(true);
        assert_eq!(snapshot.items.len(), 3);
        assert_eq!(snapshot.batches.len(), 1);
        assert_eq!(snapshot.visitors.len(), 1);
        assert!(snapshot
            .events
            .contains(&RuntimeEvent::BatchSpawned { batch_id: 1 }));
    }

    #[test]
    fn build_snapshot_drains_events_when_requested() {
        let mut engine = quiet_engine();
        engine.fire_spray();
        let peek = engine.build_snapshot(false);
        let first = engine.build_snapshot(true);
        let second = engine.build_snapshot(true);
        assert!(peek.events.is_empty());
        assert_eq!(first.events.len(), 1);
        assert!(second.events.is_empty());
    }

    #[test]
    fn batch_freezes_together_for_exactly_the_pause_duration() {
        let mut engine = make_engine(|config| {
            config.conveyor.pause_duration = 1.0;
            config.visitors.hostile_probability = 0.0;
        });
        let dt = 0.25;

        let mut guard = 0;
        loop {
            let before = batch_positions(&engine, 1);
            engine.step(dt);
            if engine.batches.get(&1).is_some_and(|pause| pause.has_triggered()) {
                assert_eq!(batch_positions(&engine, 1), before);
                break;
            }
            guard += 1;
            assert!(guard < 100, "trigger member never reached the line");
        }

        let frozen = batch_positions(&engine, 1);
        assert_eq!(frozen.len(), 3);
        let mut frozen_secs = dt;
        loop {
            engine.step(dt);
            let now = batch_positions(&engine, 1);
            if now != frozen {
                assert!(now.iter().zip(frozen.iter()).all(|(a, b)| a != b));
                break;
            }
            frozen_secs += dt;
            assert!(frozen_secs < 10.0, "batch never resumed");
        }
        assert_eq!(frozen_secs, 1.0);

        for _ in 0..8 {
            engine.step(dt);
            if let Some(pause) = engine.batches.get(&1) {
                assert!(pause.has_triggered());
                assert!(!pause.is_paused());
            }
        }
        let events = engine.build_snapshot(true).events;
        let paused = events
            .iter()
            .filter(|event| **event == RuntimeEvent::BatchPaused { batch_id: 1 })
            .count();
        let resumed = events
            .iter()
            .filter(|event| **event == RuntimeEvent::BatchResumed { batch_id: 1 })
            .count();
        assert_eq!((paused, resumed), (1, 1));
    }

    #[test]
    fn belt_items_eventually_leave_and_are_removed() {
        let mut engine = make_engine(|config| {
            config.conveyor.pause_duration = 0.5;
        });
        let first_batch: Vec<String> = engine.items.iter().map(|item| item.id.clone()).collect();
        for _ in 0..(10 * 60) {
            engine.step(TICK_DT);
        }
        for id in &first_batch {
            assert!(item(&engine, id).is_none());
        }
        assert!(!engine.batches.contains_key(&1));
        let events = engine.build_snapshot(true).events;
        let left = events
            .iter()
            .filter(|event| matches!(event, RuntimeEvent::ItemLeftBelt { .. }))
            .count();
        assert_eq!(left, 3);
    }

    #[test]
    fn belt_item_can_be_picked_up_and_dropped_on_desk() {
        let mut engine = make_engine(|_| {});
        let mut target = None;
        for _ in 0..120 {
            engine.step(TICK_DT);
            target = engine
                .items
                .iter()
                .find(|item| match &item.placement {
                    Placement::Conveyor(transport) => {
                        transport.has_entered(engine.config.conveyor.speed)
                    }
                    _ => false,
                })
                .map(|item| item.id.clone());
            if target.is_some() {
                break;
            }
        }
        let target = target.expect("an item entered the belt");
        let grab_at = center_of(&engine, &target);
        assert_eq!(
            engine.pick_up(grab_at),
            PickUpOutcome::PickedUp {
                item_id: target.clone()
            }
        );
        assert_eq!(engine.held_item_id(), Some(target.as_str()));

        let drop_at = Vec2::new(900.0, 700.0);
        assert_eq!(engine.release(drop_at), DeliveryOutcome::Dropped);
        let dropped = item(&engine, &target).expect("still exists");
        assert!(dropped.is_on_desk());
        assert_eq!(engine.items.last().map(|item| item.id.as_str()), Some(target.as_str()));
        assert!(engine
            .config
            .physics
            .surface
            .contains(dropped.body.position));
    }

    #[test]
    fn pick_up_and_drag_keep_the_grab_offset() {
        let mut engine = quiet_engine();
        let book = place_on_desk(&mut engine, "book", Vec2::new(500.0, 500.0));
        assert_eq!(
            engine.pick_up(Vec2::new(100.0, 100.0)),
            PickUpOutcome::NothingThere
        );
        assert!(matches!(
            engine.pick_up(Vec2::new(510.0, 520.0)),
            PickUpOutcome::PickedUp { .. }
        ));
        assert_eq!(
            engine.pick_up(Vec2::new(510.0, 520.0)),
            PickUpOutcome::AlreadyHolding
        );
        assert!(engine.drag_held(Vec2::new(610.0, 620.0)));
        let held = item(&engine, &book).expect("book");
        assert_eq!(held.body.position, Vec2::new(600.0, 600.0));
        assert!(engine.rotate_held(45.0));
        assert_eq!(item(&engine, &book).expect("book").body.angle, 45.0);

        let velocity_before = item(&engine, &book).expect("book").body.velocity;
        engine.step(TICK_DT);
        assert_eq!(velocity_before, Vec2::ZERO);
        assert!(item(&engine, &book).expect("book").is_held());
    }

    #[test]
    fn case_visitor_without_file_refuses_plain_items() {
        let mut engine = quiet_engine();
        let police = seat(&mut engine, 0, VisitorRole::Case(CaseFlow::AwaitingFile));
        let passport = place_on_desk(&mut engine, "passport", Vec2::new(600.0, 500.0));
        let start = engine.balance();

        let outcome = hand_over(&mut engine, &passport, &police);
        assert_eq!(
            outcome,
            DeliveryOutcome::Resolved {
                visitor_id: police.clone(),
                verdict: VerdictKind::NeedCaseNote
            }
        );
        assert_eq!(engine.balance(), start);
        let visitor = engine
            .visitors
            .iter()
            .find(|visitor| visitor.id == police)
            .expect("police stays");
        assert!(visitor.is_waiting());
        assert_eq!(visitor.role, VisitorRole::Case(CaseFlow::AwaitingFile));
        assert!(item(&engine, &passport).expect("returned").is_on_desk());
        assert!(engine
            .build_snapshot(true)
            .events
            .contains(&RuntimeEvent::NeedCaseNote { visitor_id: police }));
    }

    #[test]
    fn correct_evidence_solves_case_and_frees_slot() {
        let mut engine = quiet_engine();
        let police = seat(
            &mut engine,
            0,
            VisitorRole::Case(CaseFlow::AwaitingEvidence {
                target: "passport".to_string(),
                case_id: 12,
            }),
        );
        let passport = place_on_desk(&mut engine, "passport", Vec2::new(600.0, 500.0));
        let start = engine.balance();

        let outcome = hand_over(&mut engine, &passport, &police);
        assert_eq!(
            outcome,
            DeliveryOutcome::Resolved {
                visitor_id: police,
                verdict: VerdictKind::CaseSolved
            }
        );
        assert_eq!(engine.balance(), start + 150);
        assert!(engine.visitors.is_empty());
        assert!(engine.slots[0].is_none());
        assert!(item(&engine, &passport).is_none());
        assert_eq!(engine.build_summary().cases_solved, 1);
    }

    #[test]
    fn rejected_visitor_becomes_a_solvable_case() {
        let mut engine = quiet_engine();
        seat(
            &mut engine,
            1,
            VisitorRole::Standard {
                wants: "camera".to_string(),
            },
        );
        assert_eq!(engine.reject(2), RejectOutcome::EmptySlot);
        let RejectOutcome::Rejected { note_id, .. } = engine.reject(1) else {
            panic!("standard visitor should be rejectable");
        };
        assert!(engine.slots[1].is_none());
        let note = item(&engine, &note_id).expect("note on desk");
        assert_eq!(note.kind, ItemKind::ClueNote);
        assert!(note.body.is_static);
        assert!(note.is_on_desk());

        let PoliceOutcome::Arrived { visitor_id: police, slot } = engine.call_police() else {
            panic!("a slot is free");
        };
        assert_eq!(slot, 0);
        assert_eq!(engine.call_police(), PoliceOutcome::AlreadyPresent);
        assert_eq!(engine.reject(0), RejectOutcome::NotRejectable);

        for _ in 0..120 {
            engine.step(TICK_DT);
            if engine.visitors.iter().any(|v| v.id == police && v.is_waiting()) {
                break;
            }
        }

        let start = engine.balance();
        let filed = hand_over(&mut engine, &note_id, &police);
        let DeliveryOutcome::Resolved {
            verdict: VerdictKind::FileAccepted { target, .. },
            ..
        } = &filed
        else {
            panic!("note should open the case, got {filed:?}");
        };
        assert_eq!(target.as_str(), "camera");
        assert!(item(&engine, &note_id).is_none());

        let camera = place_on_desk(&mut engine, "camera", Vec2::new(800.0, 600.0));
        let solved = hand_over(&mut engine, &camera, &police);
        assert!(matches!(
            solved,
            DeliveryOutcome::Resolved {
                verdict: VerdictKind::CaseSolved,
                ..
            }
        ));
        assert_eq!(engine.balance(), start + 150);
    }

    #[test]
    fn wrong_item_costs_money_and_comes_back() {
        let mut engine = quiet_engine();
        let visitor = seat(
            &mut engine,
            0,
            VisitorRole::Standard {
                wants: "hat".to_string(),
            },
        );
        let book = place_on_desk(&mut engine, "book", Vec2::new(600.0, 500.0));
        let outcome = hand_over(&mut engine, &book, &visitor);
        assert_eq!(
            outcome,
            DeliveryOutcome::Resolved {
                visitor_id: visitor,
                verdict: VerdictKind::Wrong
            }
        );
        assert_eq!(engine.balance(), -50);
        assert_eq!(engine.visitors.len(), 1);
        assert!(item(&engine, &book).expect("returned").is_on_desk());
    }

    #[test]
    fn handing_an_item_to_a_hostile_is_theft() {
        let mut engine = quiet_engine();
        let thief = seat(&mut engine, 2, VisitorRole::Hostile { hp: 10 });
        let phone = place_on_desk(&mut engine, "phone", Vec2::new(600.0, 500.0));
        let outcome = hand_over(&mut engine, &phone, &thief);
        assert_eq!(
            outcome,
            DeliveryOutcome::Resolved {
                visitor_id: thief,
                verdict: VerdictKind::Stolen
            }
        );
        assert_eq!(engine.balance(), -200);
        assert!(item(&engine, &phone).is_none());
        assert!(engine.visitors.is_empty());
    }

    #[test]
    fn spray_repels_hostile_after_its_last_hit_point() {
        let mut engine = quiet_engine();
        assert_eq!(engine.fire_spray(), SprayOutcome::Wasted { amount: -10 });
        assert_eq!(engine.balance(), -10);

        let thief = seat(&mut engine, 2, VisitorRole::Hostile { hp: 3 });
        for _ in 0..2 {
            assert_eq!(
                engine.fire_spray(),
                SprayOutcome::Hit {
                    hits: 1,
                    repelled: Vec::new()
                }
            );
            assert_eq!(engine.visitors.len(), 1);
        }
        assert_eq!(
            engine.fire_spray(),
            SprayOutcome::Hit {
                hits: 1,
                repelled: vec![thief]
            }
        );
        assert!(engine.visitors.is_empty());
        assert!(engine.slots[2].is_none());
        assert_eq!(engine.balance(), -10);
        assert_eq!(engine.build_summary().hostiles_repelled, 1);
    }

    #[test]
    fn overlapping_items_separate_after_one_tick() {
        let mut engine = quiet_engine();
        let a = place_on_desk(&mut engine, "book", Vec2::new(600.0, 500.0));
        let b = place_on_desk(&mut engine, "book", Vec2::new(620.0, 510.0));
        let before = center_of(&engine, &a).distance(center_of(&engine, &b));
        engine.step(TICK_DT);
        let after = center_of(&engine, &a).distance(center_of(&engine, &b));
        assert!(after > before);
    }

    #[test]
    fn clue_note_holds_still_while_the_item_is_pushed_off() {
        let mut engine = quiet_engine();
        let note = engine.spawn_case_note("book", 700.0);
        let note_start = item(&engine, &note).expect("note exists").body.position;
        let book = place_on_desk(&mut engine, "book", note_start + Vec2::new(10.0, 10.0));
        let before = center_of(&engine, &note).distance(center_of(&engine, &book));

        engine.step(TICK_DT);

        let note_body = &item(&engine, &note).expect("note exists").body;
        assert_eq!(note_body.position, note_start);
        assert_eq!(note_body.velocity, Vec2::ZERO);
        let book_body = &item(&engine, &book).expect("book exists").body;
        assert!(book_body.velocity.length() > 0.0);
        let after = center_of(&engine, &note).distance(center_of(&engine, &book));
        assert!(after > before);
    }

    #[test]
    fn widest_case_id_range_still_files_a_case() {
        let config = SessionConfig::from_json_str(r#"{"cases":{"caseIdMin":0,"caseIdMax":2147483647}}"#)
            .expect("widest valid range");
        let mut engine = DeskEngine::new(
            config,
            Arc::new(Catalog::builtin()),
            SessionOptions {
                seed: 4242,
                ..SessionOptions::default()
            },
        );
        engine.visitors.clear();
        for slot in engine.slots.iter_mut() {
            *slot = None;
        }
        seat(
            &mut engine,
            0,
            VisitorRole::Standard {
                wants: "hat".to_string(),
            },
        );
        let RejectOutcome::Rejected { note_id, .. } = engine.reject(0) else {
            panic!("standard visitor should be rejectable");
        };
        let note = item(&engine, &note_id).expect("note on desk");
        assert!(note.note.is_some());
    }

    #[test]
    fn timed_out_visitor_costs_money_and_frees_slot() {
        let mut engine = quiet_engine();
        let visitor = seat(
            &mut engine,
            1,
            VisitorRole::Standard {
                wants: "book".to_string(),
            },
        );
        if let Some(v) = engine.visitors.iter_mut().find(|v| v.id == visitor) {
            v.max_wait_time = 0.5;
        }
        engine.step(0.25);
        assert_eq!(engine.visitors.len(), 1);
        engine.step(0.25);
        assert!(engine.visitors.is_empty());
        assert!(engine.slots[1].is_none());
        assert_eq!(engine.balance(), -20);
        assert!(engine
            .build_snapshot(true)
            .events
            .contains(&RuntimeEvent::VisitorTimedOut {
                visitor_id: visitor,
                slot: 1
            }));
    }

    #[test]
    fn full_counter_winds_the_visitor_timer_back() {
        let mut engine = quiet_engine();
        for slot in 0..engine.slot_count() {
            seat(
                &mut engine,
                slot,
                VisitorRole::Standard {
                    wants: "book".to_string(),
                },
            );
        }
        engine.visitor_timer = engine.config.visitors.spawn_interval - 0.1;
        engine.step(0.25);
        assert_eq!(engine.visitors.len(), 3);
        let expected = engine.config.visitors.spawn_interval + 0.15
            - engine.config.visitors.slot_retry_delay;
        assert!((engine.visitor_timer - expected).abs() < 1e-4);
        assert_eq!(engine.call_police(), PoliceOutcome::NoFreeSlot);
    }

    #[test]
    fn new_visitor_asks_for_something_on_the_desk() {
        let mut engine = quiet_engine();
        engine.config.visitors.desk_request_chance = 1.0;
        place_on_desk(&mut engine, "passport", Vec2::new(600.0, 500.0));
        let id = engine.spawn_visitor().expect("slot free");
        let visitor = engine
            .visitors
            .iter()
            .find(|visitor| visitor.id == id)
            .expect("spawned");
        assert_eq!(
            visitor.role,
            VisitorRole::Standard {
                wants: "passport".to_string()
            }
        );
        assert_eq!(visitor.phase, VisitorPhase::Approaching);
    }

    #[test]
    fn search_ranks_desk_items_by_keyword_overlap() {
        let mut engine = quiet_engine();
        let passport = place_on_desk(&mut engine, "passport", Vec2::new(300.0, 400.0));
        let book = place_on_desk(&mut engine, "book", Vec2::new(700.0, 400.0));
        place_on_desk(&mut engine, "camera", Vec2::new(1000.0, 400.0));

        let hits = engine.search_surface(&["travel".to_string(), "blue".to_string()]);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| (hit.score - 0.5).abs() < 1e-6));

        let hits = engine.search_surface(&["travel".to_string(), "visa".to_string()]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item_id, passport);
        assert_eq!(hits[0].score, 1.0);

        let hits = engine.search_surface(&["read".to_string()]);
        assert_eq!(hits[0].item_id, book);
        assert!(engine.search_surface(&["nothing".to_string()]).is_empty());
    }

    #[test]
    fn shift_ends_after_its_duration() {
        let mut engine = DeskEngine::new(
            SessionConfig::default(),
            Arc::new(Catalog::builtin()),
            SessionOptions {
                seed: 9,
                starting_balance: 250,
                day: 3,
                shift_duration_override: Some(1.0),
            },
        );
        for _ in 0..4 {
            engine.step(0.25);
        }
        assert!(engine.is_ended());
        let tick = engine.build_snapshot(false).tick;
        engine.step(0.25);
        assert_eq!(engine.build_snapshot(false).tick, tick);
        assert_eq!(engine.fire_spray(), SprayOutcome::Ended);

        let summary = engine.build_summary();
        assert_eq!(summary.reason, ShiftEndReason::Timeout);
        assert_eq!(summary.day, 3);
        assert_eq!(summary.starting_balance, 250);
        assert_eq!(summary.balance, 250);
        assert_eq!(summary.earned, 0);
        assert_eq!(
            summary.timeline.last().map(|event| event.label.as_str()),
            Some("Shift over")
        );
    }
}
