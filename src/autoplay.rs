use std::collections::BTreeMap;

use crate::engine::{
    DeliveryOutcome, DeskEngine, PickUpOutcome, PoliceOutcome, RejectOutcome, SprayOutcome,
};
use crate::geometry::Vec2;
use crate::rng::Rng;
use crate::types::{
    CaseStage, ItemKind, ItemView, PlacementKind, Snapshot, VisitorKind, VisitorPhase, VisitorView,
};

const THINK_INTERVAL_SECS: f32 = 0.4;
const REJECT_BELOW_PATIENCE: f32 = 0.35;
const DESK_STOCK_LIMIT: usize = 12;
const DROP_MARGIN: f32 = 160.0;

#[derive(Clone, Debug, PartialEq)]
pub enum ClerkAction {
    Deliver {
        visitor_id: String,
        outcome: DeliveryOutcome,
    },
    Reject {
        slot: usize,
        outcome: RejectOutcome,
    },
    Spray(SprayOutcome),
    CallPolice(PoliceOutcome),
    Stock {
        item_id: String,
    },
}

/// Headless stand-in for a player, driving the engine through the same
/// intents a client would send.
#[derive(Clone, Debug)]
pub struct Clerk {
    rng: Rng,
    think_timer: f32,
    /// Clue read off the note handed to each case visitor.
    case_clues: BTreeMap<String, String>,
}

impl Clerk {
    pub fn new(seed: u32) -> Self {
        Self {
            rng: Rng::new(seed),
            think_timer: 0.0,
            case_clues: BTreeMap::new(),
        }
    }

    /// Called once per tick; acts at most once per think interval.
    pub fn act(&mut self, engine: &mut DeskEngine, dt: f32) -> Option<ClerkAction> {
        self.think_timer += dt;
        if self.think_timer < THINK_INTERVAL_SECS || engine.is_ended() {
            return None;
        }
        self.think_timer = 0.0;

        if engine.held_item_id().is_some() {
            let point = self.drop_point(engine);
            engine.release(point);
        }

        let snapshot = engine.build_snapshot(false);
        self.case_clues
            .retain(|visitor_id, _| snapshot.visitors.iter().any(|v| &v.id == visitor_id));

        let waiting: Vec<&VisitorView> = snapshot
            .visitors
            .iter()
            .filter(|visitor| visitor.phase == VisitorPhase::Waiting)
            .collect();

        if waiting.iter().any(|visitor| visitor.kind == VisitorKind::Hostile) {
            return Some(ClerkAction::Spray(engine.fire_spray()));
        }

        for visitor in &waiting {
            if let Some(action) = self.serve(engine, &snapshot, visitor) {
                return Some(action);
            }
        }

        let has_case_visitor = snapshot
            .visitors
            .iter()
            .any(|visitor| visitor.kind == VisitorKind::Case);
        let has_note = snapshot
            .items
            .iter()
            .any(|item| item.kind == ItemKind::ClueNote && item.placement == PlacementKind::Desk);
        if has_note && !has_case_visitor && snapshot.visitors.len() < engine.slot_count() {
            return Some(ClerkAction::CallPolice(engine.call_police()));
        }

        self.stock_desk(engine, &snapshot)
    }

    fn serve(
        &mut self,
        engine: &mut DeskEngine,
        snapshot: &Snapshot,
        visitor: &VisitorView,
    ) -> Option<ClerkAction> {
        match (visitor.kind, visitor.case_stage) {
            (VisitorKind::Standard, _) => {
                let wants = visitor.wants.as_deref()?;
                let wanted = find_item(snapshot, |item| {
                    item.kind == ItemKind::Standard
                        && item.item_type == wants
                        && item.placement != PlacementKind::Held
                });
                match wanted {
                    Some(item) => self.hand_over(engine, item, visitor),
                    None if visitor.patience < REJECT_BELOW_PATIENCE => {
                        Some(ClerkAction::Reject {
                            slot: visitor.slot,
                            outcome: engine.reject(visitor.slot),
                        })
                    }
                    None => None,
                }
            }
            (VisitorKind::Case, Some(CaseStage::AwaitingFile)) => {
                let note = find_item(snapshot, |item| {
                    item.kind == ItemKind::ClueNote && item.placement == PlacementKind::Desk
                })?;
                let clue = note.clue_text.clone();
                let action = self.hand_over(engine, note, visitor)?;
                if let Some(clue) = clue {
                    self.case_clues.insert(visitor.id.clone(), clue);
                }
                Some(action)
            }
            (VisitorKind::Case, Some(CaseStage::AwaitingEvidence)) => {
                let clue = self.case_clues.get(&visitor.id)?.clone();
                let evidence_id = self.guess_evidence(engine, snapshot, &clue)?;
                let item = snapshot.items.iter().find(|item| item.id == evidence_id)?;
                self.hand_over(engine, item, visitor)
            }
            _ => None,
        }
    }

    /// Best keyword hit on the desk, falling back to a category match.
    fn guess_evidence(&self, engine: &DeskEngine, snapshot: &Snapshot, clue: &str) -> Option<String> {
        if let Some(hit) = engine.search_surface(&[clue.to_string()]).into_iter().next() {
            return Some(hit.item_id);
        }
        let catalog = engine.catalog();
        find_item(snapshot, |item| {
            item.kind == ItemKind::Standard
                && item.placement == PlacementKind::Desk
                && catalog
                    .get(&item.item_type)
                    .is_some_and(|spec| spec.category.as_str() == clue)
        })
        .map(|item| item.id.clone())
    }

    fn hand_over(
        &mut self,
        engine: &mut DeskEngine,
        item: &ItemView,
        visitor: &VisitorView,
    ) -> Option<ClerkAction> {
        let PickUpOutcome::PickedUp { item_id } = engine.pick_up(center_of(item)) else {
            return None;
        };
        if item_id != item.id {
            let point = self.drop_point(engine);
            engine.release(point);
            return None;
        }
        Some(ClerkAction::Deliver {
            visitor_id: visitor.id.clone(),
            outcome: engine.deliver(Vec2::new(visitor.x, visitor.y)),
        })
    }

    fn stock_desk(&mut self, engine: &mut DeskEngine, snapshot: &Snapshot) -> Option<ClerkAction> {
        let on_desk = snapshot
            .items
            .iter()
            .filter(|item| item.placement == PlacementKind::Desk)
            .count();
        if on_desk >= DESK_STOCK_LIMIT {
            return None;
        }
        for item in snapshot
            .items
            .iter()
            .filter(|item| item.placement == PlacementKind::Conveyor)
        {
            let PickUpOutcome::PickedUp { item_id } = engine.pick_up(center_of(item)) else {
                continue;
            };
            let point = self.drop_point(engine);
            engine.release(point);
            return Some(ClerkAction::Stock { item_id });
        }
        None
    }

    fn drop_point(&mut self, engine: &DeskEngine) -> Vec2 {
        let surface = engine.config.physics.surface;
        Vec2::new(
            self.rng
                .range(surface.x + DROP_MARGIN, surface.right() - DROP_MARGIN),
            self.rng
                .range(surface.y + DROP_MARGIN, surface.bottom() - DROP_MARGIN),
        )
    }
}

fn center_of(item: &ItemView) -> Vec2 {
    Vec2::new(item.x + item.width / 2.0, item.y + item.height / 2.0)
}

fn find_item<'a>(snapshot: &'a Snapshot, predicate: impl Fn(&ItemView) -> bool) -> Option<&'a ItemView> {
    snapshot.items.iter().rev().find(|item| predicate(item))
}
