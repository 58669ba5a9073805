use std::cmp::Ordering;

use serde::Serialize;
use tracing::{debug, info};

use super::utils::{topmost_at, wrap_degrees};
use super::*;
use crate::matching::resolve_delivery;
use crate::physics::SurfacePhysics;
use crate::visitor::VisitorRole;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(rename = "itemId")]
    pub item_id: String,
    pub score: f32,
}

impl DeskEngine {
    /// Belt first, then the desk; topmost item wins in both.
    pub fn pick_up(&mut self, point: Vec2) -> PickUpOutcome {
        if self.ended {
            return PickUpOutcome::Ended;
        }
        if self.held_index().is_some() {
            return PickUpOutcome::AlreadyHolding;
        }
        let speed = self.config.conveyor.speed;
        let on_belt = |item: &ItemInternal| match &item.placement {
            Placement::Conveyor(transport) => transport.has_entered(speed),
            _ => false,
        };
        let Some(idx) = topmost_at(&self.items, point, on_belt)
            .or_else(|| topmost_at(&self.items, point, ItemInternal::is_on_desk))
        else {
            return PickUpOutcome::NothingThere;
        };

        let item = &mut self.items[idx];
        let grab = point - item.body.position;
        item.body.stop();
        item.placement = Placement::Held { grab };
        debug!(item_id = %item.id, item_type = %item.item_type, "item picked up");
        PickUpOutcome::PickedUp {
            item_id: item.id.clone(),
        }
    }

    pub fn drag_held(&mut self, point: Vec2) -> bool {
        let Some(idx) = self.held_index() else {
            return false;
        };
        let item = &mut self.items[idx];
        if let Placement::Held { grab } = item.placement {
            item.body.position = point - grab;
        }
        true
    }

    pub fn rotate_held(&mut self, delta_degrees: f32) -> bool {
        let Some(idx) = self.held_index() else {
            return false;
        };
        let body = &mut self.items[idx].body;
        body.angle = wrap_degrees(body.angle + delta_degrees);
        true
    }

    /// Lets go of the held item: a waiting visitor under the pointer gets it,
    /// otherwise it lands on the desk.
    pub fn release(&mut self, point: Vec2) -> DeliveryOutcome {
        if self.ended {
            return DeliveryOutcome::Ended;
        }
        if self.held_index().is_none() {
            return DeliveryOutcome::NothingHeld;
        }
        if self.visitor_at(point).is_some() {
            return self.deliver(point);
        }
        self.drop_held(point);
        DeliveryOutcome::Dropped
    }

    pub fn deliver(&mut self, point: Vec2) -> DeliveryOutcome {
        if self.ended {
            return DeliveryOutcome::Ended;
        }
        let Some(item_idx) = self.held_index() else {
            return DeliveryOutcome::NothingHeld;
        };
        let Some(visitor_idx) = self.visitor_at(point) else {
            self.drop_held(point);
            return DeliveryOutcome::Dropped;
        };

        let verdict = resolve_delivery(
            &self.visitors[visitor_idx].role,
            self.items[item_idx].delivered(),
            &self.config.economy,
        );
        let visitor_id = self.visitors[visitor_idx].id.clone();
        let item_id = self.items[item_idx].id.clone();
        self.apply_verdict(&visitor_id, &item_id, verdict, point)
    }

    /// Sends a standard visitor away and files a clue note for their item.
    pub fn reject(&mut self, slot: usize) -> RejectOutcome {
        if self.ended {
            return RejectOutcome::Ended;
        }
        let Some(visitor) = self.visitors.iter().find(|visitor| visitor.slot == slot) else {
            return RejectOutcome::EmptySlot;
        };
        if !visitor.is_waiting() {
            return RejectOutcome::NotRejectable;
        }
        let VisitorRole::Standard { wants } = &visitor.role else {
            return RejectOutcome::NotRejectable;
        };
        let wants = wants.clone();
        let visitor_id = visitor.id.clone();
        let x = visitor.position.x;

        let note_id = self.spawn_case_note(&wants, x);
        self.remove_visitor(&visitor_id);
        self.events.push(RuntimeEvent::CaseFiled {
            visitor_id: visitor_id.clone(),
            note_id: note_id.clone(),
        });
        self.push_timeline("Case filed".to_string());
        info!(visitor_id = %visitor_id, note_id = %note_id, "visitor rejected, case filed");
        RejectOutcome::Rejected {
            visitor_id,
            note_id,
        }
    }

    /// Desk items ranked by the share of `keywords` they carry.
    pub fn search_surface(&self, keywords: &[String]) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .items
            .iter()
            .filter(|item| item.is_on_desk() && item.kind == ItemKind::Standard)
            .filter_map(|item| {
                let score = self.catalog.get(&item.item_type)?.keyword_score(keywords);
                (score > 0.0).then(|| SearchHit {
                    item_id: item.id.clone(),
                    score,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits
    }

    pub(super) fn drop_held(&mut self, point: Vec2) {
        let Some(idx) = self.held_index() else {
            return;
        };
        let mut item = self.items.remove(idx);
        if let Placement::Held { grab } = item.placement {
            item.body.position = point - grab;
        }
        item.body.stop();
        item.placement = Placement::Desk;
        SurfacePhysics::new(&self.config.physics).contain(&mut item.body);
        // Last in the list is drawn on top.
        self.items.push(item);
    }

    pub(super) fn update_surface(&mut self, dt: f32) {
        let physics = SurfacePhysics::new(&self.config.physics);
        let mut bodies: Vec<&mut Body> = Vec::new();
        for item in self.items.iter_mut() {
            if item.is_on_desk() {
                bodies.push(&mut item.body);
            } else {
                item.body.stop();
            }
        }
        physics.step(&mut bodies, dt, &mut self.rng);
    }
}
