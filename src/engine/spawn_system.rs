use tracing::{debug, info};

use super::*;
use crate::physics::SurfacePhysics;
use crate::visitor::{request_line, CaseFlow, VisitorRole, CASE_OPENING_LINE, HOSTILE_LINE};

impl DeskEngine {
    pub(super) fn update_spawn_timers(&mut self, dt: f32) {
        self.batch_timer += dt;
        if self.batch_timer >= self.config.conveyor.spawn_interval {
            self.batch_timer = 0.0;
            self.spawn_batch();
        }

        self.visitor_timer += dt;
        if self.visitor_timer >= self.config.visitors.spawn_interval {
            if self.free_slots().is_empty() {
                self.visitor_timer -= self.config.visitors.slot_retry_delay;
            } else {
                self.visitor_timer = 0.0;
                self.spawn_visitor();
            }
        }
    }

    pub(super) fn spawn_batch(&mut self) -> Option<u64> {
        if self.catalog.is_empty() {
            debug!("catalog is empty, skipping batch");
            return None;
        }
        let catalog = Arc::clone(&self.catalog);
        let entry = self.path.waypoints().first().copied().unwrap_or(Vec2::ZERO);
        let batch_size = self.config.conveyor.batch_size;
        let spacing = self.config.conveyor.member_spacing;

        let batch_id = self.next_batch_id;
        self.next_batch_id += 1;
        self.batches.insert(batch_id, BatchPause::default());

        for index in 0..batch_size {
            let Some(spec) = catalog
                .random_key(&mut self.rng)
                .and_then(|key| catalog.get(&key))
            else {
                continue;
            };
            let size = Vec2::new(spec.width, spec.height);
            let transport = TransportState::new(
                index as f32 * spacing,
                self.config.conveyor.lateral_offset(index),
            );
            let id = self.make_id("item");
            self.items.push(ItemInternal {
                id,
                item_type: spec.key.clone(),
                name: spec.name.clone(),
                kind: ItemKind::Standard,
                body: Body::new(
                    Vec2::new(entry.x - size.x / 2.0, entry.y - size.y / 2.0),
                    size,
                ),
                placement: Placement::Conveyor(transport),
                batch_id: Some(batch_id),
                batch_index: index,
                note: None,
            });
        }

        self.events.push(RuntimeEvent::BatchSpawned { batch_id });
        debug!(batch_id, batch_size, "batch spawned");
        Some(batch_id)
    }

    pub(super) fn free_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, occupant)| occupant.is_none())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// A type lying on the desk most of the time, so requests stay solvable.
    pub(super) fn pick_demand(&mut self) -> Option<String> {
        let on_desk: Vec<String> = self
            .items
            .iter()
            .filter(|item| item.is_on_desk() && item.kind == ItemKind::Standard)
            .map(|item| item.item_type.clone())
            .collect();
        if !on_desk.is_empty() && self.rng.bool(self.config.visitors.desk_request_chance) {
            return self.rng.pick(&on_desk).cloned();
        }
        self.catalog.random_key(&mut self.rng)
    }

    pub(super) fn spawn_visitor(&mut self) -> Option<String> {
        let free = self.free_slots();
        let slot = *self.rng.pick(&free)?;

        if self.rng.bool(self.config.hostile_probability()) {
            let hp = self.config.visitors.hostile_hp;
            let budget = self.config.hostile_wait_budget();
            let id = self.seat_visitor(slot, VisitorRole::Hostile { hp }, budget, HOSTILE_LINE.to_string());
            self.push_timeline("A suspicious visitor showed up".to_string());
            info!(visitor_id = %id, slot, hp, "hostile visitor spawned");
            return Some(id);
        }

        let wants = self.pick_demand()?;
        let name = self
            .catalog
            .get(&wants)
            .map(|spec| spec.name.clone())
            .unwrap_or_else(|| wants.clone());
        let variant = self.rng.pick_index(4);
        let budget = self.config.visitor_wait_budget();
        let id = self.seat_visitor(
            slot,
            VisitorRole::Standard { wants: wants.clone() },
            budget,
            request_line(&name, variant),
        );
        debug!(visitor_id = %id, slot, %wants, "visitor spawned");
        Some(id)
    }

    pub(super) fn seat_visitor(
        &mut self,
        slot: usize,
        role: VisitorRole,
        max_wait_time: f32,
        line: String,
    ) -> String {
        let id = self.make_id("visitor");
        let visitors = &self.config.visitors;
        let x = visitors.slots.get(slot).copied().unwrap_or_default();
        let visitor = Visitor::new(
            id.clone(),
            slot,
            Vec2::new(x, visitors.spawn_y),
            visitors.line_y,
            visitors.walk_speed,
            max_wait_time,
            role,
            line,
        );
        if let Some(occupant) = self.slots.get_mut(slot) {
            *occupant = Some(id.clone());
        }
        self.visitors.push(visitor);
        id
    }

    /// Seats a case visitor in the first free slot.
    pub fn call_police(&mut self) -> PoliceOutcome {
        if self.ended {
            return PoliceOutcome::Ended;
        }
        if self
            .visitors
            .iter()
            .any(|visitor| matches!(visitor.role, VisitorRole::Case(_)))
        {
            self.events.push(RuntimeEvent::PoliceAlreadyHere);
            return PoliceOutcome::AlreadyPresent;
        }
        let Some(slot) = self.free_slots().first().copied() else {
            self.events.push(RuntimeEvent::NoFreeSlot);
            return PoliceOutcome::NoFreeSlot;
        };

        let budget = self.config.visitor_wait_budget();
        let visitor_id = self.seat_visitor(
            slot,
            VisitorRole::Case(CaseFlow::AwaitingFile),
            budget,
            CASE_OPENING_LINE.to_string(),
        );
        self.events.push(RuntimeEvent::PoliceArrived {
            visitor_id: visitor_id.clone(),
            slot,
        });
        self.push_timeline("Police called".to_string());
        info!(visitor_id = %visitor_id, slot, "police called");
        PoliceOutcome::Arrived { visitor_id, slot }
    }

    /// Drops a clue note for `target` on the desk below `x`.
    pub(super) fn spawn_case_note(&mut self, target: &str, x: f32) -> String {
        let clue = self.catalog.pick_clue(target, &mut self.rng);
        let cases = &self.config.cases;
        let (min, max) = (cases.case_id_min, cases.case_id_max);
        let size = Vec2::new(cases.note_width, cases.note_height);
        let note_y = cases.note_y;
        let case_id = self
            .rng
            .int(
                i32::try_from(min).unwrap_or(i32::MAX),
                i32::try_from(max).unwrap_or(i32::MAX),
            )
            .max(0) as u32;

        let mut body = Body::fixed(Vec2::new(x - size.x / 2.0, note_y), size);
        SurfacePhysics::new(&self.config.physics).contain(&mut body);

        let id = self.make_id("note");
        self.items.push(ItemInternal {
            id: id.clone(),
            item_type: CASE_NOTE_TYPE.to_string(),
            name: format!("Case #{case_id}"),
            kind: ItemKind::ClueNote,
            body,
            placement: Placement::Desk,
            batch_id: None,
            batch_index: 0,
            note: Some(CaseNote {
                target: target.to_string(),
                clue,
                case_id,
            }),
        });
        id
    }
}
