use std::collections::HashSet;

use tracing::debug;

use super::*;
use crate::conveyor::{advance, BeltMotion};

/// The belt scroll offset wraps here; any texture period should divide it.
const BELT_SCROLL_WRAP: f32 = 4096.0;

impl DeskEngine {
    /// Latches the pause of every batch whose trigger member has reached the
    /// line. Runs before transport so the freeze applies on this very tick.
    pub(super) fn detect_pause_triggers(&mut self) -> Vec<u64> {
        let conveyor = &self.config.conveyor;
        let mut triggered = Vec::new();
        for item in &self.items {
            let Placement::Conveyor(transport) = &item.placement else {
                continue;
            };
            if item.batch_index != conveyor.trigger_index
                || !transport.has_entered(conveyor.speed)
            {
                continue;
            }
            let Some(batch_id) = item.batch_id else {
                continue;
            };
            let Some(pause) = self.batches.get_mut(&batch_id) else {
                continue;
            };
            if pause.try_trigger(item.body.position.y, conveyor.pause_trigger_y) {
                triggered.push(batch_id);
            }
        }
        for batch_id in &triggered {
            debug!(batch_id = *batch_id, "batch paused");
            self.events.push(RuntimeEvent::BatchPaused {
                batch_id: *batch_id,
            });
        }
        triggered
    }

    /// Batches paused this tick start counting on the next one, so a batch
    /// stays frozen for the full pause duration.
    pub(super) fn update_pause_timers(&mut self, dt: f32, just_triggered: &[u64]) {
        let duration = self.config.conveyor.pause_duration;
        let mut resumed = Vec::new();
        for (batch_id, pause) in self.batches.iter_mut() {
            if just_triggered.contains(batch_id) {
                continue;
            }
            if pause.tick(dt, duration) {
                resumed.push(*batch_id);
            }
        }
        for batch_id in resumed {
            debug!(batch_id, "batch resumed");
            self.events.push(RuntimeEvent::BatchResumed { batch_id });
        }
    }

    pub(super) fn advance_conveyor(&mut self, dt: f32) {
        let motion = BeltMotion {
            speed: self.config.conveyor.speed,
            lateral_axis: self.config.conveyor.lateral_axis,
        };
        let running = BatchPause::default();
        let mut finished = Vec::new();
        let mut belt_moving = false;

        for item in self.items.iter_mut() {
            let Placement::Conveyor(transport) = &mut item.placement else {
                continue;
            };
            item.body.stop();
            let pause = item
                .batch_id
                .and_then(|id| self.batches.get(&id))
                .unwrap_or(&running);
            if !pause.is_paused() {
                belt_moving = true;
            }
            let size = item.body.size;
            if advance(
                Some(transport),
                &mut item.body.position,
                size,
                dt,
                &self.path,
                motion,
                pause,
            ) {
                finished.push(item.id.clone());
            }
        }

        if !finished.is_empty() {
            self.items.retain(|item| !finished.contains(&item.id));
            for item_id in finished {
                debug!(item_id = %item_id, "item left the belt");
                self.events.push(RuntimeEvent::ItemLeftBelt { item_id });
            }
        }
        if belt_moving {
            self.belt_offset = (self.belt_offset + motion.speed * dt) % BELT_SCROLL_WRAP;
        }
        self.prune_batches();
    }

    /// Forgets batches with no member left on the belt.
    fn prune_batches(&mut self) {
        let active: HashSet<u64> = self
            .items
            .iter()
            .filter(|item| item.is_on_conveyor())
            .filter_map(|item| item.batch_id)
            .collect();
        self.batches.retain(|batch_id, _| active.contains(batch_id));
    }
}
