use tracing::{debug, info};

use super::*;
use crate::economy::LedgerReason;
use crate::matching::DeliveryVerdict;
use crate::visitor::VisitorRole;

impl DeskEngine {
    pub(super) fn update_visitors(&mut self, dt: f32) {
        let mut arrived = Vec::new();
        let mut timed_out = Vec::new();
        for visitor in self.visitors.iter_mut() {
            if visitor.update(dt) {
                arrived.push((visitor.id.clone(), visitor.slot));
            }
            if visitor.is_timed_out() {
                timed_out.push(visitor.id.clone());
            }
        }

        for (visitor_id, slot) in arrived {
            debug!(visitor_id = %visitor_id, slot, "visitor reached the counter");
            self.events
                .push(RuntimeEvent::VisitorArrived { visitor_id, slot });
        }

        for visitor_id in timed_out {
            let Some(visitor) = self.remove_visitor(&visitor_id) else {
                continue;
            };
            let amount = self.config.economy.penalty_timeout;
            self.ledger.apply(LedgerReason::Timeout, amount, self.elapsed);
            self.stats.timed_out += 1;
            info!(
                visitor_id = %visitor.id,
                slot = visitor.slot,
                kind = ?visitor.role.kind(),
                amount,
                "visitor ran out of patience"
            );
            self.events.push(RuntimeEvent::VisitorTimedOut {
                visitor_id: visitor.id,
                slot: visitor.slot,
            });
        }
    }

    /// Takes a visitor off the counter and frees its slot.
    pub(super) fn remove_visitor(&mut self, visitor_id: &str) -> Option<Visitor> {
        let idx = self
            .visitors
            .iter()
            .position(|visitor| visitor.id == visitor_id)?;
        let mut visitor = self.visitors.remove(idx);
        visitor.resolve();
        if let Some(occupant) = self.slots.get_mut(visitor.slot) {
            if occupant.as_deref() == Some(visitor_id) {
                *occupant = None;
            }
        }
        Some(visitor)
    }

    /// Waiting visitor whose drop zone contains `point`.
    pub(super) fn visitor_at(&self, point: Vec2) -> Option<usize> {
        self.visitors
            .iter()
            .position(|visitor| visitor.is_waiting() && visitor.delivery_rect().contains(point))
    }

    /// One hit on every hostile at the counter. With none present the spray
    /// is wasted and costs a small fee.
    pub fn fire_spray(&mut self) -> SprayOutcome {
        if self.ended {
            return SprayOutcome::Ended;
        }
        let mut hits = 0;
        let mut repelled = Vec::new();
        for visitor in self.visitors.iter_mut() {
            if !matches!(visitor.role, VisitorRole::Hostile { .. }) {
                continue;
            }
            hits += 1;
            let expired = visitor.apply_hit();
            if let VisitorRole::Hostile { hp } = visitor.role {
                self.events.push(RuntimeEvent::HostileHit {
                    visitor_id: visitor.id.clone(),
                    hp,
                });
            }
            if expired {
                repelled.push(visitor.id.clone());
            }
        }

        if hits == 0 {
            let amount = self.config.economy.penalty_spray_wasted;
            self.ledger
                .apply(LedgerReason::SprayWasted, amount, self.elapsed);
            self.events.push(RuntimeEvent::SprayWasted { amount });
            debug!(amount, "spray fired with nobody to hit");
            return SprayOutcome::Wasted { amount };
        }

        for visitor_id in &repelled {
            if self.remove_visitor(visitor_id).is_none() {
                continue;
            }
            self.stats.hostiles_repelled += 1;
            self.events.push(RuntimeEvent::HostileRepelled {
                visitor_id: visitor_id.clone(),
            });
            self.push_timeline("Hostile visitor repelled".to_string());
            info!(visitor_id = %visitor_id, "hostile visitor repelled");
        }
        SprayOutcome::Hit { hits, repelled }
    }

    pub(super) fn apply_verdict(
        &mut self,
        visitor_id: &str,
        item_id: &str,
        verdict: DeliveryVerdict,
        point: Vec2,
    ) -> DeliveryOutcome {
        let amount = verdict.charge.map(|(_, amount)| amount).unwrap_or(0);
        if let Some((reason, amount)) = verdict.charge {
            self.ledger.apply(reason, amount, self.elapsed);
        }

        let visitor_id = visitor_id.to_string();
        let event = match &verdict.kind {
            VerdictKind::Accepted => {
                self.stats.served += 1;
                RuntimeEvent::DeliveryAccepted {
                    visitor_id: visitor_id.clone(),
                    amount,
                }
            }
            VerdictKind::Wrong => RuntimeEvent::DeliveryWrong {
                visitor_id: visitor_id.clone(),
                amount,
            },
            VerdictKind::FileAccepted { target, case_id } => {
                if let Some(visitor) = self.visitors.iter_mut().find(|v| v.id == visitor_id) {
                    visitor.open_case(target.clone(), *case_id);
                }
                self.push_timeline(format!("Case #{case_id} opened"));
                RuntimeEvent::FileAccepted {
                    visitor_id: visitor_id.clone(),
                    case_id: *case_id,
                }
            }
            VerdictKind::NeedCaseNote => RuntimeEvent::NeedCaseNote {
                visitor_id: visitor_id.clone(),
            },
            VerdictKind::AlreadyHasFile => RuntimeEvent::AlreadyHasFile {
                visitor_id: visitor_id.clone(),
            },
            VerdictKind::CaseSolved => {
                self.stats.cases_solved += 1;
                self.push_timeline("Case solved".to_string());
                RuntimeEvent::CaseSolved {
                    visitor_id: visitor_id.clone(),
                    amount,
                }
            }
            VerdictKind::CaseFailed => {
                self.push_timeline("Case closed with the wrong evidence".to_string());
                RuntimeEvent::CaseFailed {
                    visitor_id: visitor_id.clone(),
                    amount,
                }
            }
            VerdictKind::Stolen => {
                self.push_timeline("Item handed to a thief".to_string());
                RuntimeEvent::ItemStolen {
                    visitor_id: visitor_id.clone(),
                    amount,
                }
            }
        };
        self.events.push(event);

        if verdict.item_consumed {
            self.items.retain(|item| item.id != item_id);
        } else {
            self.drop_held(point);
        }
        if verdict.remove_visitor {
            self.remove_visitor(&visitor_id);
        }
        info!(
            visitor_id = %visitor_id,
            item_id,
            verdict = ?verdict.kind,
            amount,
            balance = self.ledger.balance(),
            "delivery resolved"
        );
        DeliveryOutcome::Resolved {
            visitor_id,
            verdict: verdict.kind,
        }
    }
}
