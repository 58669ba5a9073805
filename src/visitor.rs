use crate::geometry::{Rect, Vec2};
use crate::types::{CaseStage, VisitorKind, VisitorPhase, VisitorView};

const DELIVERY_HALF_WIDTH: f32 = 100.0;
const DELIVERY_ABOVE: f32 = 100.0;
const DELIVERY_HEIGHT: f32 = 250.0;

#[derive(Clone, Debug, PartialEq)]
pub enum CaseFlow {
    AwaitingFile,
    AwaitingEvidence { target: String, case_id: u32 },
}

impl CaseFlow {
    pub fn stage(&self) -> CaseStage {
        match self {
            CaseFlow::AwaitingFile => CaseStage::AwaitingFile,
            CaseFlow::AwaitingEvidence { .. } => CaseStage::AwaitingEvidence,
        }
    }
}

/// What a visitor wants and how it may be dealt with.
#[derive(Clone, Debug, PartialEq)]
pub enum VisitorRole {
    Standard { wants: String },
    Case(CaseFlow),
    Hostile { hp: u32 },
}

impl VisitorRole {
    pub fn kind(&self) -> VisitorKind {
        match self {
            VisitorRole::Standard { .. } => VisitorKind::Standard,
            VisitorRole::Case(_) => VisitorKind::Case,
            VisitorRole::Hostile { .. } => VisitorKind::Hostile,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Visitor {
    pub id: String,
    pub slot: usize,
    pub position: Vec2,
    pub target_y: f32,
    pub walk_speed: f32,
    pub phase: VisitorPhase,
    pub wait_time: f32,
    pub max_wait_time: f32,
    pub role: VisitorRole,
    pub line: String,
}

impl Visitor {
    pub fn new(
        id: String,
        slot: usize,
        spawn: Vec2,
        target_y: f32,
        walk_speed: f32,
        max_wait_time: f32,
        role: VisitorRole,
        line: String,
    ) -> Self {
        Self {
            id,
            slot,
            position: spawn,
            target_y,
            walk_speed,
            phase: VisitorPhase::Approaching,
            wait_time: 0.0,
            max_wait_time,
            role,
            line,
        }
    }

    /// Walks toward the counter line, then accumulates wait time. Returns
    /// `true` on the tick the visitor arrives.
    pub fn update(&mut self, dt: f32) -> bool {
        match self.phase {
            VisitorPhase::Approaching => {
                self.position.y += self.walk_speed * dt;
                if self.position.y >= self.target_y {
                    self.position.y = self.target_y;
                    self.phase = VisitorPhase::Waiting;
                    return true;
                }
                false
            }
            VisitorPhase::Waiting => {
                self.wait_time += dt;
                false
            }
            VisitorPhase::Resolved => false,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.phase == VisitorPhase::Waiting
    }

    pub fn is_resolved(&self) -> bool {
        self.phase == VisitorPhase::Resolved
    }

    pub fn resolve(&mut self) {
        self.phase = VisitorPhase::Resolved;
    }

    pub fn patience(&self) -> f32 {
        if self.max_wait_time <= 0.0 {
            return 0.0;
        }
        (1.0 - self.wait_time / self.max_wait_time).clamp(0.0, 1.0)
    }

    pub fn is_timed_out(&self) -> bool {
        self.is_waiting() && self.wait_time >= self.max_wait_time
    }

    /// Only standard visitors can be sent away with a clue note.
    pub fn can_be_rejected(&self) -> bool {
        matches!(self.role, VisitorRole::Standard { .. })
    }

    /// Removes one hit point. Returns `true` when none are left. Non-hostile
    /// visitors are unaffected.
    pub fn apply_hit(&mut self) -> bool {
        match &mut self.role {
            VisitorRole::Hostile { hp } => {
                *hp = hp.saturating_sub(1);
                self.line = format!("Ouch! ({hp} left)");
                *hp == 0
            }
            _ => false,
        }
    }

    /// Moves a case visitor to its evidence stage and restarts its timer.
    pub fn open_case(&mut self, target: String, case_id: u32) {
        if let VisitorRole::Case(flow) = &mut self.role {
            *flow = CaseFlow::AwaitingEvidence { target, case_id };
            self.wait_time = 0.0;
            self.line = format!("Case #{case_id}... Find the missing item.");
        }
    }

    /// Drop zone used to decide which visitor a released entity goes to.
    pub fn delivery_rect(&self) -> Rect {
        Rect::new(
            self.position.x - DELIVERY_HALF_WIDTH,
            self.position.y - DELIVERY_ABOVE,
            DELIVERY_HALF_WIDTH * 2.0,
            DELIVERY_HEIGHT,
        )
    }

    pub fn to_view(&self) -> VisitorView {
        let (wants, case_stage, case_id, hp) = match &self.role {
            VisitorRole::Standard { wants } => (Some(wants.clone()), None, None, None),
            VisitorRole::Case(flow) => match flow {
                CaseFlow::AwaitingFile => (None, Some(flow.stage()), None, None),
                CaseFlow::AwaitingEvidence { case_id, .. } => {
                    (None, Some(flow.stage()), Some(*case_id), None)
                }
            },
            VisitorRole::Hostile { hp } => (None, None, None, Some(*hp)),
        };
        VisitorView {
            id: self.id.clone(),
            slot: self.slot,
            kind: self.role.kind(),
            x: self.position.x,
            y: self.position.y,
            phase: self.phase,
            patience: self.patience(),
            wait_time: self.wait_time,
            max_wait_time: self.max_wait_time,
            wants,
            line: self.line.clone(),
            case_stage,
            case_id,
            hp,
            can_reject: self.can_be_rejected() && self.is_waiting(),
        }
    }
}

/// Speech line shown for a standard request.
pub fn request_line(item_name: &str, variant: usize) -> String {
    match variant % 4 {
        0 => format!("I lost my {item_name}"),
        1 => format!("I am looking for {item_name}"),
        2 => format!("Seen my {item_name}?"),
        _ => format!("My {item_name} missing"),
    }
}

pub const CASE_OPENING_LINE: &str = "Officer on duty. Any cases to report?";
pub const HOSTILE_LINE: &str = "Bro, give me money!!!";

#[cfg(test)]
mod tests {
    use super::*;

    fn make_visitor(role: VisitorRole, max_wait: f32) -> Visitor {
        Visitor::new(
            "visitor_1".to_string(),
            0,
            Vec2::new(750.0, -100.0),
            120.0,
            400.0,
            max_wait,
            role,
            "hello".to_string(),
        )
    }

    fn arrived(role: VisitorRole, max_wait: f32) -> Visitor {
        let mut visitor = make_visitor(role, max_wait);
        while !visitor.update(0.1) {}
        visitor
    }

    #[test]
    fn approach_stops_at_line_and_starts_waiting() {
        let mut visitor = make_visitor(
            VisitorRole::Standard {
                wants: "book".to_string(),
            },
            25.0,
        );
        assert!(!visitor.update(0.25));
        assert_eq!(visitor.phase, VisitorPhase::Approaching);
        assert!(visitor.update(0.5));
        assert_eq!(visitor.position.y, 120.0);
        assert!(visitor.is_waiting());
        assert_eq!(visitor.wait_time, 0.0);
    }

    #[test]
    fn patience_is_monotonic_and_bounded() {
        let mut visitor = arrived(
            VisitorRole::Standard {
                wants: "book".to_string(),
            },
            10.0,
        );
        assert_eq!(visitor.patience(), 1.0);
        let mut last = visitor.patience();
        for _ in 0..150 {
            visitor.update(0.1);
            let now = visitor.patience();
            assert!(now <= last);
            assert!((0.0..=1.0).contains(&now));
            last = now;
        }
        assert_eq!(visitor.patience(), 0.0);
        assert!(visitor.is_timed_out());
    }

    #[test]
    fn patience_is_zero_exactly_at_budget() {
        let mut visitor = arrived(
            VisitorRole::Standard {
                wants: "book".to_string(),
            },
            4.0,
        );
        visitor.wait_time = 4.0;
        assert_eq!(visitor.patience(), 0.0);
        assert!(visitor.is_timed_out());
        visitor.wait_time = 0.0;
        assert_eq!(visitor.patience(), 1.0);
    }

    #[test]
    fn only_standard_visitors_can_be_rejected() {
        let standard = make_visitor(
            VisitorRole::Standard {
                wants: "hat".to_string(),
            },
            25.0,
        );
        let case = make_visitor(VisitorRole::Case(CaseFlow::AwaitingFile), 25.0);
        let hostile = make_visitor(VisitorRole::Hostile { hp: 3 }, 15.0);
        assert!(standard.can_be_rejected());
        assert!(!case.can_be_rejected());
        assert!(!hostile.can_be_rejected());
        assert!(!case.to_view().can_reject);
    }

    #[test]
    fn hostile_expires_on_last_hit() {
        let mut hostile = arrived(VisitorRole::Hostile { hp: 3 }, 15.0);
        assert!(!hostile.apply_hit());
        assert!(!hostile.apply_hit());
        assert!(hostile.apply_hit());
        assert_eq!(hostile.to_view().hp, Some(0));
    }

    #[test]
    fn hit_on_standard_visitor_is_ignored() {
        let mut standard = arrived(
            VisitorRole::Standard {
                wants: "hat".to_string(),
            },
            25.0,
        );
        assert!(!standard.apply_hit());
    }

    #[test]
    fn opening_a_case_resets_the_timer() {
        let mut police = arrived(VisitorRole::Case(CaseFlow::AwaitingFile), 25.0);
        police.update(10.0);
        assert!(police.wait_time > 0.0);
        police.open_case("passport".to_string(), 42);
        assert_eq!(police.wait_time, 0.0);
        assert_eq!(
            police.role,
            VisitorRole::Case(CaseFlow::AwaitingEvidence {
                target: "passport".to_string(),
                case_id: 42
            })
        );
        assert_eq!(police.to_view().case_id, Some(42));
    }
}
