use serde::Serialize;

use crate::config::EconomyConfig;
use crate::economy::LedgerReason;
use crate::visitor::{CaseFlow, VisitorRole};

/// What was handed over, stripped down to the fields matching looks at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Delivered<'a> {
    Item { item_type: &'a str },
    Note { target: &'a str, case_id: u32 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerdictKind {
    Accepted,
    Wrong,
    FileAccepted {
        /// Kept server-side; the client only learns the case number.
        #[serde(skip)]
        target: String,
        #[serde(rename = "caseId")]
        case_id: u32,
    },
    NeedCaseNote,
    AlreadyHasFile,
    CaseSolved,
    CaseFailed,
    Stolen,
}

/// Full consequence of one delivery. The engine applies it as-is.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliveryVerdict {
    pub kind: VerdictKind,
    /// Balance change and its ledger reason, if any.
    pub charge: Option<(LedgerReason, i64)>,
    pub remove_visitor: bool,
    /// `false` means the entity goes back to the surface.
    pub item_consumed: bool,
}

impl DeliveryVerdict {
    fn new(kind: VerdictKind) -> Self {
        Self {
            kind,
            charge: None,
            remove_visitor: false,
            item_consumed: false,
        }
    }

    fn charge(mut self, reason: LedgerReason, amount: i64) -> Self {
        self.charge = Some((reason, amount));
        self
    }

    fn removes_visitor(mut self) -> Self {
        self.remove_visitor = true;
        self
    }

    fn consumes_item(mut self) -> Self {
        self.item_consumed = true;
        self
    }
}

/// Demand check used by standard visitors. Hostiles always report a match;
/// what that means is decided in [`resolve_delivery`].
pub fn check_match(role: &VisitorRole, delivered: Delivered<'_>) -> bool {
    match (role, delivered) {
        (VisitorRole::Hostile { .. }, _) => true,
        (VisitorRole::Standard { wants }, Delivered::Item { item_type }) => wants == item_type,
        (VisitorRole::Case(CaseFlow::AwaitingEvidence { target, .. }), Delivered::Item { item_type }) => {
            target == item_type
        }
        _ => false,
    }
}

pub fn resolve_delivery(
    role: &VisitorRole,
    delivered: Delivered<'_>,
    economy: &EconomyConfig,
) -> DeliveryVerdict {
    match role {
        VisitorRole::Case(CaseFlow::AwaitingFile) => match delivered {
            Delivered::Note { target, case_id } => DeliveryVerdict::new(VerdictKind::FileAccepted {
                target: target.to_string(),
                case_id,
            })
            .consumes_item(),
            Delivered::Item { .. } => DeliveryVerdict::new(VerdictKind::NeedCaseNote),
        },
        VisitorRole::Case(CaseFlow::AwaitingEvidence { .. }) => match delivered {
            Delivered::Note { .. } => DeliveryVerdict::new(VerdictKind::AlreadyHasFile),
            Delivered::Item { .. } if check_match(role, delivered) => {
                DeliveryVerdict::new(VerdictKind::CaseSolved)
                    .charge(LedgerReason::CaseSolved, economy.reward_case_solved)
                    .removes_visitor()
                    .consumes_item()
            }
            // A wrong guess closes the case; the item stays at the desk.
            Delivered::Item { .. } => DeliveryVerdict::new(VerdictKind::CaseFailed)
                .charge(LedgerReason::CaseFailed, economy.penalty_wrong)
                .removes_visitor(),
        },
        VisitorRole::Hostile { .. } => DeliveryVerdict::new(VerdictKind::Stolen)
            .charge(LedgerReason::Theft, economy.penalty_theft)
            .removes_visitor()
            .consumes_item(),
        VisitorRole::Standard { .. } => {
            if check_match(role, delivered) {
                DeliveryVerdict::new(VerdictKind::Accepted)
                    .charge(LedgerReason::Correct, economy.reward_correct)
                    .removes_visitor()
                    .consumes_item()
            } else {
                DeliveryVerdict::new(VerdictKind::Wrong)
                    .charge(LedgerReason::Wrong, economy.penalty_wrong)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn economy() -> EconomyConfig {
        EconomyConfig::default()
    }

    fn evidence_stage(target: &str) -> VisitorRole {
        VisitorRole::Case(CaseFlow::AwaitingEvidence {
            target: target.to_string(),
            case_id: 17,
        })
    }

    #[test]
    fn standard_visitor_accepts_requested_type() {
        let role = VisitorRole::Standard {
            wants: "wallet".to_string(),
        };
        let verdict = resolve_delivery(&role, Delivered::Item { item_type: "wallet" }, &economy());
        assert_eq!(verdict.kind, VerdictKind::Accepted);
        assert_eq!(verdict.charge, Some((LedgerReason::Correct, 100)));
        assert!(verdict.remove_visitor);
        assert!(verdict.item_consumed);
    }

    #[test]
    fn standard_visitor_keeps_waiting_after_wrong_item() {
        let role = VisitorRole::Standard {
            wants: "wallet".to_string(),
        };
        let verdict = resolve_delivery(&role, Delivered::Item { item_type: "umbrella" }, &economy());
        assert_eq!(verdict.kind, VerdictKind::Wrong);
        assert_eq!(verdict.charge, Some((LedgerReason::Wrong, -50)));
        assert!(!verdict.remove_visitor);
        assert!(!verdict.item_consumed);
    }

    #[test]
    fn note_is_never_a_match_for_standard_visitor() {
        let role = VisitorRole::Standard {
            wants: "wallet".to_string(),
        };
        let verdict = resolve_delivery(
            &role,
            Delivered::Note {
                target: "wallet",
                case_id: 3,
            },
            &economy(),
        );
        assert_eq!(verdict.kind, VerdictKind::Wrong);
    }

    #[test]
    fn case_visitor_without_file_only_takes_notes() {
        let role = VisitorRole::Case(CaseFlow::AwaitingFile);
        let refused = resolve_delivery(&role, Delivered::Item { item_type: "wallet" }, &economy());
        assert_eq!(refused.kind, VerdictKind::NeedCaseNote);
        assert_eq!(refused.charge, None);
        assert!(!refused.remove_visitor);
        assert!(!refused.item_consumed);

        let accepted = resolve_delivery(
            &role,
            Delivered::Note {
                target: "wallet",
                case_id: 42,
            },
            &economy(),
        );
        assert_eq!(
            accepted.kind,
            VerdictKind::FileAccepted {
                target: "wallet".to_string(),
                case_id: 42
            }
        );
        assert_eq!(accepted.charge, None);
        assert!(accepted.item_consumed);
        assert!(!accepted.remove_visitor);
    }

    #[test]
    fn case_visitor_with_file_refuses_second_note() {
        let verdict = resolve_delivery(
            &evidence_stage("passport"),
            Delivered::Note {
                target: "passport",
                case_id: 17,
            },
            &economy(),
        );
        assert_eq!(verdict.kind, VerdictKind::AlreadyHasFile);
        assert_eq!(verdict.charge, None);
        assert!(!verdict.item_consumed);
    }

    #[test]
    fn correct_evidence_solves_case_at_elevated_reward() {
        let verdict = resolve_delivery(
            &evidence_stage("passport"),
            Delivered::Item { item_type: "passport" },
            &economy(),
        );
        assert_eq!(verdict.kind, VerdictKind::CaseSolved);
        assert_eq!(verdict.charge, Some((LedgerReason::CaseSolved, 150)));
        assert!(verdict.remove_visitor);
        assert!(verdict.item_consumed);
    }

    #[test]
    fn wrong_evidence_ends_the_case() {
        let verdict = resolve_delivery(
            &evidence_stage("passport"),
            Delivered::Item { item_type: "hat" },
            &economy(),
        );
        assert_eq!(verdict.kind, VerdictKind::CaseFailed);
        assert_eq!(verdict.charge, Some((LedgerReason::CaseFailed, -50)));
        assert!(verdict.remove_visitor);
        assert!(!verdict.item_consumed);
    }

    #[test]
    fn hostile_always_matches_and_steals() {
        let role = VisitorRole::Hostile { hp: 4 };
        assert!(check_match(&role, Delivered::Item { item_type: "anything" }));
        let verdict = resolve_delivery(&role, Delivered::Item { item_type: "hat" }, &economy());
        assert_eq!(verdict.kind, VerdictKind::Stolen);
        assert_eq!(verdict.charge, Some((LedgerReason::Theft, -200)));
        assert!(verdict.remove_visitor);
        assert!(verdict.item_consumed);
    }
}
