//! The boss decision sum type shared by the predictor, the executor and
//! the authoritative feed.

use serde::{Deserialize, Serialize};

use super::hex::HexPos;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTarget {
    pub unit_id: String,
}

impl DecisionTarget {
    pub fn new(unit_id: impl Into<String>) -> Self {
        Self { unit_id: unit_id.into() }
    }
}

/// What the boss does this round. Exhaustive by construction: the
/// executor and the consistency check match on every variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BossDecision {
    UseSkill { skill_id: String, target: DecisionTarget },
    Attack { target: DecisionTarget },
    Move { position: HexPos },
    Standby,
}

impl BossDecision {
    pub fn kind(&self) -> &'static str {
        match self {
            BossDecision::UseSkill { .. } => "use_skill",
            BossDecision::Attack { .. } => "attack",
            BossDecision::Move { .. } => "move",
            BossDecision::Standby => "standby",
        }
    }

    pub fn target(&self) -> Option<&DecisionTarget> {
        match self {
            BossDecision::UseSkill { target, .. } => Some(target),
            BossDecision::Attack { target } => Some(target),
            BossDecision::Move { .. } | BossDecision::Standby => None,
        }
    }
}
