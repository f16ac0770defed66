//! Deep-copy snapshots of the combat model for speculative rollback.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::SnapshotError;
use crate::models::{CombatState, HexPos, Stance, StatusEffect, UnitStats};

/// Captured mutable fields of one unit. Presentation handles are not part
/// of the simulation model and therefore never captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: String,
    pub position: HexPos,
    pub stats: UnitStats,
    pub skill_cooldowns: HashMap<String, u32>,
    pub status_effects: Vec<StatusEffect>,
    pub skills: Vec<String>,
    pub stance: Stance,
}

/// Immutable deep copy of the combat model at a point in time. Owned by
/// exactly one pending operation and consumed at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatSnapshot {
    pub units: Vec<UnitSnapshot>,
    pub round: u32,
    pub score: i64,
    pub captured_at_ms: i64,
}

/// Captures an independent deep copy of every unit's mutable fields plus
/// round and score.
pub fn capture(state: &CombatState) -> Result<CombatSnapshot, SnapshotError> {
    if state.units.is_empty() {
        return Err(SnapshotError::EmptyModel);
    }

    let units = state
        .units
        .iter()
        .map(|u| UnitSnapshot {
            id: u.id.clone(),
            position: u.position,
            stats: u.stats.clone(),
            skill_cooldowns: u.skill_cooldowns.clone(),
            status_effects: u.status_effects.clone(),
            skills: u.skills.clone(),
            stance: u.stance,
        })
        .collect();

    Ok(CombatSnapshot {
        units,
        round: state.round,
        score: state.score,
        captured_at_ms: Utc::now().timestamp_millis(),
    })
}

/// Writes captured fields back onto live units matched by stable id.
/// Units absent from the live model are skipped, never re-created.
pub fn restore(state: &mut CombatState, snapshot: &CombatSnapshot) {
    for snap in &snapshot.units {
        if let Some(unit) = state.unit_mut(&snap.id) {
            unit.position = snap.position;
            unit.stats = snap.stats.clone();
            unit.skill_cooldowns = snap.skill_cooldowns.clone();
            unit.status_effects = snap.status_effects.clone();
            unit.skills = snap.skills.clone();
            unit.stance = snap.stance;
        } else {
            log::debug!("restore: unit {} no longer in model, skipped", snap.id);
        }
    }
    state.round = snapshot.round;
    state.score = snapshot.score;
}
