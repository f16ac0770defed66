//! The live combat model, exclusively owned by the hosting session.
//!
//! Only the speculative executor and the snapshotter mutate this in
//! place; everything else works on copies or opaque ids.

use serde::{Deserialize, Serialize};

use super::unit::{CombatUnit, Faction};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    pub units: Vec<CombatUnit>,
    pub round: u32,
    pub score: i64,
    /// Seed shared with the authoritative server; root of every derived
    /// decision and per-operation seed.
    pub game_seed: String,
}

impl CombatState {
    pub fn new(game_seed: impl Into<String>) -> Self {
        Self { units: Vec::new(), round: 0, score: 0, game_seed: game_seed.into() }
    }

    pub fn with_units(mut self, units: Vec<CombatUnit>) -> Self {
        self.units = units;
        self
    }

    pub fn unit(&self, id: &str) -> Option<&CombatUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn unit_mut(&mut self, id: &str) -> Option<&mut CombatUnit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    pub fn boss(&self) -> Option<&CombatUnit> {
        self.units.iter().find(|u| u.faction == Faction::Boss)
    }

    pub fn living_units_of(&self, faction: Faction) -> impl Iterator<Item = &CombatUnit> {
        self.units.iter().filter(move |u| u.faction == faction && u.is_alive())
    }

    /// Advances the battle timeline one round: cooldowns tick down and
    /// attached effects run their per-round step.
    pub fn advance_round(&mut self) {
        self.round += 1;
        for unit in &mut self.units {
            unit.tick_cooldowns();
            unit.tick_effects();
        }
    }
}
