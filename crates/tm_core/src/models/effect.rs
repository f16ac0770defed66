//! Skill effect taxonomy shared by the catalog, the executor and the
//! per-round ticking logic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::unit::UnitStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Damage,
    Heal,
    /// Heal over time. Applies an initial tick on attach, then one per round.
    HealOverTime,
    /// Damage over time. No initial tick; damage lands on round advance.
    DamageOverTime,
    MpRestore,
    MpDrain,
    Shield,
    Stun,
    Buff,
    Debuff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Physical,
    Magical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierOp {
    Add,
    Multiply,
}

impl Default for ModifierOp {
    fn default() -> Self {
        ModifierOp::Add
    }
}

/// Damage reduction beyond a skill's full-damage range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageFalloff {
    pub full_damage_range: u32,
    /// Fraction of the base value kept outside the full-damage range (0-1).
    pub min_damage_percent: f64,
}

/// Static description of a single skill effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    pub id: String,
    pub name: String,
    pub kind: EffectKind,
    #[serde(default)]
    pub value: f64,
    /// Rounds the effect stays attached; 0 means instantaneous.
    #[serde(default)]
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_type: Option<DamageType>,
    /// Stat-name keyed modifiers for buffs/debuffs, e.g. `{"attack": 20.0}`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub modifiers: BTreeMap<String, f64>,
    #[serde(default)]
    pub modifier_op: ModifierOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub falloff: Option<DamageFalloff>,
}

impl EffectSpec {
    /// Signed modifier delta: debuffs subtract where buffs add.
    fn signed(&self, value: f64) -> f64 {
        match self.kind {
            EffectKind::Debuff => -value,
            _ => value,
        }
    }

    /// Applies the stat modifiers of a buff/debuff onto `stats`.
    ///
    /// Only scalar combat stats are touched so the reversal on expiry is
    /// exact. Unknown stat names are ignored.
    pub fn apply_stat_modifiers(&self, stats: &mut UnitStats) {
        for (stat, value) in &self.modifiers {
            let factor = match (self.modifier_op, self.kind) {
                (ModifierOp::Multiply, EffectKind::Debuff) => Some(1.0 - value),
                (ModifierOp::Multiply, _) => Some(1.0 + value),
                (ModifierOp::Add, _) => None,
            };
            if let Some(slot) = stats.scalar_mut(stat) {
                match factor {
                    Some(f) => *slot *= f,
                    None => *slot += self.signed(*value),
                }
            } else {
                log::debug!("ignoring modifier for unknown stat '{}'", stat);
            }
        }
    }

    /// Reverses [`apply_stat_modifiers`](Self::apply_stat_modifiers).
    pub fn remove_stat_modifiers(&self, stats: &mut UnitStats) {
        for (stat, value) in &self.modifiers {
            let factor = match (self.modifier_op, self.kind) {
                (ModifierOp::Multiply, EffectKind::Debuff) => Some(1.0 - value),
                (ModifierOp::Multiply, _) => Some(1.0 + value),
                (ModifierOp::Add, _) => None,
            };
            if let Some(slot) = stats.scalar_mut(stat) {
                match factor {
                    Some(f) if f != 0.0 => *slot /= f,
                    Some(_) => {}
                    None => *slot -= self.signed(*value),
                }
            }
        }
    }
}

/// A live effect instance attached to a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub effect: EffectSpec,
    pub remaining_rounds: u32,
}

impl StatusEffect {
    pub fn attach(effect: EffectSpec) -> Self {
        let remaining_rounds = effect.duration;
        Self { effect, remaining_rounds }
    }
}
