//! Combat units and their mutable simulation state.
//!
//! Units carry simulation fields only. Presentation handles (sprites,
//! animation timelines) live in the rendering layer and are linked to a
//! unit through its stable id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::effect::{EffectKind, EffectSpec, StatusEffect};
use super::hex::HexPos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Player,
    Boss,
    Minion,
}

/// Actor-level gate: a unit with a speculative operation in flight is
/// `Acting` and may not start another one until the first settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Idle,
    Acting,
}

/// A bounded pool such as hp or mp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub current: f64,
    pub max: f64,
}

impl Resource {
    pub fn full(max: f64) -> Self {
        Self { current: max, max }
    }

    pub fn gain(&mut self, amount: f64) {
        self.current = (self.current + amount).min(self.max);
    }

    pub fn spend(&mut self, amount: f64) {
        self.current = (self.current - amount).max(0.0);
    }

    pub fn ratio(&self) -> f64 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    pub hp: Resource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mp: Option<Resource>,
    #[serde(default)]
    pub stamina: f64,
    pub attack: f64,
    pub defense: f64,
    pub speed: f64,
    #[serde(default)]
    pub intelligence: f64,
    #[serde(default)]
    pub crit_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shield: Option<Resource>,
}

impl UnitStats {
    pub fn basic(hp: f64, attack: f64, defense: f64, speed: f64) -> Self {
        Self {
            hp: Resource::full(hp),
            mp: None,
            stamina: 0.0,
            attack,
            defense,
            speed,
            intelligence: 0.0,
            crit_rate: 0.0,
            shield: None,
        }
    }

    /// Mutable access to a scalar stat by name, for buff/debuff modifiers.
    pub fn scalar_mut(&mut self, name: &str) -> Option<&mut f64> {
        match name {
            "attack" => Some(&mut self.attack),
            "defense" => Some(&mut self.defense),
            "speed" => Some(&mut self.speed),
            "intelligence" => Some(&mut self.intelligence),
            "crit_rate" => Some(&mut self.crit_rate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatUnit {
    pub id: String,
    pub name: String,
    pub faction: Faction,
    pub position: HexPos,
    pub stats: UnitStats,
    #[serde(default)]
    pub skill_cooldowns: HashMap<String, u32>,
    #[serde(default)]
    pub status_effects: Vec<StatusEffect>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default = "default_stance")]
    pub stance: Stance,
}

fn default_stance() -> Stance {
    Stance::Idle
}

impl CombatUnit {
    pub fn new(id: impl Into<String>, faction: Faction, position: HexPos, stats: UnitStats) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            faction,
            position,
            stats,
            skill_cooldowns: HashMap::new(),
            status_effects: Vec::new(),
            skills: Vec::new(),
            stance: Stance::Idle,
        }
    }

    pub fn with_skills(mut self, skills: Vec<String>) -> Self {
        self.skills = skills;
        self
    }

    pub fn is_alive(&self) -> bool {
        self.stats.hp.current > 0.0
    }

    pub fn is_idle(&self) -> bool {
        self.stance == Stance::Idle
    }

    pub fn is_stunned(&self) -> bool {
        self.status_effects.iter().any(|s| s.effect.kind == EffectKind::Stun)
    }

    pub fn cooldown(&self, skill_id: &str) -> u32 {
        self.skill_cooldowns.get(skill_id).copied().unwrap_or(0)
    }

    /// Attaches an effect, or refreshes the duration of an existing
    /// instance with the same effect id.
    pub fn attach_effect(&mut self, effect: EffectSpec) {
        if let Some(existing) =
            self.status_effects.iter_mut().find(|s| s.effect.id == effect.id)
        {
            existing.remaining_rounds = effect.duration;
            existing.effect.value = effect.value;
            return;
        }
        self.status_effects.push(StatusEffect::attach(effect));
    }

    /// Decrements all positive cooldowns by one round.
    pub fn tick_cooldowns(&mut self) {
        for cd in self.skill_cooldowns.values_mut() {
            *cd = cd.saturating_sub(1);
        }
    }

    /// Advances attached effects by one round: DoT/HoT ticks, duration
    /// countdown, and modifier reversal when a buff/debuff expires.
    pub fn tick_effects(&mut self) {
        let mut effects = std::mem::take(&mut self.status_effects);
        effects.retain_mut(|status| {
            match status.effect.kind {
                EffectKind::DamageOverTime => {
                    self.stats.hp.spend(status.effect.value.round());
                }
                EffectKind::HealOverTime => {
                    self.stats.hp.gain(status.effect.value.round());
                }
                EffectKind::Shield => {
                    // A fully consumed shield drops its marker early.
                    if self.stats.shield.map(|s| s.current) == Some(0.0) {
                        return false;
                    }
                }
                _ => {}
            }

            if status.remaining_rounds <= 1 {
                match status.effect.kind {
                    EffectKind::Buff | EffectKind::Debuff => {
                        status.effect.remove_stat_modifiers(&mut self.stats);
                    }
                    _ => {}
                }
                false
            } else {
                status.remaining_rounds -= 1;
                true
            }
        });
        self.status_effects = effects;
    }
}
