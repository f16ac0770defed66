//! Simulation data model for the tactical battle.

pub mod decision;
pub mod effect;
pub mod hex;
pub mod state;
pub mod unit;

pub use decision::{BossDecision, DecisionTarget};
pub use effect::{DamageFalloff, DamageType, EffectKind, EffectSpec, ModifierOp, StatusEffect};
pub use hex::HexPos;
pub use state::CombatState;
pub use unit::{CombatUnit, Faction, Resource, Stance, UnitStats};
