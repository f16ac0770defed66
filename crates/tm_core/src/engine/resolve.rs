//! Deterministic action resolution.
//!
//! These routines are the client-side copy of the server's resolution
//! math. Randomness-dependent steps (crit rolls) draw from the
//! per-operation RNG, so a prediction and the authoritative result land
//! on identical numbers.

use crate::engine::rng::DeterministicRng;
use crate::models::{CombatUnit, DamageType, EffectKind, EffectSpec, Resource, UnitStats};

/// Plain melee swing: `max(1, floor(attack - 0.3 * defense))`.
pub fn basic_attack_damage(attacker: &UnitStats, defender: &UnitStats) -> f64 {
    (attacker.attack - defender.defense * 0.3).floor().max(1.0)
}

#[derive(Debug, Clone, Copy)]
pub enum BonusKind {
    Intelligence,
    Defense,
}

/// Attribute scaling curves for non-damage effect values.
pub fn attribute_bonus(attribute: f64, kind: BonusKind) -> f64 {
    if attribute <= 0.0 {
        return 1.0;
    }
    match kind {
        BonusKind::Intelligence => 1.0 + attribute * 0.005 + (attribute / 10.0).floor() * 0.01,
        BonusKind::Defense => 1.0 + attribute * 0.003 + (attribute / 15.0).floor() * 0.005,
    }
}

/// Skill damage before shields: base value plus attacker scaling, minus
/// the defender's diminishing-returns reduction, with a seeded crit roll.
fn skill_damage(
    caster: &UnitStats,
    target: &UnitStats,
    effect: &EffectSpec,
    base_value: f64,
    rng: &mut DeterministicRng,
) -> f64 {
    let mut damage = base_value;

    match effect.damage_type {
        Some(DamageType::Magical) => damage += caster.intelligence * 0.8,
        Some(DamageType::Physical) | None => damage += caster.attack * 0.5,
    }

    if target.defense > 0.0 {
        damage *= 1.0 - target.defense / (target.defense + 100.0);
    }

    if caster.crit_rate > 0.0 && rng.next() < caster.crit_rate.min(1.0) {
        damage *= 1.5;
    }

    damage.round().max(0.0)
}

/// Finalizes an effect's value for a given caster/target pair and cast
/// distance. Pure apart from the RNG draw.
pub fn effect_value(
    caster: &UnitStats,
    target: &UnitStats,
    effect: &EffectSpec,
    distance: u32,
    rng: &mut DeterministicRng,
) -> f64 {
    let mut value = effect.value;

    if let Some(falloff) = &effect.falloff {
        if distance > falloff.full_damage_range {
            value = (value * falloff.min_damage_percent).round();
        }
    }

    match effect.kind {
        EffectKind::Damage => skill_damage(caster, target, effect, value, rng),
        // DoT ticks use the configured value directly.
        EffectKind::DamageOverTime => value,
        EffectKind::Heal | EffectKind::HealOverTime | EffectKind::MpRestore => {
            (value * attribute_bonus(caster.intelligence, BonusKind::Intelligence)).round()
        }
        EffectKind::Shield => (value
            * attribute_bonus(caster.intelligence, BonusKind::Intelligence)
            * attribute_bonus(caster.defense, BonusKind::Defense))
        .round(),
        EffectKind::MpDrain | EffectKind::Stun | EffectKind::Buff | EffectKind::Debuff => value,
    }
}

/// Applies raw damage to a unit, consuming shield first. Returns the
/// damage that reached hp.
pub fn apply_damage(target: &mut CombatUnit, amount: f64) -> f64 {
    let mut remaining = amount.max(0.0);
    if let Some(shield) = target.stats.shield.as_mut() {
        let absorbed = shield.current.min(remaining);
        shield.current -= absorbed;
        remaining -= absorbed;
    }
    target.stats.hp.spend(remaining);
    remaining
}

/// Mutates the target per effect kind with the finalized value. Effects
/// with a duration are attached for per-round ticking.
pub fn apply_effect(target: &mut CombatUnit, effect: &EffectSpec, value: f64) {
    if effect.duration > 0 {
        let mut attached = effect.clone();
        attached.value = value;
        target.attach_effect(attached);
    }

    match effect.kind {
        EffectKind::Damage => {
            apply_damage(target, value);
        }
        EffectKind::Heal | EffectKind::HealOverTime => {
            target.stats.hp.gain(value);
        }
        EffectKind::MpRestore => {
            if let Some(mp) = target.stats.mp.as_mut() {
                mp.gain(value);
            }
        }
        EffectKind::MpDrain => {
            if let Some(mp) = target.stats.mp.as_mut() {
                mp.spend(value);
            }
        }
        EffectKind::Shield => {
            let shield = target.stats.shield.get_or_insert(Resource { current: 0.0, max: 0.0 });
            shield.current += value;
            shield.max = shield.max.max(shield.current);
        }
        EffectKind::Buff | EffectKind::Debuff => {
            effect.apply_stat_modifiers(&mut target.stats);
        }
        // Attach-only kinds: the status entry itself is the effect.
        EffectKind::DamageOverTime | EffectKind::Stun => {}
    }
}

/// Whether an effect of this kind helps its own caster (and therefore
/// lands on the caster when no explicit target is given).
pub fn is_self_targeted(kind: EffectKind) -> bool {
    matches!(
        kind,
        EffectKind::Buff
            | EffectKind::Heal
            | EffectKind::HealOverTime
            | EffectKind::MpRestore
            | EffectKind::Shield
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Faction, HexPos, ModifierOp};
    use std::collections::BTreeMap;

    fn unit(hp: f64, attack: f64, defense: f64) -> CombatUnit {
        CombatUnit::new("u", Faction::Player, HexPos::new(0, 0), UnitStats::basic(hp, attack, defense, 5.0))
    }

    fn damage_spec(value: f64) -> EffectSpec {
        EffectSpec {
            id: "dmg".to_string(),
            name: "Damage".to_string(),
            kind: EffectKind::Damage,
            value,
            duration: 0,
            damage_type: Some(DamageType::Physical),
            modifiers: BTreeMap::new(),
            modifier_op: ModifierOp::Add,
            falloff: None,
        }
    }

    #[test]
    fn test_basic_attack_damage_floor() {
        let attacker = UnitStats::basic(100.0, 50.0, 0.0, 1.0);
        let defender = UnitStats::basic(100.0, 0.0, 10.0, 1.0);
        assert_eq!(basic_attack_damage(&attacker, &defender), 47.0);

        // Heavily armored defender still takes at least 1.
        let tank = UnitStats::basic(100.0, 0.0, 500.0, 1.0);
        assert_eq!(basic_attack_damage(&attacker, &tank), 1.0);
    }

    #[test]
    fn test_skill_damage_is_deterministic_per_seed() {
        let caster = unit(100.0, 40.0, 0.0);
        let target = unit(100.0, 0.0, 20.0);
        let spec = damage_spec(30.0);

        let mut rng_a = DeterministicRng::new("abc:1:op0");
        let mut rng_b = DeterministicRng::new("abc:1:op0");
        let a = effect_value(&caster.stats, &target.stats, &spec, 1, &mut rng_a);
        let b = effect_value(&caster.stats, &target.stats, &spec, 1, &mut rng_b);
        assert_eq!(a, b);
        assert!(a > 0.0);
    }

    #[test]
    fn test_falloff_reduces_value_beyond_range() {
        let caster = unit(100.0, 0.0, 0.0);
        let target = unit(100.0, 0.0, 0.0);
        let mut spec = damage_spec(100.0);
        spec.damage_type = None;
        spec.falloff =
            Some(crate::models::DamageFalloff { full_damage_range: 2, min_damage_percent: 0.6 });

        let mut rng = DeterministicRng::new("s");
        let near = effect_value(&caster.stats, &target.stats, &spec, 2, &mut rng);
        let mut rng = DeterministicRng::new("s");
        let far = effect_value(&caster.stats, &target.stats, &spec, 3, &mut rng);
        assert!(far < near, "far {} should be below near {}", far, near);
    }

    #[test]
    fn test_shield_absorbs_before_hp() {
        let mut target = unit(100.0, 0.0, 0.0);
        target.stats.shield = Some(Resource { current: 30.0, max: 30.0 });

        let to_hp = apply_damage(&mut target, 50.0);
        assert_eq!(to_hp, 20.0);
        assert_eq!(target.stats.shield.unwrap().current, 0.0);
        assert_eq!(target.stats.hp.current, 80.0);
    }

    #[test]
    fn test_apply_effect_attaches_durable_effects() {
        let mut target = unit(100.0, 0.0, 0.0);
        let spec = EffectSpec {
            id: "venom".to_string(),
            name: "Venom".to_string(),
            kind: EffectKind::DamageOverTime,
            value: 8.0,
            duration: 3,
            damage_type: None,
            modifiers: BTreeMap::new(),
            modifier_op: ModifierOp::Add,
            falloff: None,
        };
        apply_effect(&mut target, &spec, 8.0);
        assert_eq!(target.stats.hp.current, 100.0, "DoT has no immediate tick");
        assert_eq!(target.status_effects.len(), 1);
    }

    #[test]
    fn test_heal_is_clamped_at_max() {
        let mut target = unit(100.0, 0.0, 0.0);
        target.stats.hp.current = 90.0;
        let spec = EffectSpec {
            id: "heal".to_string(),
            name: "Heal".to_string(),
            kind: EffectKind::Heal,
            value: 50.0,
            duration: 0,
            damage_type: None,
            modifiers: BTreeMap::new(),
            modifier_op: ModifierOp::Add,
            falloff: None,
        };
        apply_effect(&mut target, &spec, 50.0);
        assert_eq!(target.stats.hp.current, 100.0);
    }
}
