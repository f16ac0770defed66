//! Local mirror of the authoritative boss decision algorithm.
//!
//! `decide` must reproduce the server's choice exactly: same seed, same
//! candidate ordering, same weighted walk. Any drift here turns every
//! prediction into a rollback.

use std::collections::HashMap;

use crate::catalog::BossPhase;
use crate::engine::rng::{decision_seed, weighted_pick, DeterministicRng};
use crate::models::{BossDecision, CombatUnit, DecisionTarget, HexPos};

/// Read-only view of the boss used for a decision.
#[derive(Debug, Clone)]
pub struct BossView {
    pub current_hp: f64,
    pub max_hp: f64,
    pub skill_cooldowns: HashMap<String, u32>,
}

impl BossView {
    pub fn of(unit: &CombatUnit) -> Self {
        Self {
            current_hp: unit.stats.hp.current,
            max_hp: unit.stats.hp.max,
            skill_cooldowns: unit.skill_cooldowns.clone(),
        }
    }

    pub fn hp_ratio(&self) -> f64 {
        if self.max_hp > 0.0 {
            self.current_hp / self.max_hp
        } else {
            0.0
        }
    }
}

/// Read-only view of one candidate target.
#[derive(Debug, Clone)]
pub struct TargetView {
    pub unit_id: String,
    pub position: HexPos,
    pub current_hp: f64,
    pub max_hp: f64,
}

impl TargetView {
    pub fn of(unit: &CombatUnit) -> Self {
        Self {
            unit_id: unit.id.clone(),
            position: unit.position,
            current_hp: unit.stats.hp.current,
            max_hp: unit.stats.hp.max,
        }
    }
}

/// Decides the boss action for a round. Pure; all randomness comes from
/// the decision seed `{game_seed}:{round}`.
pub fn decide(
    game_seed: &str,
    round: u32,
    boss: &BossView,
    targets: &[TargetView],
    boss_position: HexPos,
    phase: Option<&BossPhase>,
) -> BossDecision {
    let mut rng = DeterministicRng::new(&decision_seed(game_seed, round));

    let living: Vec<&TargetView> = targets.iter().filter(|t| t.current_hp > 0.0).collect();
    let Some(nearest) = nearest_target(&living, boss_position) else {
        return BossDecision::Standby;
    };

    let available: Vec<&crate::catalog::SkillPriority> = phase
        .map(|p| {
            p.skill_priorities
                .iter()
                .filter(|s| boss.skill_cooldowns.get(&s.skill_id).copied().unwrap_or(0) == 0)
                .collect()
        })
        .unwrap_or_default();

    if !available.is_empty() {
        let roll = rng.next();
        if let Some(pick) = weighted_pick(&available, |s| s.priority, roll) {
            return BossDecision::UseSkill {
                skill_id: pick.skill_id.clone(),
                target: DecisionTarget::new(nearest.unit_id.clone()),
            };
        }
    }

    BossDecision::Attack { target: DecisionTarget::new(nearest.unit_id.clone()) }
}

/// Nearest living target by hex distance; ties keep the earlier entry so
/// both sides resolve them identically from the same input order.
fn nearest_target<'a>(living: &[&'a TargetView], from: HexPos) -> Option<&'a TargetView> {
    let mut best: Option<&TargetView> = None;
    for target in living {
        match best {
            None => best = Some(target),
            Some(current) => {
                if target.position.distance(&from) < current.position.distance(&from) {
                    best = Some(target);
                }
            }
        }
    }
    best
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsistencyTolerance {
    /// Accept a different target for the same action, e.g. when the
    /// predicted target died before the server decided.
    pub target_change: bool,
}

/// Field-level consistency check between a predicted and an
/// authoritative decision.
pub fn is_consistent(
    predicted: &BossDecision,
    server: &BossDecision,
    tolerance: ConsistencyTolerance,
) -> bool {
    match (predicted, server) {
        (
            BossDecision::UseSkill { skill_id: a, target: ta },
            BossDecision::UseSkill { skill_id: b, target: tb },
        ) => a == b && (ta == tb || tolerance.target_change),
        (BossDecision::Attack { target: ta }, BossDecision::Attack { target: tb }) => {
            ta == tb || tolerance.target_change
        }
        (BossDecision::Move { position: pa }, BossDecision::Move { position: pb }) => pa == pb,
        (BossDecision::Standby, BossDecision::Standby) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BossPhase, SkillPriority};
    use proptest::prelude::*;

    fn boss_view(cooldowns: &[(&str, u32)]) -> BossView {
        BossView {
            current_hp: 500.0,
            max_hp: 500.0,
            skill_cooldowns: cooldowns
                .iter()
                .map(|(id, cd)| (id.to_string(), *cd))
                .collect(),
        }
    }

    fn target(id: &str, q: i32, r: i32, hp: f64) -> TargetView {
        TargetView { unit_id: id.to_string(), position: HexPos::new(q, r), current_hp: hp, max_hp: 100.0 }
    }

    fn phase(priorities: &[(&str, f64)]) -> BossPhase {
        BossPhase {
            name: "phase1".to_string(),
            hp_threshold: 1.0,
            skill_priorities: priorities
                .iter()
                .map(|(id, p)| SkillPriority { skill_id: id.to_string(), priority: *p })
                .collect(),
        }
    }

    #[test]
    fn test_no_living_target_means_standby() {
        let boss = boss_view(&[]);
        let targets = [target("a", 1, 0, 0.0), target("b", 2, 0, 0.0)];
        let decision = decide("abc", 1, &boss, &targets, HexPos::new(0, 0), None);
        assert_eq!(decision, BossDecision::Standby);
    }

    #[test]
    fn test_nearest_living_target_chosen_with_input_order_ties() {
        let boss = boss_view(&[]);
        // "far" is dead, "near_b" ties "near_a" on distance.
        let targets =
            [target("far", 5, 0, 50.0), target("near_a", 1, 0, 50.0), target("near_b", 0, 1, 50.0)];
        let decision = decide("abc", 1, &boss, &targets, HexPos::new(0, 0), None);
        assert_eq!(
            decision,
            BossDecision::Attack { target: DecisionTarget::new("near_a") },
            "ties must resolve to the earlier input entry"
        );
    }

    #[test]
    fn test_all_skills_on_cooldown_falls_back_to_attack() {
        let boss = boss_view(&[("skill_crush", 2), ("skill_roar", 1)]);
        let targets = [target("hero", 1, 0, 80.0)];
        let p = phase(&[("skill_crush", 2.0), ("skill_roar", 1.0)]);
        for round in 0..50 {
            let decision = decide("abc", round, &boss, &targets, HexPos::new(0, 0), Some(&p));
            assert!(
                matches!(decision, BossDecision::Attack { .. }),
                "round {}: expected attack, got {:?}",
                round,
                decision
            );
        }
    }

    #[test]
    fn test_available_skill_is_used() {
        let boss = boss_view(&[("skill_crush", 0)]);
        let targets = [target("hero", 1, 0, 80.0)];
        let p = phase(&[("skill_crush", 1.0)]);
        let decision = decide("abc", 1, &boss, &targets, HexPos::new(0, 0), Some(&p));
        assert_eq!(
            decision,
            BossDecision::UseSkill {
                skill_id: "skill_crush".to_string(),
                target: DecisionTarget::new("hero"),
            }
        );
    }

    #[test]
    fn test_decision_is_deterministic_per_seed_and_round() {
        let boss = boss_view(&[("skill_crush", 0), ("skill_roar", 0)]);
        let targets = [target("hero", 1, 0, 80.0), target("mage", 2, 0, 60.0)];
        let p = phase(&[("skill_crush", 1.0), ("skill_roar", 3.0)]);
        for round in 0..20 {
            let a = decide("seed-x", round, &boss, &targets, HexPos::new(0, 0), Some(&p));
            let b = decide("seed-x", round, &boss, &targets, HexPos::new(0, 0), Some(&p));
            assert_eq!(a, b, "round {} diverged", round);
        }
    }

    #[test]
    fn test_consistency_check() {
        let tolerate = ConsistencyTolerance { target_change: true };
        let strict = ConsistencyTolerance::default();

        let a = BossDecision::Attack { target: DecisionTarget::new("hero") };
        let b = BossDecision::Attack { target: DecisionTarget::new("mage") };
        assert!(is_consistent(&a, &b, tolerate));
        assert!(!is_consistent(&a, &b, strict));

        let skill_a = BossDecision::UseSkill {
            skill_id: "skill_crush".to_string(),
            target: DecisionTarget::new("hero"),
        };
        let skill_b = BossDecision::UseSkill {
            skill_id: "skill_roar".to_string(),
            target: DecisionTarget::new("hero"),
        };
        assert!(!is_consistent(&skill_a, &skill_b, tolerate), "skill id must match");
        assert!(!is_consistent(&a, &skill_a, tolerate), "action kind must match");

        let move_a = BossDecision::Move { position: HexPos::new(1, 1) };
        let move_b = BossDecision::Move { position: HexPos::new(1, 2) };
        assert!(!is_consistent(&move_a, &move_b, tolerate), "move position is exact");
        assert!(is_consistent(&move_a, &move_a.clone(), strict));
    }

    proptest! {
        #[test]
        fn prop_standby_for_any_seed_when_no_living_targets(seed in "[a-z0-9]{1,16}", round in 0u32..500) {
            let boss = boss_view(&[]);
            let targets = [target("a", 1, 0, 0.0)];
            let decision = decide(&seed, round, &boss, &targets, HexPos::new(0, 0), None);
            prop_assert_eq!(decision, BossDecision::Standby);
        }

        #[test]
        fn prop_never_use_skill_when_all_on_cooldown(seed in "[a-z0-9]{1,16}", round in 0u32..500) {
            let boss = boss_view(&[("skill_crush", 1), ("skill_roar", 3)]);
            let targets = [target("hero", 1, 0, 50.0)];
            let p = phase(&[("skill_crush", 2.0), ("skill_roar", 5.0)]);
            let decision = decide(&seed, round, &boss, &targets, HexPos::new(0, 0), Some(&p));
            let used_skill = matches!(decision, BossDecision::UseSkill { .. });
            prop_assert!(!used_skill, "cooldowns were all positive, got {:?}", decision);
        }
    }
}
