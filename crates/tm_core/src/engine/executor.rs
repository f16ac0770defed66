//! Speculative execution of actions against the local combat model.
//!
//! Every action runs the same shape: precondition gate, snapshot, ledger
//! sequence, per-operation RNG, exactly one mutation branch, rollback
//! closure, registration. A precondition failure happens before the
//! snapshot and leaves the model untouched.

use serde::{Deserialize, Serialize};

use crate::catalog::{ResourceCost, Skill, SkillCatalog};
use crate::engine::ledger::{OperationKind, OperationLedger};
use crate::engine::resolve;
use crate::engine::rng::{operation_seed, DeterministicRng};
use crate::engine::snapshot;
use crate::error::ExecutionError;
use crate::models::{BossDecision, CombatState, CombatUnit, EffectKind, Stance};

/// An action the client wants to apply ahead of the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpeculativeAction {
    Skill { caster_id: String, skill_id: String, target_ids: Vec<String> },
    Boss { actor_id: String, decision: BossDecision },
}

impl SpeculativeAction {
    pub fn actor_id(&self) -> &str {
        match self {
            SpeculativeAction::Skill { caster_id, .. } => caster_id,
            SpeculativeAction::Boss { actor_id, .. } => actor_id,
        }
    }

    fn operation_kind(&self) -> OperationKind {
        match self {
            SpeculativeAction::Skill { .. } => OperationKind::UseSkill,
            SpeculativeAction::Boss { decision, .. } => match decision {
                BossDecision::UseSkill { .. } => OperationKind::UseSkill,
                BossDecision::Attack { .. } => OperationKind::Attack,
                BossDecision::Move { .. } => OperationKind::Move,
                BossDecision::Standby => OperationKind::Standby,
            },
        }
    }
}

/// One effect application within an action, in cast order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedEffect {
    pub target_id: String,
    pub effect_id: String,
    pub kind: EffectKind,
    pub applied: bool,
    pub value: f64,
}

/// What the speculative run believes the server will report back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    pub cooldown_set: u32,
    pub resources_consumed: ResourceCost,
    pub effects: Vec<AppliedEffect>,
}

impl ActionResult {
    fn noop(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            cooldown_set: 0,
            resources_consumed: ResourceCost::default(),
            effects: Vec::new(),
        }
    }
}

/// A registered speculative operation and its predicted result.
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub operation_id: String,
    pub result: ActionResult,
}

/// Runs an action speculatively. On success the model reflects the
/// predicted outcome, the actor is gated `Acting`, and the ledger holds a
/// rollback closure over the pre-action snapshot.
pub fn execute_optimistically(
    state: &mut CombatState,
    catalog: &SkillCatalog,
    ledger: &mut OperationLedger,
    action: &SpeculativeAction,
    game_seed: &str,
    round: u32,
) -> Result<ExecutionOutcome, ExecutionError> {
    let actor_id = action.actor_id();
    let actor = state
        .unit(actor_id)
        .cloned()
        .ok_or_else(|| ExecutionError::ActorNotFound { id: actor_id.to_string() })?;

    check_actor_gate(&actor)?;
    if let Some(skill_id) = action_skill_id(action) {
        let skill = catalog
            .get(skill_id)
            .ok_or_else(|| ExecutionError::UnknownSkill { id: skill_id.to_string() })?;
        check_skill_preconditions(&actor, skill)?;
    }

    // Preconditions passed; from here on the snapshot covers every write.
    let snap = snapshot::capture(state)?;
    let sequence = ledger.next_sequence_index();
    let mut rng = DeterministicRng::new(&operation_seed(game_seed, round, sequence));

    if let Some(unit) = state.unit_mut(actor_id) {
        unit.stance = Stance::Acting;
    }

    let result = match action {
        SpeculativeAction::Skill { caster_id, skill_id, target_ids } => {
            let skill = catalog
                .get(skill_id)
                .ok_or_else(|| ExecutionError::UnknownSkill { id: skill_id.to_string() })?;
            apply_skill(state, caster_id, skill, target_ids, &mut rng)
        }
        SpeculativeAction::Boss { actor_id, decision } => match decision {
            BossDecision::UseSkill { skill_id, target } => {
                let skill = catalog
                    .get(skill_id)
                    .ok_or_else(|| ExecutionError::UnknownSkill { id: skill_id.to_string() })?;
                apply_skill(state, actor_id, skill, &[target.unit_id.clone()], &mut rng)
            }
            BossDecision::Attack { target } => apply_basic_attack(state, actor_id, &target.unit_id),
            BossDecision::Move { position } => {
                if let Some(unit) = state.unit_mut(actor_id) {
                    unit.position = *position;
                }
                ActionResult::noop(format!("{} moved to {:?}", actor_id, position))
            }
            BossDecision::Standby => ActionResult::noop(format!("{} stands by", actor_id)),
        },
    };

    let payload = serde_json::json!({
        "action": action,
        "round": round,
        "result": result,
    });
    let operation_id = ledger.register(
        action.operation_kind(),
        sequence,
        payload,
        Box::new(move |s| {
            snapshot::restore(s, &snap);
            Ok(())
        }),
    );
    log::debug!("speculative {} for {} registered as {}", result.message, actor_id, operation_id);

    Ok(ExecutionOutcome { operation_id, result })
}

/// Releases the acting gate after the operation settled (confirmed or
/// rolled back). Rollback restores the pre-action stance on its own, so
/// this is only needed on the confirm path, but it is safe either way.
pub fn settle(state: &mut CombatState, actor_id: &str) {
    if let Some(unit) = state.unit_mut(actor_id) {
        unit.stance = Stance::Idle;
    }
}

fn action_skill_id(action: &SpeculativeAction) -> Option<&str> {
    match action {
        SpeculativeAction::Skill { skill_id, .. } => Some(skill_id),
        SpeculativeAction::Boss { decision: BossDecision::UseSkill { skill_id, .. }, .. } => {
            Some(skill_id)
        }
        SpeculativeAction::Boss { .. } => None,
    }
}

fn check_actor_gate(actor: &CombatUnit) -> Result<(), ExecutionError> {
    if !actor.is_alive() {
        return Err(ExecutionError::Precondition {
            reason: format!("{} is dead", actor.id),
        });
    }
    if !actor.is_idle() {
        return Err(ExecutionError::Precondition {
            reason: format!("{} already has an operation in flight", actor.id),
        });
    }
    if actor.is_stunned() {
        return Err(ExecutionError::Precondition { reason: format!("{} is stunned", actor.id) });
    }
    Ok(())
}

fn check_skill_preconditions(actor: &CombatUnit, skill: &Skill) -> Result<(), ExecutionError> {
    let remaining = actor.cooldown(&skill.id);
    if remaining > 0 {
        return Err(ExecutionError::Precondition {
            reason: format!("{} on cooldown for {} more rounds", skill.id, remaining),
        });
    }

    let cost = &skill.resource_cost;
    let mp_available = actor.stats.mp.map(|mp| mp.current).unwrap_or(0.0);
    if cost.mp > 0.0 && mp_available < cost.mp {
        return Err(ExecutionError::Precondition {
            reason: format!("not enough mp: {} < {}", mp_available, cost.mp),
        });
    }
    if cost.hp > 0.0 && actor.stats.hp.current <= cost.hp {
        return Err(ExecutionError::Precondition {
            reason: format!("not enough hp: {} <= {}", actor.stats.hp.current, cost.hp),
        });
    }
    if cost.stamina > 0.0 && actor.stats.stamina < cost.stamina {
        return Err(ExecutionError::Precondition {
            reason: format!("not enough stamina: {} < {}", actor.stats.stamina, cost.stamina),
        });
    }
    Ok(())
}

/// Pays costs, sets the cooldown and applies every effect in declared
/// order. Self-targeted effects land on the caster, the rest on each
/// requested target. Dead or absent targets are reported unapplied.
fn apply_skill(
    state: &mut CombatState,
    caster_id: &str,
    skill: &Skill,
    target_ids: &[String],
    rng: &mut DeterministicRng,
) -> ActionResult {
    // Frozen view of the caster for all value math; writes go through
    // unit_mut one unit at a time.
    let caster = state.unit(caster_id).cloned();
    let Some(caster) = caster else {
        return ActionResult {
            success: false,
            message: format!("caster {} vanished", caster_id),
            cooldown_set: 0,
            resources_consumed: ResourceCost::default(),
            effects: Vec::new(),
        };
    };

    let cost = skill.resource_cost;
    if let Some(unit) = state.unit_mut(caster_id) {
        if let Some(mp) = unit.stats.mp.as_mut() {
            mp.spend(cost.mp);
        }
        unit.stats.hp.spend(cost.hp);
        unit.stats.stamina = (unit.stats.stamina - cost.stamina).max(0.0);
        unit.skill_cooldowns.insert(skill.id.clone(), skill.cooldown);
    }

    let mut effects = Vec::new();
    for effect in &skill.effects {
        if resolve::is_self_targeted(effect.kind) {
            let value =
                resolve::effect_value(&caster.stats, &caster.stats, effect, 0, rng);
            let applied = match state.unit_mut(caster_id) {
                Some(unit) => {
                    resolve::apply_effect(unit, effect, value);
                    true
                }
                None => false,
            };
            effects.push(AppliedEffect {
                target_id: caster_id.to_string(),
                effect_id: effect.id.clone(),
                kind: effect.kind,
                applied,
                value,
            });
            continue;
        }

        for target_id in target_ids {
            let target = state.unit(target_id).cloned();
            let (applied, value) = match target {
                Some(ref t) if t.is_alive() => {
                    let distance = caster.position.distance(&t.position);
                    let value =
                        resolve::effect_value(&caster.stats, &t.stats, effect, distance, rng);
                    if let Some(unit) = state.unit_mut(target_id) {
                        resolve::apply_effect(unit, effect, value);
                        (true, value)
                    } else {
                        (false, 0.0)
                    }
                }
                _ => (false, 0.0),
            };
            effects.push(AppliedEffect {
                target_id: target_id.clone(),
                effect_id: effect.id.clone(),
                kind: effect.kind,
                applied,
                value,
            });
        }
    }

    ActionResult {
        success: true,
        message: format!("{} used {}", caster_id, skill.name),
        cooldown_set: skill.cooldown,
        resources_consumed: cost,
        effects,
    }
}

fn apply_basic_attack(state: &mut CombatState, attacker_id: &str, target_id: &str) -> ActionResult {
    let attacker_stats = state.unit(attacker_id).map(|u| u.stats.clone());
    let target_stats =
        state.unit(target_id).filter(|t| t.is_alive()).map(|t| t.stats.clone());

    let (applied, value) = match (attacker_stats, target_stats) {
        (Some(attacker), Some(target)) => {
            let damage = resolve::basic_attack_damage(&attacker, &target);
            if let Some(unit) = state.unit_mut(target_id) {
                resolve::apply_damage(unit, damage);
                (true, damage)
            } else {
                (false, 0.0)
            }
        }
        _ => (false, 0.0),
    };

    ActionResult {
        success: applied,
        message: format!("{} attacks {}", attacker_id, target_id),
        cooldown_set: 0,
        resources_consumed: ResourceCost::default(),
        effects: vec![AppliedEffect {
            target_id: target_id.to_string(),
            effect_id: "basic_attack".to_string(),
            kind: EffectKind::Damage,
            applied,
            value,
        }],
    }
}
