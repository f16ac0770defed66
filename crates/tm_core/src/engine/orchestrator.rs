//! Stateful façade tying predictor, executor, ledger and reconciliation
//! together.
//!
//! Per (round, actor) key the lifecycle is: absent → predicted →
//! confirmed or rolled back. Both terminal transitions remove the record
//! and release the actor's gate.

use std::collections::HashMap;

use crate::catalog::{BossPhaseConfig, SkillCatalog};
use crate::engine::executor::{self, ActionResult, SpeculativeAction};
use crate::engine::ledger::{OperationLedger, PendingOperation};
use crate::engine::predictor::{self, BossView, ConsistencyTolerance, TargetView};
use crate::models::{BossDecision, CombatState, Faction};

/// A stored speculative guess for one actor in one round.
#[derive(Debug)]
pub struct PredictedRecord {
    pub round: u32,
    pub actor_id: String,
    pub decision: BossDecision,
    /// Absent when the speculative execution failed a precondition; the
    /// guess is then display-only and there is nothing to roll back.
    pub operation_id: Option<String>,
    pub result: Option<ActionResult>,
}

/// Terminal report of a `verify` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Nothing was predicted for this key; apply the server result as-is.
    NoPrediction,
    /// Prediction matched; the speculative mutation stands.
    Confirmed,
    /// Prediction diverged; the speculative mutation was reverted.
    RolledBack,
}

pub struct PredictionOrchestrator {
    catalog: SkillCatalog,
    phases: BossPhaseConfig,
    ledger: OperationLedger,
    predictions: HashMap<(u32, String), PredictedRecord>,
}

impl PredictionOrchestrator {
    pub fn new(catalog: SkillCatalog, phases: BossPhaseConfig) -> Self {
        Self { catalog, phases, ledger: OperationLedger::new(), predictions: HashMap::new() }
    }

    /// Predicts the boss action for `round` and applies it speculatively.
    ///
    /// Never fails: an execution problem is logged and degrades to either
    /// a display-only guess (precondition failure) or no prediction at
    /// all (snapshot failure). A prior record for the same key has its
    /// speculative operation rolled back before being replaced.
    pub fn predict(&mut self, state: &mut CombatState, round: u32) -> Option<BossDecision> {
        let boss_id = state.boss()?.id.clone();

        // A stale record for this key still owns a live speculative
        // mutation; revert it before predicting on the reverted model,
        // otherwise the overwrite would orphan its ledger entry.
        if let Some(old) = self.predictions.remove(&(round, boss_id.clone())) {
            if let Some(op_id) = &old.operation_id {
                log::debug!(
                    "re-predicting {} round {}: rolling back stale operation {}",
                    boss_id,
                    round,
                    op_id
                );
                self.ledger.rollback(op_id, state);
            }
        }

        let boss = state.unit(&boss_id)?;
        let boss_position = boss.position;
        let boss_view = BossView::of(boss);
        let targets: Vec<TargetView> =
            state.living_units_of(Faction::Player).map(TargetView::of).collect();
        let phase = self.phases.phase_for_hp(boss_view.hp_ratio()).cloned();

        let decision = predictor::decide(
            &state.game_seed,
            round,
            &boss_view,
            &targets,
            boss_position,
            phase.as_ref(),
        );

        let action =
            SpeculativeAction::Boss { actor_id: boss_id.clone(), decision: decision.clone() };
        let game_seed = state.game_seed.clone();
        let record = match executor::execute_optimistically(
            state,
            &self.catalog,
            &mut self.ledger,
            &action,
            &game_seed,
            round,
        ) {
            Ok(outcome) => PredictedRecord {
                round,
                actor_id: boss_id.clone(),
                decision: decision.clone(),
                operation_id: Some(outcome.operation_id),
                result: Some(outcome.result),
            },
            Err(err) if err.left_model_untouched() => {
                log::debug!("prediction for {} round {} not applied: {}", boss_id, round, err);
                PredictedRecord {
                    round,
                    actor_id: boss_id.clone(),
                    decision: decision.clone(),
                    operation_id: None,
                    result: None,
                }
            }
            Err(err) => {
                log::warn!("prediction for {} round {} skipped: {}", boss_id, round, err);
                return None;
            }
        };

        self.predictions.insert((round, boss_id), record);
        Some(decision)
    }

    /// Settles the prediction for `(round, actor_id)` against the
    /// authoritative decision.
    ///
    /// `on_rollback` is invoked with (predicted, server) when the guess
    /// diverged, after the model has been reverted, so the caller can run
    /// compensating presentation work.
    pub fn verify(
        &mut self,
        state: &mut CombatState,
        round: u32,
        actor_id: &str,
        server_decision: &BossDecision,
        on_rollback: Option<&mut dyn FnMut(&BossDecision, &BossDecision)>,
    ) -> VerifyOutcome {
        let key = (round, actor_id.to_string());
        let Some(record) = self.predictions.remove(&key) else {
            return VerifyOutcome::NoPrediction;
        };

        let tolerance = ConsistencyTolerance { target_change: true };
        if predictor::is_consistent(&record.decision, server_decision, tolerance) {
            if let Some(op_id) = &record.operation_id {
                self.ledger.confirm(op_id);
            }
            executor::settle(state, actor_id);
            log::debug!("prediction confirmed for {} round {}", actor_id, round);
            return VerifyOutcome::Confirmed;
        }

        if let Some(op_id) = &record.operation_id {
            self.ledger.rollback(op_id, state);
        }
        executor::settle(state, actor_id);
        log::info!(
            "prediction rolled back for {} round {}: predicted {:?}, server {:?}",
            actor_id,
            round,
            record.decision,
            server_decision
        );
        if let Some(callback) = on_rollback {
            callback(&record.decision, server_decision);
        }
        VerifyOutcome::RolledBack
    }

    /// Drops a stored prediction without touching the model or ledger.
    pub fn clear(&mut self, round: u32, actor_id: &str) {
        self.predictions.remove(&(round, actor_id.to_string()));
    }

    /// The unconfirmed guess for a key, for display purposes.
    pub fn predicted_action(&self, round: u32, actor_id: &str) -> Option<&BossDecision> {
        self.predictions.get(&(round, actor_id.to_string())).map(|r| &r.decision)
    }

    pub fn pending_operations(&self) -> Vec<&PendingOperation> {
        self.ledger.pending()
    }

    pub fn is_confirmed(&self, operation_id: &str) -> bool {
        self.ledger.is_confirmed(operation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CombatUnit, DecisionTarget, HexPos, Stance, UnitStats};

    fn arena() -> (CombatState, PredictionOrchestrator) {
        let hero = CombatUnit::new(
            "hero",
            Faction::Player,
            HexPos::new(1, 0),
            UnitStats::basic(120.0, 30.0, 10.0, 7.0),
        );
        let boss = CombatUnit::new(
            "boss",
            Faction::Boss,
            HexPos::new(0, 0),
            UnitStats::basic(800.0, 60.0, 25.0, 6.0),
        )
        .with_skills(vec!["skill_crush".to_string()]);
        let state = CombatState::new("abc").with_units(vec![hero, boss]);
        let orchestrator =
            PredictionOrchestrator::new(SkillCatalog::builtin(), BossPhaseConfig::default());
        (state, orchestrator)
    }

    #[test]
    fn test_predict_applies_and_stores_record() {
        let (mut state, mut orchestrator) = arena();
        let decision = orchestrator.predict(&mut state, 1).expect("boss present");

        // No phase config, so the fallback is a basic attack on the hero.
        assert_eq!(decision, BossDecision::Attack { target: DecisionTarget::new("hero") });
        assert!(state.unit("hero").unwrap().stats.hp.current < 120.0);
        assert_eq!(orchestrator.predicted_action(1, "boss"), Some(&decision));
        assert_eq!(orchestrator.pending_operations().len(), 1);
    }

    #[test]
    fn test_verify_without_prediction() {
        let (mut state, mut orchestrator) = arena();
        let outcome = orchestrator.verify(&mut state, 1, "boss", &BossDecision::Standby, None);
        assert_eq!(outcome, VerifyOutcome::NoPrediction);
    }

    #[test]
    fn test_verify_confirms_matching_decision() {
        let (mut state, mut orchestrator) = arena();
        let decision = orchestrator.predict(&mut state, 1).unwrap();
        let hp_after_prediction = state.unit("hero").unwrap().stats.hp.current;

        let outcome = orchestrator.verify(&mut state, 1, "boss", &decision, None);
        assert_eq!(outcome, VerifyOutcome::Confirmed);
        assert_eq!(
            state.unit("hero").unwrap().stats.hp.current,
            hp_after_prediction,
            "confirmed speculation must stand"
        );
        assert_eq!(state.unit("boss").unwrap().stance, Stance::Idle, "gate released");
        assert!(orchestrator.predicted_action(1, "boss").is_none(), "record is terminal");
        assert!(orchestrator.pending_operations().is_empty());
    }

    #[test]
    fn test_verify_rolls_back_divergent_decision() {
        let (mut state, mut orchestrator) = arena();
        let reference = state.clone();
        let predicted = orchestrator.predict(&mut state, 1).unwrap();

        let server = BossDecision::Move { position: HexPos::new(5, 5) };
        let mut seen = None;
        let mut callback = |p: &BossDecision, s: &BossDecision| {
            seen = Some((p.clone(), s.clone()));
        };
        let outcome = orchestrator.verify(&mut state, 1, "boss", &server, Some(&mut callback));

        assert_eq!(outcome, VerifyOutcome::RolledBack);
        assert_eq!(state, reference, "model must be back to the pre-prediction snapshot");
        assert_eq!(seen, Some((predicted, server)));
        assert!(orchestrator.predicted_action(1, "boss").is_none());
    }

    #[test]
    fn test_target_change_is_tolerated() {
        let (mut state, mut orchestrator) = arena();
        state.units.push(CombatUnit::new(
            "mage",
            Faction::Player,
            HexPos::new(4, 0),
            UnitStats::basic(80.0, 10.0, 5.0, 5.0),
        ));
        orchestrator.predict(&mut state, 1).unwrap();

        let server = BossDecision::Attack { target: DecisionTarget::new("mage") };
        let outcome = orchestrator.verify(&mut state, 1, "boss", &server, None);
        assert_eq!(outcome, VerifyOutcome::Confirmed, "same action on another target is fine");
    }

    #[test]
    fn test_clear_drops_record_without_touching_model() {
        let (mut state, mut orchestrator) = arena();
        orchestrator.predict(&mut state, 1).unwrap();
        let after_prediction = state.clone();

        orchestrator.clear(1, "boss");
        assert!(orchestrator.predicted_action(1, "boss").is_none());
        assert_eq!(state, after_prediction);
    }

    #[test]
    fn test_repredicting_a_key_replaces_the_speculative_operation() {
        let (mut state, mut orchestrator) = arena();
        let first = orchestrator.predict(&mut state, 1).unwrap();
        let after_first = state.clone();
        let second = orchestrator.predict(&mut state, 1).unwrap();

        // Deterministic seed: the re-prediction lands on the same
        // decision and the same model, through a fresh ledger entry.
        assert_eq!(first, second);
        assert_eq!(state, after_first);
        assert_eq!(orchestrator.pending_operations().len(), 1, "stale entry must not leak");
    }

    #[test]
    fn test_divergent_verify_after_repredict_still_reverts_the_model() {
        let (mut state, mut orchestrator) = arena();
        let reference = state.clone();
        orchestrator.predict(&mut state, 1).unwrap();
        orchestrator.predict(&mut state, 1).unwrap();

        let outcome = orchestrator.verify(&mut state, 1, "boss", &BossDecision::Standby, None);
        assert_eq!(outcome, VerifyOutcome::RolledBack);
        assert_eq!(
            state.unit("hero").unwrap().stats.hp.current,
            reference.unit("hero").unwrap().stats.hp.current,
            "rollback must revert the speculative damage"
        );
        assert_eq!(state, reference);
        assert!(orchestrator.pending_operations().is_empty());
    }

    #[test]
    fn test_predict_without_boss_is_none() {
        let (mut state, mut orchestrator) = arena();
        state.units.retain(|u| u.faction != Faction::Boss);
        assert!(orchestrator.predict(&mut state, 1).is_none());
    }
}
