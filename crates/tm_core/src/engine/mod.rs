//! Prediction, speculative execution and reconciliation machinery.

pub mod executor;
pub mod ledger;
pub mod orchestrator;
pub mod predictor;
pub mod reconcile;
pub mod resolve;
pub mod rng;
pub mod snapshot;

pub use executor::{
    execute_optimistically, settle, ActionResult, AppliedEffect, ExecutionOutcome,
    SpeculativeAction,
};
pub use ledger::{OperationKind, OperationLedger, PendingOperation, RollbackFn, RETAINED_CONFIRMED};
pub use orchestrator::{PredictedRecord, PredictionOrchestrator, VerifyOutcome};
pub use predictor::{decide, is_consistent, BossView, ConsistencyTolerance, TargetView};
pub use reconcile::{compare, Reconciliation, RESOURCE_TOLERANCE};
pub use rng::{decision_seed, operation_seed, weighted_pick, DeterministicRng};
pub use snapshot::{capture, restore, CombatSnapshot, UnitSnapshot};
