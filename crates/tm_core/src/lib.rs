//! # tm_core - Optimistic Action Execution and Rollback Core
//!
//! Client-side speculation engine for the Tactical Monster battle mode.
//! The client predicts the authoritative server's decisions with a shared
//! deterministic random source, applies them to the local combat model
//! immediately, and reconciles when the real result arrives: confirmed
//! predictions stand, divergent ones are rolled back to a pre-action
//! snapshot.
//!
//! ## Features
//! - 100% deterministic prediction (same seed = same decision)
//! - Snapshot-based rollback with a bounded operation ledger
//! - Field-level reconciliation of predicted vs authoritative results
//! - JSON-loadable skill and boss-phase configuration

// Game APIs sometimes need many parameters for seed, round and actor context
#![allow(clippy::too_many_arguments)]

pub mod catalog;
pub mod engine;
pub mod error;
pub mod models;

pub use catalog::{BossPhase, BossPhaseConfig, ResourceCost, Skill, SkillCatalog, SkillPriority};
pub use engine::{
    ActionResult, AppliedEffect, BossView, CombatSnapshot, ConsistencyTolerance, DeterministicRng,
    OperationLedger, PendingOperation, PredictionOrchestrator, Reconciliation, SpeculativeAction,
    TargetView, VerifyOutcome,
};
pub use error::{CatalogError, ExecutionError, SnapshotError};
pub use models::{
    BossDecision, CombatState, CombatUnit, DecisionTarget, EffectKind, EffectSpec, Faction, HexPos,
    Resource, Stance, UnitStats,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
