//! Registry of speculative operations with confirm, rollback and
//! retention handling.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SnapshotError;
use crate::models::CombatState;

/// Confirmed entries kept for diagnostics before being pruned.
pub const RETAINED_CONFIRMED: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    UseSkill,
    Attack,
    Move,
    Standby,
}

/// Reverts the combat model to the snapshot captured before the
/// operation ran. Consumes the snapshot; callable at most once.
pub type RollbackFn = Box<dyn FnOnce(&mut CombatState) -> Result<(), SnapshotError>>;

pub struct PendingOperation {
    pub id: String,
    pub kind: OperationKind,
    pub timestamp_ms: i64,
    /// Monotonic sequence index, shared across all actors; doubles as the
    /// per-operation RNG sub-seed source.
    pub sequence: u64,
    pub payload: serde_json::Value,
    pub confirmed: bool,
    rollback: Option<RollbackFn>,
}

impl fmt::Debug for PendingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOperation")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("timestamp_ms", &self.timestamp_ms)
            .field("sequence", &self.sequence)
            .field("confirmed", &self.confirmed)
            .finish()
    }
}

#[derive(Default)]
pub struct OperationLedger {
    ops: HashMap<String, PendingOperation>,
    next_sequence: u64,
    confirmed_order: VecDeque<String>,
}

impl OperationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the next globally shared sequence index. Strictly
    /// increasing across every actor and round.
    pub fn next_sequence_index(&mut self) -> u64 {
        let index = self.next_sequence;
        self.next_sequence += 1;
        index
    }

    /// Stores a speculative operation and returns its id.
    pub fn register(
        &mut self,
        kind: OperationKind,
        sequence: u64,
        payload: serde_json::Value,
        rollback: RollbackFn,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let op = PendingOperation {
            id: id.clone(),
            kind,
            timestamp_ms: Utc::now().timestamp_millis(),
            sequence,
            payload,
            confirmed: false,
            rollback: Some(rollback),
        };
        log::debug!("registered operation {} (seq {})", id, sequence);
        self.ops.insert(id.clone(), op);
        id
    }

    /// Marks an operation confirmed and prunes old confirmed entries,
    /// keeping only the [`RETAINED_CONFIRMED`] most recent. Unknown ids
    /// are a logged no-op.
    pub fn confirm(&mut self, id: &str) -> bool {
        let Some(op) = self.ops.get_mut(id) else {
            log::warn!("confirm: unknown operation {}", id);
            return false;
        };
        if op.confirmed {
            return true;
        }
        op.confirmed = true;
        self.confirmed_order.push_back(id.to_string());
        while self.confirmed_order.len() > RETAINED_CONFIRMED {
            if let Some(old) = self.confirmed_order.pop_front() {
                self.ops.remove(&old);
            }
        }
        true
    }

    /// Runs the stored rollback closure and deletes the entry. Unknown
    /// ids and failing closures return `false` and are logged; the entry
    /// is removed even when the closure fails, because leaving a
    /// half-rolled-back operation in the ledger is worse than losing its
    /// bookkeeping.
    pub fn rollback(&mut self, id: &str, state: &mut CombatState) -> bool {
        let Some(mut op) = self.ops.remove(id) else {
            log::warn!("rollback: unknown operation {}", id);
            return false;
        };
        self.confirmed_order.retain(|c| c != id);

        match op.rollback.take() {
            None => {
                log::warn!("rollback: operation {} has no snapshot left", id);
                false
            }
            Some(restore) => match restore(state) {
                Ok(()) => {
                    log::debug!("rolled back operation {} (seq {})", id, op.sequence);
                    true
                }
                Err(err) => {
                    log::warn!("rollback of operation {} failed: {}", id, err);
                    false
                }
            },
        }
    }

    /// All unconfirmed operations, ordered by timestamp ascending
    /// (sequence breaks millisecond ties).
    pub fn pending(&self) -> Vec<&PendingOperation> {
        let mut pending: Vec<&PendingOperation> =
            self.ops.values().filter(|op| !op.confirmed).collect();
        pending.sort_by_key(|op| (op.timestamp_ms, op.sequence));
        pending
    }

    pub fn is_confirmed(&self, id: &str) -> bool {
        self.ops.get(id).map(|op| op.confirmed).unwrap_or(false)
    }

    pub fn get(&self, id: &str) -> Option<&PendingOperation> {
        self.ops.get(id)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
