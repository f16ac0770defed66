//! Field-level comparison of a predicted result against the
//! authoritative one.
//!
//! Pure data in, pure data out. A mismatch is not an error; the caller
//! decides whether to roll back.

use serde::{Deserialize, Serialize};

use crate::engine::executor::ActionResult;

/// Allowed absolute drift on resource deltas. Both sides compute in
/// binary floating point from the same inputs, so anything beyond
/// rounding noise is a real divergence.
pub const RESOURCE_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub is_valid: bool,
    /// Human-readable description of each divergent field.
    pub differences: Vec<String>,
}

impl Reconciliation {
    fn valid() -> Self {
        Self { is_valid: true, differences: Vec::new() }
    }
}

fn within_tolerance(a: f64, b: f64) -> bool {
    (a - b).abs() <= RESOURCE_TOLERANCE
}

/// Compares the locally predicted result with the server's.
///
/// Success flag and cooldown must match exactly; mp/hp/stamina costs
/// match within [`RESOURCE_TOLERANCE`]; effects are compared in order on
/// target id, effect id, kind and applied flag.
pub fn compare(local: &ActionResult, server: &ActionResult) -> Reconciliation {
    let mut differences = Vec::new();

    if local.success != server.success {
        differences
            .push(format!("success: local {} vs server {}", local.success, server.success));
    }
    if local.cooldown_set != server.cooldown_set {
        differences.push(format!(
            "cooldown_set: local {} vs server {}",
            local.cooldown_set, server.cooldown_set
        ));
    }

    let pairs = [
        ("mp", local.resources_consumed.mp, server.resources_consumed.mp),
        ("hp", local.resources_consumed.hp, server.resources_consumed.hp),
        ("stamina", local.resources_consumed.stamina, server.resources_consumed.stamina),
    ];
    for (name, l, s) in pairs {
        if !within_tolerance(l, s) {
            differences.push(format!("resources_consumed.{}: local {} vs server {}", name, l, s));
        }
    }

    if local.effects.len() != server.effects.len() {
        differences.push(format!(
            "effects: local count {} vs server count {}",
            local.effects.len(),
            server.effects.len()
        ));
    } else {
        for (i, (l, s)) in local.effects.iter().zip(&server.effects).enumerate() {
            if l.target_id != s.target_id
                || l.effect_id != s.effect_id
                || l.kind != s.kind
                || l.applied != s.applied
            {
                differences.push(format!(
                    "effects[{}]: local {}/{}/{:?}/{} vs server {}/{}/{:?}/{}",
                    i,
                    l.target_id,
                    l.effect_id,
                    l.kind,
                    l.applied,
                    s.target_id,
                    s.effect_id,
                    s.kind,
                    s.applied
                ));
            }
        }
    }

    if differences.is_empty() {
        Reconciliation::valid()
    } else {
        Reconciliation { is_valid: false, differences }
    }
}
