//! PPT invariant system: runtime invariant enforcement with contract tracking.
//!
//! With the `ppt` feature, every asserted invariant id is recorded so
//! integration tests can prove the pulse pipeline actually checked it.

#[cfg(feature = "ppt")]
use lazy_static::lazy_static;
#[cfg(feature = "ppt")]
use std::collections::HashSet;
#[cfg(feature = "ppt")]
use std::sync::Mutex;

// Invariant ids for contract tracking.
pub const RESIDUAL_BOUNDED: u32 = 1;
pub const PULSE_FREQUENCY_DERIVED: u32 = 2;
pub const PULSE_WITHIN_LIMITS: u32 = 3;
pub const PACKET_COMPLETE: u32 = 4;
pub const PACKET_VALID: u32 = 5;
pub const CADENCE_SCHEDULED: u32 = 6;
pub const FIRST_TICK_IDLE: u32 = 7;

#[cfg(feature = "ppt")]
lazy_static! {
    static ref INVARIANT_LOG: Mutex<HashSet<u32>> = Mutex::new(HashSet::new());
}

#[cfg(feature = "ppt")]
/// Assert an invariant: logs it and panics on failure.
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, context: Option<&str>) {
    if !condition {
        let full_message = if let Some(ctx) = context {
            format!("Invariant {} failed: {} (context: {})", id, message, ctx)
        } else {
            format!("Invariant {} failed: {}", id, message)
        };
        tracing::error!(target: "coyote", invariant = id, "{}", full_message);
        panic!("{}", full_message);
    }
    // A poisoned log only loses bookkeeping; keep recording.
    let mut log = match INVARIANT_LOG.lock() {
        Ok(log) => log,
        Err(poisoned) => poisoned.into_inner(),
    };
    log.insert(id);
}

#[cfg(not(feature = "ppt"))]
/// Invariants are compiled out without `ppt`.
#[inline(always)]
pub(crate) fn assert_invariant(_id: u32, _condition: bool, _message: &str, _context: Option<&str>) {}

#[cfg(feature = "ppt")]
/// Contract test: checks that specified invariants were asserted.
pub fn contract_test(test_name: &str, required_invariants: &[u32]) {
    let log = match INVARIANT_LOG.lock() {
        Ok(log) => log,
        Err(poisoned) => poisoned.into_inner(),
    };
    let missing: Vec<&str> = required_invariants
        .iter()
        .filter(|id| !log.contains(id))
        .map(|&id| invariant_name(id))
        .collect();
    drop(log); // Drop the lock before panicking
    if !missing.is_empty() {
        panic!(
            "Contract test '{}' failed: invariants not enforced: {:?}",
            test_name, missing
        );
    }
}

#[cfg(not(feature = "ppt"))]
/// Contract test: no-op when PPT feature is disabled.
pub fn contract_test(_test_name: &str, _required_invariants: &[u32]) {}

#[cfg(feature = "ppt")]
/// Clear invariant log (for between test runs).
pub fn clear_invariant_log() {
    if let Ok(mut log) = INVARIANT_LOG.lock() {
        log.clear();
    }
}

#[cfg(not(feature = "ppt"))]
/// Clear invariant log: no-op when PPT feature is disabled.
pub fn clear_invariant_log() {}

/// Maps invariant id to a readable name (diagnostics only).
pub const fn invariant_name(id: u32) -> &'static str {
    match id {
        RESIDUAL_BOUNDED => "RESIDUAL_BOUNDED",
        PULSE_FREQUENCY_DERIVED => "PULSE_FREQUENCY_DERIVED",
        PULSE_WITHIN_LIMITS => "PULSE_WITHIN_LIMITS",
        PACKET_COMPLETE => "PACKET_COMPLETE",
        PACKET_VALID => "PACKET_VALID",
        CADENCE_SCHEDULED => "CADENCE_SCHEDULED",
        FIRST_TICK_IDLE => "FIRST_TICK_IDLE",
        _ => "UNKNOWN",
    }
}
