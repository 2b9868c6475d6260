// ============================================
// File: crates/shdc-engine/src/dispatch.rs
// ============================================
//! # Shared Dispatch Pipeline
//!
//! ## Creation Reason
//! Both engines run every inbound datagram through the same sequence:
//! decode, resolve the expected signer, verify the signature, then the
//! replay check. Only then does role-specific handling open the AEAD
//! payload.
//!
//! ## Last Modified
//! v0.1.0 - Initial dispatch helpers

use tracing::debug;

use shdc_core::crypto::IdentityPublicKey;
use shdc_core::error::Result as CoreResult;
use shdc_core::protocol::Packet;
use shdc_core::replay::ReplayGuard;

use crate::error::EngineError;
use crate::hooks::EventHooks;
use crate::stats::EngineStats;

/// Verifies the packet signature and runs the replay check, in that
/// order. The replay entry is only recorded for packets whose
/// signature held, so attackers cannot poison the nonce set.
pub(crate) fn verify_and_guard(
    packet: &Packet,
    signer: &IdentityPublicKey,
    replay: &ReplayGuard,
) -> CoreResult<()> {
    packet.verify(signer)?;
    replay.check_and_insert(
        packet.header.device_id,
        packet.header.nonce,
        packet.header.timestamp,
    )
}

/// Drop-and-log path for a failed packet: classify into the stats
/// counters, log at debug, and surface through the error hook.
pub(crate) fn drop_packet(
    err: EngineError,
    context: &'static str,
    stats: &EngineStats,
    hooks: &EventHooks,
) {
    match &err {
        EngineError::Core(core) => stats.record_core_drop(core),
        _ => stats.record_state_drop(),
    }
    debug!(%err, context, "Dropped packet");
    hooks.fire_error(&err, context);
}
