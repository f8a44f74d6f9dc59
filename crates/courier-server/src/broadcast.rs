//! Fan-out to many sessions.

use std::sync::Arc;

use courier_core::{Envelope, Event};
use courier_telemetry::metrics::record_broadcast_failures;
use futures_util::future::join_all;
use tracing::warn;

use crate::error::{BroadcastError, BroadcastFailure, Result};
use crate::session::Session;

/// Sends `event` on `channel` to every target concurrently.
///
/// The event is encoded once. Every failed target is reported in one
/// [`BroadcastError`]; targets that did receive the event keep it.
pub async fn broadcast<T: Event>(channel: &str, event: &T, targets: &[Arc<Session>]) -> Result<()> {
    if targets.is_empty() {
        return Ok(());
    }
    let envelope = Envelope::from_event(channel, event)?;
    broadcast_envelope(&envelope, targets).await
}

/// Sends a prepared envelope to every target concurrently.
pub async fn broadcast_envelope(envelope: &Envelope, targets: &[Arc<Session>]) -> Result<()> {
    let results = join_all(targets.iter().map(|session| async move {
        (session.id(), session.send_envelope(envelope).await)
    }))
    .await;

    let failures: Vec<BroadcastFailure> = results
        .into_iter()
        .filter_map(|(session, result)| result.err().map(|error| BroadcastFailure { session, error }))
        .collect();

    if failures.is_empty() {
        return Ok(());
    }

    record_broadcast_failures(&envelope.channel, failures.len());
    warn!(
        channel = %envelope.channel,
        event = %envelope.name,
        failed = failures.len(),
        targets = targets.len(),
        "Broadcast partially failed"
    );
    Err(BroadcastError { failures }.into())
}
