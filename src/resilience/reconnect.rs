//! Shared connection slot with one-shot reconnect.
//!
//! # Responsibilities
//! - Hold the current connection and its Disconnected/Connecting/Connected state
//! - Serialize connection attempts so concurrent callers share one connect
//! - Retry a call once on a fresh connection after a transport failure
//!
//! # Design Decisions
//! - Every established connection gets a generation number. A failed caller
//!   only resets the slot if its generation is still current, so a connection
//!   another caller just re-established survives.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use crate::chain::types::{ChainResult, ConnectionStatus};
use crate::config::NetworkName;
use crate::observability::metrics;
use crate::resilience::with_timeout;

enum SlotState<K> {
    Disconnected,
    Connecting,
    Connected { generation: u64, connection: K },
}

struct Slot<K> {
    state: SlotState<K>,
    generations: u64,
}

/// Connection slot for one network.
pub struct Reconnector<K> {
    network: NetworkName,
    slot: Mutex<Slot<K>>,
    /// Serializes connection attempts.
    gate: tokio::sync::Mutex<()>,
}

impl<K: Clone> Reconnector<K> {
    pub fn new(network: NetworkName) -> Self {
        Self {
            network,
            slot: Mutex::new(Slot {
                state: SlotState::Disconnected,
                generations: 0,
            }),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        match &self.lock().state {
            SlotState::Disconnected => ConnectionStatus::Disconnected,
            SlotState::Connecting => ConnectionStatus::Connecting,
            SlotState::Connected { .. } => ConnectionStatus::Connected,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot<K>> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn current(&self) -> Option<(u64, K)> {
        match &self.lock().state {
            SlotState::Connected {
                generation,
                connection,
            } => Some((*generation, connection.clone())),
            _ => None,
        }
    }

    fn set_state(&self, state: SlotState<K>) {
        let connected = matches!(state, SlotState::Connected { .. });
        self.lock().state = state;
        metrics::record_chain_connected(self.network.as_str(), connected);
    }

    /// Return the live connection and its generation, opening one with `connect` if needed.
    pub async fn connection<C, CF>(&self, connect: C) -> ChainResult<(u64, K)>
    where
        C: FnOnce() -> CF,
        CF: Future<Output = ChainResult<K>>,
    {
        if let Some(current) = self.current() {
            return Ok(current);
        }

        let _gate = self.gate.lock().await;
        // Another caller may have connected while we waited.
        if let Some(current) = self.current() {
            return Ok(current);
        }

        self.set_state(SlotState::Connecting);
        match connect().await {
            Ok(connection) => {
                let generation = {
                    let mut slot = self.lock();
                    slot.generations += 1;
                    slot.generations
                };
                self.set_state(SlotState::Connected {
                    generation,
                    connection: connection.clone(),
                });
                Ok((generation, connection))
            }
            Err(e) => {
                self.set_state(SlotState::Disconnected);
                Err(e)
            }
        }
    }

    /// Drop the connection if `generation` is still the live one.
    ///
    /// Returns whether the slot was reset.
    pub fn invalidate(&self, generation: u64) -> bool {
        let reset = {
            let mut slot = self.lock();
            let live = matches!(
                slot.state,
                SlotState::Connected { generation: current, .. } if current == generation
            );
            if live {
                slot.state = SlotState::Disconnected;
            }
            live
        };
        if reset {
            metrics::record_chain_connected(self.network.as_str(), false);
        }
        reset
    }

    /// Run `call` with a deadline, reconnecting and retrying once on a transport failure.
    pub async fn call<T, C, CF, F, Fut>(
        &self,
        connect: C,
        operation: &'static str,
        limit: Duration,
        call: F,
    ) -> ChainResult<T>
    where
        C: Fn() -> CF,
        CF: Future<Output = ChainResult<K>>,
        F: Fn(K) -> Fut,
        Fut: Future<Output = ChainResult<T>>,
    {
        let (generation, connection) = self.connection(&connect).await?;
        match with_timeout(operation, limit, call(connection)).await {
            Err(e) if e.is_connection() => {
                tracing::warn!(
                    network = %self.network,
                    operation,
                    generation,
                    error = %e,
                    "Connection lost, reconnecting"
                );
                self.invalidate(generation);
                let (_, connection) = self.connection(&connect).await?;
                with_timeout(operation, limit, call(connection)).await
            }
            other => other,
        }
    }
}
