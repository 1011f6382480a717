//! Connection-facing API used by traffic generators.

use std::any::Any;

use crate::sim::{SimTime, Simulator};
use crate::trace::MetricChange;

use super::Address;

/// One application write handed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit {
    pub size_bytes: u32,
    /// Simulated send timestamp, for latency measurement downstream.
    pub sent_at: SimTime,
}

/// Failures surfaced by a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("socket already bound")]
    AlreadyBound,
    #[error("socket is not bound")]
    NotBound,
    #[error("socket is not connected")]
    NotConnected,
    #[error("socket is closed")]
    Closed,
    #[error("send buffer full: requested {requested} bytes, {available} available")]
    BufferFull { requested: u64, available: u64 },
}

/// Minimal connection API for the traffic generator.
///
/// Implementations own whatever transport state they need; the generator
/// only drives the lifecycle and writes units.
pub trait Connection: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn bind(&mut self) -> Result<(), ConnectionError>;
    fn connect(&mut self, peer: Address) -> Result<(), ConnectionError>;
    fn send(&mut self, unit: Unit, sim: &mut Simulator) -> Result<(), ConnectionError>;
    fn close(&mut self, sim: &mut Simulator);
    fn is_open(&self) -> bool;

    /// Drain state-change notifications queued since the last call, in the
    /// order they happened. Connections without observable state have none.
    fn drain_metric_changes(&mut self) -> Vec<MetricChange> {
        Vec::new()
    }
}
