use crate::app::{ByteCounter, Direction, ThroughputAggregator, TrafficGenerator};
use crate::net::{Address, Connection, ConnectionError, NodeId, Unit};
use crate::scenario::{FlowState, UldlWorld};
use crate::sim::{SimTime, Simulator};
use crate::trace::{MetricChange, TraceWriter};
use std::any::Any;
use std::sync::{Arc, Mutex};

/// Connection that records every unit it accepts.
#[derive(Default)]
pub struct RecordingConn {
    pub sends: Arc<Mutex<Vec<Unit>>>,
    pub closes: Arc<Mutex<usize>>,
    pub fail_bind: bool,
    /// Once this many units have been accepted, every send fails with the given error.
    pub fail_after: Option<(usize, ConnectionError)>,
    pub queued: Vec<MetricChange>,
    pub open: bool,
}

impl RecordingConn {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Connection for RecordingConn {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn bind(&mut self) -> Result<(), ConnectionError> {
        if self.fail_bind {
            return Err(ConnectionError::Closed);
        }
        self.open = true;
        Ok(())
    }

    fn connect(&mut self, _peer: Address) -> Result<(), ConnectionError> {
        Ok(())
    }

    fn send(&mut self, unit: Unit, _sim: &mut Simulator) -> Result<(), ConnectionError> {
        let mut sends = self.sends.lock().expect("sends lock");
        if let Some((limit, err)) = &self.fail_after {
            if sends.len() >= *limit {
                return Err(err.clone());
            }
        }
        sends.push(unit);
        Ok(())
    }

    fn close(&mut self, _sim: &mut Simulator) {
        self.open = false;
        *self.closes.lock().expect("closes lock") += 1;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn drain_metric_changes(&mut self) -> Vec<MetricChange> {
        std::mem::take(&mut self.queued)
    }
}

pub fn peer() -> Address {
    Address::new(NodeId(4), 20000)
}

/// World with a single flow in `dir`, driven by `conn`.
pub fn world_with(dir: Direction, generator: TrafficGenerator, conn: RecordingConn) -> UldlWorld {
    let mut world = UldlWorld::default();
    world.insert_flow(
        dir,
        FlowState {
            generator,
            conn: Box::new(conn),
            counter: ByteCounter::default(),
            aggregator: ThroughputAggregator::new(dir, TraceWriter::sink()),
        },
    );
    world
}

pub fn send_times(sends: &Arc<Mutex<Vec<Unit>>>) -> Vec<SimTime> {
    sends
        .lock()
        .expect("sends lock")
        .iter()
        .map(|u| u.sent_at)
        .collect()
}
