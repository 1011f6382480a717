//! 场景世界
//!
//! 每个方向一套状态（生成器、连接、接收计数、吞吐采样），外加指标订阅表。

use std::any::Any;

use crate::app::{ByteCounter, Direction, ThroughputAggregator, TrafficGenerator};
use crate::net::Connection;
use crate::sim::{SimTime, Simulator, World};
use crate::trace::MetricBus;
use tracing::warn;

/// 一个方向拥有的全部状态
pub struct FlowState {
    pub generator: TrafficGenerator,
    pub conn: Box<dyn Connection>,
    pub counter: ByteCounter,
    pub aggregator: ThroughputAggregator,
}

/// 上下行场景的世界
#[derive(Default)]
pub struct UldlWorld {
    flows: [Option<FlowState>; 2],
    pub bus: MetricBus,
    publish_errors: u64,
}

impl UldlWorld {
    pub fn insert_flow(&mut self, dir: Direction, flow: FlowState) {
        self.flows[dir.index()] = Some(flow);
    }

    pub fn flow(&self, dir: Direction) -> Option<&FlowState> {
        self.flows[dir.index()].as_ref()
    }

    pub fn flow_mut(&mut self, dir: Direction) -> Option<&mut FlowState> {
        self.flows[dir.index()].as_mut()
    }

    pub fn publish_errors(&self) -> u64 {
        self.publish_errors
    }

    /// 把各连接排队的状态变化按发生顺序分发给订阅者
    pub fn publish_pending(&mut self, now: SimTime) {
        for dir in Direction::ALL {
            let Some(flow) = self.flows[dir.index()].as_mut() else {
                continue;
            };
            for change in flow.conn.drain_metric_changes() {
                if let Err(e) = self.bus.publish(now, dir, &change) {
                    self.publish_errors += 1;
                    warn!(?dir, ?change, error = %e, "指标追踪写入失败");
                }
            }
        }
    }
}

impl World for UldlWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_tick(&mut self, sim: &mut Simulator) {
        self.publish_pending(sim.now());
    }
}

pub(crate) fn uldl_world(world: &mut dyn World) -> &mut UldlWorld {
    world
        .as_any_mut()
        .downcast_mut::<UldlWorld>()
        .expect("world must be UldlWorld")
}
