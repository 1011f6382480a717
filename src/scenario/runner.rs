//! 场景搭建与运行
//!
//! 拓扑固定为 远端主机 <-> 终端 两个节点；每个方向一条 TCP 连接，
//! 数据走本方向的瓶颈链路，ACK 走反方向的链路参数。

use std::io;
use std::sync::{Arc, Mutex};

use crate::app::{
    ChangeRate, Direction, StartGenerator, StopGenerator, ThroughputAggregator, ThroughputSample,
    TrafficGenerator,
};
use crate::error::{Result, TraceError};
use crate::net::{Address, Link, NodeId};
use crate::proto::tcp::TcpSocket;
use crate::sim::{SimTime, Simulator};
use crate::trace::{DirectionSeries, Instrumentation, TraceWriter};
use tracing::{info, instrument};

use super::config::{LinkConfig, ScenarioConfig};
use super::world::{FlowState, UldlWorld};

/// 远端主机节点（下行发送端）
pub const REMOTE_HOST: NodeId = NodeId(2);
/// 终端节点（上行发送端）
pub const UE: NodeId = NodeId(4);

pub const DL_SINK_PORT: u16 = 20000;
pub const UL_SINK_PORT: u16 = 30000;

/// 某方向的 (本端, 对端) 地址
pub fn endpoints(dir: Direction) -> (Address, Address) {
    match dir {
        Direction::Downlink => (
            Address::new(REMOTE_HOST, 49153),
            Address::new(UE, DL_SINK_PORT),
        ),
        Direction::Uplink => (Address::new(UE, 49153), Address::new(REMOTE_HOST, UL_SINK_PORT)),
    }
}

fn make_link(cfg: &LinkConfig) -> Link {
    Link::new(SimTime::from_secs_f64(cfg.latency_ms / 1e3), cfg.rate.bps())
        .with_capacity_bytes(cfg.capacity_bytes())
}

/// 单个方向的运行结果
#[derive(Debug, Clone)]
pub struct FlowSummary {
    pub dir: Direction,
    pub units_sent: u64,
    /// 发送缓冲已满而丢弃的单元
    pub units_dropped: u64,
    pub bytes_received: u64,
    pub last_sample: Option<ThroughputSample>,
    pub samples: u64,
    pub dropped_pkts: u64,
    pub retransmits: u64,
    pub timeouts: u64,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub end: SimTime,
    pub flows: Vec<FlowSummary>,
}

/// 搭建好的场景
pub struct Scenario {
    cfg: ScenarioConfig,
    sim: Simulator,
    world: UldlWorld,
    instrumentation: Arc<Mutex<Instrumentation>>,
}

impl Scenario {
    /// 在 `out_dir` 下创建追踪文件
    pub fn build(cfg: ScenarioConfig) -> Result<Self> {
        std::fs::create_dir_all(&cfg.out_dir)?;
        let paths = cfg.clone();
        Self::build_with(cfg, move |dir, tag| TraceWriter::create(paths.trace_path(dir, tag)))
    }

    /// 由 `open(方向, 标签)` 提供每个追踪输出
    #[instrument(skip_all, fields(prefix = %cfg.prefix_name, transport = %cfg.transport_prot))]
    pub fn build_with<F>(cfg: ScenarioConfig, mut open: F) -> Result<Self>
    where
        F: FnMut(Direction, &str) -> io::Result<TraceWriter>,
    {
        cfg.validate()?;

        let mut sim = Simulator::default();
        let mut world = UldlWorld::default();
        let instrumentation = Arc::new(Mutex::new(Instrumentation::new()));

        let app_start = SimTime::from_secs_f64(cfg.app_start_s);
        let app_stop = SimTime::from_secs_f64(cfg.app_stop_s);

        for dir in cfg.directions() {
            let flow_cfg = cfg.flow(dir);
            let reverse = match dir {
                Direction::Downlink => &cfg.uplink.link,
                Direction::Uplink => &cfg.downlink.link,
            };
            let (local, peer) = endpoints(dir);

            let mut generator = TrafficGenerator::new(dir);
            generator.configure(
                peer,
                flow_cfg.unit_size_bytes,
                flow_cfg.total_units,
                flow_cfg.rate,
            )?;

            let conn = TcpSocket::new(
                dir,
                local,
                cfg.tcp.clone(),
                make_link(&flow_cfg.link),
                make_link(reverse),
            );

            let mut aggregator = ThroughputAggregator::new(dir, open(dir, "tp")?);
            aggregator.start(
                &mut sim,
                SimTime::from_secs_f64(cfg.sample_start_s),
                SimTime::from_secs_f64(cfg.sample_interval_s),
                app_start,
            )?;

            world.insert_flow(
                dir,
                FlowState {
                    generator,
                    conn: Box::new(conn),
                    counter: Default::default(),
                    aggregator,
                },
            );

            sim.schedule(app_start, StartGenerator { dir });
            sim.schedule(app_stop, StopGenerator { dir });
            for change in &flow_cfg.rate_changes {
                sim.schedule(
                    SimTime::from_secs_f64(change.at_s),
                    ChangeRate {
                        dir,
                        rate: change.rate,
                    },
                );
            }

            if cfg.trace_metrics {
                let series = DirectionSeries::open(|metric| open(dir, metric.file_tag()))?;
                instrumentation
                    .lock()
                    .map_err(|_| TraceError::Poisoned)?
                    .insert(dir, series);
                Instrumentation::attach(&instrumentation, &mut world.bus, dir);
            }

            info!(
                ?dir,
                %local,
                %peer,
                rate = %flow_cfg.rate,
                link_rate = %flow_cfg.link.rate,
                queue_pkts = flow_cfg.link.queue_pkts,
                "方向已配置"
            );
        }

        Ok(Self {
            cfg,
            sim,
            world,
            instrumentation,
        })
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.cfg
    }

    pub fn world(&self) -> &UldlWorld {
        &self.world
    }

    pub fn instrumentation(&self) -> &Arc<Mutex<Instrumentation>> {
        &self.instrumentation
    }

    /// 运行到 `sim_stop_s`，刷新全部追踪输出并汇总
    pub fn run(&mut self) -> Result<RunSummary> {
        let until = SimTime::from_secs_f64(self.cfg.sim_stop_s);
        info!(until = %until, "▶️  运行上下行场景");
        self.sim.run_until(until, &mut self.world);

        let mut flows = Vec::new();
        for dir in self.cfg.directions() {
            let Some(flow) = self.world.flow_mut(dir) else {
                continue;
            };
            flow.aggregator.flush()?;
            let mut summary = FlowSummary {
                dir,
                units_sent: flow.generator.units_sent(),
                units_dropped: flow.generator.units_dropped(),
                bytes_received: flow.counter.total_bytes(),
                last_sample: flow.aggregator.last_sample(),
                samples: flow.aggregator.sample_count(),
                dropped_pkts: 0,
                retransmits: 0,
                timeouts: 0,
            };
            if let Some(sock) = flow.conn.as_any_mut().downcast_mut::<TcpSocket>() {
                let stats = sock.stats();
                summary.dropped_pkts = sock.dropped_pkts();
                summary.retransmits = stats.retransmits;
                summary.timeouts = stats.timeouts;
            }
            flows.push(summary);
        }
        self.instrumentation
            .lock()
            .map_err(|_| TraceError::Poisoned)?
            .flush()?;

        info!(end = %self.sim.now(), "✅ 场景结束");
        Ok(RunSummary {
            end: self.sim.now(),
            flows,
        })
    }
}
