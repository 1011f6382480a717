//! 吞吐采样
//!
//! 周期性读取接收字节计数，计算两个速率并追加一行到吞吐追踪文件。
//! “瞬时”吞吐实际上是自 `baseline` 起的累计平均（计数从不清零），
//! 平均吞吐则以仿真零点为起点。

use std::io;

use crate::error::{Result, TraceError};
use crate::scenario::uldl_world;
use crate::sim::{Event, SimTime, Simulator, Timer, World};
use crate::trace::TraceWriter;
use tracing::{debug, info, warn};

use super::{ByteCounter, Direction};

/// `bytes * 8 / (secs * 1024 * 1024)`；`secs <= 0` 时为 0。
pub fn mbps(bytes: u64, secs: f64) -> f64 {
    if !(secs.is_finite() && secs > 0.0) {
        return 0.0;
    }
    (bytes as f64 * 8.0) / (secs * 1024.0 * 1024.0)
}

/// 一次吞吐采样
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputSample {
    pub t_s: f64,
    pub instantaneous_mbps: f64,
    pub average_mbps: f64,
}

impl ThroughputSample {
    pub fn compute(now: SimTime, baseline: SimTime, total_bytes: u64) -> Self {
        let t_s = now.as_secs_f64();
        let elapsed = t_s - baseline.as_secs_f64();
        Self {
            t_s,
            instantaneous_mbps: mbps(total_bytes, elapsed),
            average_mbps: mbps(total_bytes, t_s),
        }
    }
}

/// 吞吐聚合器（每个方向一个）
#[derive(Debug)]
pub struct ThroughputAggregator {
    dir: Direction,
    interval: SimTime,
    baseline: SimTime,
    timer: Timer,
    out: TraceWriter,
    last: Option<ThroughputSample>,
    sample_count: u64,
}

impl ThroughputAggregator {
    pub fn new(dir: Direction, out: TraceWriter) -> Self {
        Self {
            dir,
            interval: SimTime::from_secs(1),
            baseline: SimTime::ZERO,
            timer: Timer::default(),
            out,
            last: None,
            sample_count: 0,
        }
    }

    /// 在 `first_delay` 后进行第一次采样，此后每 `interval` 一次。
    pub fn start(
        &mut self,
        sim: &mut Simulator,
        first_delay: SimTime,
        interval: SimTime,
        baseline: SimTime,
    ) -> Result<()> {
        if interval == SimTime::ZERO {
            return Err(TraceError::invalid("sampling interval must be positive"));
        }
        self.interval = interval;
        self.baseline = baseline;
        self.timer.arm(sim, first_delay, SampleThroughput { dir: self.dir });
        debug!(dir = ?self.dir, ?first_delay, ?interval, ?baseline, "吞吐采样已启动");
        Ok(())
    }

    /// 取消后续采样
    pub fn stop(&mut self, sim: &mut Simulator) {
        self.timer.cancel(sim);
    }

    /// 采样一次并无条件地重新调度。仿真零点不产生记录。
    pub fn sample(
        &mut self,
        sim: &mut Simulator,
        counter: &ByteCounter,
    ) -> io::Result<Option<ThroughputSample>> {
        self.timer
            .arm(sim, self.interval, SampleThroughput { dir: self.dir });

        let now = sim.now();
        if now == SimTime::ZERO {
            debug!(dir = ?self.dir, "仿真零点，跳过吞吐采样");
            return Ok(None);
        }

        let sample = ThroughputSample::compute(now, self.baseline, counter.total_bytes());
        info!(
            dir = %self.dir,
            total_bytes = counter.total_bytes(),
            "Time: {}s\t{} Throughput: {} Mbps\tAverage Throughput: {} Mbps",
            sample.t_s,
            self.dir,
            sample.instantaneous_mbps,
            sample.average_mbps
        );
        self.last = Some(sample);
        self.sample_count += 1;
        self.out
            .write_throughput(sample.t_s, sample.instantaneous_mbps, sample.average_mbps)?;
        Ok(Some(sample))
    }

    /// 已写出的采样数（不含仿真零点被跳过的那次）
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn last_sample(&self) -> Option<ThroughputSample> {
        self.last
    }

    pub fn is_scheduled(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub(crate) fn timer_fired(&mut self) {
        self.timer.fired();
    }
}

/// 事件：吞吐采样
#[derive(Debug)]
pub struct SampleThroughput {
    pub dir: Direction,
}

impl Event for SampleThroughput {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SampleThroughput { dir } = *self;
        let w = uldl_world(world);
        let Some(flow) = w.flow_mut(dir) else {
            return;
        };
        flow.aggregator.timer_fired();
        if let Err(e) = flow.aggregator.sample(sim, &flow.counter) {
            warn!(?dir, error = %e, "写入吞吐记录失败");
        }
    }
}
