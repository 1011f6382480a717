//! 多序列同步记录
//!
//! 每个方向持有五条序列；窗口与阈值成对：任一方变化时，若另一方已引导，
//! 就在同一时刻重写另一方的最后取值，使两张图逐点对齐。

use std::io;
use std::sync::{Arc, Mutex};

use crate::app::Direction;
use crate::error::{Result, TraceError};
use crate::sim::SimTime;
use tracing::debug;

use super::bus::MetricBus;
use super::metric::{Metric, MetricChange};
use super::series::MetricSeries;
use super::writer::TraceWriter;

/// 一个方向的五条序列
#[derive(Debug)]
pub struct DirectionSeries {
    window: MetricSeries,
    threshold: MetricSeries,
    rtt: MetricSeries,
    ack: MetricSeries,
    cong_state: MetricSeries,
}

impl DirectionSeries {
    /// 用 `open` 为每个指标创建输出
    pub fn open<F>(mut open: F) -> io::Result<Self>
    where
        F: FnMut(Metric) -> io::Result<TraceWriter>,
    {
        Ok(Self {
            window: MetricSeries::new(Metric::Window, open(Metric::Window)?),
            threshold: MetricSeries::new(Metric::Threshold, open(Metric::Threshold)?),
            rtt: MetricSeries::new(Metric::Rtt, open(Metric::Rtt)?),
            ack: MetricSeries::new(Metric::Ack, open(Metric::Ack)?),
            cong_state: MetricSeries::new(Metric::CongState, open(Metric::CongState)?),
        })
    }

    pub fn series(&self, metric: Metric) -> &MetricSeries {
        match metric {
            Metric::Window => &self.window,
            Metric::Threshold => &self.threshold,
            Metric::Rtt => &self.rtt,
            Metric::Ack => &self.ack,
            Metric::CongState => &self.cong_state,
        }
    }

    fn series_mut(&mut self, metric: Metric) -> &mut MetricSeries {
        match metric {
            Metric::Window => &mut self.window,
            Metric::Threshold => &mut self.threshold,
            Metric::Rtt => &mut self.rtt,
            Metric::Ack => &mut self.ack,
            Metric::CongState => &mut self.cong_state,
        }
    }

    pub fn record(&mut self, now: SimTime, change: &MetricChange) -> io::Result<()> {
        let metric = change.metric();
        let (old, new) = change.values();
        self.series_mut(metric).record(now, old, new)?;
        if let Some(other) = metric.paired() {
            self.series_mut(other).echo_last(now)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        for metric in Metric::ALL {
            self.series_mut(metric).flush()?;
        }
        Ok(())
    }
}

/// 追踪上下文：两个方向各自的序列，互不引用
#[derive(Debug, Default)]
pub struct Instrumentation {
    dirs: [Option<DirectionSeries>; 2],
}

impl Instrumentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dir: Direction, series: DirectionSeries) {
        self.dirs[dir.index()] = Some(series);
    }

    pub fn get(&self, dir: Direction) -> Option<&DirectionSeries> {
        self.dirs[dir.index()].as_ref()
    }

    /// 记录一次通知；该方向未开启追踪时忽略
    pub fn record(&mut self, dir: Direction, now: SimTime, change: &MetricChange) -> Result<()> {
        match self.dirs[dir.index()].as_mut() {
            Some(series) => series.record(now, change).map_err(TraceError::from),
            None => {
                debug!(?dir, ?change, "方向未开启追踪，忽略通知");
                Ok(())
            }
        }
    }

    /// 把共享上下文的句柄挂到该方向的五个指标上
    pub fn attach(ctx: &Arc<Mutex<Instrumentation>>, bus: &mut MetricBus, dir: Direction) {
        for metric in Metric::ALL {
            let ctx = Arc::clone(ctx);
            bus.on_metric_changed(dir, metric, move |now, change| {
                let mut guard = ctx.lock().map_err(|_| TraceError::Poisoned)?;
                guard.record(dir, now, change)
            });
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        for series in self.dirs.iter_mut().flatten() {
            series.flush()?;
        }
        Ok(())
    }
}
