//! 单条指标时间序列

use std::io;

use crate::sim::SimTime;

use super::metric::{Metric, TraceValue};
use super::writer::TraceWriter;

/// 一个 (方向, 指标) 的追踪序列
#[derive(Debug)]
pub struct MetricSeries {
    metric: Metric,
    bootstrapped: bool,
    last_value: Option<TraceValue>,
    out: TraceWriter,
}

impl MetricSeries {
    /// 没有引导行的指标（ack、拥塞状态）从一开始就视为已引导。
    pub fn new(metric: Metric, out: TraceWriter) -> Self {
        Self {
            metric,
            bootstrapped: !metric.has_bootstrap_row(),
            last_value: None,
            out,
        }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    pub fn last_value(&self) -> Option<TraceValue> {
        self.last_value
    }

    pub fn rows(&self) -> u64 {
        self.out.rows()
    }

    /// 处理一次 `(old, new)` 通知：必要时先写 `(0.0, old)`，再写 `(now, new)`。
    pub fn record(&mut self, now: SimTime, old: TraceValue, new: TraceValue) -> io::Result<()> {
        if !self.bootstrapped {
            self.out.write_row(0.0, old)?;
            self.bootstrapped = true;
        }
        self.out.write_row(now.as_secs_f64(), new)?;
        self.last_value = Some(new);
        Ok(())
    }

    /// 成对指标变更时，在 `now` 重写本序列的最后取值；未引导时什么也不写。
    ///
    /// 不改变引导状态，也不算作本序列的一次通知。
    pub fn echo_last(&mut self, now: SimTime) -> io::Result<bool> {
        if !self.bootstrapped {
            return Ok(false);
        }
        let Some(v) = self.last_value else {
            return Ok(false);
        };
        self.out.write_row(now.as_secs_f64(), v)?;
        Ok(true)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
