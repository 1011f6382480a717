//! 指标订阅
//!
//! 连接的状态变化以 `(方向, 指标)` 为键分发给订阅者，
//! 取代按字符串路径挂接回调的方式。

use std::fmt;

use crate::app::Direction;
use crate::error::Result;
use crate::sim::SimTime;
use tracing::trace;

use super::metric::{Metric, MetricChange};

/// 指标变化回调
pub type MetricHandler = Box<dyn FnMut(SimTime, &MetricChange) -> Result<()> + Send>;

/// 按 (方向, 指标) 注册的回调表
#[derive(Default)]
pub struct MetricBus {
    subs: Vec<(Direction, Metric, MetricHandler)>,
}

impl MetricBus {
    /// 订阅某方向上某个指标的变化
    pub fn on_metric_changed<F>(&mut self, dir: Direction, metric: Metric, handler: F)
    where
        F: FnMut(SimTime, &MetricChange) -> Result<()> + Send + 'static,
    {
        self.subs.push((dir, metric, Box::new(handler)));
    }

    pub fn subscriber_count(&self, dir: Direction, metric: Metric) -> usize {
        self.subs
            .iter()
            .filter(|(d, m, _)| *d == dir && *m == metric)
            .count()
    }

    /// 按注册顺序调用所有匹配的回调；全部调用完后返回第一个错误。
    pub fn publish(&mut self, now: SimTime, dir: Direction, change: &MetricChange) -> Result<()> {
        let metric = change.metric();
        trace!(?dir, ?metric, ?change, "发布指标变化");
        let mut first_err = None;
        for (d, m, handler) in self.subs.iter_mut() {
            if *d != dir || *m != metric {
                continue;
            }
            if let Err(e) = handler(now, change) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for MetricBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricBus")
            .field("subscriptions", &self.subs.len())
            .finish()
    }
}
