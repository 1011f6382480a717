//! 链路类型
//!
//! 单向点到点瓶颈链路：串行化时延 + 传播时延 + 尾丢弃缓冲。

use crate::sim::SimTime;
use tracing::trace;

/// 单向链路
///
/// 不显式保存队列：排队字节数由 `busy_until` 与当前时间之差按带宽折算。
#[derive(Debug, Clone)]
pub struct Link {
    pub latency: SimTime,
    pub bandwidth_bps: u64,
    pub busy_until: SimTime,
    /// 缓冲容量（字节）；超过则尾丢弃
    pub capacity_bytes: u64,
    pub dropped_pkts: u64,
}

impl Link {
    /// 创建新链路（缓冲几乎无限）
    pub fn new(latency: SimTime, bandwidth_bps: u64) -> Self {
        Self {
            latency,
            bandwidth_bps,
            busy_until: SimTime::ZERO,
            capacity_bytes: u64::MAX,
            dropped_pkts: 0,
        }
    }

    pub fn with_capacity_bytes(mut self, capacity_bytes: u64) -> Self {
        self.capacity_bytes = capacity_bytes;
        self
    }

    /// 计算传输指定字节数所需的时间
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        // ceil(bytes*8 / bps) 秒 -> 纳秒
        if self.bandwidth_bps == 0 {
            return SimTime(u64::MAX / 4);
        }
        let bits = (bytes as u128).saturating_mul(8);
        let nanos = (bits.saturating_mul(1_000_000_000u128)
            + (self.bandwidth_bps as u128 - 1))
            / self.bandwidth_bps as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }

    /// 当前排队中的字节数（尚未开始串行化的部分）
    pub fn queued_bytes(&self, now: SimTime) -> u64 {
        let backlog = self.busy_until.saturating_sub(now);
        ((backlog.0 as u128).saturating_mul(self.bandwidth_bps as u128) / 8_000_000_000u128)
            .min(u64::MAX as u128) as u64
    }

    /// 发送一个包：返回到达对端的时间；缓冲已满则返回 `None`（丢包）。
    pub fn transmit(&mut self, now: SimTime, bytes: u32) -> Option<SimTime> {
        let queued = self.queued_bytes(now);
        if queued.saturating_add(bytes as u64) > self.capacity_bytes {
            self.dropped_pkts = self.dropped_pkts.saturating_add(1);
            trace!(queued, bytes, cap = self.capacity_bytes, "尾丢弃");
            return None;
        }
        let start = now.max(self.busy_until);
        let depart = start.saturating_add(self.tx_time(bytes));
        self.busy_until = depart;
        Some(depart.saturating_add(self.latency))
    }
}
