//! 自调度任务句柄
//!
//! 周期任务（吞吐采样）、速率驱动的发送和 TCP RTO 都通过 `Timer` 重新请求自己。

use super::event::Event;
use super::scheduled_event::EventId;
use super::simulator::Simulator;
use super::time::SimTime;

/// 至多持有一个待执行事件的定时器。
#[derive(Debug, Default)]
pub struct Timer {
    pending: Option<EventId>,
}

impl Timer {
    /// 在 `delay` 之后调度 `ev`；若已有待执行事件，先取消它。
    pub fn arm<E: Event>(&mut self, sim: &mut Simulator, delay: SimTime, ev: E) -> EventId {
        self.cancel(sim);
        let id = sim.schedule_in(delay, ev);
        self.pending = Some(id);
        id
    }

    /// 取消待执行事件；返回是否确实取消了一个事件。
    pub fn cancel(&mut self, sim: &mut Simulator) -> bool {
        match self.pending.take() {
            Some(id) => sim.cancel(id),
            None => false,
        }
    }

    /// 由事件自身在执行时调用，释放句柄。
    pub fn fired(&mut self) {
        self.pending = None;
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn handle(&self) -> Option<EventId> {
        self.pending
    }
}
