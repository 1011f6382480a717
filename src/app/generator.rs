//! 速率受控的流量生成器
//!
//! 启动后立即发送一个单元，之后按 `unit_size * 8 / rate` 的间隔重新调度自己，
//! 直到发满 `total_units` 或被停止。

use crate::error::{Result, TraceError};
use crate::net::{Address, Connection, ConnectionError, DataRate, Unit};
use crate::scenario::uldl_world;
use crate::sim::{Event, EventId, SimTime, Simulator, Timer, World};
use tracing::{debug, error, info, trace, warn};

use super::Direction;

/// 生成器的静态参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub peer: Address,
    pub unit_size_bytes: u32,
    pub total_units: u64,
    pub rate: DataRate,
}

/// 发送间隔：ceil(bits * 1e9 / bps) 纳秒。速率为 0 时返回 `None`。
pub fn emission_interval(unit_size_bytes: u32, rate: DataRate) -> Option<SimTime> {
    if rate.bps() == 0 {
        return None;
    }
    let bps = rate.bps() as u128;
    let bits = (unit_size_bytes as u128).saturating_mul(8);
    let nanos = (bits.saturating_mul(1_000_000_000u128) + (bps - 1)) / bps;
    Some(SimTime(nanos.min(u64::MAX as u128) as u64))
}

fn check_rate(rate: DataRate) -> Result<()> {
    if rate.bps() == 0 {
        return Err(TraceError::invalid("data rate must be positive"));
    }
    Ok(())
}

/// 流量生成器（对应一个应用实例）
#[derive(Debug)]
pub struct TrafficGenerator {
    dir: Direction,
    cfg: Option<GeneratorConfig>,
    running: bool,
    units_sent: u64,
    /// 发送缓冲已满而被丢弃的单元
    units_dropped: u64,
    timer: Timer,
}

impl TrafficGenerator {
    pub fn new(dir: Direction) -> Self {
        Self {
            dir,
            cfg: None,
            running: false,
            units_sent: 0,
            units_dropped: 0,
            timer: Timer::default(),
        }
    }

    /// 绑定目的地址、单元大小、单元数与速率；只能在 `start` 之前调用。
    pub fn configure(
        &mut self,
        peer: Address,
        unit_size_bytes: u32,
        total_units: u64,
        rate: DataRate,
    ) -> Result<()> {
        if self.running {
            return Err(TraceError::invalid("configure called on a running generator"));
        }
        if unit_size_bytes == 0 {
            return Err(TraceError::invalid("unit size must be positive"));
        }
        if total_units == 0 {
            return Err(TraceError::invalid("total units must be positive"));
        }
        check_rate(rate)?;
        self.cfg = Some(GeneratorConfig {
            peer,
            unit_size_bytes,
            total_units,
            rate,
        });
        Ok(())
    }

    /// 修改之后的调度所用速率；已调度的发送不受影响。
    pub fn change_rate(&mut self, rate: DataRate) -> Result<()> {
        check_rate(rate)?;
        let cfg = self
            .cfg
            .as_mut()
            .ok_or_else(|| TraceError::invalid("change_rate before configure"))?;
        debug!(dir = ?self.dir, old = %cfg.rate, new = %rate, "修改发送速率");
        cfg.rate = rate;
        Ok(())
    }

    /// 打开连接并同步发送第一个单元
    #[tracing::instrument(skip(self, sim, conn), fields(dir = ?self.dir))]
    pub fn start(&mut self, sim: &mut Simulator, conn: &mut dyn Connection) -> Result<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| TraceError::invalid("start before configure"))?;
        if self.running {
            return Err(TraceError::invalid("generator already running"));
        }
        conn.bind()?;
        conn.connect(cfg.peer)?;
        self.units_sent = 0;
        self.units_dropped = 0;
        self.running = true;
        info!(
            peer = %cfg.peer,
            unit_size_bytes = cfg.unit_size_bytes,
            total_units = cfg.total_units,
            rate = %cfg.rate,
            "🚀 流量生成器启动"
        );
        self.emit(sim, conn)
    }

    /// 停止：取消待执行的发送并关闭连接。可重复调用。
    pub fn stop(&mut self, sim: &mut Simulator, conn: &mut dyn Connection) {
        let was_running = self.running;
        self.running = false;
        if self.timer.cancel(sim) {
            debug!(dir = ?self.dir, "取消待执行的发送");
        }
        if conn.is_open() {
            conn.close(sim);
        }
        if was_running {
            info!(dir = ?self.dir, units_sent = self.units_sent, "流量生成器停止");
        }
    }

    /// 发送一个单元，并在需要时调度下一次发送。
    ///
    /// 发送缓冲已满时丢弃该单元并照常调度；其他连接错误会停止生成器并返回。
    pub fn emit(&mut self, sim: &mut Simulator, conn: &mut dyn Connection) -> Result<()> {
        let Some(cfg) = self.cfg else {
            return Err(TraceError::invalid("emit before configure"));
        };
        if !self.running {
            trace!(dir = ?self.dir, "生成器未运行，忽略发送");
            return Ok(());
        }

        let unit = Unit {
            size_bytes: cfg.unit_size_bytes,
            sent_at: sim.now(),
        };
        match conn.send(unit, sim) {
            Ok(()) => {
                self.units_sent += 1;
                trace!(dir = ?self.dir, units_sent = self.units_sent, now = ?sim.now(), "发送单元");
            }
            Err(ConnectionError::BufferFull {
                requested,
                available,
            }) => {
                self.units_dropped += 1;
                if self.units_dropped == 1 {
                    warn!(dir = ?self.dir, requested, available, now = ?sim.now(), "发送缓冲已满，开始丢弃单元");
                } else {
                    debug!(dir = ?self.dir, units_dropped = self.units_dropped, "发送缓冲已满，丢弃单元");
                }
            }
            Err(e) => {
                self.running = false;
                return Err(e.into());
            }
        }

        if self.emissions() < cfg.total_units {
            let delay = emission_interval(cfg.unit_size_bytes, cfg.rate)
                .ok_or_else(|| TraceError::invalid("data rate must be positive"))?;
            self.timer.arm(sim, delay, EmitUnit { dir: self.dir });
        } else {
            info!(
                dir = ?self.dir,
                units_sent = self.units_sent,
                units_dropped = self.units_dropped,
                "✅ 已发送全部单元"
            );
        }
        Ok(())
    }

    /// 已尝试的发送次数（含被丢弃的）
    fn emissions(&self) -> u64 {
        self.units_sent.saturating_add(self.units_dropped)
    }

    pub fn direction(&self) -> Direction {
        self.dir
    }

    pub fn config(&self) -> Option<&GeneratorConfig> {
        self.cfg.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn units_sent(&self) -> u64 {
        self.units_sent
    }

    pub fn units_dropped(&self) -> u64 {
        self.units_dropped
    }

    pub fn pending_emission(&self) -> Option<EventId> {
        self.timer.handle()
    }

    pub(crate) fn timer_fired(&mut self) {
        self.timer.fired();
    }
}

/// 事件：发送下一个单元
#[derive(Debug)]
pub struct EmitUnit {
    pub dir: Direction,
}

impl Event for EmitUnit {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let EmitUnit { dir } = *self;
        let w = uldl_world(world);
        let Some(flow) = w.flow_mut(dir) else {
            return;
        };
        flow.generator.timer_fired();
        if let Err(e) = flow.generator.emit(sim, flow.conn.as_mut()) {
            error!(?dir, error = %e, "连接不可用，停止发送");
        }
    }
}

/// 事件：启动某方向的应用
#[derive(Debug)]
pub struct StartGenerator {
    pub dir: Direction,
}

impl Event for StartGenerator {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let StartGenerator { dir } = *self;
        let w = uldl_world(world);
        let Some(flow) = w.flow_mut(dir) else {
            return;
        };
        if let Err(e) = flow.generator.start(sim, flow.conn.as_mut()) {
            error!(?dir, error = %e, "启动流量生成器失败");
        }
    }
}

/// 事件：停止某方向的应用
#[derive(Debug)]
pub struct StopGenerator {
    pub dir: Direction,
}

impl Event for StopGenerator {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let StopGenerator { dir } = *self;
        let w = uldl_world(world);
        if let Some(flow) = w.flow_mut(dir) {
            flow.generator.stop(sim, flow.conn.as_mut());
        }
    }
}

/// 事件：在指定时刻修改发送速率
#[derive(Debug)]
pub struct ChangeRate {
    pub dir: Direction,
    pub rate: DataRate,
}

impl Event for ChangeRate {
    fn execute(self: Box<Self>, _sim: &mut Simulator, world: &mut dyn World) {
        let ChangeRate { dir, rate } = *self;
        let w = uldl_world(world);
        let Some(flow) = w.flow_mut(dir) else {
            return;
        };
        if let Err(e) = flow.generator.change_rate(rate) {
            error!(?dir, error = %e, "修改速率失败");
        }
    }
}
