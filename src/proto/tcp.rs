//! TCP（简化版）参考传输实现
//!
//! 场景中被观测的连接：流量生成器向它写入单元，它把窗口、阈值、RTT、
//! 最高已确认序号和拥塞状态的每次变化排入通知队列，由场景统一分发。
//! - 数据段/ACK 段经过各自的瓶颈链路（含尾丢弃缓冲）
//! - 慢启动 + 拥塞避免，3 dupACK 快速重传，RTO 指数退避
//! - 接收端只接受按序数据（乱序段丢弃），因此重传采用 go-back-N
//!
//! 注意：这是仿真用途的“极简 TCP”，不实现握手/窗口通告/选择确认等。

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::app::Direction;
use crate::net::{Address, Connection, ConnectionError, Link, Unit};
use crate::scenario::uldl_world;
use crate::sim::{Event, SimTime, Simulator, Timer, World};
use crate::trace::{CongState, MetricChange};
use tracing::{debug, trace};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    /// 数据段载荷大小（字节）
    pub segment_size: u32,
    /// 每个数据段的头部开销（字节）
    pub header_bytes: u32,
    /// ACK 包大小（字节）
    pub ack_bytes: u32,
    /// 初始 cwnd（段数）
    pub init_cwnd_segments: u32,
    /// 初始 ssthresh（字节）
    pub init_ssthresh_bytes: u32,
    pub min_rto_ms: u64,
    pub max_rto_ms: u64,
    /// 发送缓冲（字节）
    pub snd_buf_bytes: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            segment_size: 2500,
            header_bytes: 40,
            ack_bytes: 40,
            init_cwnd_segments: 10,
            init_ssthresh_bytes: u32::MAX,
            min_rto_ms: 200,
            max_rto_ms: 60_000,
            snd_buf_bytes: 131_072 * 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketState {
    Idle,
    Bound,
    Connected,
    Closed,
}

/// 计数器（便于结束时输出）
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpStats {
    pub segments_sent: u64,
    pub retransmits: u64,
    pub timeouts: u64,
    pub fast_retransmits: u64,
}

/// 一个方向上的 TCP 连接（发送端与接收端）
#[derive(Debug)]
pub struct TcpSocket {
    dir: Direction,
    local: Address,
    peer: Option<Address>,
    state: SocketState,
    cfg: TcpConfig,
    data_link: Link,
    ack_link: Link,

    // sender
    write_end: u64,
    next_seq: u64,
    high_tx: u64,
    snd_una: u64,
    recover: u64,
    dup_acks: u32,
    cwnd: u32,
    ssthresh: u32,
    cong: CongState,
    last_rtt: SimTime,
    srtt: Option<SimTime>,
    rttvar: SimTime,
    rto: SimTime,
    rto_timer: Timer,

    // receiver
    rcv_nxt: u64,

    changes: Vec<MetricChange>,
    stats: TcpStats,
}

impl TcpSocket {
    pub fn new(dir: Direction, local: Address, cfg: TcpConfig, data_link: Link, ack_link: Link) -> Self {
        let cwnd = cfg
            .segment_size
            .saturating_mul(cfg.init_cwnd_segments.max(1));
        let ssthresh = cfg.init_ssthresh_bytes;
        let rto = SimTime::from_millis(cfg.min_rto_ms.max(1));
        Self {
            dir,
            local,
            peer: None,
            state: SocketState::Idle,
            cfg,
            data_link,
            ack_link,
            write_end: 0,
            next_seq: 0,
            high_tx: 0,
            snd_una: 0,
            recover: 0,
            dup_acks: 0,
            cwnd,
            ssthresh,
            cong: CongState::Open,
            last_rtt: SimTime::ZERO,
            srtt: None,
            rttvar: SimTime::ZERO,
            rto,
            rto_timer: Timer::default(),
            rcv_nxt: 0,
            changes: Vec::new(),
            stats: TcpStats::default(),
        }
    }

    pub fn local(&self) -> Address {
        self.local
    }

    pub fn peer(&self) -> Option<Address> {
        self.peer
    }

    pub fn cwnd(&self) -> u32 {
        self.cwnd
    }

    pub fn ssthresh(&self) -> u32 {
        self.ssthresh
    }

    pub fn cong_state(&self) -> CongState {
        self.cong
    }

    pub fn bytes_acked(&self) -> u64 {
        self.snd_una
    }

    pub fn bytes_buffered(&self) -> u64 {
        self.write_end.saturating_sub(self.snd_una)
    }

    pub fn stats(&self) -> TcpStats {
        self.stats
    }

    pub fn dropped_pkts(&self) -> u64 {
        self.data_link
            .dropped_pkts
            .saturating_add(self.ack_link.dropped_pkts)
    }

    fn seg(&self) -> u64 {
        self.cfg.segment_size.max(1) as u64
    }

    fn set_cwnd(&mut self, bytes: u64) {
        let new = bytes.min(u32::MAX as u64) as u32;
        let old = self.cwnd;
        if old != new {
            self.cwnd = new;
            self.changes.push(MetricChange::Window { old, new });
        }
    }

    fn set_ssthresh(&mut self, bytes: u64) {
        let new = bytes.min(u32::MAX as u64) as u32;
        let old = self.ssthresh;
        if old != new {
            self.ssthresh = new;
            self.changes.push(MetricChange::Threshold { old, new });
        }
    }

    fn set_cong(&mut self, new: CongState) {
        let old = self.cong;
        if old != new {
            self.cong = new;
            self.changes.push(MetricChange::CongState { old, new });
        }
    }

    fn set_high_ack(&mut self, old_una: u64, new_una: u64) {
        // 32 位序号，回绕
        let old = old_una as u32;
        let new = new_una as u32;
        if old != new {
            self.changes.push(MetricChange::Ack { old, new });
        }
    }

    fn on_rtt_sample(&mut self, sample: SimTime) {
        let old = self.last_rtt;
        self.last_rtt = sample;
        if old != sample {
            self.changes.push(MetricChange::Rtt { old, new: sample });
        }

        // RFC 6298
        match self.srtt {
            None => {
                self.srtt = Some(sample);
                self.rttvar = SimTime(sample.0 / 2);
            }
            Some(srtt) => {
                let diff = srtt.0.abs_diff(sample.0);
                self.rttvar = SimTime((3 * (self.rttvar.0 / 4)).saturating_add(diff / 4));
                self.srtt = Some(SimTime((7 * (srtt.0 / 8)).saturating_add(sample.0 / 8)));
            }
        }
        let srtt = self.srtt.unwrap_or(sample);
        let rto = srtt.saturating_add(SimTime(self.rttvar.0.saturating_mul(4)));
        self.rto = rto
            .max(SimTime::from_millis(self.cfg.min_rto_ms))
            .min(SimTime::from_millis(self.cfg.max_rto_ms));
    }

    fn flight(&self) -> u64 {
        self.next_seq.saturating_sub(self.snd_una)
    }

    /// 在窗口允许的范围内发送数据
    fn try_send(&mut self, sim: &mut Simulator) {
        let seg = self.seg();
        while self.next_seq < self.write_end {
            let remain = self.write_end - self.next_seq;
            let len = seg.min(remain);
            if self.flight().saturating_add(len) > self.cwnd as u64 {
                break;
            }
            let seq = self.next_seq;
            self.transmit_segment(sim, seq, len as u32);
            self.next_seq = self.next_seq.saturating_add(len);
            self.high_tx = self.high_tx.max(self.next_seq);
        }
    }

    fn transmit_segment(&mut self, sim: &mut Simulator, seq: u64, len: u32) {
        let now = sim.now();
        let retrans = seq < self.high_tx;
        let bytes = len.saturating_add(self.cfg.header_bytes);
        match self.data_link.transmit(now, bytes) {
            Some(arrive) => {
                sim.schedule(
                    arrive,
                    DataArrival {
                        dir: self.dir,
                        seq,
                        len,
                        sent_at: now,
                        retrans,
                    },
                );
            }
            None => debug!(dir = ?self.dir, seq, len, "数据段被丢弃"),
        }
        self.stats.segments_sent += 1;
        if retrans {
            self.stats.retransmits += 1;
        }
        if !self.rto_timer.is_armed() {
            self.rto_timer.arm(sim, self.rto, RtoFire { dir: self.dir });
        }
    }

    /// 接收端：处理到达的数据段，返回交付给应用的字节数
    pub fn on_data(
        &mut self,
        sim: &mut Simulator,
        seq: u64,
        len: u32,
        sent_at: SimTime,
        retrans: bool,
    ) -> u64 {
        let delivered = if seq == self.rcv_nxt {
            self.rcv_nxt = self.rcv_nxt.saturating_add(len as u64);
            len as u64
        } else {
            trace!(dir = ?self.dir, seq, rcv_nxt = self.rcv_nxt, "乱序数据段，丢弃");
            0
        };

        // 无论是否乱序，都发累计 ACK（dupACK 体现为 ack 不前进）
        let ack = self.rcv_nxt;
        if let Some(arrive) = self.ack_link.transmit(sim.now(), self.cfg.ack_bytes) {
            sim.schedule(
                arrive,
                AckArrival {
                    dir: self.dir,
                    ack,
                    echo: sent_at,
                    retrans,
                },
            );
        }
        delivered
    }

    /// 发送端：处理到达的 ACK
    pub fn on_ack(&mut self, sim: &mut Simulator, ack: u64, echo: SimTime, retrans: bool) {
        let now = sim.now();
        if ack > self.snd_una {
            let newly = ack - self.snd_una;
            let old_una = self.snd_una;
            self.snd_una = ack;
            self.next_seq = self.next_seq.max(ack);
            self.dup_acks = 0;
            self.set_high_ack(old_una, ack);
            if !retrans {
                self.on_rtt_sample(now.saturating_sub(echo));
            }

            match self.cong {
                CongState::Recovery if ack >= self.recover => {
                    self.set_cwnd(self.ssthresh as u64);
                    self.set_cong(CongState::Open);
                }
                CongState::Loss if ack >= self.recover => self.set_cong(CongState::Open),
                CongState::Disorder => self.set_cong(CongState::Open),
                _ => {}
            }

            if self.cong != CongState::Recovery {
                let seg = self.seg();
                let cwnd = self.cwnd as u64;
                if cwnd < self.ssthresh as u64 {
                    self.set_cwnd(cwnd.saturating_add(newly.min(seg)));
                } else {
                    let inc = (seg.saturating_mul(seg) / cwnd.max(1)).max(1);
                    self.set_cwnd(cwnd.saturating_add(inc));
                }
            }

            if self.snd_una >= self.high_tx {
                self.rto_timer.cancel(sim);
            } else {
                self.rto_timer.arm(sim, self.rto, RtoFire { dir: self.dir });
            }
            self.try_send(sim);
        } else if ack == self.snd_una && self.high_tx > self.snd_una {
            self.dup_acks = self.dup_acks.saturating_add(1);
            if self.cong == CongState::Open {
                self.set_cong(CongState::Disorder);
            }
            if self.dup_acks == 3 && !matches!(self.cong, CongState::Recovery | CongState::Loss) {
                self.enter_recovery(sim);
            }
        }
    }

    fn enter_recovery(&mut self, sim: &mut Simulator) {
        let seg = self.seg();
        let flight = self.high_tx.saturating_sub(self.snd_una);
        debug!(dir = ?self.dir, snd_una = self.snd_una, flight, "快速重传");
        self.set_ssthresh((flight / 2).max(2 * seg));
        self.set_cwnd(self.ssthresh as u64);
        self.set_cong(CongState::Recovery);
        self.recover = self.high_tx;
        self.next_seq = self.snd_una;
        self.stats.fast_retransmits += 1;
        self.try_send(sim);
    }

    /// RTO 超时：回到慢启动，从最早未确认处重发
    pub fn on_rto(&mut self, sim: &mut Simulator) {
        self.rto_timer.fired();
        if self.snd_una >= self.high_tx {
            return;
        }
        let seg = self.seg();
        let flight = self.high_tx.saturating_sub(self.snd_una);
        debug!(dir = ?self.dir, snd_una = self.snd_una, rto = ?self.rto, "RTO 超时");
        self.set_ssthresh((flight / 2).max(2 * seg));
        self.set_cwnd(seg);
        self.set_cong(CongState::Loss);
        self.recover = self.high_tx;
        self.next_seq = self.snd_una;
        self.dup_acks = 0;
        self.rto = SimTime(
            self.rto
                .0
                .saturating_mul(2)
                .min(SimTime::from_millis(self.cfg.max_rto_ms).0),
        );
        self.stats.timeouts += 1;
        self.try_send(sim);
    }
}

impl Connection for TcpSocket {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn bind(&mut self) -> Result<(), ConnectionError> {
        match self.state {
            SocketState::Idle => {
                self.state = SocketState::Bound;
                Ok(())
            }
            SocketState::Closed => Err(ConnectionError::Closed),
            _ => Err(ConnectionError::AlreadyBound),
        }
    }

    fn connect(&mut self, peer: Address) -> Result<(), ConnectionError> {
        match self.state {
            SocketState::Bound => {
                // 不模拟握手：连接立即建立
                self.peer = Some(peer);
                self.state = SocketState::Connected;
                debug!(dir = ?self.dir, local = %self.local, %peer, "连接建立");
                Ok(())
            }
            SocketState::Idle => Err(ConnectionError::NotBound),
            SocketState::Closed => Err(ConnectionError::Closed),
            SocketState::Connected => Ok(()),
        }
    }

    fn send(&mut self, unit: Unit, sim: &mut Simulator) -> Result<(), ConnectionError> {
        match self.state {
            SocketState::Connected => {}
            SocketState::Closed => return Err(ConnectionError::Closed),
            _ => return Err(ConnectionError::NotConnected),
        }
        let requested = unit.size_bytes as u64;
        let available = self.cfg.snd_buf_bytes.saturating_sub(self.bytes_buffered());
        if requested > available {
            return Err(ConnectionError::BufferFull {
                requested,
                available,
            });
        }
        trace!(dir = ?self.dir, size = unit.size_bytes, sent_at = ?unit.sent_at, "应用写入");
        self.write_end = self.write_end.saturating_add(requested);
        self.try_send(sim);
        Ok(())
    }

    /// 关闭后不再接受新数据；已缓冲的数据仍会发送完毕
    fn close(&mut self, _sim: &mut Simulator) {
        if self.state != SocketState::Closed {
            debug!(dir = ?self.dir, buffered = self.bytes_buffered(), "连接关闭");
        }
        self.state = SocketState::Closed;
    }

    fn is_open(&self) -> bool {
        matches!(self.state, SocketState::Bound | SocketState::Connected)
    }

    fn drain_metric_changes(&mut self) -> Vec<MetricChange> {
        std::mem::take(&mut self.changes)
    }
}

fn tcp_socket(conn: &mut dyn Connection) -> Option<&mut TcpSocket> {
    conn.as_any_mut().downcast_mut::<TcpSocket>()
}

/// 事件：数据段到达接收端
#[derive(Debug)]
pub struct DataArrival {
    pub dir: Direction,
    pub seq: u64,
    pub len: u32,
    pub sent_at: SimTime,
    pub retrans: bool,
}

impl Event for DataArrival {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DataArrival {
            dir,
            seq,
            len,
            sent_at,
            retrans,
        } = *self;
        let w = uldl_world(world);
        let Some(flow) = w.flow_mut(dir) else {
            return;
        };
        let Some(sock) = tcp_socket(flow.conn.as_mut()) else {
            return;
        };
        let delivered = sock.on_data(sim, seq, len, sent_at, retrans);
        if delivered > 0 {
            flow.counter.on_receive(delivered);
        }
    }
}

/// 事件：ACK 到达发送端
#[derive(Debug)]
pub struct AckArrival {
    pub dir: Direction,
    pub ack: u64,
    pub echo: SimTime,
    pub retrans: bool,
}

impl Event for AckArrival {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let AckArrival {
            dir,
            ack,
            echo,
            retrans,
        } = *self;
        let w = uldl_world(world);
        let Some(flow) = w.flow_mut(dir) else {
            return;
        };
        if let Some(sock) = tcp_socket(flow.conn.as_mut()) {
            sock.on_ack(sim, ack, echo, retrans);
        }
    }
}

/// TCP RTO 事件
#[derive(Debug)]
pub struct RtoFire {
    pub dir: Direction,
}

impl Event for RtoFire {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let RtoFire { dir } = *self;
        let w = uldl_world(world);
        let Some(flow) = w.flow_mut(dir) else {
            return;
        };
        if let Some(sock) = tcp_socket(flow.conn.as_mut()) {
            sock.on_rto(sim);
        }
    }
}
