//! 被观测的传输层指标
//!
//! 每个方向的连接暴露五个可追踪值：拥塞窗口、慢启动阈值、RTT、最高已确认序号、拥塞状态。

use std::fmt;

use crate::sim::SimTime;

/// 指标种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Window,
    Threshold,
    Rtt,
    Ack,
    CongState,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Window,
        Metric::Threshold,
        Metric::Rtt,
        Metric::Ack,
        Metric::CongState,
    ];

    /// 追踪文件名中的标签，例如 `<prefix>-dl-cwnd.data`
    pub fn file_tag(self) -> &'static str {
        match self {
            Metric::Window => "cwnd",
            Metric::Threshold => "ssth",
            Metric::Rtt => "rtt",
            Metric::Ack => "ack",
            Metric::CongState => "cong-state",
        }
    }

    /// 首次变更时是否写入 `(0.0, old)` 引导行。ack 与拥塞状态没有引导行。
    pub fn has_bootstrap_row(self) -> bool {
        matches!(self, Metric::Window | Metric::Threshold | Metric::Rtt)
    }

    /// 与之成对、需要保持采样对齐的指标
    pub fn paired(self) -> Option<Metric> {
        match self {
            Metric::Window => Some(Metric::Threshold),
            Metric::Threshold => Some(Metric::Window),
            _ => None,
        }
    }
}

/// 拥塞状态（编码与 Linux 的 `TCP_CA_*` 一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CongState {
    #[default]
    Open = 0,
    Disorder = 1,
    Cwr = 2,
    Recovery = 3,
    Loss = 4,
}

impl CongState {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// 写入追踪文件的一个取值
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraceValue {
    Count(u32),
    Seconds(f64),
    State(CongState),
}

impl fmt::Display for TraceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceValue::Count(v) => write!(f, "{v}"),
            TraceValue::Seconds(s) => write!(f, "{s}"),
            TraceValue::State(s) => write!(f, "{}", s.code()),
        }
    }
}

/// 一次“值已改变”通知
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricChange {
    Window { old: u32, new: u32 },
    Threshold { old: u32, new: u32 },
    Rtt { old: SimTime, new: SimTime },
    Ack { old: u32, new: u32 },
    CongState { old: CongState, new: CongState },
}

impl MetricChange {
    pub fn metric(&self) -> Metric {
        match self {
            MetricChange::Window { .. } => Metric::Window,
            MetricChange::Threshold { .. } => Metric::Threshold,
            MetricChange::Rtt { .. } => Metric::Rtt,
            MetricChange::Ack { .. } => Metric::Ack,
            MetricChange::CongState { .. } => Metric::CongState,
        }
    }

    /// `(old, new)` 转成可写入的取值
    pub fn values(&self) -> (TraceValue, TraceValue) {
        match *self {
            MetricChange::Window { old, new }
            | MetricChange::Threshold { old, new }
            | MetricChange::Ack { old, new } => (TraceValue::Count(old), TraceValue::Count(new)),
            MetricChange::Rtt { old, new } => (
                TraceValue::Seconds(old.as_secs_f64()),
                TraceValue::Seconds(new.as_secs_f64()),
            ),
            MetricChange::CongState { old, new } => (TraceValue::State(old), TraceValue::State(new)),
        }
    }
}
