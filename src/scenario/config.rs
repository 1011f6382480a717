//! 场景配置
//!
//! 所有字段都有默认值，对应原始上下行 TCP 场景；可从 JSON 文件覆盖。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app::Direction;
use crate::error::{Result, TraceError};
use crate::net::DataRate;
use crate::proto::tcp::TcpConfig;

/// 瓶颈链路参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub rate: DataRate,
    pub latency_ms: f64,
    /// 缓冲大小（包数，按 1500 字节折算）
    pub queue_pkts: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            rate: DataRate(1_000_000_000),
            latency_ms: 10.0,
            queue_pkts: 100_000,
        }
    }
}

pub const QUEUE_PKT_BYTES: u64 = 1500;

impl LinkConfig {
    pub fn capacity_bytes(&self) -> u64 {
        self.queue_pkts.saturating_mul(QUEUE_PKT_BYTES)
    }
}

/// 在 `at_s` 时刻把发送速率改为 `rate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateChange {
    pub at_s: f64,
    pub rate: DataRate,
}

/// 单个方向的流量配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    pub unit_size_bytes: u32,
    pub total_units: u64,
    pub rate: DataRate,
    #[serde(default)]
    pub rate_changes: Vec<RateChange>,
    #[serde(default)]
    pub link: LinkConfig,
}

impl FlowConfig {
    pub fn downlink() -> Self {
        Self {
            unit_size_bytes: 1400,
            total_units: 5_000_000,
            rate: DataRate(500_000_000),
            rate_changes: Vec::new(),
            link: LinkConfig::default(),
        }
    }

    pub fn uplink() -> Self {
        Self {
            unit_size_bytes: 1400,
            total_units: 100_000,
            rate: DataRate(100_000_000),
            rate_changes: Vec::new(),
            link: LinkConfig {
                queue_pkts: 100,
                ..LinkConfig::default()
            },
        }
    }

    fn validate(&self, dir: Direction) -> Result<()> {
        if self.unit_size_bytes == 0 {
            return Err(TraceError::invalid(format!("{dir}: unit_size_bytes must be positive")));
        }
        if self.total_units == 0 {
            return Err(TraceError::invalid(format!("{dir}: total_units must be positive")));
        }
        if self.rate.bps() == 0 {
            return Err(TraceError::invalid(format!("{dir}: rate must be positive")));
        }
        if self.link.rate.bps() == 0 {
            return Err(TraceError::invalid(format!("{dir}: link rate must be positive")));
        }
        if !(self.link.latency_ms.is_finite() && self.link.latency_ms >= 0.0) {
            return Err(TraceError::invalid(format!("{dir}: link latency must be non-negative")));
        }
        for change in &self.rate_changes {
            if change.rate.bps() == 0 {
                return Err(TraceError::invalid(format!(
                    "{dir}: rate change at {}s must be positive",
                    change.at_s
                )));
            }
            check_time(&format!("{dir} rate change"), change.at_s)?;
        }
        Ok(())
    }
}

fn check_time(name: &str, t: f64) -> Result<()> {
    if t.is_finite() && t >= 0.0 {
        Ok(())
    } else {
        Err(TraceError::invalid(format!("{name} must be a non-negative time, got {t}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// 追踪文件名前缀
    pub prefix_name: String,
    /// 追踪文件输出目录
    pub out_dir: PathBuf,
    /// 传输协议名称，仅用于日志
    pub transport_prot: String,
    pub sim_stop_s: f64,
    pub app_start_s: f64,
    pub app_stop_s: f64,
    /// 第一次吞吐采样的时间
    pub sample_start_s: f64,
    pub sample_interval_s: f64,
    pub enable_ul: bool,
    /// 是否记录五个传输层指标
    pub trace_metrics: bool,
    pub downlink: FlowConfig,
    pub uplink: FlowConfig,
    pub tcp: TcpConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            prefix_name: "TcpVariantsComparison".to_string(),
            out_dir: PathBuf::from("."),
            transport_prot: "TcpNewReno".to_string(),
            sim_stop_s: 4.5,
            app_start_s: 0.1,
            app_stop_s: 4.0,
            sample_start_s: 0.5,
            sample_interval_s: 1.0,
            enable_ul: true,
            trace_metrics: true,
            downlink: FlowConfig::downlink(),
            uplink: FlowConfig::uplink(),
            tcp: TcpConfig::default(),
        }
    }
}

impl ScenarioConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| TraceError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
            .map_err(|e| TraceError::Config(format!("{}: {e}", path.display())))
    }

    /// 启用的方向
    pub fn directions(&self) -> Vec<Direction> {
        if self.enable_ul {
            Direction::ALL.to_vec()
        } else {
            vec![Direction::Downlink]
        }
    }

    pub fn flow(&self, dir: Direction) -> &FlowConfig {
        match dir {
            Direction::Downlink => &self.downlink,
            Direction::Uplink => &self.uplink,
        }
    }

    /// `<out_dir>/<prefix>-<dl|ul>-<tag>.data`
    pub fn trace_path(&self, dir: Direction, tag: &str) -> PathBuf {
        self.out_dir
            .join(format!("{}-{}-{}.data", self.prefix_name, dir.tag(), tag))
    }

    pub fn validate(&self) -> Result<()> {
        check_time("sim_stop_s", self.sim_stop_s)?;
        check_time("app_start_s", self.app_start_s)?;
        check_time("app_stop_s", self.app_stop_s)?;
        check_time("sample_start_s", self.sample_start_s)?;
        if self.sim_stop_s <= 0.0 {
            return Err(TraceError::invalid("sim_stop_s must be positive"));
        }
        if self.app_stop_s < self.app_start_s {
            return Err(TraceError::invalid("app_stop_s must not precede app_start_s"));
        }
        if !(self.sample_interval_s.is_finite() && self.sample_interval_s > 0.0) {
            return Err(TraceError::invalid("sample_interval_s must be positive"));
        }
        if self.prefix_name.is_empty() {
            return Err(TraceError::invalid("prefix_name must not be empty"));
        }
        for dir in self.directions() {
            self.flow(dir).validate(dir)?;
        }
        Ok(())
    }
}
