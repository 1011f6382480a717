//! 传输层内部状态追踪
//!
//! 把连接的状态变化通知写成按方向、按指标拆分的时间序列文件。

mod bus;
mod instrumentation;
mod metric;
mod series;
mod writer;

pub use bus::{MetricBus, MetricHandler};
pub use instrumentation::{DirectionSeries, Instrumentation};
pub use metric::{CongState, Metric, MetricChange, TraceValue};
pub use series::MetricSeries;
pub use writer::{SharedBuffer, TraceWriter, fmt_secs};
