//! 上下行 TCP 场景
//!
//! 配置、世界与运行入口。

mod config;
mod runner;
mod world;

pub use config::{FlowConfig, LinkConfig, QUEUE_PKT_BYTES, RateChange, ScenarioConfig};
pub use runner::{
    DL_SINK_PORT, FlowSummary, REMOTE_HOST, RunSummary, Scenario, UE, UL_SINK_PORT, endpoints,
};
pub(crate) use world::uldl_world;
pub use world::{FlowState, UldlWorld};
