//! 应用层：流量生成、接收计数与吞吐采样
//!
//! 每个 [`Direction`] 各有一套，互不共享状态。

mod counter;
mod direction;
mod generator;
mod throughput;

pub use counter::ByteCounter;
pub use direction::Direction;
pub use generator::{
    ChangeRate, EmitUnit, GeneratorConfig, StartGenerator, StopGenerator, TrafficGenerator,
    emission_interval,
};
pub use throughput::{SampleThroughput, ThroughputAggregator, ThroughputSample, mbps};
