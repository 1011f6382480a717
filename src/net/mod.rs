//! 网络与传输层协作方接口
//!
//! 此模块只定义流量生成器依赖的连接接口，以及参考传输实现所用的链路模型。

// 子模块声明
mod connection;
mod id;
mod link;
mod rate;

// 重新导出公共接口
pub use connection::{Connection, ConnectionError, Unit};
pub use id::{Address, NodeId};
pub use link::Link;
pub use rate::DataRate;
