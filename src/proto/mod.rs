//! 传输层/协议模块
//!
//! 场景中被观测的参考传输实现。

pub mod tcp;
