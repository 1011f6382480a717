//! 世界 trait
//!
//! 定义仿真世界接口。

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界：由场景层实现（例如上下行两个方向的流量与统计状态）。
///
/// 事件通过 `as_any_mut` 向下转型拿到具体的世界类型。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}
