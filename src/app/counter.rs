//! 接收端字节计数

/// 单调递增的接收字节计数；只由本方向的接收回调修改，采样方只读不清零。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ByteCounter {
    total_bytes: u64,
    deliveries: u64,
}

impl ByteCounter {
    /// 接收回调：每到达一块数据调用一次
    pub fn on_receive(&mut self, bytes: u64) {
        self.total_bytes = self.total_bytes.saturating_add(bytes);
        self.deliveries = self.deliveries.saturating_add(1);
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn deliveries(&self) -> u64 {
        self.deliveries
    }
}
