//! 错误类型
//!
//! 配置错误在配置阶段返回，发送阶段只会出现连接错误与 I/O 错误。

use std::io;

use crate::net::ConnectionError;

/// 流量生成、吞吐采样与指标追踪共用的错误类型。
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// 非法参数（速率为 0、包大小为 0、未配置就修改速率等）
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// 底层连接（bind/connect/send）失败
    #[error("connection failure: {0}")]
    Connection(#[from] ConnectionError),

    /// 追踪文件写入失败
    #[error("trace i/o: {0}")]
    Io(#[from] io::Error),

    /// 场景配置无法解析
    #[error("config: {0}")]
    Config(String),

    /// 共享的追踪上下文锁已中毒
    #[error("instrumentation lock poisoned")]
    Poisoned,
}

impl TraceError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        TraceError::InvalidParameter(msg.into())
    }
}

pub type Result<T, E = TraceError> = std::result::Result<T, E>;
