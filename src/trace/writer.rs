//! 文本追踪输出
//!
//! 指标：`<t> <value>`；吞吐：`<t>\t<瞬时>\t<平均>`。每行一条记录。

use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// 时间列：至少保留一位小数，引导行因此写成 `0.0`。
///
/// 整数秒写成 `1.0` 而不是 `1`，这是时间列唯一的格式约定；
/// 数值列保持 Rust 的最短浮点表示。
pub fn fmt_secs(t: f64) -> String {
    let s = format!("{t}");
    if s.contains(['.', 'e', 'E', 'N', 'i']) {
        s
    } else {
        format!("{s}.0")
    }
}

/// 追踪文件句柄
pub struct TraceWriter {
    out: Box<dyn Write + Send>,
    rows: u64,
}

impl TraceWriter {
    /// 创建（截断）文件
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }

    pub fn from_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Box::new(out),
            rows: 0,
        }
    }

    /// 丢弃所有输出
    pub fn sink() -> Self {
        Self::from_writer(io::sink())
    }

    pub fn write_row(&mut self, t: f64, value: impl Display) -> io::Result<()> {
        writeln!(self.out, "{} {}", fmt_secs(t), value)?;
        self.rows += 1;
        Ok(())
    }

    pub fn write_throughput(&mut self, t: f64, instantaneous: f64, average: f64) -> io::Result<()> {
        writeln!(self.out, "{}\t{}\t{}", fmt_secs(t), instantaneous, average)?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl std::fmt::Debug for TraceWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceWriter").field("rows", &self.rows).finish()
    }
}

/// 内存缓冲，克隆后共享同一份数据（便于在仿真结束后读取）。
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        match self.0.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        }
    }

    /// 按行解析为 `(t, value)`，用于检查两列输出
    pub fn rows(&self) -> Vec<(f64, f64)> {
        self.contents()
            .lines()
            .filter_map(|line| {
                let mut cols = line.split_whitespace();
                let t = cols.next()?.parse().ok()?;
                let v = cols.next()?.parse().ok()?;
                Some((t, v))
            })
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self
            .0
            .lock()
            .map_err(|_| io::Error::other("shared buffer poisoned"))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
