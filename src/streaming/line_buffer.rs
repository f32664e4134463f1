//! 行重组缓冲区
//!
//! 上游 TCP 分片不保证任何帧边界：一条 JSON 记录可能被拆成多次读取，
//! 多条记录也可能在一次读取中到达，甚至一个 UTF-8 序列也可能被拦腰
//! 截断。`LineBuffer` 把任意切分的字节片段重组为完整的 `\n` 结尾逻辑行。
//! UTF-8 解码只在完整行上进行，因此分片落在多字节字符中间也不会出错。

/// 行重组缓冲区
///
/// 每个上游连接持有一个实例。缓冲区无上限，病态上游可以让它无限增长，
/// 这是已知并接受的限制。
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个原始字节片段，返回由此产生的全部完整行
    ///
    /// 行终止符 `\n` 被移除；紧邻的 `\r` 一并移除。
    /// 完整行内的非法 UTF-8 按替换字符处理（上游协议均为 UTF-8 文本，
    /// 实际不会出现）。
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            raw.pop(); // '\n'
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            lines.push(String::from_utf8_lossy(&raw).into_owned());
        }
        lines
    }

    /// 缓冲区中未终止的残留字节数
    ///
    /// 上游关闭时残留的半行不是合法记录，直接丢弃即可；
    /// 该方法仅用于诊断日志。
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}
