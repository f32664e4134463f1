//! 测速指标累积器
//!
//! 观察片段流与墙钟，产出首 token 延迟、总耗时与吞吐量。
//! 吞吐量按首 token 之后的区间计算：排队与网络延迟属于上游的
//! 接纳路径，混入吞吐量会压低生成速率的可比性。

use std::time::{Duration, Instant};

/// 单次会话的指标状态
///
/// 只由驱动该会话的任务持有与修改。
#[derive(Debug, Clone)]
pub struct SpeedMetrics {
    /// 上游调用发起时刻
    start: Instant,
    /// 首个非空片段到达时刻（至多设置一次）
    first_fragment: Option<Instant>,
    /// 已发出片段的累计字符数
    char_count: usize,
}

/// 会话结束时的指标汇总
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    pub time_taken_ms: u64,
    /// 首 token 延迟；从未收到片段时为 0
    pub time_to_first_token_ms: u64,
    /// 估算的响应 token 数（ceil(字符数 / 4)）
    pub response_tokens: u64,
    /// token/秒，保留两位小数，始终为非负有限值
    pub tokens_per_second: f64,
}

impl SpeedMetrics {
    /// 在发起上游调用时创建
    pub fn start_now() -> Self {
        Self {
            start: Instant::now(),
            first_fragment: None,
            char_count: 0,
        }
    }

    /// 记录一个非空片段
    pub fn record_fragment(&mut self, text: &str) {
        if self.first_fragment.is_none() {
            self.first_fragment = Some(Instant::now());
        }
        self.char_count += text.chars().count();
    }

    /// 累计字符数
    pub fn char_count(&self) -> usize {
        self.char_count
    }

    /// 按字符数估算 token 数
    ///
    /// 上游在流式模式下不回报 usage，采用 4 字符/token 的粗略估算。
    pub fn estimate_tokens(chars: usize) -> u64 {
        chars.div_ceil(4) as u64
    }

    /// 会话结束时汇总指标
    pub fn finalize(&self) -> MetricsSummary {
        self.finalize_at(Instant::now())
    }

    fn finalize_at(&self, end: Instant) -> MetricsSummary {
        let time_taken_ms = end.saturating_duration_since(self.start).as_millis() as u64;
        let time_to_first_token_ms = self
            .first_fragment
            .map(|t| t.saturating_duration_since(self.start).as_millis() as u64)
            .unwrap_or(0);

        let tokens = Self::estimate_tokens(self.char_count);
        let generation_ms = time_taken_ms.saturating_sub(time_to_first_token_ms);

        // 优先使用首 token 之后的区间；区间为零（单次突发或时钟分辨率
        // 噪声）时回退到全区间；全区间也为零时吞吐量记 0。
        let raw = if self.first_fragment.is_some() && generation_ms > 0 {
            tokens as f64 / (generation_ms as f64 / 1000.0)
        } else if time_taken_ms > 0 {
            tokens as f64 / (time_taken_ms as f64 / 1000.0)
        } else {
            0.0
        };

        MetricsSummary {
            time_taken_ms,
            time_to_first_token_ms,
            response_tokens: tokens,
            tokens_per_second: round2(raw),
        }
    }
}

/// 保留两位小数（与历史记录中的数值格式一致）
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 计算全区间吞吐量（非流式路径使用）
///
/// 非流式调用没有首 token 时刻，只能按整个请求耗时计算。
pub fn whole_interval_tps(tokens: u64, time_taken_ms: u64) -> f64 {
    if time_taken_ms == 0 {
        return 0.0;
    }
    round2(tokens as f64 / (time_taken_ms as f64 / 1000.0))
}

impl SpeedMetrics {
    /// 用显式时间构造（仅测试使用）
    #[cfg(test)]
    fn with_times(start: Instant, first_fragment: Option<Instant>, char_count: usize) -> Self {
        Self {
            start,
            first_fragment,
            char_count,
        }
    }
}
