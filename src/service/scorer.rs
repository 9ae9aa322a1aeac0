//! 字段相似度评分
//!
//! 关键词命中字段的判定:
//! 1. 子串命中直接得 1.0;
//! 2. 否则仅当关键词足够长时做 InDel 相似度比较, 整字段 (字段不超长时) 与逐词取最大值;
//! 3. 模糊比例低于阈值记 0。

use crate::config::ScoringConfig;
use crate::service::normalize::normalize;

/// 最长公共子序列长度 (按字符)
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// InDel 相似度: 2·LCS / (|a| + |b|), 两侧均为空记 1
fn indel_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (2 * lcs_len(a, b)) as f64 / total as f64
}

/// 相似度 (0-1), 只计插入/删除
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    indel_ratio(&a, &b)
}

/// 局部相似度 (0-1): 短串与长串各窗口的最佳 [`ratio`]
///
/// 窗口包括所有等长子串, 以及长串首尾不足短串长度的前缀/后缀。
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (short, long) = if a_chars.len() <= b_chars.len() {
        (a_chars, b_chars)
    } else {
        (b_chars, a_chars)
    };

    if short.is_empty() {
        return if long.is_empty() { 1.0 } else { 0.0 };
    }

    let n = short.len();
    let len = long.len();
    let prefixes = (1..n).map(|end| &long[..end]);
    let full = long.windows(n);
    let suffixes = (len - n + 1..len).map(|start| &long[start..]);

    let mut best = 0.0_f64;
    for window in prefixes.chain(full).chain(suffixes) {
        best = best.max(indel_ratio(&short, window));
        if best >= 1.0 {
            break;
        }
    }
    best
}

/// 单字段评分器
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldScorer {
    config: ScoringConfig,
}

impl FieldScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// 关键词对字段的评分 (0-1), 0 表示未命中
    pub fn score_field(&self, token: &str, field_value: &str) -> f64 {
        self.score_normalized(&normalize(token), &normalize(field_value))
    }

    /// 两侧均已规范化
    pub fn score_normalized(&self, token: &str, field: &str) -> f64 {
        if field.is_empty() {
            return 0.0;
        }
        if field.contains(token) {
            return 1.0;
        }

        let token_len = token.chars().count();
        if token_len < self.config.min_fuzzy_token_len {
            return 0.0;
        }

        let mut best = 0.0_f64;
        if field.chars().count() <= self.config.max_fuzzy_field_len {
            best = ratio(token, field);
        }

        for word in field.split_whitespace() {
            if word.chars().count().abs_diff(token_len) <= self.config.word_len_window {
                best = best.max(ratio(token, word));
            }
        }

        if best >= self.config.fuzzy_match_ratio {
            best
        } else {
            0.0
        }
    }

    /// 仅子串匹配 (精确模式)
    pub fn score_exact(&self, token: &str, field: &str) -> f64 {
        if !field.is_empty() && field.contains(token) {
            1.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> FieldScorer {
        FieldScorer::default()
    }

    #[test]
    fn test_substring_dominates() {
        assert_eq!(scorer().score_field("10K", "RC0603FR-0710KL 10k"), 1.0);
        assert_eq!(scorer().score_field("0603", "10K0603"), 1.0);
    }

    #[test]
    fn test_empty_field() {
        assert_eq!(scorer().score_field("10k", ""), 0.0);
        assert_eq!(scorer().score_field("10k", "   "), 0.0);
    }

    #[test]
    fn test_short_token_never_fuzzy() {
        // "10x" 与 "10k" 只差一个字符, 但短词只做子串匹配
        assert_eq!(scorer().score_field("10x", "10k"), 0.0);
    }

    #[test]
    fn test_fuzzy_word_match() {
        // 相邻字符互换: LCS 4 → 8/10
        let s = scorer().score_field("yagoe", "YAGEO");
        assert!((s - 0.8).abs() < 1e-9, "got {s}");
        // "murata" vs "murada": LCS 5 → 10/12
        let s = scorer().score_field("murada", "Murata Electronics");
        assert!((s - (1.0 - 1.0 / 6.0)).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn test_fuzzy_below_threshold_contributes_zero() {
        assert_eq!(scorer().score_field("0805", "10k0603"), 0.0);
    }

    #[test]
    fn test_long_field_compared_word_by_word() {
        let long = format!("{} ceramic capacitor", "x".repeat(120));
        assert!(long.chars().count() > 100);
        let s = scorer().score_field("ceramik", &long);
        assert!(s >= 0.75, "got {s}");
        // 整字段比较会被稀释到几乎为 0
        assert!(ratio("ceramik", &long) < 0.1);
    }

    #[test]
    fn test_word_length_window() {
        // "resistor" (8) 与 "res" (3) 长度差 5, 不参与逐词比较
        assert_eq!(scorer().score_field("resistor", "res"), 0.0);
    }

    #[test]
    fn test_custom_threshold() {
        let strict = FieldScorer::new(ScoringConfig {
            fuzzy_match_ratio: 0.9,
            ..ScoringConfig::default()
        });
        assert_eq!(strict.score_field("murada", "murata"), 0.0);
    }

    #[test]
    fn test_exact_mode() {
        assert_eq!(scorer().score_exact("0603", "10k0603"), 1.0);
        assert_eq!(scorer().score_exact("murada", "murata"), 0.0);
    }

    #[test]
    fn test_ratio_bounds() {
        assert_eq!(ratio("abc", "abc"), 1.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);
        assert_eq!(ratio("", ""), 1.0);
        assert_eq!(ratio("abc", ""), 0.0);
    }

    #[test]
    fn test_ratio_counts_insertions_and_deletions() {
        // 7 个字符全部按序出现在长串中: 2·7 / (21 + 7)
        assert_eq!(ratio("10k ohm resistor 0603", "10k0603"), 0.5);
        // 一次替换 = 一删一插: 2·2 / (3 + 3)
        let r = ratio("10k", "10j");
        assert!((r - 2.0 / 3.0).abs() < 1e-9, "got {r}");
        assert_eq!(ratio("0805", "10k0603"), 4.0 / 11.0);
    }

    #[test]
    fn test_partial_ratio() {
        assert_eq!(partial_ratio("10k", "resistor 10k 0603"), 1.0);
        assert_eq!(partial_ratio("resistor 10k 0603", "10k"), 1.0);
        assert_eq!(partial_ratio("", ""), 1.0);
        assert_eq!(partial_ratio("", "abc"), 0.0);
        let p = partial_ratio("10j", "resistor 10k");
        assert!((p - 2.0 / 3.0).abs() < 1e-9, "got {p}");
        // 长串末尾的不完整窗口 "60" 也参与比较
        let tail = partial_ratio("603x", "abcdefg 60");
        assert!((tail - 2.0 * 2.0 / 6.0).abs() < 1e-9, "got {tail}");
    }
}
