//! 文本规范化: 小写, 单位符号转 ASCII, 压缩空白。

/// 符号替换表 (作用于已小写的文本)
///
/// 乱码序列必须排在单字符之前, 否则 "â°" 会先被拆成 "âdeg"。
const SYMBOL_MAP: &[(&str, &str)] = &[
    // UTF-8 按 Windows-1252 误解码
    ("â‰¤", "<="),
    ("â‰¥", ">="),
    ("î©", "ohm"),
    ("î¼", "u"),
    ("âµ", "u"),
    ("â°", "deg"),
    ("â±", "+/-"),
    // UTF-8 按 Mac Roman 误解码
    ("œ©", "ohm"),
    ("œº", "u"),
    ("¬µ", "u"),
    ("¬∞", "deg"),
    ("¬±", "+/-"),
    ("‚â§", "<="),
    ("‚â•", ">="),
    // 正确编码的字符 (Ω 与 Ω 小写后都是 ω)
    ("ω", "ohm"),
    ("µ", "u"),
    ("μ", "u"),
    ("°", "deg"),
    ("±", "+/-"),
    ("≤", "<="),
    ("≥", ">="),
];

/// 规范化文本, 幂等
pub fn normalize(text: &str) -> String {
    let mut out = text.to_lowercase();
    for (from, to) in SYMBOL_MAP {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 规范化后按空白切分关键词
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
