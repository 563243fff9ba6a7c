//! # 两列数值谱解析器
//!
//! 解析积分软件导出的 Q–强度文本文件（.xy/.xye/.chi/.dat/.txt/.csv）。
//!
//! ## 格式说明
//! ```text
//! # 2D integration, unit q_A^-1      <- 注释行（#、!、; 开头）
//! q_A^-1  I                          <- 数据前的非数值表头行
//! 1.000  120.5  3.2                  <- 第一列 Q，第二列强度，其余列忽略
//! 1.010, 121.0                       <- 分隔符可为空白、逗号或分号
//! ```
//!
//! 数据行按文件顺序保留，Q 的单调性由分析引擎校验。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `error.rs`

use crate::error::{QpeakError, Result};
use std::fs;
use std::path::Path;

/// 文件读入的原始谱（未校验）
#[derive(Debug, Clone, PartialEq)]
pub struct RawSpectrum {
    pub name: String,
    pub q: Vec<f64>,
    pub intensity: Vec<f64>,
}

/// 解析谱文件
pub fn parse_xy_file(path: &Path) -> Result<RawSpectrum> {
    let content = fs::read_to_string(path).map_err(|e| QpeakError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");

    parse_xy_content(&content, name).map_err(|e| match e {
        QpeakError::ParseError { format, reason, .. } => QpeakError::ParseError {
            format,
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// 从字符串内容解析
pub fn parse_xy_content(content: &str, name: &str) -> Result<RawSpectrum> {
    let mut q = Vec::new();
    let mut intensity = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(['#', '!', ';']) {
            continue;
        }

        let tokens: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
            .filter(|t| !t.is_empty())
            .collect();

        let first = tokens.first().and_then(|t| t.parse::<f64>().ok());
        let Some(q_value) = first else {
            if q.is_empty() {
                // 数据前的表头
                continue;
            }
            return Err(parse_error(
                name,
                format!("line {}: expected numeric data, got '{}'", line_no + 1, line),
            ));
        };

        let i_value = tokens
            .get(1)
            .and_then(|t| t.parse::<f64>().ok())
            .ok_or_else(|| {
                parse_error(
                    name,
                    format!(
                        "line {}: expected at least 2 numeric columns, got '{}'",
                        line_no + 1,
                        line
                    ),
                )
            })?;

        q.push(q_value);
        intensity.push(i_value);
    }

    if q.is_empty() {
        return Err(parse_error(name, "no data rows found".to_string()));
    }

    Ok(RawSpectrum {
        name: name.to_string(),
        q,
        intensity,
    })
}

fn parse_error(name: &str, reason: String) -> QpeakError {
    QpeakError::ParseError {
        format: "xy".to_string(),
        path: name.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chi_with_header() {
        let content = r#"# pyFAI integration
# Unit: q_A^-1
q_A^-1 I
1.0 10.5
1.1   11.0   0.3
1.2	12.25
"#;
        let raw = parse_xy_content(content, "sample").unwrap();
        assert_eq!(raw.name, "sample");
        assert_eq!(raw.q, vec![1.0, 1.1, 1.2]);
        assert_eq!(raw.intensity, vec![10.5, 11.0, 12.25]);
    }

    #[test]
    fn test_parse_comma_and_semicolon() {
        let content = "q,intensity\n1.0,2.0\n! note\n1.5; 3.0\n; comment\n2.0 ,4.0\n";
        let raw = parse_xy_content(content, "csv").unwrap();
        assert_eq!(raw.q, vec![1.0, 1.5, 2.0]);
        assert_eq!(raw.intensity, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_keeps_file_order_and_non_finite() {
        let raw = parse_xy_content("2.0 1.0\n1.0 NaN\n", "x").unwrap();
        assert_eq!(raw.q, vec![2.0, 1.0]);
        assert!(raw.intensity[1].is_nan());
    }

    #[test]
    fn test_single_column_is_error() {
        let err = parse_xy_content("1.0 2.0\n1.5\n", "x").unwrap_err();
        match err {
            QpeakError::ParseError { reason, .. } => assert!(reason.starts_with("line 2")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_text_after_data_is_error() {
        assert!(parse_xy_content("1.0 2.0\nEND\n", "x").is_err());
    }

    #[test]
    fn test_empty_file_is_error() {
        assert!(parse_xy_content("# only comments\n\n", "x").is_err());
    }
}
