//! # 统一错误处理模块
//!
//! 定义 qpeak 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 错误分类
//! - `ValidationError`: 输入或配置不合法，整个分析调用失败
//! - `FitFailure`: 单个候选峰拟合失败，在流水线内部恢复并计数
//! - `QpeakError`: 命令行层的 I/O、解析、导出错误
//!
//! 低质量拟合（R² 低于阈值）不是错误，只是过滤策略。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// 错误信息中最多列出的索引数
const MAX_LISTED_INDICES: usize = 10;

/// 出错的输入数组
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Q,
    Intensity,
}

impl Field {
    /// 对外使用的字段名
    pub fn name(self) -> &'static str {
        match self {
            Field::Q => "q_values",
            Field::Intensity => "intensities",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 输入校验错误（对整个调用是致命的）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Q-values and intensities must have same length ({q_len} vs {intensity_len})")]
    LengthMismatch { q_len: usize, intensity_len: usize },

    #[error("Insufficient data points: {len} (minimum {min} required)")]
    TooFewPoints { len: usize, min: usize },

    #[error("{field} must contain only finite numbers (NaN/Infinity at indices {})", format_indices(.indices))]
    NonFinite { field: Field, indices: Vec<usize> },

    #[error("Q-values must be monotonically increasing (violations at indices {})", format_indices(.indices))]
    NotMonotonic { indices: Vec<usize> },

    #[error("intensities must contain at least one positive value")]
    NoPositiveIntensity,

    #[error("Invalid configuration '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl ValidationError {
    /// 出错字段名
    pub fn field(&self) -> &str {
        match self {
            ValidationError::LengthMismatch { .. }
            | ValidationError::TooFewPoints { .. }
            | ValidationError::NoPositiveIntensity => Field::Intensity.name(),
            ValidationError::NonFinite { field, .. } => field.name(),
            ValidationError::NotMonotonic { .. } => Field::Q.name(),
            ValidationError::InvalidConfig { field, .. } => field,
        }
    }

    /// 出错的样本索引（无则为空）
    pub fn indices(&self) -> &[usize] {
        match self {
            ValidationError::NonFinite { indices, .. }
            | ValidationError::NotMonotonic { indices } => indices,
            _ => &[],
        }
    }
}

fn format_indices(indices: &[usize]) -> String {
    let shown: Vec<String> = indices
        .iter()
        .take(MAX_LISTED_INDICES)
        .map(|i| i.to_string())
        .collect();
    if indices.len() > MAX_LISTED_INDICES {
        format!(
            "[{}, ... {} more]",
            shown.join(", "),
            indices.len() - MAX_LISTED_INDICES
        )
    } else {
        format!("[{}]", shown.join(", "))
    }
}

/// 单个候选峰的拟合失败原因
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitFailure {
    #[error("fit window has {points} points, need at least {required}")]
    WindowTooSmall { points: usize, required: usize },

    #[error("did not converge within {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("fitted parameters are not finite")]
    NonFinite,

    #[error("non-positive width (FWHM = {0:.4e})")]
    NonPositiveWidth(f64),

    #[error("non-positive height ({0:.4e})")]
    NonPositiveHeight(f64),

    #[error("position {position:.4} outside fit window [{lower:.4}, {upper:.4}]")]
    OutsideWindow { position: f64, lower: f64, upper: f64 },
}

/// qpeak 应用层错误类型
#[derive(Error, Debug)]
pub enum QpeakError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 分析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid range format: {0}")]
    InvalidRange(String),

    // ─────────────────────────────────────────────────────────────
    // 导出错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Plot error: {0}")]
    PlotError(String),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, QpeakError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_field_and_indices() {
        let err = ValidationError::NotMonotonic { indices: vec![2] };
        assert_eq!(err.field(), "q_values");
        assert_eq!(err.indices(), &[2]);
        assert_eq!(
            err.to_string(),
            "Q-values must be monotonically increasing (violations at indices [2])"
        );
    }

    #[test]
    fn test_long_index_lists_are_truncated() {
        let err = ValidationError::NonFinite {
            field: Field::Intensity,
            indices: (0..25).collect(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("intensities must contain only finite numbers"));
        assert!(msg.contains("... 15 more"));
        assert_eq!(err.indices().len(), 25);
    }

    #[test]
    fn test_field_name_matches_message_and_accessor() {
        for field in [Field::Q, Field::Intensity] {
            let err = ValidationError::NonFinite {
                field,
                indices: vec![0],
            };
            assert_eq!(err.field(), field.name());
            assert!(err.to_string().starts_with(field.name()));
        }
        assert_eq!(
            ValidationError::NoPositiveIntensity.field(),
            Field::Intensity.name()
        );
    }
}
