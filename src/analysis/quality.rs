//! # 拟合质量评估
//!
//! R² 低于阈值的峰不算错误，只是被过滤并计入 `low_quality`。
//!
//! ## 依赖关系
//! - 被 `analysis/fitter.rs`、`analysis/mod.rs` 使用
//! - 使用 `analysis/numeric.rs`

pub use crate::analysis::numeric::r_squared;

/// 质量判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Accepted,
    LowQuality,
}

/// R² ≥ 阈值即接受
pub fn assess(r_squared: f64, threshold: f64) -> Quality {
    if r_squared >= threshold {
        Quality::Accepted
    } else {
        Quality::LowQuality
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assess_threshold_is_inclusive() {
        assert_eq!(assess(0.95, 0.95), Quality::Accepted);
        assert_eq!(assess(0.9499, 0.95), Quality::LowQuality);
        assert_eq!(assess(0.0, 0.0), Quality::Accepted);
    }
}
