//! # 结果汇总
//!
//! 把通过质量过滤的拟合转换为 `FittedPeak`，计算 d 间距、按峰位排序，
//! 并给出峰高加权的整体 R²。
//!
//! ## 依赖关系
//! - 被 `analysis/mod.rs` 调用
//! - 使用 `analysis/fitter.rs` 的 PeakFit

use crate::analysis::fitter::PeakFit;
use crate::models::FittedPeak;

use std::f64::consts::PI;

/// d = 2π/Q，Q <= 0 时无定义
pub fn d_spacing(q: f64) -> Option<f64> {
    if q > 0.0 {
        Some(2.0 * PI / q)
    } else {
        None
    }
}

/// 拟合结果转为输出峰
pub fn to_fitted_peak(fit: &PeakFit, candidate_index: usize) -> FittedPeak {
    let position = fit.position();
    FittedPeak {
        position,
        height: fit.height(),
        fwhm: fit.fwhm(),
        area: fit.area(),
        profile_type: fit.profile_type,
        eta: fit.eta(),
        r_squared: fit.r_squared,
        d_spacing: d_spacing(position),
        uncertainty: fit.uncertainty,
        candidate_index,
    }
}

/// 按峰位升序排列
pub fn sort_by_position(peaks: &mut [FittedPeak]) {
    peaks.sort_by(|a, b| a.position.total_cmp(&b.position));
}

/// 峰高加权平均 R²，无峰时为 0
pub fn overall_r_squared(peaks: &[FittedPeak]) -> f64 {
    let total_height: f64 = peaks.iter().map(|p| p.height).sum();
    if !(total_height > 0.0) {
        return 0.0;
    }
    peaks.iter().map(|p| p.height * p.r_squared).sum::<f64>() / total_height
}
