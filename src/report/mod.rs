//! # 分析结果输出模块
//!
//! 将 `AnalysisResult` 导出为文件或图表。
//!
//! ## 依赖关系
//! - 被 `commands/analyze.rs` 调用
//! - 子模块: export, plot

pub mod export;
pub mod plot;

use crate::models::{AnalysisResult, FittedPeak};

/// 所有拟合峰在 q 处的叠加强度（不含背底）
pub fn model_intensity(peaks: &[FittedPeak], q: f64) -> f64 {
    peaks
        .iter()
        .map(|p| {
            let mut params = vec![p.position, p.height, p.fwhm];
            if let Some(eta) = p.eta {
                params.push(eta);
            }
            p.profile_type.evaluate(&params, q)
        })
        .sum()
}

/// 拟合模型曲线（背底 + 各峰）
pub fn model_curve(q: &[f64], result: &AnalysisResult) -> Vec<f64> {
    q.iter()
        .zip(&result.background.baseline)
        .map(|(&x, &b)| b + model_intensity(&result.peaks, x))
        .collect()
}

/// 按峰高降序取前 n 个峰，输出仍按峰位升序
pub fn top_peaks(peaks: &[FittedPeak], n: usize) -> Vec<FittedPeak> {
    let mut sorted = peaks.to_vec();
    sorted.sort_by(|a, b| b.height.total_cmp(&a.height));
    sorted.truncate(n);
    sorted.sort_by(|a, b| a.position.total_cmp(&b.position));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileType;
    use approx::assert_abs_diff_eq;

    fn peak(position: f64, height: f64, profile_type: ProfileType) -> FittedPeak {
        FittedPeak {
            position,
            height,
            fwhm: 0.1,
            area: 0.0,
            profile_type,
            eta: (profile_type == ProfileType::Voigt).then_some(0.5),
            r_squared: 1.0,
            d_spacing: None,
            uncertainty: None,
            candidate_index: 0,
        }
    }

    #[test]
    fn test_model_intensity_sums_peaks() {
        let peaks = vec![
            peak(1.0, 10.0, ProfileType::Gaussian),
            peak(1.05, 4.0, ProfileType::Voigt),
        ];
        // 1.05 处：Gaussian 半高 5，Voigt 峰顶 4
        assert_abs_diff_eq!(model_intensity(&peaks, 1.05), 9.0, epsilon = 1e-9);
        assert_eq!(model_intensity(&[], 1.0), 0.0);
    }

    #[test]
    fn test_top_peaks() {
        let peaks = vec![
            peak(1.0, 5.0, ProfileType::Gaussian),
            peak(2.0, 50.0, ProfileType::Gaussian),
            peak(3.0, 20.0, ProfileType::Gaussian),
        ];
        let top = top_peaks(&peaks, 2);
        let positions: Vec<f64> = top.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![2.0, 3.0]);
        assert_eq!(top_peaks(&peaks, 10).len(), 3);
    }
}
