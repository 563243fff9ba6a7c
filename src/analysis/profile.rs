//! # 峰形函数
//!
//! 三种峰形共用参数布局 `[center, height, fwhm, eta?]`，以 FWHM 而非
//! σ/γ 参数化，便于与检测阶段的半高宽估计直接衔接：
//!
//! - Gaussian: `h·exp(−4 ln2 ((q−q0)/w)²)`
//! - Lorentzian: `h / (1 + 4((q−q0)/w)²)`
//! - Voigt: pseudo-Voigt `h·[η·L + (1−η)·G]`，共用 FWHM，η ∈ [0, 1]
//!
//! ## 依赖关系
//! - 被 `analysis/fitter.rs` 使用
//! - 为 `models/config.rs` 的 ProfileType 增加求值方法

use crate::models::{PeakCandidate, ProfileType};

use std::f64::consts::{LN_2, PI};

pub const CENTER: usize = 0;
pub const HEIGHT: usize = 1;
pub const FWHM: usize = 2;
pub const ETA: usize = 3;

/// pseudo-Voigt 初始混合比例
pub const INITIAL_ETA: f64 = 0.5;

/// 单位峰高、单位 FWHM 的 Gaussian 面积 √(π / (4 ln2))
fn gaussian_area_factor() -> f64 {
    0.5 * (PI / LN_2).sqrt()
}

/// 单位峰高、单位 FWHM 的 Lorentzian 面积 π/2
const LORENTZIAN_AREA_FACTOR: f64 = PI / 2.0;

fn gaussian(x: f64) -> f64 {
    (-4.0 * LN_2 * x * x).exp()
}

fn lorentzian(x: f64) -> f64 {
    1.0 / (1.0 + 4.0 * x * x)
}

impl ProfileType {
    /// 拟合参数个数
    pub fn parameter_count(self) -> usize {
        match self {
            ProfileType::Gaussian | ProfileType::Lorentzian => 3,
            ProfileType::Voigt => 4,
        }
    }

    /// 在 q 处求值
    pub fn evaluate(self, params: &[f64], q: f64) -> f64 {
        let x = (q - params[CENTER]) / params[FWHM];
        let h = params[HEIGHT];
        match self {
            ProfileType::Gaussian => h * gaussian(x),
            ProfileType::Lorentzian => h * lorentzian(x),
            ProfileType::Voigt => {
                let eta = params[ETA];
                h * (eta * lorentzian(x) + (1.0 - eta) * gaussian(x))
            }
        }
    }

    /// 由候选峰给出初值
    pub fn initial_guess(self, candidate: &PeakCandidate) -> Vec<f64> {
        let fwhm = if candidate.fwhm > 0.0 {
            candidate.fwhm
        } else {
            f64::EPSILON * candidate.position.abs().max(1.0)
        };

        let mut params = vec![candidate.position, candidate.height, fwhm];
        if self == ProfileType::Voigt {
            params.push(INITIAL_ETA);
        }
        params
    }

    /// 参数约束，每步迭代后调用
    pub fn constrain(self, params: &mut [f64]) {
        if self == ProfileType::Voigt {
            params[ETA] = params[ETA].clamp(0.0, 1.0);
        }
    }

    /// 混合比例（仅 Voigt）
    pub fn eta(self, params: &[f64]) -> Option<f64> {
        match self {
            ProfileType::Voigt => Some(params[ETA]),
            _ => None,
        }
    }

    /// 积分面积
    pub fn area(self, params: &[f64]) -> f64 {
        params[HEIGHT] * params[FWHM] * self.area_factor(params)
    }

    /// 面积对各参数的偏导，用于误差传递
    pub fn area_gradient(self, params: &[f64]) -> Vec<f64> {
        let factor = self.area_factor(params);
        let mut gradient = vec![0.0; self.parameter_count()];
        gradient[HEIGHT] = params[FWHM] * factor;
        gradient[FWHM] = params[HEIGHT] * factor;
        if self == ProfileType::Voigt {
            gradient[ETA] =
                params[HEIGHT] * params[FWHM] * (LORENTZIAN_AREA_FACTOR - gaussian_area_factor());
        }
        gradient
    }

    fn area_factor(self, params: &[f64]) -> f64 {
        match self {
            ProfileType::Gaussian => gaussian_area_factor(),
            ProfileType::Lorentzian => LORENTZIAN_AREA_FACTOR,
            ProfileType::Voigt => {
                let eta = params[ETA];
                eta * LORENTZIAN_AREA_FACTOR + (1.0 - eta) * gaussian_area_factor()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn candidate() -> PeakCandidate {
        PeakCandidate {
            index: 10,
            position: 2.0,
            height: 50.0,
            prominence: 50.0,
            width_samples: 8.0,
            fwhm: 0.08,
        }
    }

    #[test]
    fn test_half_maximum_at_half_fwhm() {
        for profile in [
            ProfileType::Gaussian,
            ProfileType::Lorentzian,
            ProfileType::Voigt,
        ] {
            let params = profile.initial_guess(&candidate());
            assert_abs_diff_eq!(profile.evaluate(&params, 2.0), 50.0, epsilon = 1e-12);
            assert_abs_diff_eq!(profile.evaluate(&params, 2.04), 25.0, epsilon = 1e-9);
            assert_abs_diff_eq!(profile.evaluate(&params, 1.96), 25.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_parameter_layout() {
        assert_eq!(ProfileType::Gaussian.parameter_count(), 3);
        assert_eq!(ProfileType::Voigt.parameter_count(), 4);

        let params = ProfileType::Voigt.initial_guess(&candidate());
        assert_eq!(params, vec![2.0, 50.0, 0.08, INITIAL_ETA]);
        assert_eq!(ProfileType::Voigt.eta(&params), Some(INITIAL_ETA));
        assert_eq!(ProfileType::Gaussian.eta(&params), None);
    }

    #[test]
    fn test_eta_is_clamped() {
        let mut params = vec![0.0, 1.0, 1.0, 1.7];
        ProfileType::Voigt.constrain(&mut params);
        assert_eq!(params[ETA], 1.0);
        params[ETA] = -0.2;
        ProfileType::Voigt.constrain(&mut params);
        assert_eq!(params[ETA], 0.0);
    }

    #[test]
    fn test_area_matches_numeric_integral() {
        let params = [0.0, 3.0, 0.5, 0.3];
        for profile in [ProfileType::Gaussian, ProfileType::Voigt] {
            let step = 1e-3;
            let numeric: f64 = (-200_000..=200_000)
                .map(|i| profile.evaluate(&params, i as f64 * step) * step)
                .sum();
            // Lorentzian 尾部收敛慢，截断积分会少一部分面积
            let tolerance = if profile == ProfileType::Voigt { 0.01 } else { 1e-6 };
            assert_abs_diff_eq!(profile.area(&params), numeric, epsilon = tolerance);
        }
    }

    #[test]
    fn test_area_gradient() {
        let params = [1.0, 4.0, 0.2];
        let g = ProfileType::Lorentzian.area_gradient(&params);
        assert_eq!(g[CENTER], 0.0);
        assert_abs_diff_eq!(g[HEIGHT], 0.2 * PI / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g[FWHM], 4.0 * PI / 2.0, epsilon = 1e-12);
    }
}
