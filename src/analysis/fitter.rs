//! # 单峰拟合
//!
//! 对每个候选峰截取局部窗口，在扣背底后的信号上用 Levenberg–Marquardt
//! 拟合所选峰形，并检查结果的物理合理性。
//!
//! 窗口为峰顶 ± `ceil(FIT_WINDOW_MARGIN × width_samples)` 个采样点，
//! 每侧至少 `MIN_WINDOW_HALF` 点，超出谱范围时截断。重叠的窗口各自
//! 独立拟合，不做联合解卷积。
//!
//! ## 依赖关系
//! - 被 `analysis/mod.rs` 调用
//! - 使用 `analysis/lm.rs`、`analysis/profile.rs`、`analysis/quality.rs`

use crate::analysis::lm::{self, LmOptions};
use crate::analysis::profile::{CENTER, FWHM, HEIGHT};
use crate::analysis::{numeric, quality};
use crate::error::FitFailure;
use crate::models::{AnalysisConfig, PeakCandidate, PeakUncertainty, ProfileType};

/// 窗口半宽相对检测峰宽的倍数
pub const FIT_WINDOW_MARGIN: f64 = 2.0;
/// 窗口每侧最少采样点数
pub const MIN_WINDOW_HALF: usize = 3;

/// 单峰拟合结果
#[derive(Debug, Clone)]
pub struct PeakFit {
    pub profile_type: ProfileType,
    /// `[center, height, fwhm, eta?]`
    pub params: Vec<f64>,
    /// 窗口内 R²
    pub r_squared: f64,
    pub uncertainty: Option<PeakUncertainty>,
    pub iterations: usize,
}

impl PeakFit {
    pub fn position(&self) -> f64 {
        self.params[CENTER]
    }

    pub fn height(&self) -> f64 {
        self.params[HEIGHT]
    }

    pub fn fwhm(&self) -> f64 {
        self.params[FWHM]
    }

    pub fn area(&self) -> f64 {
        self.profile_type.area(&self.params)
    }

    pub fn eta(&self) -> Option<f64> {
        self.profile_type.eta(&self.params)
    }
}

/// 候选峰的拟合窗口（闭区间索引）
pub fn fit_window(candidate: &PeakCandidate, len: usize) -> (usize, usize) {
    let half = ((FIT_WINDOW_MARGIN * candidate.width_samples).ceil() as usize).max(MIN_WINDOW_HALF);
    let lower = candidate.index.saturating_sub(half);
    let upper = (candidate.index + half).min(len.saturating_sub(1));
    (lower, upper)
}

/// 拟合单个候选峰
pub fn fit_candidate(
    q: &[f64],
    signal: &[f64],
    candidate: &PeakCandidate,
    config: &AnalysisConfig,
) -> Result<PeakFit, FitFailure> {
    let profile = config.profile_type;
    let (lower, upper) = fit_window(candidate, q.len().min(signal.len()));
    let x = &q[lower..=upper];
    let y = &signal[lower..=upper];

    let required = profile.parameter_count() + 1;
    if x.len() < required {
        return Err(FitFailure::WindowTooSmall {
            points: x.len(),
            required,
        });
    }

    let outcome = lm::minimize(
        x,
        y,
        &profile.initial_guess(candidate),
        |p, v| profile.evaluate(p, v),
        |p| profile.constrain(p),
        LmOptions {
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
        },
    );

    let params = outcome.params;
    if !outcome.ssr.is_finite() || params.iter().any(|v| !v.is_finite()) {
        return Err(FitFailure::NonFinite);
    }
    if !outcome.converged {
        return Err(FitFailure::NotConverged {
            iterations: outcome.iterations,
        });
    }
    if params[FWHM] <= 0.0 {
        return Err(FitFailure::NonPositiveWidth(params[FWHM]));
    }
    if params[HEIGHT] <= 0.0 {
        return Err(FitFailure::NonPositiveHeight(params[HEIGHT]));
    }
    let (q_lo, q_hi) = (x[0], x[x.len() - 1]);
    if params[CENTER] < q_lo || params[CENTER] > q_hi {
        return Err(FitFailure::OutsideWindow {
            position: params[CENTER],
            lower: q_lo,
            upper: q_hi,
        });
    }

    let fitted: Vec<f64> = x.iter().map(|&v| profile.evaluate(&params, v)).collect();
    let r_squared = quality::r_squared(y, &fitted);

    let uncertainty = if config.compute_uncertainties {
        uncertainty(profile, &params, &outcome.jtj, outcome.ssr, x.len())
    } else {
        None
    };

    Ok(PeakFit {
        profile_type: profile,
        params,
        r_squared,
        uncertainty,
        iterations: outcome.iterations,
    })
}

/// 标准误差 sqrt(diag(C))，C = (JᵀJ)⁻¹ · SSR/(n−p)；JᵀJ 奇异时返回 None
fn uncertainty(
    profile: ProfileType,
    params: &[f64],
    jtj: &[Vec<f64>],
    ssr: f64,
    points: usize,
) -> Option<PeakUncertainty> {
    let dof = points.checked_sub(params.len()).filter(|&d| d > 0)?;
    let inverse = numeric::invert(jtj)?;
    let variance = ssr / dof as f64;

    let covariance: Vec<Vec<f64>> = inverse
        .iter()
        .map(|row| row.iter().map(|v| v * variance).collect())
        .collect();
    let std_err = |k: usize| covariance[k][k].max(0.0).sqrt();

    // 面积误差一阶传递：σ²_A = gᵀ C g
    let g = profile.area_gradient(params);
    let area_var: f64 = (0..g.len())
        .map(|a| (0..g.len()).map(|b| g[a] * covariance[a][b] * g[b]).sum::<f64>())
        .sum();

    let result = PeakUncertainty {
        position: std_err(CENTER),
        height: std_err(HEIGHT),
        fwhm: std_err(FWHM),
        area: area_var.max(0.0).sqrt(),
    };

    let finite = [result.position, result.height, result.fwhm, result.area]
        .iter()
        .all(|v| v.is_finite());
    finite.then_some(result)
}
