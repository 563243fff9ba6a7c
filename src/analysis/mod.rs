//! # 峰分析引擎
//!
//! 对一条 Q 空间衍射谱执行完整流水线：
//!
//! 1. 输入校验（`Spectrum::new`）
//! 2. 背底估计与扣除（`background`）
//! 3. 候选峰检测（`detector`）
//! 4. 逐峰拟合（`fitter` + `lm` + `profile`）
//! 5. 质量过滤（`quality`）
//! 6. 汇总（`aggregate`）
//!
//! 引擎无状态、单线程，不做 I/O；同样的输入和配置总是得到同样的峰。
//! 单个候选峰的拟合失败不会中断调用，只记入 `fit_failures` 和警告。
//!
//! ## 依赖关系
//! - 被 `lib.rs` 导出，被 `commands/analyze.rs` 调用
//! - 使用 `models/` 的数据模型和 `error.rs` 的 ValidationError

pub mod aggregate;
pub mod background;
pub mod detector;
pub mod fitter;
pub mod lm;
pub mod numeric;
pub mod profile;
pub mod quality;

use crate::error::ValidationError;
use crate::models::{AnalysisConfig, AnalysisResult, Spectrum};

use log::{debug, warn};
use quality::Quality;
use std::time::Instant;

/// 校验输入与配置后分析
pub fn analyze(
    q: &[f64],
    intensity: &[f64],
    config: &AnalysisConfig,
) -> Result<AnalysisResult, ValidationError> {
    config.validate()?;
    let spectrum = Spectrum::new(q.to_vec(), intensity.to_vec())?;
    Ok(analyze_spectrum(&spectrum, config))
}

/// 分析已校验的谱
///
/// 配置应事先通过 [`AnalysisConfig::validate`]。
pub fn analyze_spectrum(spectrum: &Spectrum, config: &AnalysisConfig) -> AnalysisResult {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let background = background::estimate_background(spectrum, config);
    debug!(
        "background: enabled={}, order={}, R²={:.4}",
        background.enabled, background.order, background.r_squared
    );

    let q = spectrum.q();
    let candidates = detector::detect_candidates(
        q,
        &background.subtracted,
        spectrum.intensity_scale(),
        config,
    );
    debug!("{} candidate peaks detected", candidates.len());
    if candidates.is_empty() {
        warnings.push("No peaks detected with current parameters".to_string());
    }

    let mut peaks = Vec::with_capacity(candidates.len());
    let mut fit_failures = 0;
    let mut low_quality = 0;

    for (i, candidate) in candidates.iter().enumerate() {
        let fit = match fitter::fit_candidate(q, &background.subtracted, candidate, config) {
            Ok(fit) => fit,
            Err(e) => {
                warn!(
                    "peak {} at Q={:.4}: fit failed: {}",
                    i, candidate.position, e
                );
                warnings.push(format!(
                    "Failed to fit peak {} at Q={:.4}: {}",
                    i, candidate.position, e
                ));
                fit_failures += 1;
                continue;
            }
        };

        debug!(
            "peak {}: Q0={:.5}, h={:.3}, FWHM={:.5}, R²={:.4}, {} iterations",
            i,
            fit.position(),
            fit.height(),
            fit.fwhm(),
            fit.r_squared,
            fit.iterations
        );

        match quality::assess(fit.r_squared, config.r_squared_threshold) {
            Quality::Accepted => peaks.push(aggregate::to_fitted_peak(&fit, candidate.index)),
            Quality::LowQuality => {
                warnings.push(format!(
                    "Peak {} at Q={:.4} fit quality below threshold (R^2={:.3})",
                    i,
                    fit.position(),
                    fit.r_squared
                ));
                low_quality += 1;
            }
        }
    }

    aggregate::sort_by_position(&mut peaks);
    let overall_r_squared = aggregate::overall_r_squared(&peaks);

    AnalysisResult {
        candidates_detected: candidates.len(),
        peaks_fitted: peaks.len(),
        peaks,
        fit_failures,
        low_quality,
        overall_r_squared,
        processing_time: start.elapsed(),
        background,
        warnings,
    }
}
