//! # 候选峰检测
//!
//! 在扣背底后的信号上寻找局部极大值，并依次按峰高、突出度、峰宽、
//! 峰间距过滤。语义与 `scipy.signal.find_peaks` 一致：
//!
//! 1. 局部极大值：严格大于左右相邻点（端点不参与）
//! 2. 峰高 > `height_threshold × max`
//! 3. 突出度：向两侧扫描直到遇到严格更高的点或边界，取两侧最小值中
//!    较高者为参考线；突出度需 > `prominence × (max − min)`，且高于
//!    数值噪声下限
//! 4. 半突出度处宽度（线性插值，采样点单位）落在 `width_bounds` 内
//! 5. 峰间距：按峰高降序（同高取索引小者）贪心保留，与已保留峰的
//!    索引差必须 > `min_distance`
//!
//! 平坦谱返回空列表，不是错误。
//!
//! ## 依赖关系
//! - 被 `analysis/mod.rs` 调用
//! - 使用 `models/peak.rs` 的 PeakCandidate

use crate::models::{AnalysisConfig, PeakCandidate};

use log::debug;

/// 数值噪声下限（相对原始强度绝对值最大值）
pub const NOISE_FLOOR: f64 = 1e-9;

/// 检测候选峰，结果按索引（即 Q）升序
pub fn detect_candidates(
    q: &[f64],
    signal: &[f64],
    intensity_scale: f64,
    config: &AnalysisConfig,
) -> Vec<PeakCandidate> {
    let n = signal.len().min(q.len());
    if n < 3 {
        return Vec::new();
    }
    let signal = &signal[..n];

    let max = signal.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = signal.iter().copied().fold(f64::INFINITY, f64::min);
    if !(max > 0.0) {
        return Vec::new();
    }

    let height_cut = config.height_threshold * max;
    let prominence_cut = (config.prominence * (max - min)).max(NOISE_FLOOR * intensity_scale);
    let (width_min, width_max) = config.width_bounds;

    let mut candidates = Vec::new();
    for i in 1..n - 1 {
        let height = signal[i];
        if !(height > signal[i - 1] && height > signal[i + 1]) || height <= height_cut {
            continue;
        }

        let prominence = prominence_at(signal, i);
        if prominence <= prominence_cut {
            continue;
        }

        let half = height - prominence / 2.0;
        let left_ips = crossing(signal, i, half, Side::Left);
        let right_ips = crossing(signal, i, half, Side::Right);
        let width_samples = right_ips - left_ips;
        if width_samples < width_min || width_samples > width_max {
            debug!(
                "candidate at index {} rejected: width {:.2} samples outside [{}, {}]",
                i, width_samples, width_min, width_max
            );
            continue;
        }

        candidates.push(PeakCandidate {
            index: i,
            position: q[i],
            height,
            prominence,
            width_samples,
            fwhm: q_at(q, right_ips) - q_at(q, left_ips),
        });
    }

    let detected = candidates.len();
    let kept = suppress_close(candidates, config.min_distance);
    debug!(
        "{} candidates passed height/prominence/width filters, {} kept after distance filter",
        detected,
        kept.len()
    );
    kept
}

/// 突出度：峰高减去两侧基线中较高者
fn prominence_at(signal: &[f64], peak: usize) -> f64 {
    let height = signal[peak];

    let mut left_min = height;
    for &v in signal[..peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &signal[peak + 1..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// 从峰顶向一侧寻找信号穿过 `level` 的位置（分数索引）
fn crossing(signal: &[f64], peak: usize, level: f64, side: Side) -> f64 {
    match side {
        Side::Left => {
            for i in (1..=peak).rev() {
                if signal[i - 1] <= level && signal[i] > level {
                    let frac = (level - signal[i - 1]) / (signal[i] - signal[i - 1]);
                    return (i - 1) as f64 + frac;
                }
            }
            0.0
        }
        Side::Right => {
            for i in peak..signal.len() - 1 {
                if signal[i] > level && signal[i + 1] <= level {
                    let frac = (signal[i] - level) / (signal[i] - signal[i + 1]);
                    return i as f64 + frac;
                }
            }
            (signal.len() - 1) as f64
        }
    }
}

/// 分数索引处的 Q（线性插值）
fn q_at(q: &[f64], ips: f64) -> f64 {
    let last = q.len() - 1;
    let ips = ips.clamp(0.0, last as f64);
    let i = (ips.floor() as usize).min(last);
    if i == last {
        return q[last];
    }
    q[i] + (ips - i as f64) * (q[i + 1] - q[i])
}

/// 峰间距过滤：高峰优先，同高取左侧
fn suppress_close(mut candidates: Vec<PeakCandidate>, min_distance: usize) -> Vec<PeakCandidate> {
    candidates.sort_by(|a, b| {
        b.height
            .total_cmp(&a.height)
            .then_with(|| a.index.cmp(&b.index))
    });

    let mut kept: Vec<PeakCandidate> = Vec::with_capacity(candidates.len());
    for c in candidates {
        if kept
            .iter()
            .all(|k| k.index.abs_diff(c.index) > min_distance)
        {
            kept.push(c);
        }
    }

    kept.sort_by_key(|c| c.index);
    kept
}
