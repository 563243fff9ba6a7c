//! # 衍射谱数据模型
//!
//! 一维粉末衍射谱：强度随散射矢量模 Q (Å⁻¹) 的变化。
//!
//! `Spectrum` 只能通过 [`Spectrum::new`] 创建，创建时完成全部输入校验，
//! 之后不可变。
//!
//! ## 校验规则（按顺序）
//! 1. Q 与强度数组长度一致
//! 2. 至少 `MIN_POINTS` 个点
//! 3. 不含 NaN / Infinity
//! 4. Q 严格递增
//! 5. 至少一个正强度
//!
//! ## 依赖关系
//! - 被 `analysis/` 和 `parsers/` 使用
//! - 使用 `error.rs` 的 ValidationError

use crate::error::{Field, ValidationError};

use serde::Serialize;

/// 最少数据点数（形成一个局部极大值所需）
pub const MIN_POINTS: usize = 3;

/// 重采样网格的点数上限
pub const MAX_RESAMPLE_POINTS: usize = 10_000_000;

/// 经过校验的衍射谱
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    q: Vec<f64>,
    intensity: Vec<f64>,
}

/// 衍射谱统计信息
#[derive(Debug, Clone, Serialize)]
pub struct SpectrumStatistics {
    pub num_points: usize,
    /// Q 范围 (min, max)，Å⁻¹
    pub q_range: (f64, f64),
    pub q_step_mean: f64,
    pub q_step_std: f64,
    pub intensity_range: (f64, f64),
    pub intensity_mean: f64,
    pub intensity_std: f64,
}

impl Spectrum {
    /// 校验并创建衍射谱
    pub fn new(q: Vec<f64>, intensity: Vec<f64>) -> Result<Self, ValidationError> {
        if q.len() != intensity.len() {
            return Err(ValidationError::LengthMismatch {
                q_len: q.len(),
                intensity_len: intensity.len(),
            });
        }

        if q.len() < MIN_POINTS {
            return Err(ValidationError::TooFewPoints {
                len: q.len(),
                min: MIN_POINTS,
            });
        }

        for (field, values) in [(Field::Q, &q), (Field::Intensity, &intensity)] {
            let bad: Vec<usize> = values
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_finite())
                .map(|(i, _)| i)
                .collect();
            if !bad.is_empty() {
                return Err(ValidationError::NonFinite {
                    field,
                    indices: bad,
                });
            }
        }

        let not_increasing: Vec<usize> = (1..q.len()).filter(|&i| q[i] <= q[i - 1]).collect();
        if !not_increasing.is_empty() {
            return Err(ValidationError::NotMonotonic {
                indices: not_increasing,
            });
        }

        if !intensity.iter().any(|&v| v > 0.0) {
            return Err(ValidationError::NoPositiveIntensity);
        }

        Ok(Self { q, intensity })
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    /// 校验保证至少 `MIN_POINTS` 个点，始终为 false
    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn q(&self) -> &[f64] {
        &self.q
    }

    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    /// Q 范围 (min, max)
    pub fn q_range(&self) -> (f64, f64) {
        (self.q[0], self.q[self.q.len() - 1])
    }

    /// 最大强度
    pub fn max_intensity(&self) -> f64 {
        self.intensity
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// 强度绝对值的最大值，用作数值噪声基准
    pub fn intensity_scale(&self) -> f64 {
        self.intensity.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
    }

    /// Q 步长中位数
    pub fn median_q_step(&self) -> f64 {
        let mut steps: Vec<f64> = self.q.windows(2).map(|w| w[1] - w[0]).collect();
        steps.sort_by(|a, b| a.total_cmp(b));
        let n = steps.len();
        if n % 2 == 1 {
            steps[n / 2]
        } else {
            0.5 * (steps[n / 2 - 1] + steps[n / 2])
        }
    }

    /// 计算统计信息（总体标准差）
    pub fn statistics(&self) -> SpectrumStatistics {
        let steps: Vec<f64> = self.q.windows(2).map(|w| w[1] - w[0]).collect();
        let (q_step_mean, q_step_std) = mean_std(&steps);
        let (intensity_mean, intensity_std) = mean_std(&self.intensity);
        let i_min = self.intensity.iter().copied().fold(f64::INFINITY, f64::min);

        SpectrumStatistics {
            num_points: self.len(),
            q_range: self.q_range(),
            q_step_mean,
            q_step_std,
            intensity_range: (i_min, self.max_intensity()),
            intensity_mean,
            intensity_std,
        }
    }

    /// 截取 Q 范围（闭区间），返回重新校验的新谱
    pub fn trim_q_range(
        &self,
        q_min: Option<f64>,
        q_max: Option<f64>,
    ) -> Result<Spectrum, ValidationError> {
        let lo = q_min.unwrap_or(f64::NEG_INFINITY);
        let hi = q_max.unwrap_or(f64::INFINITY);

        let (q, intensity): (Vec<f64>, Vec<f64>) = self
            .q
            .iter()
            .zip(&self.intensity)
            .filter(|(q, _)| **q >= lo && **q <= hi)
            .map(|(q, i)| (*q, *i))
            .unzip();

        Spectrum::new(q, intensity)
    }

    /// 线性插值到新的 Q 网格，返回重新校验的新谱
    ///
    /// 超出原 Q 范围的点取端点强度，不外推。
    pub fn interpolate(&self, new_q: &[f64]) -> Result<Spectrum, ValidationError> {
        let intensity = new_q.iter().map(|&x| self.intensity_at(x)).collect();
        Spectrum::new(new_q.to_vec(), intensity)
    }

    /// 重采样到覆盖原 Q 范围的等间距网格
    pub fn resample(&self, step: f64) -> Result<Spectrum, ValidationError> {
        let (q_min, q_max) = self.q_range();
        if !step.is_finite() || step <= 0.0 {
            return Err(ValidationError::InvalidConfig {
                field: "q_step",
                reason: format!("must be a finite value > 0, got {}", step),
            });
        }

        // 容差避免 span/step 恰为整数时因舍入丢掉最后一个点
        let intervals = ((q_max - q_min) / step + 1e-9).floor();
        if intervals >= MAX_RESAMPLE_POINTS as f64 {
            return Err(ValidationError::InvalidConfig {
                field: "q_step",
                reason: format!(
                    "step {} gives more than {} points",
                    step, MAX_RESAMPLE_POINTS
                ),
            });
        }

        let grid: Vec<f64> = (0..=intervals as usize)
            .map(|i| q_min + i as f64 * step)
            .collect();
        self.interpolate(&grid)
    }

    /// 单点线性插值
    fn intensity_at(&self, x: f64) -> f64 {
        let last = self.q.len() - 1;
        if !(x > self.q[0]) {
            return self.intensity[0];
        }
        if x >= self.q[last] {
            return self.intensity[last];
        }

        // 第一个大于 x 的索引，落在 1..=last
        let hi = self.q.partition_point(|&v| v <= x);
        let lo = hi - 1;
        let frac = (x - self.q[lo]) / (self.q[hi] - self.q[lo]);
        self.intensity[lo] + frac * (self.intensity[hi] - self.intensity[lo])
    }
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
