//! # 背底估计
//!
//! 迭代非对称最小二乘：每轮拟合后把高于当前背底的强度截到背底上，
//! 再重新拟合，使曲线逐步贴近谱的下包络。固定迭代 `BACKGROUND_ITERATIONS`
//! 轮，不做收敛判断。
//!
//! 可选的基函数族：
//! - 幂基多项式（默认）
//! - Chebyshev 多项式
//! - 三次 B 样条，节点数 `min(order + 3, n / 4)`，内部节点均匀分布；
//!   点数不足或法方程奇异时退回线性多项式
//!
//! Q 先线性映射到 t ∈ [-1, 1] 再拟合，保证法方程的条件数可控。
//! 扣背底后的强度不做截断，平坦区域出现负残差是正常的。
//!
//! ## 依赖关系
//! - 被 `analysis/mod.rs` 调用
//! - 使用 `analysis/numeric.rs` 求解法方程

use crate::analysis::numeric;
use crate::models::{AnalysisConfig, Background, BackgroundModel, Spectrum};

use log::debug;

/// 拟合轮数
pub const BACKGROUND_ITERATIONS: usize = 3;

/// 样条次数
const SPLINE_DEGREE: usize = 3;

/// 样条模型在阶数之外额外使用的节点数
const SPLINE_EXTRA_KNOTS: usize = 3;

// ─────────────────────────────────────────────────────────────
// 基函数
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Basis {
    /// 1, t, t², …
    Power(usize),
    /// T₀(t), T₁(t), …
    Chebyshev(usize),
    /// 夹持节点向量（含两端各 `SPLINE_DEGREE + 1` 个重复端点）
    Spline(Vec<f64>),
}

impl Basis {
    fn for_config(model: BackgroundModel, order: usize, n: usize) -> Basis {
        let order = order.min(n - 1);
        match model {
            BackgroundModel::Polynomial => Basis::Power(order),
            BackgroundModel::Chebyshev => Basis::Chebyshev(order),
            BackgroundModel::Spline => {
                let count = (order + SPLINE_EXTRA_KNOTS).min(n / 4);
                let mut knots = vec![-1.0; SPLINE_DEGREE + 1];
                if count > 2 {
                    let step = 2.0 / (count - 1) as f64;
                    knots.extend((1..count - 1).map(|k| -1.0 + k as f64 * step));
                }
                knots.extend(std::iter::repeat(1.0).take(SPLINE_DEGREE + 1));
                Basis::Spline(knots)
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            Basis::Power(order) | Basis::Chebyshev(order) => order + 1,
            Basis::Spline(knots) => knots.len() - SPLINE_DEGREE - 1,
        }
    }

    fn model(&self) -> BackgroundModel {
        match self {
            Basis::Power(_) => BackgroundModel::Polynomial,
            Basis::Chebyshev(_) => BackgroundModel::Chebyshev,
            Basis::Spline(_) => BackgroundModel::Spline,
        }
    }

    fn order(&self) -> usize {
        match self {
            Basis::Power(order) | Basis::Chebyshev(order) => *order,
            Basis::Spline(_) => SPLINE_DEGREE,
        }
    }

    /// 内部节点（t 坐标）
    fn interior_knots(&self) -> &[f64] {
        match self {
            Basis::Spline(knots) => &knots[SPLINE_DEGREE + 1..knots.len() - SPLINE_DEGREE - 1],
            _ => &[],
        }
    }

    /// 无法拟合时的下一个候选；多项式逐级降阶，样条退回线性
    fn fallback(&self) -> Option<Basis> {
        match self {
            Basis::Power(0) | Basis::Chebyshev(0) => None,
            Basis::Power(order) => Some(Basis::Power(order - 1)),
            Basis::Chebyshev(order) => Some(Basis::Chebyshev(order - 1)),
            Basis::Spline(_) => Some(Basis::Power(1)),
        }
    }

    /// 设计矩阵的一行
    fn row(&self, t: f64) -> Vec<f64> {
        match self {
            Basis::Power(order) => {
                let mut p = 1.0;
                (0..=*order)
                    .map(|_| {
                        let v = p;
                        p *= t;
                        v
                    })
                    .collect()
            }
            Basis::Chebyshev(order) => {
                let mut row = Vec::with_capacity(order + 1);
                row.push(1.0);
                if *order >= 1 {
                    row.push(t);
                }
                for k in 2..=*order {
                    row.push(2.0 * t * row[k - 1] - row[k - 2]);
                }
                row
            }
            Basis::Spline(knots) => bspline_row(knots, t.clamp(-1.0, 1.0)),
        }
    }

    fn evaluate(&self, coefficients: &[f64], t: f64) -> f64 {
        self.row(t)
            .iter()
            .zip(coefficients)
            .map(|(b, c)| b * c)
            .sum()
    }
}

/// 三次 B 样条在 t 处的全部基函数值（Cox–de Boor）
fn bspline_row(knots: &[f64], t: f64) -> Vec<f64> {
    let count = knots.len() - SPLINE_DEGREE - 1;
    let mut row = vec![0.0; count];

    // 节点区间 [knots[span], knots[span + 1])，右端点归入最后一个区间
    let span = (SPLINE_DEGREE..count)
        .rev()
        .find(|&s| knots[s] <= t)
        .unwrap_or(SPLINE_DEGREE);

    let mut values = [0.0; SPLINE_DEGREE + 1];
    let mut left = [0.0; SPLINE_DEGREE + 1];
    let mut right = [0.0; SPLINE_DEGREE + 1];
    values[0] = 1.0;
    for j in 1..=SPLINE_DEGREE {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom != 0.0 { values[r] / denom } else { 0.0 };
            values[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        values[j] = saved;
    }

    for (j, v) in values.iter().enumerate() {
        row[span - SPLINE_DEGREE + j] = *v;
    }
    row
}

// ─────────────────────────────────────────────────────────────
// 估计
// ─────────────────────────────────────────────────────────────

/// 估计并扣除背底
pub fn estimate_background(spectrum: &Spectrum, config: &AnalysisConfig) -> Background {
    let q = spectrum.q();
    let intensity = spectrum.intensity();
    let (q_min, q_max) = spectrum.q_range();
    let q_center = 0.5 * (q_min + q_max);
    let q_half_span = 0.5 * (q_max - q_min);

    if !config.background_enabled {
        return Background {
            enabled: false,
            model: config.background_model,
            order: 0,
            knots: Vec::new(),
            coefficients: Vec::new(),
            q_center,
            q_half_span,
            r_squared: 1.0,
            baseline: vec![0.0; intensity.len()],
            subtracted: intensity.to_vec(),
        };
    }

    let t: Vec<f64> = q.iter().map(|&v| (v - q_center) / q_half_span).collect();
    let requested = Basis::for_config(
        config.background_model,
        config.background_order as usize,
        q.len(),
    );

    let mut work = intensity.to_vec();
    let (mut basis, mut coefficients) = least_squares(&t, &work, &requested);
    let mut baseline: Vec<f64> = t.iter().map(|&ti| basis.evaluate(&coefficients, ti)).collect();

    for iteration in 1..BACKGROUND_ITERATIONS {
        // 非对称截断：只压低高于背底的点
        for (w, b) in work.iter_mut().zip(&baseline) {
            if *w > *b {
                *w = *b;
            }
        }

        (basis, coefficients) = least_squares(&t, &work, &requested);
        baseline = t.iter().map(|&ti| basis.evaluate(&coefficients, ti)).collect();
        debug!(
            "background iteration {}: {} order {}, coefficients {:?}",
            iteration + 1,
            basis.model(),
            basis.order(),
            coefficients
        );
    }

    let subtracted: Vec<f64> = intensity
        .iter()
        .zip(&baseline)
        .map(|(y, b)| y - b)
        .collect();
    let r_squared = numeric::r_squared(intensity, &baseline);

    Background {
        enabled: true,
        model: basis.model(),
        order: basis.order(),
        knots: basis
            .interior_knots()
            .iter()
            .map(|k| q_center + k * q_half_span)
            .collect(),
        coefficients,
        q_center,
        q_half_span,
        r_squared,
        baseline,
        subtracted,
    }
}

/// 法方程最小二乘；基函数多于点数或方程奇异时按 `Basis::fallback` 退化
fn least_squares(t: &[f64], y: &[f64], basis: &Basis) -> (Basis, Vec<f64>) {
    let mut current = basis.clone();
    loop {
        let m = current.len();
        if m <= t.len() {
            let mut normal = vec![vec![0.0; m]; m];
            let mut rhs = vec![0.0; m];
            for (&ti, &yi) in t.iter().zip(y) {
                let row = current.row(ti);
                for j in 0..m {
                    rhs[j] += row[j] * yi;
                    for k in j..m {
                        normal[j][k] += row[j] * row[k];
                    }
                }
            }
            for j in 0..m {
                for k in 0..j {
                    normal[j][k] = normal[k][j];
                }
            }

            if let Some(coefficients) = numeric::solve_linear(&normal, &rhs) {
                return (current, coefficients);
            }
        }

        match current.fallback() {
            Some(next) => current = next,
            None => break,
        }
    }

    // 0 阶法方程只有在 t 为空时才奇异，校验过的谱不会出现
    let mean = y.iter().sum::<f64>() / y.len().max(1) as f64;
    (Basis::Power(0), vec![mean])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn linear_with_peak() -> Spectrum {
        let q: Vec<f64> = (0..401).map(|i| 1.0 + i as f64 * 0.01).collect();
        let intensity = q
            .iter()
            .map(|&x| {
                let peak = 100.0 * (-4.0 * 2.0_f64.ln() * ((x - 3.0) / 0.1).powi(2)).exp();
                10.0 + 2.0 * x + peak
            })
            .collect();
        Spectrum::new(q, intensity).unwrap()
    }

    #[test]
    fn test_disabled_is_pass_through() {
        let spectrum = linear_with_peak();
        let config = AnalysisConfig {
            background_enabled: false,
            ..Default::default()
        };
        let bg = estimate_background(&spectrum, &config);

        assert!(!bg.enabled);
        assert!(bg.baseline.iter().all(|&b| b == 0.0));
        assert_eq!(bg.subtracted, spectrum.intensity());
    }

    #[test]
    fn test_linear_baseline_tracks_lower_envelope() {
        let spectrum = linear_with_peak();
        let bg = estimate_background(&spectrum, &AnalysisConfig::default());

        assert!(bg.enabled);
        assert_eq!(bg.order, 1);
        assert_eq!(bg.baseline.len(), spectrum.len());

        // 远离峰的区域背底应与真实线性背底一致
        for (i, &q) in spectrum.q().iter().enumerate() {
            if (q - 3.0).abs() > 0.5 {
                assert_abs_diff_eq!(bg.baseline[i], 10.0 + 2.0 * q, epsilon = 0.1);
            }
        }

        // 峰顶扣背底后接近峰高
        assert_abs_diff_eq!(bg.subtracted[200], 100.0, epsilon = 0.5);
    }

    #[test]
    fn test_subtracted_values_are_not_clipped() {
        let q: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
        let intensity: Vec<f64> = (0..50)
            .map(|i| 20.0 + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let spectrum = Spectrum::new(q, intensity).unwrap();
        let bg = estimate_background(&spectrum, &AnalysisConfig::default());

        assert!(bg.subtracted.iter().any(|&v| v < 0.0));
        for i in 0..spectrum.len() {
            assert_abs_diff_eq!(
                bg.subtracted[i],
                spectrum.intensity()[i] - bg.baseline[i],
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_order_is_limited_by_point_count() {
        let spectrum = Spectrum::new(vec![1.0, 1.5, 2.0], vec![10.0, 10.0, 10.0]).unwrap();
        let config = AnalysisConfig {
            background_order: 5,
            ..Default::default()
        };
        let bg = estimate_background(&spectrum, &config);
        assert!(bg.order <= 2);
        for b in &bg.baseline {
            assert_abs_diff_eq!(*b, 10.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_power_basis_evaluation() {
        // 1 + 2t + 3t²
        assert_abs_diff_eq!(Basis::Power(2).evaluate(&[1.0, 2.0, 3.0], 2.0), 17.0);
        // T₂(t) = 2t² − 1
        assert_abs_diff_eq!(Basis::Chebyshev(2).row(0.5)[2], -0.5);
    }

    #[test]
    fn test_bspline_partition_of_unity() {
        let basis = Basis::for_config(BackgroundModel::Spline, 2, 400);
        assert_eq!(basis.len(), 7);
        assert_eq!(basis.interior_knots(), &[-0.5, 0.0, 0.5]);

        for i in 0..=40 {
            let t = -1.0 + i as f64 * 0.05;
            let row = basis.row(t);
            assert!(row.iter().all(|&v| v >= -1e-12));
            assert_abs_diff_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(basis.row(-1.0)[0], 1.0);
        assert_abs_diff_eq!(basis.row(1.0)[6], 1.0);
    }

    #[test]
    fn test_chebyshev_matches_polynomial_baseline() {
        let spectrum = linear_with_peak();
        let poly = estimate_background(
            &spectrum,
            &AnalysisConfig {
                background_order: 3,
                ..Default::default()
            },
        );
        let cheb = estimate_background(
            &spectrum,
            &AnalysisConfig {
                background_order: 3,
                background_model: BackgroundModel::Chebyshev,
                ..Default::default()
            },
        );

        assert_eq!(cheb.model, BackgroundModel::Chebyshev);
        assert_eq!(cheb.order, 3);
        assert!(cheb.knots.is_empty());
        for (a, b) in poly.baseline.iter().zip(&cheb.baseline) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_spline_follows_curved_background() {
        let q: Vec<f64> = (0..401).map(|i| 1.0 + i as f64 * 0.01).collect();
        let truth: Vec<f64> = q.iter().map(|&x| 50.0 * (-0.5 * x).exp()).collect();
        let spectrum = Spectrum::new(q, truth.clone()).unwrap();

        let spline = estimate_background(
            &spectrum,
            &AnalysisConfig {
                background_model: BackgroundModel::Spline,
                background_order: 2,
                ..Default::default()
            },
        );
        let linear = estimate_background(&spectrum, &AnalysisConfig::default());

        assert_eq!(spline.model, BackgroundModel::Spline);
        assert_eq!(spline.order, 3);
        assert_eq!(spline.knots.len(), 3);
        assert_abs_diff_eq!(spline.knots[1], 3.0, epsilon = 1e-9);

        let max_err = |bg: &Background| {
            bg.baseline
                .iter()
                .zip(&truth)
                .map(|(b, t)| (b - t).abs())
                .fold(0.0, f64::max)
        };
        assert!(max_err(&spline) < 0.2);
        assert!(max_err(&linear) > 1.0);
    }

    #[test]
    fn test_spline_falls_back_to_linear_on_short_spectrum() {
        let spectrum = Spectrum::new(vec![1.0, 1.5, 2.0], vec![10.0, 10.0, 10.0]).unwrap();
        let bg = estimate_background(
            &spectrum,
            &AnalysisConfig {
                background_model: BackgroundModel::Spline,
                ..Default::default()
            },
        );
        assert_eq!(bg.model, BackgroundModel::Polynomial);
        assert_eq!(bg.order, 1);
        assert!(bg.knots.is_empty());
        for b in &bg.baseline {
            assert_abs_diff_eq!(*b, 10.0, epsilon = 1e-9);
        }
    }
}
