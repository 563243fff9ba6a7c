//! # Levenberg–Marquardt 非线性最小二乘
//!
//! 小规模（≤ 4 参数）曲线拟合求解器：
//!
//! - 前向差分 Jacobian
//! - Marquardt 对角缩放：`(JᵀJ + λ·diag(JᵀJ)) δ = Jᵀr`
//! - 步长被接受时 λ ÷ 10，被拒绝时 λ × 10
//!
//! 收敛判据（满足任一即可）：
//! 1. 接受步的 SSR 相对下降量 ≤ `tolerance`
//! 2. SSR 降到数值下限（`1e-28 · Σy²`）
//! 3. λ 增大到上限仍找不到下降方向（已处于极小点）
//!
//! 达到 `max_iterations` 仍未满足判据时 `converged = false`。
//!
//! ## 依赖关系
//! - 被 `analysis/fitter.rs` 调用
//! - 使用 `analysis/numeric.rs` 求解增量方程

use crate::analysis::numeric;

use log::trace;

/// λ 初值
pub const DAMPING_INITIAL: f64 = 1e-3;
/// λ 调整倍数
pub const DAMPING_FACTOR: f64 = 10.0;
const DAMPING_MIN: f64 = 1e-12;
const DAMPING_MAX: f64 = 1e12;

/// 前向差分相对步长
const FD_STEP: f64 = 1e-7;
/// 差分步长的参数量级下限
const FD_MIN_SCALE: f64 = 1e-3;

/// SSR 数值下限（相对 Σy²），随数据量级缩放
const SSR_FLOOR: f64 = 1e-28;

/// 对角元下限，避免某参数对模型无贡献时对角缩放失效
const DIAG_FLOOR: f64 = 1e-30;

#[derive(Debug, Clone, Copy)]
pub struct LmOptions {
    pub max_iterations: usize,
    pub tolerance: f64,
}

#[derive(Debug, Clone)]
pub struct LmOutcome {
    pub params: Vec<f64>,
    /// 残差平方和
    pub ssr: f64,
    pub iterations: usize,
    pub converged: bool,
    /// 最终参数处的 JᵀJ
    pub jtj: Vec<Vec<f64>>,
}

/// 最小化 Σ (y − model(params, x))²
///
/// `constrain` 在初值和每个试探步之后调用，用于把参数投影回可行域。
pub fn minimize<M, C>(
    x: &[f64],
    y: &[f64],
    initial: &[f64],
    model: M,
    constrain: C,
    options: LmOptions,
) -> LmOutcome
where
    M: Fn(&[f64], f64) -> f64,
    C: Fn(&mut [f64]),
{
    let mut params = initial.to_vec();
    constrain(params.as_mut_slice());

    let ssr_of = |p: &[f64]| -> f64 {
        x.iter()
            .zip(y)
            .map(|(&xi, &yi)| (yi - model(p, xi)).powi(2))
            .sum()
    };

    let y_norm: f64 = y.iter().map(|v| v * v).sum();
    // 全零数据只在残差恰好为零时停止
    let floor = if y_norm > 0.0 { SSR_FLOOR * y_norm } else { 0.0 };
    let mut ssr = ssr_of(&params);
    let mut damping = DAMPING_INITIAL;
    let mut converged = false;
    let mut iterations = 0;

    if ssr.is_finite() {
        while iterations < options.max_iterations {
            if ssr <= floor {
                converged = true;
                break;
            }
            iterations += 1;

            let jacobian = jacobian(x, &params, &model);
            let jtj = normal_matrix(&jacobian);
            let residuals: Vec<f64> = x
                .iter()
                .zip(y)
                .map(|(&xi, &yi)| yi - model(params.as_slice(), xi))
                .collect();
            let jtr: Vec<f64> = (0..params.len())
                .map(|k| jacobian.iter().zip(&residuals).map(|(row, r)| row[k] * r).sum())
                .collect();

            let mut accepted = false;
            while damping <= DAMPING_MAX {
                let mut scaled = jtj.clone();
                for (k, row) in scaled.iter_mut().enumerate() {
                    row[k] += damping * jtj[k][k].max(DIAG_FLOOR);
                }

                let trial = numeric::solve_linear(&scaled, &jtr).map(|delta| {
                    let mut p: Vec<f64> = params.iter().zip(&delta).map(|(a, d)| a + d).collect();
                    constrain(p.as_mut_slice());
                    p
                });

                if let Some(trial) = trial {
                    let trial_ssr = ssr_of(&trial);
                    if trial_ssr.is_finite() && trial_ssr < ssr {
                        let relative = (ssr - trial_ssr) / ssr;
                        params = trial;
                        ssr = trial_ssr;
                        damping = (damping / DAMPING_FACTOR).max(DAMPING_MIN);
                        accepted = true;
                        trace!(
                            "lm iteration {}: ssr {:.6e}, relative decrease {:.3e}, damping {:.1e}",
                            iterations,
                            ssr,
                            relative,
                            damping
                        );
                        if relative <= options.tolerance {
                            converged = true;
                        }
                        break;
                    }
                }

                damping *= DAMPING_FACTOR;
            }

            if !accepted {
                // 任何阻尼下都无法继续下降
                converged = true;
            }
            if converged {
                break;
            }
        }
    }

    let jtj = normal_matrix(&jacobian(x, &params, &model));
    LmOutcome {
        params,
        ssr,
        iterations,
        converged,
        jtj,
    }
}

/// 前向差分 Jacobian，行对应数据点，列对应参数
fn jacobian<M>(x: &[f64], params: &[f64], model: &M) -> Vec<Vec<f64>>
where
    M: Fn(&[f64], f64) -> f64,
{
    let base: Vec<f64> = x.iter().map(|&xi| model(params, xi)).collect();
    let mut jac = vec![vec![0.0; params.len()]; x.len()];

    let mut shifted = params.to_vec();
    for k in 0..params.len() {
        let h = FD_STEP * params[k].abs().max(FD_MIN_SCALE);
        shifted[k] = params[k] + h;
        for (i, &xi) in x.iter().enumerate() {
            jac[i][k] = (model(shifted.as_slice(), xi) - base[i]) / h;
        }
        shifted[k] = params[k];
    }
    jac
}

fn normal_matrix(jacobian: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let p = jacobian.first().map_or(0, |row| row.len());
    let mut jtj = vec![vec![0.0; p]; p];
    for row in jacobian {
        for a in 0..p {
            for b in a..p {
                jtj[a][b] += row[a] * row[b];
            }
        }
    }
    for a in 0..p {
        for b in 0..a {
            jtj[a][b] = jtj[b][a];
        }
    }
    jtj
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn options() -> LmOptions {
        LmOptions {
            max_iterations: 200,
            tolerance: 1e-12,
        }
    }

    #[test]
    fn test_linear_model_exact() {
        let x: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();

        let out = minimize(&x, &y, &[0.0, 0.0], |p, v| p[0] * v + p[1], |_| {}, options());
        assert!(out.converged);
        assert_abs_diff_eq!(out.params[0], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out.params[1], 1.0, epsilon = 1e-6);
        assert!(out.ssr < 1e-10);
    }

    #[test]
    fn test_exponential_decay() {
        let x: Vec<f64> = (0..30).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|v| 5.0 * (-1.3 * v).exp()).collect();

        let out = minimize(
            &x,
            &y,
            &[3.0, 0.5],
            |p, v| p[0] * (-p[1] * v).exp(),
            |_| {},
            options(),
        );
        assert!(out.converged);
        assert_abs_diff_eq!(out.params[0], 5.0, epsilon = 1e-5);
        assert_abs_diff_eq!(out.params[1], 1.3, epsilon = 1e-5);
        assert_eq!(out.jtj.len(), 2);
    }

    #[test]
    fn test_iteration_cap() {
        let x: Vec<f64> = (0..30).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|v| 5.0 * (-1.3 * v).exp()).collect();

        let out = minimize(
            &x,
            &y,
            &[1.0, 3.0],
            |p, v| p[0] * (-p[1] * v).exp(),
            |_| {},
            LmOptions {
                max_iterations: 1,
                tolerance: 1e-15,
            },
        );
        assert_eq!(out.iterations, 1);
        assert!(!out.converged);
    }

    #[test]
    fn test_constraint_is_applied() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|_| 3.0).collect();

        // 最优值 3 在可行域 [0, 1] 之外
        let out = minimize(
            &x,
            &y,
            &[0.5],
            |p, _| p[0],
            |p| p[0] = p[0].clamp(0.0, 1.0),
            options(),
        );
        assert!(out.converged);
        assert_abs_diff_eq!(out.params[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tiny_amplitude_is_fitted() {
        // 峰高 1e-16，残差平方和远低于任何绝对阈值
        let scale = 1e-18;
        let x: Vec<f64> = (0..41).map(|i| 2.8 + i as f64 * 0.01).collect();
        let gaussian = |p: &[f64], v: f64| {
            p[1] * (-4.0 * std::f64::consts::LN_2 * ((v - p[0]) / p[2]).powi(2)).exp()
        };
        let truth = [3.004, 100.0 * scale, 0.1];
        let y: Vec<f64> = x.iter().map(|&v| gaussian(&truth, v)).collect();

        let out = minimize(
            &x,
            &y,
            &[3.0, 99.0 * scale, 0.12],
            gaussian,
            |_| {},
            options(),
        );
        assert!(out.converged);
        assert!(out.iterations > 1);
        assert_abs_diff_eq!(out.params[0], 3.004, epsilon = 1e-6);
        assert_abs_diff_eq!(out.params[1] / scale, 100.0, epsilon = 1e-4);
        assert_abs_diff_eq!(out.params[2], 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_all_zero_data() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = vec![0.0; 10];
        let out = minimize(&x, &y, &[2.0], |p, _| p[0], |_| {}, options());
        assert!(out.converged);
        assert_abs_diff_eq!(out.params[0], 0.0, epsilon = 1e-9);
    }
}
