//! # 数值工具
//!
//! 小规模稠密线性方程组求解、矩阵求逆与决定系数，供背底拟合和
//! Levenberg–Marquardt 求解器共用。矩阵规模不超过 10×10，直接用
//! 部分主元 Gauss-Jordan 消元。
//!
//! ## 依赖关系
//! - 被 `analysis/background.rs`、`analysis/lm.rs`、`analysis/quality.rs` 使用
//! - 无外部模块依赖

/// 主元绝对值下限，低于此值视为奇异
const PIVOT_EPS: f64 = 1e-300;

/// 求解 A x = b，奇异时返回 None
pub fn solve_linear(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = a.len();
    if n == 0 || b.len() != n {
        return None;
    }

    let mut aug: Vec<Vec<f64>> = a
        .iter()
        .zip(b)
        .map(|(row, &bi)| {
            let mut r = row.clone();
            r.push(bi);
            r
        })
        .collect();

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| aug[i][col].abs().total_cmp(&aug[j][col].abs()))?;
        let pivot_val = aug[pivot][col];
        if !pivot_val.is_finite() || pivot_val.abs() < PIVOT_EPS {
            return None;
        }
        aug.swap(col, pivot);

        for j in col..=n {
            aug[col][j] /= pivot_val;
        }
        for r in 0..n {
            if r == col {
                continue;
            }
            let factor = aug[r][col];
            if factor == 0.0 {
                continue;
            }
            for j in col..=n {
                aug[r][j] -= factor * aug[col][j];
            }
        }
    }

    let x: Vec<f64> = aug.iter().map(|row| row[n]).collect();
    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// 矩阵求逆，奇异时返回 None
pub fn invert(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut columns = Vec::with_capacity(n);
    for k in 0..n {
        let mut e = vec![0.0; n];
        e[k] = 1.0;
        columns.push(solve_linear(a, &e)?);
    }
    // columns[k] 是逆矩阵的第 k 列
    Some(
        (0..n)
            .map(|i| (0..n).map(|k| columns[k][i]).collect())
            .collect(),
    )
}

/// 决定系数 R² = 1 - SSR/SST，截断到 [0, 1]；SST 为 0 时返回 0
pub fn r_squared(observed: &[f64], fitted: &[f64]) -> f64 {
    let n = observed.len().min(fitted.len());
    if n == 0 {
        return 0.0;
    }
    let mean = observed[..n].iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = observed[..n].iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = observed[..n]
        .iter()
        .zip(&fitted[..n])
        .map(|(y, f)| (y - f).powi(2))
        .sum();

    if ss_tot <= 0.0 || !ss_res.is_finite() {
        return 0.0;
    }
    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_solve_linear_with_pivoting() {
        // 首行主元为 0，需要换行
        let a = vec![vec![0.0, 2.0], vec![3.0, 1.0]];
        let x = solve_linear(&a, &[4.0, 5.0]).unwrap();
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_matrix() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(solve_linear(&a, &[1.0, 2.0]).is_none());
        assert!(invert(&a).is_none());
    }

    #[test]
    fn test_invert() {
        let a = vec![vec![4.0, 7.0], vec![2.0, 6.0]];
        let inv = invert(&a).unwrap();
        assert_abs_diff_eq!(inv[0][0], 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(inv[0][1], -0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(inv[1][0], -0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(inv[1][1], 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_r_squared_bounds() {
        let y = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(r_squared(&y, &y), 1.0);
        // 比均值还差的拟合截断到 0
        assert_eq!(r_squared(&y, &[4.0, 3.0, 2.0, 1.0]), 0.0);
        // 常数观测值
        assert_eq!(r_squared(&[5.0, 5.0, 5.0], &[5.0, 5.0, 5.0]), 0.0);
    }
}
