//! # 分析配置
//!
//! 每次分析调用传入一次的只读配置。所有默认值集中在 `Default` 实现中，
//! 没有模块级可变默认值。
//!
//! 支持从 JSON 读取部分字段（未给出的字段使用默认值）。
//!
//! ## 依赖关系
//! - 被 `analysis/` 全部子模块使用
//! - 被 `commands/analyze.rs` 构建

use crate::error::ValidationError;

use serde::{Deserialize, Serialize};

/// 峰形函数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    /// Gaussian
    #[default]
    Gaussian,
    /// Lorentzian
    Lorentzian,
    /// Pseudo-Voigt（Gaussian 与 Lorentzian 的线性混合）
    Voigt,
}

impl std::fmt::Display for ProfileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileType::Gaussian => write!(f, "gaussian"),
            ProfileType::Lorentzian => write!(f, "lorentzian"),
            ProfileType::Voigt => write!(f, "voigt"),
        }
    }
}

/// 背底模型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundModel {
    /// 幂基多项式
    #[default]
    Polynomial,
    /// Chebyshev 多项式（与同阶多项式张成相同空间，系数条件更好）
    Chebyshev,
    /// 均匀内部节点的三次 B 样条，节点数由阶数决定
    Spline,
}

impl std::fmt::Display for BackgroundModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackgroundModel::Polynomial => write!(f, "polynomial"),
            BackgroundModel::Chebyshev => write!(f, "chebyshev"),
            BackgroundModel::Spline => write!(f, "spline"),
        }
    }
}

/// 峰分析配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 最小峰高，相对扣背底后最大强度的比例
    pub height_threshold: f64,
    /// 最小突出度，相对扣背底后信号范围 (max - min) 的比例
    pub prominence: f64,
    /// 峰间最小距离（采样点数），必须严格大于该值
    pub min_distance: usize,
    /// 检测阶段峰宽范围（采样点数，半突出度处），闭区间
    pub width_bounds: (f64, f64),
    /// 是否扣除背底
    pub background_enabled: bool,
    /// 背底模型
    pub background_model: BackgroundModel,
    /// 背底多项式阶数 (1-5)；样条模型下决定节点数
    pub background_order: u8,
    /// 拟合峰形
    pub profile_type: ProfileType,
    /// R² 过滤阈值 [0, 1]
    pub r_squared_threshold: f64,
    /// Levenberg–Marquardt 最大迭代次数
    pub max_iterations: usize,
    /// 收敛判据：SSR 相对下降量
    pub tolerance: f64,
    /// 是否计算参数标准误差
    pub compute_uncertainties: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            height_threshold: 0.05,
            prominence: 0.01,
            min_distance: 5,
            width_bounds: (1.0, 1000.0),
            background_enabled: true,
            background_model: BackgroundModel::Polynomial,
            background_order: 1,
            profile_type: ProfileType::Gaussian,
            r_squared_threshold: 0.95,
            max_iterations: 200,
            tolerance: 1e-9,
            compute_uncertainties: true,
        }
    }
}

impl AnalysisConfig {
    /// 检查各字段取值范围
    pub fn validate(&self) -> Result<(), ValidationError> {
        fn invalid(field: &'static str, reason: String) -> Result<(), ValidationError> {
            Err(ValidationError::InvalidConfig { field, reason })
        }

        if !self.height_threshold.is_finite() || self.height_threshold < 0.0 {
            return invalid(
                "height_threshold",
                format!("must be a finite value >= 0, got {}", self.height_threshold),
            );
        }
        if !self.prominence.is_finite() || self.prominence < 0.0 {
            return invalid(
                "prominence",
                format!("must be a finite value >= 0, got {}", self.prominence),
            );
        }

        let (w_min, w_max) = self.width_bounds;
        if !(w_min.is_finite() && w_max.is_finite()) || w_min < 0.0 || w_min > w_max {
            return invalid(
                "width_bounds",
                format!("must satisfy 0 <= min <= max, got ({}, {})", w_min, w_max),
            );
        }

        if !(1..=5).contains(&self.background_order) {
            return invalid(
                "background_order",
                format!("must be in 1-5, got {}", self.background_order),
            );
        }

        if !(0.0..=1.0).contains(&self.r_squared_threshold) {
            return invalid(
                "r_squared_threshold",
                format!("must be in [0, 1], got {}", self.r_squared_threshold),
            );
        }

        if self.max_iterations == 0 {
            return invalid("max_iterations", "must be at least 1".to_string());
        }

        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return invalid(
                "tolerance",
                format!("must be a finite value > 0, got {}", self.tolerance),
            );
        }

        Ok(())
    }
}
