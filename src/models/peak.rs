//! # 峰与分析结果数据模型
//!
//! - `PeakCandidate`: 检测阶段产生的候选峰，仅在流水线内部流转
//! - `FittedPeak`: 拟合成功且通过质量过滤的峰
//! - `Background`: 背底估计结果
//! - `AnalysisResult`: 一次分析调用的完整输出
//!
//! ## 依赖关系
//! - 被 `analysis/`、`report/` 使用
//! - 使用 `models/config.rs` 的 ProfileType

use crate::models::{BackgroundModel, ProfileType};

use serde::{Serialize, Serializer};
use std::time::Duration;

/// 候选峰
#[derive(Debug, Clone, PartialEq)]
pub struct PeakCandidate {
    /// 峰顶采样点索引
    pub index: usize,
    /// 峰位 Q（Å⁻¹）
    pub position: f64,
    /// 扣背底后的峰高
    pub height: f64,
    /// 突出度
    pub prominence: f64,
    /// 半突出度处宽度（采样点数）
    pub width_samples: f64,
    /// 估计 FWHM（Q 单位）
    pub fwhm: f64,
}

/// 拟合参数标准误差
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakUncertainty {
    pub position: f64,
    pub height: f64,
    pub fwhm: f64,
    pub area: f64,
}

/// 拟合峰
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedPeak {
    /// 峰位 Q（Å⁻¹）
    pub position: f64,
    /// 峰高
    pub height: f64,
    /// 半高全宽（Å⁻¹），始终 > 0
    pub fwhm: f64,
    /// 积分面积
    pub area: f64,
    pub profile_type: ProfileType,
    /// Pseudo-Voigt 中 Lorentzian 成分比例
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<f64>,
    /// 拟合优度，[0, 1]
    pub r_squared: f64,
    /// d 间距 2π/Q（Å），峰位 <= 0 时为 None
    pub d_spacing: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<PeakUncertainty>,
    /// 对应候选峰的采样点索引
    pub candidate_index: usize,
}

/// 背底估计结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Background {
    pub enabled: bool,
    /// 实际使用的模型（样条无法拟合时退回线性多项式）
    pub model: BackgroundModel,
    /// 多项式阶数（实际使用，可能因点数不足而降低）；样条为 3
    pub order: usize,
    /// 样条内部节点（Q），其他模型为空
    pub knots: Vec<f64>,
    /// 基函数系数（低阶在前），自变量 t = (Q - q_center) / q_half_span
    pub coefficients: Vec<f64>,
    pub q_center: f64,
    pub q_half_span: f64,
    /// 背底相对原始强度的 R²
    pub r_squared: f64,
    /// 各采样点的背底值
    pub baseline: Vec<f64>,
    /// 扣除背底后的强度（允许为负）
    pub subtracted: Vec<f64>,
}

/// 一次分析调用的结果
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    /// 按峰位升序排列
    pub peaks: Vec<FittedPeak>,
    pub candidates_detected: usize,
    pub peaks_fitted: usize,
    /// 拟合失败的候选峰数
    pub fit_failures: usize,
    /// 拟合收敛但 R² 低于阈值的候选峰数
    pub low_quality: usize,
    /// 按峰高加权的平均 R²
    pub overall_r_squared: f64,
    #[serde(rename = "processing_time_ms", serialize_with = "serialize_millis")]
    pub processing_time: Duration,
    pub background: Background,
    pub warnings: Vec<String>,
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}
