//! # 数据模型模块
//!
//! 定义衍射谱、分析配置与分析结果的数据模型。
//!
//! ## 依赖关系
//! - 被 `analysis/`、`parsers/`、`report/` 和 `commands/` 使用
//! - 子模块: spectrum, config, peak

pub mod config;
pub mod peak;
pub mod spectrum;

pub use config::{AnalysisConfig, BackgroundModel, ProfileType};
pub use peak::{AnalysisResult, Background, FittedPeak, PeakCandidate, PeakUncertainty};
pub use spectrum::{Spectrum, SpectrumStatistics, MIN_POINTS};
