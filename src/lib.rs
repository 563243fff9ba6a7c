//! # qpeak - Q 空间粉末衍射峰分析
//!
//! 对一维积分衍射谱做背底扣除、候选峰检测与峰形拟合，输出峰位、
//! 峰高、半高宽、面积、d 间距及拟合质量。
//!
//! ```no_run
//! use qpeak::{analyze, AnalysisConfig};
//!
//! let q: Vec<f64> = (0..400).map(|i| 1.0 + i as f64 * 0.01).collect();
//! let intensity: Vec<f64> = q.iter().map(|&x| 10.0 + 100.0 * (-(x - 3.0).powi(2) / 0.002).exp()).collect();
//! let result = analyze(&q, &intensity, &AnalysisConfig::default()).unwrap();
//! for peak in &result.peaks {
//!     println!("Q = {:.4}, d = {:?}", peak.position, peak.d_spacing);
//! }
//! ```
//!
//! ## 依赖关系
//! ```text
//! lib.rs
//!   ├── analysis/   (分析引擎)
//!   ├── models/     (数据模型与配置)
//!   ├── parsers/    (谱文件读取)
//!   ├── report/     (导出与绘图)
//!   └── error.rs    (错误处理)
//! ```

pub mod analysis;
pub mod error;
pub mod models;
pub mod parsers;
pub mod report;

pub use analysis::{analyze, analyze_spectrum};
pub use error::{FitFailure, QpeakError, Result, ValidationError};
pub use models::{
    AnalysisConfig, AnalysisResult, Background, BackgroundModel, FittedPeak, PeakUncertainty,
    ProfileType, Spectrum,
};
