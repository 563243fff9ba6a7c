//! # analyze 子命令 CLI 定义
//!
//! 峰分析参数：输入输出、配置文件与逐项覆盖、批量处理选项。
//!
//! 配置优先级：命令行覆盖 > `--config` JSON 文件 > 默认值。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/analyze.rs`

use clap::{Args, ValueEnum};
use qpeak::{BackgroundModel, ProfileType};
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────
// 枚举参数
// ─────────────────────────────────────────────────────────────

/// 拟合峰形
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ProfileArg {
    /// Gaussian profile
    Gaussian,
    /// Lorentzian profile
    Lorentzian,
    /// Pseudo-Voigt (fitted Gaussian/Lorentzian mixing)
    Voigt,
}

impl From<ProfileArg> for ProfileType {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Gaussian => ProfileType::Gaussian,
            ProfileArg::Lorentzian => ProfileType::Lorentzian,
            ProfileArg::Voigt => ProfileType::Voigt,
        }
    }
}

/// 背底模型
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum BackgroundArg {
    /// Power-basis polynomial
    Polynomial,
    /// Chebyshev polynomial
    Chebyshev,
    /// Cubic B-spline with uniform knots (count set by --background-order)
    Spline,
}

impl From<BackgroundArg> for BackgroundModel {
    fn from(arg: BackgroundArg) -> Self {
        match arg {
            BackgroundArg::Polynomial => BackgroundModel::Polynomial,
            BackgroundArg::Chebyshev => BackgroundModel::Chebyshev,
            BackgroundArg::Spline => BackgroundModel::Spline,
        }
    }
}

/// 输出格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// CSV peak table
    Csv,
    /// JSON report (config, statistics, peaks, background)
    Json,
    /// XY data file (Q, raw, background, subtracted, model)
    Xy,
    /// PNG plot
    Png,
    /// SVG plot
    Svg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Xy => "xy",
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

// ─────────────────────────────────────────────────────────────
// analyze 子命令
// ─────────────────────────────────────────────────────────────

/// analyze 子命令参数
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Input: spectrum file (.xy, .xye, .chi, .dat, .txt, .csv) or directory
    pub input: PathBuf,

    /// Output: file path (single mode) or directory (batch mode)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (auto-detected from extension if not specified)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// JSON file with analysis parameters (missing fields use defaults)
    #[arg(long)]
    pub config: Option<PathBuf>,

    // ─────────────────────────────────────────────────────────────
    // 检测参数
    // ─────────────────────────────────────────────────────────────
    /// Minimum peak height, fraction of the maximum background-subtracted intensity
    #[arg(long)]
    pub height: Option<f64>,

    /// Minimum prominence, fraction of the background-subtracted intensity range
    #[arg(long)]
    pub prominence: Option<f64>,

    /// Minimum distance between peaks in samples (must be exceeded)
    #[arg(long)]
    pub min_distance: Option<usize>,

    /// Minimum peak width at half prominence, in samples
    #[arg(long)]
    pub width_min: Option<f64>,

    /// Maximum peak width at half prominence, in samples
    #[arg(long)]
    pub width_max: Option<f64>,

    // ─────────────────────────────────────────────────────────────
    // 背底与拟合参数
    // ─────────────────────────────────────────────────────────────
    /// Disable polynomial background subtraction
    #[arg(long, default_value_t = false)]
    pub no_background: bool,

    /// Background model
    #[arg(long, value_enum)]
    pub background_model: Option<BackgroundArg>,

    /// Background polynomial order (1-5)
    #[arg(long)]
    pub background_order: Option<u8>,

    /// Peak profile to fit
    #[arg(long, value_enum)]
    pub profile: Option<ProfileArg>,

    /// Discard fits with R² below this value (0-1)
    #[arg(long)]
    pub r2_threshold: Option<f64>,

    /// Maximum Levenberg-Marquardt iterations per peak
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Convergence tolerance on the relative decrease of the residual sum of squares
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Skip parameter standard errors
    #[arg(long, default_value_t = false)]
    pub no_uncertainties: bool,

    /// Restrict analysis to a Q range in Å⁻¹ (e.g., "1.0-6.5")
    #[arg(long)]
    pub q_range: Option<String>,

    /// Resample onto a uniform Q grid with this step in Å⁻¹ (linear interpolation)
    #[arg(long)]
    pub q_step: Option<f64>,

    // ─────────────────────────────────────────────────────────────
    // 显示与绘图参数
    // ─────────────────────────────────────────────────────────────
    /// Number of strongest peaks to show in the table and label in plots
    #[arg(long, default_value_t = 20)]
    pub top_n: usize,

    /// Title for the plot (default: file name)
    #[arg(long)]
    pub title: Option<String>,

    /// Figure width in pixels (for PNG) or points (for SVG)
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Figure height in pixels (for PNG) or points (for SVG)
    #[arg(long, default_value_t = 800)]
    pub height_px: u32,

    // ─────────────────────────────────────────────────────────────
    // 批量处理参数
    // ─────────────────────────────────────────────────────────────
    /// Glob pattern for input files (batch mode, e.g., "*.xy,*.chi")
    #[arg(long, default_value = "*.xy,*.xye,*.chi,*.dat")]
    pub pattern: String,

    /// Number of parallel jobs (0 = auto, batch mode only)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Recurse into subdirectories (batch mode)
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
