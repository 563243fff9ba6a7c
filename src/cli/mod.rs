//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `analyze`: 峰分析（单文件或目录）
//! - `info`: 谱文件统计信息
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: analyze, info

pub mod analyze;
pub mod info;

use clap::{Parser, Subcommand};

/// qpeak - Q 空间粉末衍射峰分析
#[derive(Parser)]
#[command(name = "qpeak")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Peak detection and profile fitting for powder diffraction spectra in Q-space", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Detect and fit diffraction peaks in a spectrum file or directory
    Analyze(analyze::AnalyzeArgs),

    /// Show statistics of a spectrum file
    Info(info::InfoArgs),
}
