//! # info 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/info.rs`

use clap::Args;
use std::path::PathBuf;

/// info 子命令参数
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Spectrum file
    pub file: PathBuf,

    /// Print statistics as JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
