//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `batch/`, `utils/` 与 `qpeak` 库
//! - 子模块: analyze, info

pub mod analyze;
pub mod info;

use crate::cli::Commands;
use qpeak::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Analyze(args) => analyze::execute(args),
        Commands::Info(args) => info::execute(args),
    }
}
