//! # qpeak 命令行工具
//!
//! ## 子命令
//! - `analyze` - 峰检测与拟合（单文件或目录批量）
//! - `info`    - 谱文件统计信息
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── batch/     (批量处理)
//!   │     └── qpeak      (分析引擎、解析器、导出)
//!   └── utils/      (终端输出工具)
//! ```

mod batch;
mod cli;
mod commands;
mod utils;

use clap::Parser;
use cli::Cli;
use log::LevelFilter;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
