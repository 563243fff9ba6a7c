//! # 终端输出
//!
//! 面向用户的结果输出：状态行、标题栏与分隔线。诊断日志走 `log`，不经过这里。
//!
//! 警告与错误写 stderr，stdout 只留给分析结果（峰表、统计表、JSON）。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块和 `main.rs` 使用
//! - 使用 `colored` crate

use colored::{ColoredString, Colorize};

/// 标题栏与分隔线宽度
const RULE_WIDTH: usize = 60;

fn rule() -> ColoredString {
    "─".repeat(RULE_WIDTH).dimmed()
}

/// 打印成功消息
pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

pub fn print_info(msg: &str) {
    println!("{} {}", "[*]".blue().bold(), msg);
}

/// 打印警告（stderr）
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "[WARN]".yellow().bold(), msg);
}

/// 打印错误（stderr）
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

/// 打印标题栏
pub fn print_header(title: &str) {
    println!("\n{}", rule());
    println!("  {}", title.bold());
    println!("{}\n", rule());
}

pub fn print_separator() {
    println!("{}", rule());
}
