//! # 文件收集器
//!
//! 根据输入路径和文件名模式收集待分析的谱文件。
//!
//! ## 功能
//! - 支持单文件和目录输入
//! - glob 模式匹配（逗号分隔多模式，大小写不敏感）
//! - 递归目录搜索
//! - 结果按路径排序，保证批量输出顺序稳定
//!
//! ## 依赖关系
//! - 被 `commands/analyze.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob` 匹配文件名

use glob::{MatchOptions, Pattern};
use log::warn;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// 文件收集器
pub struct FileCollector {
    /// 输入路径
    input: PathBuf,
    /// 匹配模式列表
    patterns: Vec<Pattern>,
    /// 是否递归
    recursive: bool,
}

impl FileCollector {
    /// 创建新的文件收集器
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            patterns: Vec::new(),
            recursive: false,
        }
    }

    /// 设置匹配模式（逗号分隔的多模式），无效模式记录警告后忽略
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.patterns = pattern
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match Pattern::new(s) {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("ignoring invalid pattern '{}': {}", s, e);
                    None
                }
            })
            .collect();
        self
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有匹配的文件
    pub fn collect(&self) -> Vec<PathBuf> {
        if self.input.is_file() {
            return vec![self.input.clone()];
        }

        if !self.input.is_dir() {
            return vec![];
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let mut files: Vec<PathBuf> = WalkDir::new(&self.input)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|entry| self.matches_patterns(entry.path()))
            .map(|e| e.path().to_path_buf())
            .collect();

        files.sort();
        files
    }

    /// 检查文件名是否匹配任一模式（无模式时全部匹配）
    fn matches_patterns(&self, path: &Path) -> bool {
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };

        self.patterns.is_empty()
            || self
                .patterns
                .iter()
                .any(|p| p.matches_with(filename, MATCH_OPTIONS))
    }
}
