//! # 批量执行器
//!
//! 并行执行批量分析任务。每个文件是一次独立的分析调用，
//! 并发只存在于这一层。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代
//! - 进度条显示
//! - 错误收集与汇总报告
//!
//! ## 依赖关系
//! - 被 `commands/analyze.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::utils::progress;

use log::{debug, warn};
use rayon::prelude::*;
use std::path::PathBuf;

/// 单个文件处理结果
#[derive(Debug, Clone)]
pub enum ProcessResult {
    /// 处理成功
    Success(String),
    /// 跳过（如输出文件已存在）
    Skipped(String),
    /// 处理失败
    Failed(String, String), // (文件路径, 错误信息)
}

/// 批量处理结果统计
#[derive(Debug, Default)]
pub struct BatchResult {
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
    /// 失败详情
    pub failures: Vec<(String, String)>,
}

impl BatchResult {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Success(msg) => {
                debug!("{}", msg);
                self.success += 1;
            }
            ProcessResult::Skipped(msg) => {
                debug!("{}", msg);
                self.skipped += 1;
            }
            ProcessResult::Failed(path, err) => {
                self.failed += 1;
                self.failures.push((path, err));
            }
        }
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    /// 创建新的批量执行器，0 表示使用全部 CPU
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    /// 并行处理文件列表，结果顺序与输入一致
    pub fn run<F>(&self, files: Vec<PathBuf>, processor: F) -> BatchResult
    where
        F: Fn(&PathBuf) -> ProcessResult + Sync + Send,
    {
        let pb = progress::create_progress_bar(files.len() as u64, "Analyzing");

        let process = || -> Vec<ProcessResult> {
            files
                .par_iter()
                .map(|file| {
                    let result = processor(file);
                    pb.inc(1);
                    result
                })
                .collect()
        };

        let results = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
        {
            Ok(pool) => pool.install(process),
            Err(e) => {
                warn!("failed to build thread pool ({}), using global pool", e);
                process()
            }
        };

        pb.finish_and_clear();

        let mut batch_result = BatchResult::default();
        for result in results {
            batch_result.merge(result);
        }
        batch_result
    }
}
