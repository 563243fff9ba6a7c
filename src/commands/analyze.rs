//! # analyze 命令实现
//!
//! 读取谱文件，运行峰分析引擎，打印结果并按需导出。
//!
//! ## 功能
//! - 支持单文件和批量目录处理
//! - 并行处理（rayon，仅批量模式；引擎本身单线程）
//! - 配置分层：默认值 → `--config` JSON → 命令行覆盖
//! - 输出 CSV / JSON / XY 数据文件或 PNG / SVG 图表
//!
//! ## 依赖关系
//! - 使用 `cli/analyze.rs` 定义的 AnalyzeArgs
//! - 使用 `batch/` 模块进行批量处理
//! - 使用 `qpeak` 的解析器、分析引擎与导出

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::analyze::{AnalyzeArgs, OutputFormat};
use crate::utils::output;

use qpeak::error::{QpeakError, Result};
use qpeak::report::plot::PlotOptions;
use qpeak::report::{self, export, plot};
use qpeak::{analyze_spectrum, parsers, AnalysisConfig, AnalysisResult, FittedPeak, Spectrum};

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// 批量模式默认输出目录
const DEFAULT_BATCH_OUTPUT: &str = "qpeak_results";

/// 单次运行的共享设置
struct RunSettings {
    config: AnalysisConfig,
    q_range: Option<(f64, f64)>,
    q_step: Option<f64>,
    plot: PlotOptions,
    overwrite: bool,
}

/// 执行 analyze 命令
pub fn execute(args: AnalyzeArgs) -> Result<()> {
    output::print_header("Diffraction Peak Analysis");

    let config = build_config(&args)?;
    debug!("analysis config: {:?}", config);

    let settings = RunSettings {
        config,
        q_range: args.q_range.as_deref().map(parse_range).transpose()?,
        q_step: args.q_step,
        plot: PlotOptions {
            title: args.title.clone().unwrap_or_default(),
            width: args.width,
            height: args.height_px,
            label_count: args.top_n,
            use_svg: false,
        },
        overwrite: args.overwrite,
    };

    if args.input.is_file() {
        execute_single_file(&args, &settings)
    } else if args.input.is_dir() {
        execute_batch(&args, &settings)
    } else {
        Err(QpeakError::FileNotFound {
            path: args.input.display().to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────
// 配置
// ─────────────────────────────────────────────────────────────

/// 由配置文件与命令行覆盖构建分析配置
fn build_config(args: &AnalyzeArgs) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => AnalysisConfig::default(),
    };

    if let Some(v) = args.height {
        config.height_threshold = v;
    }
    if let Some(v) = args.prominence {
        config.prominence = v;
    }
    if let Some(v) = args.min_distance {
        config.min_distance = v;
    }
    if let Some(v) = args.width_min {
        config.width_bounds.0 = v;
    }
    if let Some(v) = args.width_max {
        config.width_bounds.1 = v;
    }
    if args.no_background {
        config.background_enabled = false;
    }
    if let Some(v) = args.background_model {
        config.background_model = v.into();
    }
    if let Some(v) = args.background_order {
        config.background_order = v;
    }
    if let Some(v) = args.profile {
        config.profile_type = v.into();
    }
    if let Some(v) = args.r2_threshold {
        config.r_squared_threshold = v;
    }
    if let Some(v) = args.max_iterations {
        config.max_iterations = v;
    }
    if let Some(v) = args.tolerance {
        config.tolerance = v;
    }
    if args.no_uncertainties {
        config.compute_uncertainties = false;
    }

    config.validate()?;
    Ok(config)
}

/// 读取 JSON 配置文件
fn load_config(path: &Path) -> Result<AnalysisConfig> {
    let content = fs::read_to_string(path).map_err(|e| QpeakError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| QpeakError::ParseError {
        format: "json".to_string(),
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

// ─────────────────────────────────────────────────────────────
// 单文件模式
// ─────────────────────────────────────────────────────────────

fn execute_single_file(args: &AnalyzeArgs, settings: &RunSettings) -> Result<()> {
    output::print_info(&format!("Single file mode: '{}'", args.input.display()));

    let (name, spectrum) = load_spectrum(&args.input, settings)?;
    let (q_min, q_max) = spectrum.q_range();
    output::print_success(&format!(
        "Loaded spectrum: {} ({} points, Q {:.3} - {:.3} Å⁻¹)",
        name,
        spectrum.len(),
        q_min,
        q_max
    ));

    let result = analyze_spectrum(&spectrum, &settings.config);
    print_summary(&result);
    for warning in &result.warnings {
        output::print_warning(warning);
    }
    print_peak_table(&result.peaks, args.top_n);

    if let Some(out) = &args.output {
        let format = args
            .format
            .unwrap_or_else(|| guess_format_from_extension(out));
        write_output(&name, &spectrum, &result, out, format, settings)?;
        output::print_success(&format!("Results saved to '{}'", out.display()));
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────
// 批量模式
// ─────────────────────────────────────────────────────────────

fn execute_batch(args: &AnalyzeArgs, settings: &RunSettings) -> Result<()> {
    output::print_info(&format!("Batch mode: directory '{}'", args.input.display()));

    let collector = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)
        .recursive(args.recursive);
    let files = collector.collect();

    if files.is_empty() {
        output::print_warning(&format!(
            "No matching files found with pattern '{}'",
            args.pattern
        ));
        return Ok(());
    }
    output::print_info(&format!("Found {} spectrum files", files.len()));

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BATCH_OUTPUT));
    fs::create_dir_all(&output_dir).map_err(|e| QpeakError::FileWriteError {
        path: output_dir.display().to_string(),
        source: e,
    })?;

    let format = args.format.unwrap_or(OutputFormat::Csv);
    output::print_info(&format!("Output format: {:?}", format));

    let runner = BatchRunner::new(args.jobs);
    let result = runner.run(files, |file| {
        process_batch_file(file, &output_dir, format, settings)
    });

    output::print_separator();
    output::print_success(&format!(
        "Batch complete: {} success, {} skipped, {} failed",
        result.success, result.skipped, result.failed
    ));

    if !result.failures.is_empty() {
        output::print_warning("Failed files:");
        for (path, err) in result.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", path, err));
        }
        if result.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
        }
    }

    Ok(())
}

/// 处理批量模式中的单个文件
fn process_batch_file(
    input: &Path,
    output_dir: &Path,
    format: OutputFormat,
    settings: &RunSettings,
) -> ProcessResult {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let output_file = output_dir.join(format!("{}_peaks.{}", stem, format.extension()));

    if output_file.exists() && !settings.overwrite {
        return ProcessResult::Skipped(format!(
            "Output exists, skipping: {}",
            output_file.display()
        ));
    }

    let run = || -> Result<AnalysisResult> {
        let (name, spectrum) = load_spectrum(input, settings)?;
        let result = analyze_spectrum(&spectrum, &settings.config);
        write_output(&name, &spectrum, &result, &output_file, format, settings)?;
        Ok(result)
    };

    match run() {
        Ok(result) => ProcessResult::Success(format!(
            "{} -> {} ({} peaks)",
            input.display(),
            output_file.display(),
            result.peaks.len()
        )),
        Err(e) => ProcessResult::Failed(input.display().to_string(), e.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────
// 共用逻辑
// ─────────────────────────────────────────────────────────────

/// 读取并校验谱，可选截取 Q 范围并重采样
fn load_spectrum(path: &Path, settings: &RunSettings) -> Result<(String, Spectrum)> {
    let raw = parsers::parse_spectrum_file(path)?;
    let mut spectrum = Spectrum::new(raw.q, raw.intensity)?;
    if let Some((lo, hi)) = settings.q_range {
        spectrum = spectrum.trim_q_range(Some(lo), Some(hi))?;
    }
    if let Some(step) = settings.q_step {
        spectrum = spectrum.resample(step)?;
        debug!("resampled {} to {} points", raw.name, spectrum.len());
    }
    Ok((raw.name, spectrum))
}

fn write_output(
    name: &str,
    spectrum: &Spectrum,
    result: &AnalysisResult,
    path: &Path,
    format: OutputFormat,
    settings: &RunSettings,
) -> Result<()> {
    match format {
        OutputFormat::Csv => export::peaks_to_csv(result, path),
        OutputFormat::Json => export::result_to_json(name, spectrum, &settings.config, result, path),
        OutputFormat::Xy => export::processed_to_xy(name, spectrum, result, path),
        OutputFormat::Png | OutputFormat::Svg => {
            let mut options = settings.plot.clone();
            if options.title.is_empty() {
                options.title = name.to_string();
            }
            options.use_svg = format == OutputFormat::Svg;
            plot::generate_analysis_plot(spectrum, result, path, &options)
        }
    }
}

/// 从文件扩展名推断输出格式
fn guess_format_from_extension(path: &Path) -> OutputFormat {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        Some("json") => OutputFormat::Json,
        Some("xy") | Some("dat") | Some("txt") => OutputFormat::Xy,
        Some("png") => OutputFormat::Png,
        Some("svg") => OutputFormat::Svg,
        _ => OutputFormat::Csv,
    }
}

/// 解析 Q 范围 "min-max"
fn parse_range(range: &str) -> Result<(f64, f64)> {
    let parts: Vec<&str> = range.split('-').collect();
    if parts.len() != 2 {
        return Err(QpeakError::InvalidRange(range.to_string()));
    }

    let min: f64 = parts[0]
        .trim()
        .parse()
        .map_err(|_| QpeakError::InvalidRange(range.to_string()))?;
    let max: f64 = parts[1]
        .trim()
        .parse()
        .map_err(|_| QpeakError::InvalidRange(range.to_string()))?;

    if !(min.is_finite() && max.is_finite()) || min < 0.0 || max <= min {
        return Err(QpeakError::InvalidRange(format!(
            "{} (must be 0 <= min < max)",
            range
        )));
    }

    Ok((min, max))
}

fn print_summary(result: &AnalysisResult) {
    let bg = &result.background;
    if bg.enabled {
        output::print_info(&format!(
            "Background: {} order {} (R² = {:.4})",
            bg.model, bg.order, bg.r_squared
        ));
    } else {
        output::print_info("Background subtraction disabled");
    }

    output::print_info(&format!(
        "Candidates: {}, fitted: {}, failed: {}, low quality: {}",
        result.candidates_detected, result.peaks_fitted, result.fit_failures, result.low_quality
    ));
    output::print_success(&format!(
        "Overall R² = {:.4} ({:.1} ms)",
        result.overall_r_squared,
        result.processing_time.as_secs_f64() * 1000.0
    ));
}

/// 打印峰表（按峰高取前 count 个，按峰位排列）
fn print_peak_table(peaks: &[FittedPeak], count: usize) {
    use tabled::{Table, Tabled};

    #[derive(Tabled)]
    struct PeakRow {
        #[tabled(rename = "Q (Å⁻¹)")]
        q: String,
        #[tabled(rename = "d (Å)")]
        d_spacing: String,
        #[tabled(rename = "Height")]
        height: String,
        #[tabled(rename = "FWHM (Å⁻¹)")]
        fwhm: String,
        #[tabled(rename = "Area")]
        area: String,
        #[tabled(rename = "R²")]
        r_squared: String,
    }

    let rows: Vec<PeakRow> = report::top_peaks(peaks, count)
        .iter()
        .map(|p| PeakRow {
            q: match p.uncertainty {
                Some(u) => format!("{:.4} ± {:.4}", p.position, u.position),
                None => format!("{:.4}", p.position),
            },
            d_spacing: p
                .d_spacing
                .map(|d| format!("{:.4}", d))
                .unwrap_or_else(|| "-".to_string()),
            height: format!("{:.2}", p.height),
            fwhm: format!("{:.4}", p.fwhm),
            area: format!("{:.3}", p.area),
            r_squared: format!("{:.4}", p.r_squared),
        })
        .collect();

    if !rows.is_empty() {
        output::print_header(&format!("Top {} Peaks", rows.len()));
        let table = Table::new(&rows);
        println!("{}", table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use qpeak::{BackgroundModel, ProfileType};

    fn parse_args(extra: &[&str]) -> AnalyzeArgs {
        let mut argv = vec!["qpeak", "analyze", "pattern.xy"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Analyze(args) => args,
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("1.0-6.5").unwrap(), (1.0, 6.5));
        assert_eq!(parse_range(" 2 - 3 ").unwrap(), (2.0, 3.0));
        assert!(parse_range("5-1").is_err());
        assert!(parse_range("abc").is_err());
        assert!(parse_range("1-2-3").is_err());
    }

    #[test]
    fn test_guess_format() {
        assert_eq!(guess_format_from_extension(Path::new("a.json")), OutputFormat::Json);
        assert_eq!(guess_format_from_extension(Path::new("a.SVG")), OutputFormat::Svg);
        assert_eq!(guess_format_from_extension(Path::new("a.dat")), OutputFormat::Xy);
        assert_eq!(guess_format_from_extension(Path::new("a")), OutputFormat::Csv);
    }

    #[test]
    fn test_build_config_defaults() {
        let config = build_config(&parse_args(&[])).unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_build_config_overrides() {
        let args = parse_args(&[
            "--height",
            "0.2",
            "--min-distance",
            "8",
            "--width-max",
            "50",
            "--no-background",
            "--profile",
            "voigt",
            "--background-model",
            "spline",
            "--no-uncertainties",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.height_threshold, 0.2);
        assert_eq!(config.min_distance, 8);
        assert_eq!(config.width_bounds, (1.0, 50.0));
        assert!(!config.background_enabled);
        assert_eq!(config.profile_type, ProfileType::Voigt);
        assert_eq!(config.background_model, BackgroundModel::Spline);
        assert!(!config.compute_uncertainties);
    }

    #[test]
    fn test_build_config_rejects_invalid() {
        let err = build_config(&parse_args(&["--background-order", "9"])).unwrap_err();
        assert!(matches!(err, QpeakError::Validation(_)));
    }

    #[test]
    fn test_config_file_then_flags() {
        let path = std::env::temp_dir().join(format!("qpeak_config_{}.json", std::process::id()));
        fs::write(&path, r#"{"prominence": 0.05, "min_distance": 3}"#).unwrap();

        let path_str = path.display().to_string();
        let args = parse_args(&["--config", &path_str, "--min-distance", "7"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.prominence, 0.05);
        assert_eq!(config.min_distance, 7);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_spectrum_trims_then_resamples() {
        let path = std::env::temp_dir().join(format!("qpeak_load_{}.xy", std::process::id()));
        let body: String = (0..=20)
            .map(|i| format!("{:.2} {}\n", 1.0 + i as f64 * 0.1, 10 + i))
            .collect();
        fs::write(&path, body).unwrap();

        let settings = RunSettings {
            config: AnalysisConfig::default(),
            q_range: Some((1.5, 2.5)),
            q_step: Some(0.05),
            plot: PlotOptions::default(),
            overwrite: false,
        };
        let (_, spectrum) = load_spectrum(&path, &settings).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(spectrum.len(), 21);
        assert!((spectrum.q()[0] - 1.5).abs() < 1e-12);
        assert!((spectrum.q()[20] - 2.5).abs() < 1e-9);
        // 1.55 位于 1.5 (15) 与 1.6 (16) 之间
        assert!((spectrum.intensity()[1] - 15.5).abs() < 1e-9);
    }
}
