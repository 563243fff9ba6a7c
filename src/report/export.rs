//! # 结果导出
//!
//! ## 支持格式
//! - CSV: 峰表（Q、d、峰高、FWHM、面积、R² 与标准误差）
//! - JSON: 完整分析报告（来源、配置、谱统计、结果、背底与扣背底数据）
//! - XY: 逐点数据（Q、原始强度、背底、扣背底强度、拟合曲线）
//!
//! ## 依赖关系
//! - 被 `commands/analyze.rs` 调用
//! - 使用 `models/peak.rs` 的 AnalysisResult
//! - 使用 `csv`、`serde_json` 写文件

use crate::error::{QpeakError, Result};
use crate::models::{AnalysisConfig, AnalysisResult, Spectrum, SpectrumStatistics};
use crate::report::model_curve;

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// JSON 报告
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub source: &'a str,
    pub config: &'a AnalysisConfig,
    pub statistics: SpectrumStatistics,
    pub result: &'a AnalysisResult,
}

/// 峰表 CSV 列名
pub const CSV_HEADER: [&str; 12] = [
    "q",
    "d_spacing",
    "height",
    "fwhm",
    "area",
    "profile",
    "eta",
    "r_squared",
    "sigma_q",
    "sigma_height",
    "sigma_fwhm",
    "sigma_area",
];

/// 导出峰表为 CSV
pub fn peaks_to_csv(result: &AnalysisResult, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    wtr.write_record(CSV_HEADER)?;

    for peak in &result.peaks {
        let unc = peak.uncertainty;
        wtr.write_record(&[
            format!("{:.6}", peak.position),
            format_optional(peak.d_spacing, 6),
            format!("{:.4}", peak.height),
            format!("{:.6}", peak.fwhm),
            format!("{:.4}", peak.area),
            peak.profile_type.to_string(),
            format_optional(peak.eta, 4),
            format!("{:.5}", peak.r_squared),
            format_optional(unc.map(|u| u.position), 6),
            format_optional(unc.map(|u| u.height), 4),
            format_optional(unc.map(|u| u.fwhm), 6),
            format_optional(unc.map(|u| u.area), 4),
        ])?;
    }

    wtr.flush().map_err(|e| QpeakError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// 导出完整报告为 JSON
pub fn result_to_json(
    source: &str,
    spectrum: &Spectrum,
    config: &AnalysisConfig,
    result: &AnalysisResult,
    output_path: &Path,
) -> Result<()> {
    let report = AnalysisReport {
        source,
        config,
        statistics: spectrum.statistics(),
        result,
    };

    let file = File::create(output_path).map_err(|e| QpeakError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.flush().map_err(|e| QpeakError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// 导出逐点数据为 XY
pub fn processed_to_xy(
    source: &str,
    spectrum: &Spectrum,
    result: &AnalysisResult,
    output_path: &Path,
) -> Result<()> {
    let io_err = |e| QpeakError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    };

    let file = File::create(output_path).map_err(io_err)?;
    let mut w = BufWriter::new(file);

    writeln!(w, "# Peak analysis: {}", source).map_err(io_err)?;
    writeln!(
        w,
        "# Peaks: {}, overall R^2: {:.4}",
        result.peaks.len(),
        result.overall_r_squared
    )
    .map_err(io_err)?;
    writeln!(
        w,
        "# Columns: Q (1/A), intensity, background, subtracted, model"
    )
    .map_err(io_err)?;
    writeln!(w, "#").map_err(io_err)?;

    let model = model_curve(spectrum.q(), result);
    for i in 0..spectrum.len() {
        writeln!(
            w,
            "{:.6}\t{:.4}\t{:.4}\t{:.4}\t{:.4}",
            spectrum.q()[i],
            spectrum.intensity()[i],
            result.background.baseline[i],
            result.background.subtracted[i],
            model[i]
        )
        .map_err(io_err)?;
    }

    w.flush().map_err(io_err)?;
    Ok(())
}

/// 可选数值格式化，None 输出空字段
pub fn format_optional(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use std::fs;

    fn sample() -> (Spectrum, AnalysisResult) {
        let q: Vec<f64> = (0..201).map(|i| 1.0 + i as f64 * 0.01).collect();
        let intensity: Vec<f64> = q
            .iter()
            .map(|&x| 5.0 + 80.0 * (-4.0 * 2.0_f64.ln() * ((x - 2.0) / 0.1).powi(2)).exp())
            .collect();
        let result = analyze(&q, &intensity, &AnalysisConfig::default()).unwrap();
        (Spectrum::new(q, intensity).unwrap(), result)
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("qpeak_export_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some(1.23456), 2), "1.23");
        assert_eq!(format_optional(None, 2), "");
    }

    #[test]
    fn test_peaks_to_csv() {
        let (_, result) = sample();
        let path = temp_path("peaks.csv");
        peaks_to_csv(&result, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next().unwrap(), CSV_HEADER.join(","));
        assert_eq!(lines.count(), result.peaks.len());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_result_to_json() {
        let (spectrum, result) = sample();
        let path = temp_path("result.json");
        result_to_json("sample.xy", &spectrum, &AnalysisConfig::default(), &result, &path)
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["source"], "sample.xy");
        assert_eq!(value["statistics"]["num_points"], 201);
        assert_eq!(value["config"]["profile_type"], "gaussian");
        assert!(value["result"]["processing_time_ms"].is_number());
        assert_eq!(
            value["result"]["peaks"].as_array().unwrap().len(),
            result.peaks.len()
        );
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_processed_to_xy() {
        let (spectrum, result) = sample();
        let path = temp_path("processed.xy");
        processed_to_xy("sample", &spectrum, &result, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let data: Vec<&str> = content.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(data.len(), spectrum.len());
        assert_eq!(data[0].split('\t').count(), 5);
        fs::remove_file(&path).ok();
    }
}
