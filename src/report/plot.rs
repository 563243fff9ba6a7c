//! # 峰分析图表
//!
//! 使用 `plotters` 绘制原始谱、背底、拟合曲线与峰位标记，支持 PNG 和 SVG。
//!
//! ## 依赖关系
//! - 被 `commands/analyze.rs` 调用
//! - 使用 `report/mod.rs` 的模型曲线
//! - 使用 `plotters` 渲染图表

use crate::error::{QpeakError, Result};
use crate::models::{AnalysisResult, Spectrum};
use crate::report::{model_curve, top_peaks};

use plotters::prelude::*;
use std::path::Path;

/// 图表选项
#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// 标注 d 间距的峰数（按峰高）
    pub label_count: usize,
    pub use_svg: bool,
}

impl Default for PlotOptions {
    fn default() -> Self {
        PlotOptions {
            title: String::new(),
            width: 1200,
            height: 800,
            label_count: 10,
            use_svg: false,
        }
    }
}

/// 生成分析图表
pub fn generate_analysis_plot(
    spectrum: &Spectrum,
    result: &AnalysisResult,
    output_path: &Path,
    options: &PlotOptions,
) -> Result<()> {
    let size = (options.width, options.height);
    if options.use_svg {
        let root = SVGBackend::new(output_path, size).into_drawing_area();
        draw_analysis_chart(&root, spectrum, result, options)?;
        root.present()
            .map_err(|e| QpeakError::PlotError(format!("{:?}", e)))?;
    } else {
        let root = BitMapBackend::new(output_path, size).into_drawing_area();
        draw_analysis_chart(&root, spectrum, result, options)?;
        root.present()
            .map_err(|e| QpeakError::PlotError(format!("{:?}", e)))?;
    }
    Ok(())
}

/// 纵轴范围，上方留 10% 给标注
fn y_range(series: &[&[f64]]) -> (f64, f64) {
    let (lo, hi) = series
        .iter()
        .flat_map(|s| s.iter().copied())
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !(lo.is_finite() && hi.is_finite()) {
        return (0.0, 1.0);
    }
    let lo = lo.min(0.0);
    let span = if hi > lo { hi - lo } else { 1.0 };
    (lo, hi + 0.1 * span)
}

fn draw_analysis_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    spectrum: &Spectrum,
    result: &AnalysisResult,
    options: &PlotOptions,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| QpeakError::PlotError(format!("{:?}", e)))?;

    let q = spectrum.q();
    let (x_min, x_max) = spectrum.q_range();
    let model = model_curve(q, result);
    let (y_min, y_max) = y_range(&[
        spectrum.intensity(),
        result.background.baseline.as_slice(),
        model.as_slice(),
    ]);

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(|e| QpeakError::PlotError(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("Q (Å⁻¹)")
        .y_desc("Intensity (a.u.)")
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(|e| QpeakError::PlotError(format!("{:?}", e)))?;

    // 原始数据
    let raw_color = RGBColor(120, 120, 120);
    chart
        .draw_series(LineSeries::new(
            q.iter().copied().zip(spectrum.intensity().iter().copied()),
            raw_color.stroke_width(1),
        ))
        .map_err(|e| QpeakError::PlotError(format!("{:?}", e)))?
        .label("data")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], raw_color));

    // 背底
    if result.background.enabled {
        let bg_color = RGBColor(230, 126, 34);
        chart
            .draw_series(LineSeries::new(
                q.iter().copied().zip(result.background.baseline.iter().copied()),
                bg_color.stroke_width(2),
            ))
            .map_err(|e| QpeakError::PlotError(format!("{:?}", e)))?
            .label("background")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], bg_color));
    }

    // 拟合曲线
    let fit_color = RGBColor(0, 102, 204);
    chart
        .draw_series(LineSeries::new(
            q.iter().copied().zip(model.iter().copied()),
            fit_color.stroke_width(2),
        ))
        .map_err(|e| QpeakError::PlotError(format!("{:?}", e)))?
        .label("fit")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], fit_color));

    // 峰位标记
    let marker_color = RGBColor(192, 57, 43);
    for peak in &result.peaks {
        let idx = peak.candidate_index.min(q.len() - 1);
        let top = model[idx];
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(peak.position, y_min), (peak.position, top)],
                marker_color.mix(0.5).stroke_width(1),
            )))
            .map_err(|e| QpeakError::PlotError(format!("{:?}", e)))?;
    }

    for peak in top_peaks(&result.peaks, options.label_count) {
        let Some(d) = peak.d_spacing else {
            continue;
        };
        let idx = peak.candidate_index.min(q.len() - 1);
        let label = format!("{:.3} Å", d);
        chart
            .draw_series(std::iter::once(Text::new(
                label,
                (peak.position, model[idx] + 0.02 * (y_max - y_min)),
                ("sans-serif", 12).into_font().color(&BLACK),
            )))
            .map_err(|e| QpeakError::PlotError(format!("{:?}", e)))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| QpeakError::PlotError(format!("{:?}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_y_range_has_headroom() {
        let a = [1.0, 5.0, 3.0];
        let b = [2.0, 11.0];
        let (lo, hi) = y_range(&[&a[..], &b[..]]);
        assert_eq!(lo, 0.0);
        assert!((hi - 12.1).abs() < 1e-12);
    }

    #[test]
    fn test_y_range_negative_values() {
        let a = [-2.0, 8.0];
        let (lo, hi) = y_range(&[&a]);
        assert_eq!(lo, -2.0);
        assert!((hi - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_y_range_degenerate() {
        assert_eq!(y_range(&[]), (0.0, 1.0));
        let flat = [0.0, 0.0];
        assert_eq!(y_range(&[&flat]), (0.0, 0.1));
    }
}
