//! # info 命令实现
//!
//! 读取谱文件并打印点数、Q 范围、步长与强度统计。
//!
//! ## 依赖关系
//! - 使用 `cli/info.rs` 定义的 InfoArgs
//! - 使用 `qpeak` 的解析器与 Spectrum

use crate::cli::info::InfoArgs;
use crate::utils::output;

use qpeak::error::Result;
use qpeak::models::SpectrumStatistics;
use qpeak::{parsers, Spectrum};

use tabled::{Table, Tabled};

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Property")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// 执行 info 命令
pub fn execute(args: InfoArgs) -> Result<()> {
    let raw = parsers::parse_spectrum_file(&args.file)?;
    let name = raw.name.clone();
    let spectrum = Spectrum::new(raw.q, raw.intensity)?;
    let stats = spectrum.statistics();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    output::print_header(&format!("Spectrum: {}", name));
    println!(
        "{}",
        Table::new(stat_rows(&stats, spectrum.median_q_step()))
    );
    Ok(())
}

fn stat_rows(stats: &SpectrumStatistics, median_step: f64) -> Vec<StatRow> {
    vec![
        StatRow {
            name: "Points",
            value: stats.num_points.to_string(),
        },
        StatRow {
            name: "Q range (Å⁻¹)",
            value: format!("{:.4} - {:.4}", stats.q_range.0, stats.q_range.1),
        },
        StatRow {
            name: "Q step (Å⁻¹)",
            value: format!("{:.5} ± {:.5}", stats.q_step_mean, stats.q_step_std),
        },
        StatRow {
            name: "Median Q step (Å⁻¹)",
            value: format!("{:.5}", median_step),
        },
        StatRow {
            name: "Intensity range",
            value: format!(
                "{:.3} - {:.3}",
                stats.intensity_range.0, stats.intensity_range.1
            ),
        },
        StatRow {
            name: "Intensity mean",
            value: format!("{:.3} ± {:.3}", stats.intensity_mean, stats.intensity_std),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_rows() {
        let spectrum = Spectrum::new(vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0]).unwrap();
        let rows = stat_rows(&spectrum.statistics(), spectrum.median_q_step());
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[3].value, "1.00000");
        assert_eq!(rows[0].value, "3");
        assert_eq!(rows[1].value, "1.0000 - 3.0000");
    }
}
