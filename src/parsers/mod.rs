//! # 解析器模块
//!
//! 读取一维积分衍射谱文件。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 子模块: xy

pub mod xy;

pub use xy::{parse_xy_content, parse_xy_file, RawSpectrum};

use crate::error::{QpeakError, Result};
use std::path::Path;

/// 支持的谱文件扩展名
pub const SPECTRUM_EXTENSIONS: &[&str] = &["xy", "xye", "chi", "dat", "txt", "csv"];

/// 从文件扩展名判断格式并解析
pub fn parse_spectrum_file(path: &Path) -> Result<RawSpectrum> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    if SPECTRUM_EXTENSIONS.contains(&ext.as_str()) {
        xy::parse_xy_file(path)
    } else {
        Err(QpeakError::UnsupportedFormat(format!(
            "Cannot determine spectrum format for: {} (expected one of: {})",
            path.display(),
            SPECTRUM_EXTENSIONS.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_extension() {
        let err = parse_spectrum_file(Path::new("pattern.cif")).unwrap_err();
        assert!(matches!(err, QpeakError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_spectrum_file(Path::new("/nonexistent/pattern.xy")).unwrap_err();
        assert!(matches!(err, QpeakError::FileReadError { .. }));
    }
}
