//! Timestamped output files: graphs, recordings and JSON reports.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::features::Analysis;

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `dir/<prefix><YYYYmmdd_HHMMSS>.<ext>` for the given instant.
pub fn timestamped_path_at(dir: &Path, prefix: &str, ext: &str, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}{}.{}", prefix, at.format(TIMESTAMP_FORMAT), ext))
}

pub fn timestamped_path(dir: &Path, prefix: &str, ext: &str) -> PathBuf {
    timestamped_path_at(dir, prefix, ext, Local::now())
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}

/// Write `analysis` as pretty JSON next to the graphs.
pub fn save_report(dir: &Path, prefix: &str, analysis: &Analysis) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = timestamped_path(dir, prefix, "json");
    let json = serde_json::to_string_pretty(analysis).context("Failed to serialize analysis")?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    log::info!("Saved report: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analysis::AnalysisKind;
    use crate::audio::features::Waveform;
    use chrono::TimeZone;

    #[test]
    fn formats_timestamp_into_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let path = timestamped_path_at(Path::new("wav"), "recorded-sound_", "wav", at);
        assert_eq!(path, PathBuf::from("wav/recorded-sound_20240309_070501.wav"));
    }

    #[test]
    fn report_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("reports");
        let analysis = Analysis::new(AnalysisKind::Spectrum, Waveform::new(vec![0.25; 8], 8));

        let path = save_report(&nested, "analysis_", &analysis).unwrap();
        assert!(path.starts_with(&nested));

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["sample_rate"], 8);
        assert_eq!(value["kind"], "spectrum");
    }
}
