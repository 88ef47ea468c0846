use anyhow::Context;
use log::info;
use phasecore::scenario::{RenderHints, ReportSink};
use phasecore::{AnalysisError, AnalysisResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes every table as pretty JSON under one directory.
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating report directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, hints: &RenderHints) -> PathBuf {
        match &hints.filename {
            Some(name) => self.dir.join(name),
            None => self.dir.join(format!("{}.json", slug(&hints.title))),
        }
    }
}

fn slug(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if slug.is_empty() {
        "report".into()
    } else {
        slug
    }
}

impl ReportSink for JsonFileSink {
    fn render(&self, hints: &RenderHints, table: &serde_json::Value) -> AnalysisResult<()> {
        let path = self.path_for(hints);
        let document = serde_json::json!({
            "title": hints.title,
            "ylabel": hints.ylabel,
            "change_dates": hints.change_dates,
            "table": table,
        });
        let text = serde_json::to_string_pretty(&document)
            .map_err(|e| AnalysisError::Report(format!("encoding {}: {}", path.display(), e)))?;
        fs::write(&path, text).map_err(|e| AnalysisError::Report(format!("writing {}: {}", path.display(), e)))?;
        info!("report written to {}", path.display());
        Ok(())
    }
}
