use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::config::PipelineConfig;
use super::outcome::SkipReason;

/// Per-invocation working state. Built after the extension filter passes and dropped when
/// the invocation ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    pub bucket: String,
    pub source_key: String,
    pub destination_key: String,
    pub local_input_path: PathBuf,
    pub local_output_path: PathBuf,
    pub file_extension: String,
}

impl JobContext {
    pub fn new(
        bucket: &str,
        source_key: &str,
        file_extension: String,
        config: &PipelineConfig,
        scratch_dir: &Path,
    ) -> Self {
        let local_input_path = scratch_dir.join(local_file_name(source_key));

        let mut output = local_input_path.clone().into_os_string();
        output.push(".");
        output.push(&config.transcode.container);

        Self {
            bucket: bucket.to_string(),
            source_key: source_key.to_string(),
            destination_key: config.destination.render(source_key),
            local_input_path,
            local_output_path: PathBuf::from(output),
            file_extension,
        }
    }
}

/// Lowercased extension of `key`, if it is one the pipeline accepts.
///
/// The extension is whatever follows the last `.` in the whole key, so a dot in a
/// directory segment with none in the file name yields a nonsense extension and a skip.
pub fn detect_extension(key: &str, accepted: &BTreeSet<String>) -> Result<String, SkipReason> {
    let extension = match key.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => return Err(SkipReason::NoExtension),
    };

    if accepted.contains(&extension) {
        Ok(extension)
    } else {
        Err(SkipReason::UnsupportedExtension { extension })
    }
}

/// Base name of the key, so nested keys never escape the scratch directory.
fn local_file_name(key: &str) -> String {
    Path::new(key)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("input")
        .to_string()
}

/// Deterministic identity of one source object revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobIdentity(String);

impl JobIdentity {
    pub fn new(bucket: &str, key: &str, revision: Option<&str>) -> Self {
        Self(format!("{}/{}@{}", bucket, key, revision.unwrap_or("latest")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Invocation-scoped scratch directory, removed with everything in it on drop.
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    pub fn create(root: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix("transcode-")
            .tempdir_in(root)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
