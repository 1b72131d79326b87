use std::path::{Path, PathBuf};

use crate::error::{JobError, StorageError};
use crate::sanitize::{redact_path, sanitize_label};
use crate::spec::Spec;

pub const ARTIFACT_EXTENSION: &str = "png";

/// Job-scoped artifact directories under one output base.
///
/// Layout is `{output_base}/{job_id}/{label}-r{row_index}-{n}.png`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_base: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(output_base: P) -> Self {
        Self {
            output_base: output_base.as_ref().to_path_buf(),
        }
    }

    pub fn output_base(&self) -> &Path {
        &self.output_base
    }

    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.output_base.join(job_id)
    }

    /// File name for the `sequence`-th (1-based) artifact of `spec`.
    pub fn artifact_name(spec: &Spec, sequence: usize) -> String {
        format!(
            "{}-r{}-{}.{}",
            sanitize_label(&spec.label),
            spec.row_index,
            sequence,
            ARTIFACT_EXTENSION
        )
    }

    /// Writes every artifact for `spec` and returns `{job_id}/{filename}`
    /// references in artifact order.
    ///
    /// A failed write removes whatever this call already wrote and fails the
    /// whole save.
    pub fn save(
        &self,
        job_id: &str,
        spec: &Spec,
        artifacts: &[Vec<u8>],
    ) -> Result<Vec<String>, StorageError> {
        let dir = self.job_dir(job_id);
        ensure_directory(&dir)?;

        let mut written: Vec<PathBuf> = Vec::with_capacity(artifacts.len());
        let mut references = Vec::with_capacity(artifacts.len());

        for (i, bytes) in artifacts.iter().enumerate() {
            let filename = Self::artifact_name(spec, i + 1);
            let path = dir.join(&filename);

            if let Err(e) = std::fs::write(&path, bytes) {
                for path in &written {
                    let _ = std::fs::remove_file(path);
                }
                return Err(StorageError::WriteFile { path, source: e });
            }

            log::debug!("Saved artifact {}", redact_path(&path));
            written.push(path);
            references.push(format!("{}/{}", job_id, filename));
        }

        Ok(references)
    }

    /// Every artifact file of a job, sorted by name. A job without a
    /// directory has no artifacts.
    pub fn list(&self, job_id: &str) -> Result<Vec<PathBuf>, StorageError> {
        let dir = self.job_dir(job_id);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::ReadFile { path: dir, source: e }),
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(ARTIFACT_EXTENSION))
            })
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Raw bytes of one artifact.
    pub fn read(&self, job_id: &str, filename: &str) -> Result<Vec<u8>, JobError> {
        if !is_plain_name(job_id) {
            return Err(JobError::InvalidArtifactName(job_id.to_string()));
        }
        if !is_plain_name(filename) {
            return Err(JobError::InvalidArtifactName(filename.to_string()));
        }

        let path = self.job_dir(job_id).join(filename);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(JobError::ArtifactNotFound {
                job_id: job_id.to_string(),
                filename: filename.to_string(),
            }),
            Err(e) => Err(StorageError::ReadFile { path, source: e }.into()),
        }
    }
}

/// `create_dir_all` tolerates concurrent creation of the same tree.
fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
        path: path.to_path_buf(),
        source: e,
    })
}

/// A single path component that cannot escape its parent directory.
pub(crate) fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}
