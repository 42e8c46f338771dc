//! Handing completed batches to storage.
//!
//! A [`FrameCommitter`] receives the whole frame sequence of a completed run,
//! keyed by a [`DatasetId`]. Two committers ship with the crate:
//!
//! - [`DirectoryCommitter`] files images as `<root>/<dataset>/<label>/…`,
//!   one directory per label, and records each batch in a JSON manifest.
//! - [`MemoryCommitter`] keeps batches in memory, for embedding and tests.
//!
//! Commits are all-or-nothing: a committer either stores every frame of the
//! batch or none of them.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

use crate::error::LabelFramesError;
use crate::sampler::ExtractedFrame;

/// Name of the per-dataset directory holding batch manifests.
pub const MANIFEST_DIRECTORY: &str = "manifests";

/// A validated dataset identity.
///
/// Dataset names become directory names, so they must be non-empty, must
/// not contain path separators, and must not start with a dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetId(String);

impl DatasetId {
    /// Validate a dataset name.
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// [`LabelFramesError::InvalidDataset`] if the name is empty, contains
    /// `/` or `\`, or starts with `.`.
    ///
    /// # Example
    ///
    /// ```
    /// use labelframes::DatasetId;
    ///
    /// assert_eq!(DatasetId::new(" birds ").unwrap().as_str(), "birds");
    /// assert!(DatasetId::new("../etc").is_err());
    /// ```
    pub fn new(name: impl Into<String>) -> Result<Self, LabelFramesError> {
        let name = name.into();
        let trimmed = name.trim();
        let valid = !trimmed.is_empty()
            && !trimmed.starts_with('.')
            && !trimmed.contains(['/', '\\'])
            && !trimmed.chars().any(char::is_control);
        if valid {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(LabelFramesError::InvalidDataset(name))
        }
    }

    /// The dataset name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DatasetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// What a committer stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Dataset the batch was filed under.
    pub dataset: DatasetId,
    /// Number of frames stored.
    pub frames: usize,
    /// Manifest written for the batch, if the committer writes one.
    pub manifest: Option<PathBuf>,
    /// Stored image files, in frame order (empty for in-memory committers).
    pub files: Vec<PathBuf>,
}

/// Storage collaborator for completed runs.
pub trait FrameCommitter {
    /// Store every frame of `frames` under `dataset`.
    ///
    /// # Errors
    ///
    /// Implementations must leave no frame of a failed batch visible.
    fn commit(
        &mut self,
        dataset: &DatasetId,
        frames: &[ExtractedFrame],
    ) -> Result<CommitReceipt, LabelFramesError>;
}

impl<C: FrameCommitter + ?Sized> FrameCommitter for &mut C {
    fn commit(
        &mut self,
        dataset: &DatasetId,
        frames: &[ExtractedFrame],
    ) -> Result<CommitReceipt, LabelFramesError> {
        (**self).commit(dataset, frames)
    }
}

/// Keeps committed batches in memory.
#[derive(Debug, Default)]
pub struct MemoryCommitter {
    batches: Vec<(DatasetId, Vec<ExtractedFrame>)>,
}

impl MemoryCommitter {
    /// Create an empty committer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed batches, oldest first.
    pub fn batches(&self) -> &[(DatasetId, Vec<ExtractedFrame>)] {
        &self.batches
    }

    /// All frames committed under `dataset`, across batches.
    pub fn frames_for(&self, dataset: &DatasetId) -> Vec<&ExtractedFrame> {
        self.batches
            .iter()
            .filter(|(id, _)| id == dataset)
            .flat_map(|(_, frames)| frames.iter())
            .collect()
    }
}

impl FrameCommitter for MemoryCommitter {
    fn commit(
        &mut self,
        dataset: &DatasetId,
        frames: &[ExtractedFrame],
    ) -> Result<CommitReceipt, LabelFramesError> {
        self.batches.push((dataset.clone(), frames.to_vec()));
        Ok(CommitReceipt {
            dataset: dataset.clone(),
            frames: frames.len(),
            manifest: None,
            files: Vec::new(),
        })
    }
}

/// Files frames on disk, one directory per label.
///
/// Each commit is a batch. Its images are named
/// `<batch>-<index>_<millis>ms.<ext>` under `<root>/<dataset>/<label>/`,
/// and its manifest is written to
/// `<root>/<dataset>/manifests/<batch>.json`:
///
/// ```json
/// { "dataset": "birds", "batch": "b1718000000000",
///   "images": [ { "time": 1.5, "class": "robin", "file": "robin/b1718000000000-000003_1500ms.jpg",
///                 "width": 640, "height": 360, "mime": "image/jpeg" } ] }
/// ```
///
/// Files are written to a hidden staging directory first and moved into
/// place only once all of them were written. If a move fails, the files
/// already moved are removed again.
#[derive(Debug, Clone)]
pub struct DirectoryCommitter {
    root: PathBuf,
}

impl DirectoryCommitter {
    /// Create a committer rooted at `root`. The directory is created on the
    /// first commit.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a dataset's images.
    pub fn dataset_directory(&self, dataset: &DatasetId) -> PathBuf {
        self.root.join(dataset.as_str())
    }

    fn next_batch_id(&self, dataset_directory: &Path) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or(0);
        let manifests = dataset_directory.join(MANIFEST_DIRECTORY);
        let mut candidate = millis;
        loop {
            let batch = format!("b{candidate}");
            if !manifests.join(format!("{batch}.json")).exists()
                && !dataset_directory.join(format!(".staging-{batch}")).exists()
            {
                return batch;
            }
            candidate += 1;
        }
    }

    fn stage(
        staging: &Path,
        dataset: &DatasetId,
        batch: &str,
        frames: &[ExtractedFrame],
    ) -> Result<Vec<PathBuf>, LabelFramesError> {
        let mut relative_paths = Vec::with_capacity(frames.len());
        let mut images = Vec::with_capacity(frames.len());

        for (index, frame) in frames.iter().enumerate() {
            let class = sanitize_label(&frame.label);
            let file_name = format!(
                "{batch}-{index:06}_{}ms.{}",
                (frame.timestamp * 1000.0).round() as u64,
                frame.encoding.extension(),
            );
            let relative = Path::new(&class).join(&file_name);

            fs::create_dir_all(staging.join(&class))?;
            fs::write(staging.join(&relative), &frame.image)?;

            images.push(json!({
                "time": frame.timestamp,
                "class": frame.label,
                "file": format!("{class}/{file_name}"),
                "width": frame.width,
                "height": frame.height,
                "mime": frame.encoding.mime_type(),
            }));
            relative_paths.push(relative);
        }

        let manifest = json!({
            "dataset": dataset.as_str(),
            "batch": batch,
            "images": images,
        });
        let manifest_relative = Path::new(MANIFEST_DIRECTORY).join(format!("{batch}.json"));
        fs::create_dir_all(staging.join(MANIFEST_DIRECTORY))?;
        fs::write(
            staging.join(&manifest_relative),
            serde_json::to_vec_pretty(&manifest)?,
        )?;
        relative_paths.push(manifest_relative);

        Ok(relative_paths)
    }

    fn publish(
        staging: &Path,
        destination: &Path,
        relative_paths: &[PathBuf],
    ) -> Result<Vec<PathBuf>, LabelFramesError> {
        let mut moved: Vec<PathBuf> = Vec::with_capacity(relative_paths.len());
        for relative in relative_paths {
            let target = destination.join(relative);
            let result = target
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|()| fs::rename(staging.join(relative), &target));
            if let Err(error) = result {
                for path in &moved {
                    if let Err(cleanup) = fs::remove_file(path) {
                        log::warn!("Failed to roll back {}: {cleanup}", path.display());
                    }
                }
                return Err(error.into());
            }
            moved.push(target);
        }
        Ok(moved)
    }
}

impl FrameCommitter for DirectoryCommitter {
    fn commit(
        &mut self,
        dataset: &DatasetId,
        frames: &[ExtractedFrame],
    ) -> Result<CommitReceipt, LabelFramesError> {
        let destination = self.dataset_directory(dataset);
        fs::create_dir_all(&destination).map_err(|error| LabelFramesError::CommitFailed {
            dataset: dataset.to_string(),
            reason: error.to_string(),
        })?;

        let batch = self.next_batch_id(&destination);
        let staging = destination.join(format!(".staging-{batch}"));
        log::debug!(
            "Staging {} frame(s) for dataset {} in {}",
            frames.len(),
            dataset,
            staging.display()
        );

        let outcome = Self::stage(&staging, dataset, &batch, frames)
            .and_then(|relative_paths| Self::publish(&staging, &destination, &relative_paths));

        if staging.exists() {
            if let Err(error) = fs::remove_dir_all(&staging) {
                log::warn!("Failed to remove staging directory {}: {error}", staging.display());
            }
        }

        let mut files = outcome.map_err(|error| LabelFramesError::CommitFailed {
            dataset: dataset.to_string(),
            reason: error.to_string(),
        })?;
        let manifest = files.pop();

        log::info!(
            "Committed {} frame(s) to {}",
            files.len(),
            destination.display()
        );

        Ok(CommitReceipt {
            dataset: dataset.clone(),
            frames: files.len(),
            manifest,
            files,
        })
    }
}

/// Turn a label into a safe single path component.
///
/// Characters other than ASCII letters, digits, `-`, `_`, `.`, and space
/// become `_`. Labels that would be empty or start with a dot are prefixed
/// with `_`.
pub fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.starts_with('.') {
        format!("_{cleaned}")
    } else {
        cleaned
    }
}
