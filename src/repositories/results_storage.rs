use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::configuration::StorageSettings;
use crate::helper::error_chain_fmt;

/// Name of the archive a completed job exposes for download.
/// Its presence in a job's output directory is what makes the job `completed`.
pub const RESULTS_ARCHIVE_NAME: &str = "results.zip";

#[derive(thiserror::Error)]
pub enum ResultsStorageError {
    #[error("There are no result files to archive for job {0}")]
    NoResultFiles(Uuid),
    #[error(transparent)]
    ZipError(#[from] zip::result::ZipError),
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl std::fmt::Debug for ResultsStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Local-filesystem storage for staged uploads and job results.
///
/// Staged uploads land in `upload_dir` as `{job_id}_{file_name}`; each job
/// gets its own sub-directory of `output_dir` for the annotated pages and,
/// once packing succeeded, the results archive.
#[derive(Clone)]
pub struct ResultsStorage {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl ResultsStorage {
    pub fn new(settings: &StorageSettings) -> Self {
        Self {
            upload_dir: settings.upload_dir.clone(),
            output_dir: settings.output_dir.clone(),
        }
    }

    /// Creates the upload and output directories if they do not exist yet
    pub async fn ensure_directories(&self) -> Result<(), ResultsStorageError> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }

    pub fn job_output_dir(&self, job_id: Uuid) -> PathBuf {
        self.output_dir.join(job_id.to_string())
    }

    pub fn results_archive_path(&self, job_id: Uuid) -> PathBuf {
        self.job_output_dir(job_id).join(RESULTS_ARCHIVE_NAME)
    }

    /// Whether the job's results archive exists on disk
    pub async fn has_results(&self, job_id: Uuid) -> bool {
        tokio::fs::try_exists(&self.results_archive_path(job_id))
            .await
            .unwrap_or(false)
    }

    /// Whether the job at least started: its output directory exists
    pub async fn has_job_output_dir(&self, job_id: Uuid) -> bool {
        tokio::fs::try_exists(&self.job_output_dir(job_id))
            .await
            .unwrap_or(false)
    }

    /// Copies an uploaded file into the staging area and creates the job's
    /// output directory.
    ///
    /// # Returns
    /// The path of the staged input file, to be handed to the annotator
    #[tracing::instrument(name = "Staging uploaded drawing", skip(self, uploaded_file))]
    pub async fn stage_upload(
        &self,
        job_id: Uuid,
        file_name: &str,
        uploaded_file: &Path,
    ) -> Result<PathBuf, ResultsStorageError> {
        let staged_path = self.upload_dir.join(format!("{}_{}", job_id, file_name));

        // A plain copy rather than a rename: the upload lands in a temp file
        // that can sit on another filesystem.
        tokio::fs::copy(uploaded_file, &staged_path).await?;
        tokio::fs::create_dir_all(self.job_output_dir(job_id)).await?;

        Ok(staged_path)
    }

    /// Removes the staged input file once the job is done with it.
    pub async fn remove_staged_upload(&self, staged_path: &Path) -> Result<(), ResultsStorageError> {
        tokio::fs::remove_file(staged_path).await?;
        Ok(())
    }

    /// Packs every file the annotator produced into the job's results
    /// archive. The archive never includes itself, so re-packing after a
    /// partial failure stays safe.
    #[tracing::instrument(name = "Packing results archive", skip(self))]
    pub async fn pack_results_archive(&self, job_id: Uuid) -> Result<PathBuf, ResultsStorageError> {
        let job_output_dir = self.job_output_dir(job_id);
        let archive_path = self.results_archive_path(job_id);

        // zip writing is synchronous
        let packed_path = tokio::task::spawn_blocking({
            let archive_path = archive_path.clone();
            move || pack_directory(&job_output_dir, &archive_path, job_id)
        })
        .await
        .map_err(|join_error| std::io::Error::new(std::io::ErrorKind::Other, join_error))??;

        info!("Packed results archive: {}", packed_path.display());
        Ok(packed_path)
    }
}

fn pack_directory(
    job_output_dir: &Path,
    archive_path: &Path,
    job_id: Uuid,
) -> Result<PathBuf, ResultsStorageError> {
    let archive_file = std::fs::File::create(archive_path)?;
    let mut writer = ZipWriter::new(archive_file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut packed_files = 0;
    let mut buffer = Vec::new();

    pack_entries(
        job_output_dir,
        job_output_dir,
        &mut writer,
        options,
        &mut packed_files,
        &mut buffer,
    )?;

    if packed_files == 0 {
        // An empty archive would let the status route report a completed
        // job with nothing to download
        writer.finish()?;
        std::fs::remove_file(archive_path)?;
        return Err(ResultsStorageError::NoResultFiles(job_id));
    }

    writer.finish()?;
    Ok(archive_path.to_path_buf())
}

/// Walks `dir` depth-first, adding every file under it with an archive name
/// relative to `root`. The annotation tool may sort its output into
/// subdirectories, so a flat listing is not enough.
fn pack_entries(
    root: &Path,
    dir: &Path,
    writer: &mut ZipWriter<std::fs::File>,
    options: FileOptions,
    packed_files: &mut usize,
    buffer: &mut Vec<u8>,
) -> Result<(), ResultsStorageError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            pack_entries(root, &path, writer, options, packed_files, buffer)?;
            continue;
        }
        if !entry.file_type()?.is_file() {
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .map_err(|error| std::io::Error::new(std::io::ErrorKind::Other, error))?;
        let archive_name = relative.to_string_lossy().replace('\\', "/");
        if archive_name == RESULTS_ARCHIVE_NAME {
            continue;
        }

        writer.start_file(archive_name.as_str(), options)?;
        buffer.clear();
        std::fs::File::open(&path)?.read_to_end(buffer)?;
        writer.write_all(buffer)?;
        *packed_files += 1;
    }

    Ok(())
}
