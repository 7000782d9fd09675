//! ZIP packaging of a job's working tree

use crate::error::{Error, Result};
use crate::types::JobId;
use crate::utils::sanitize_path_component;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::FileOptions;

/// Builds job archives under a temp root
pub struct Archiver;

impl Archiver {
    /// Archive file name for a job: `{qualification}_{first 8 chars of id}.zip`
    pub fn archive_name(job_id: JobId, qualification: &str) -> String {
        format!(
            "{}_{}.zip",
            sanitize_path_component(qualification),
            job_id.short()
        )
    }

    /// Zip `<temp_root>/<job_id>/` into `<temp_root>/<archive_name>` on a blocking thread
    ///
    /// Entries are the regular files of the working tree, named by their path
    /// relative to it with `/` separators, in sorted order, deflate-compressed.
    /// A missing working tree yields an empty archive.
    pub async fn build(job_id: JobId, qualification: &str, temp_root: &Path) -> Result<PathBuf> {
        let source = temp_root.join(job_id.to_string());
        let output = temp_root.join(Self::archive_name(job_id, qualification));
        let root = temp_root.to_path_buf();

        tokio::task::spawn_blocking(move || Self::build_blocking(&source, &root, &output))
            .await
            .map_err(|e| Error::Archive(format!("archive task failed: {e}")))?
    }

    fn build_blocking(source: &Path, temp_root: &Path, output: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(temp_root)?;
        // Written beside the final path and renamed, so readers never see a partial archive
        let mut tmp = tempfile::NamedTempFile::new_in(temp_root)?;
        let entries = write_tree(source, tmp.as_file_mut())?;
        tmp.as_file().sync_all()?;
        tmp.persist(output).map_err(|e| Error::Io(e.error))?;

        info!(archive = %output.display(), entries, "archive created");
        Ok(output.to_path_buf())
    }
}

fn write_tree<W: Write + Seek>(source: &Path, sink: W) -> Result<usize> {
    let mut writer = zip::ZipWriter::new(sink);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut entries = 0;

    if source.is_dir() {
        for entry in WalkDir::new(source).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Archive(format!("failed to walk {}: {e}", source.display())))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|e| Error::Archive(e.to_string()))?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            debug!(entry = %name, "adding to archive");
            writer
                .start_file(name, options)
                .map_err(|e| Error::Archive(format!("failed to add entry: {e}")))?;
            let mut file = std::fs::File::open(entry.path())?;
            std::io::copy(&mut file, &mut writer)?;
            entries += 1;
        }
    } else {
        debug!(source = %source.display(), "no working tree, writing empty archive");
    }

    writer
        .finish()
        .map_err(|e| Error::Archive(format!("failed to finish archive: {e}")))?;
    Ok(entries)
}
