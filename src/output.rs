use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Create the output folder and any missing parents. Existing folders are left alone.
pub fn prepare_output_dir(path: &Path) -> Result<()> {
    if path.exists() && !path.is_dir() {
        anyhow::bail!("output path {} exists and is not a directory", path.display());
    }
    std::fs::create_dir_all(path)
        .with_context(|| format!("creating output folder {}", path.display()))
}

/// Copy `source` into `output_dir` under `file_name`, replacing any file already there.
pub fn copy_into(source: &Path, output_dir: &Path, file_name: &OsStr) -> Result<PathBuf> {
    let dest = output_dir.join(file_name);
    std::fs::copy(source, &dest)
        .with_context(|| format!("copying {} to {}", source.display(), dest.display()))?;
    Ok(dest)
}
