use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{config::model::FileType, foundation::error::ForgeResult};

/// On-disk layout of one collection's outputs.
///
/// ```text
/// <out>/<name>/images/<index>.<ext>
/// <out>/<name>/metadata/metadata.json
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLayout {
    dir: PathBuf,
}

impl OutputLayout {
    /// Layout for collection `name` under `out_root`.
    pub fn new(out_root: impl AsRef<Path>, name: &str) -> Self {
        Self {
            dir: out_root.as_ref().join(name),
        }
    }

    /// Collection directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory holding rendered images.
    pub fn images_dir(&self) -> PathBuf {
        self.dir.join("images")
    }

    /// Directory holding the trait table manifest.
    pub fn metadata_dir(&self) -> PathBuf {
        self.dir.join("metadata")
    }

    /// Trait table manifest file.
    pub fn manifest_path(&self) -> PathBuf {
        self.metadata_dir().join("metadata.json")
    }

    /// Output file name of the trait set at collection position `index`.
    pub fn image_file_name(index: usize, filetype: FileType) -> String {
        format!("{index}.{}", filetype.extension())
    }

    /// Output path of the trait set at collection position `index`.
    pub fn image_path(&self, index: usize, filetype: FileType) -> PathBuf {
        self.images_dir().join(Self::image_file_name(index, filetype))
    }

    /// Remove any previous images and recreate an empty images directory.
    pub fn recreate_images_dir(&self) -> ForgeResult<()> {
        let dir = self.images_dir();
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("remove old images dir '{}'", dir.display()))?;
        }
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create images dir '{}'", dir.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/output/layout.rs"]
mod tests;
