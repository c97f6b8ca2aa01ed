use std::fs;
use std::path::{Path, PathBuf};

use super::{export_file_name, ExportError, ExportResult, ExportedImage};
use crate::scene::ExportFormat;

const PICTURES_SUBDIR: &str = "Pictures";

/// Receives finished exports (file system, clipboard, download prompt...).
pub trait ExportSink {
    fn deliver(&self, image: &ExportedImage) -> ExportResult<PathBuf>;
}

/// Writes `screenshot.<ext>` into a directory, replacing any previous export.
#[derive(Debug, Clone)]
pub struct FileExportSink {
    dir: PathBuf,
}

impl FileExportSink {
    pub const fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn with_default_dir() -> ExportResult<Self> {
        let home = std::env::var("HOME").map_err(|_| ExportError::MissingHomeDirectory)?;
        let mut dir = PathBuf::from(home);
        dir.push(PICTURES_SUBDIR);
        Ok(Self::with_dir(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn target_path(&self, format: ExportFormat) -> PathBuf {
        self.dir.join(export_file_name(format))
    }
}

impl ExportSink for FileExportSink {
    fn deliver(&self, image: &ExportedImage) -> ExportResult<PathBuf> {
        let target = self.target_path(image.format);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &image.bytes)?;
        tracing::info!(path = %target.display(), bytes = image.bytes.len(), "export saved");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("shotframe-sink-{name}-{}", std::process::id()));
        dir
    }

    #[test]
    fn target_path_uses_screenshot_name() {
        let sink = FileExportSink::with_dir(PathBuf::from("/home/test/Pictures"));
        assert_eq!(
            sink.target_path(ExportFormat::Jpeg),
            PathBuf::from("/home/test/Pictures/screenshot.jpg")
        );
    }

    #[test]
    fn deliver_creates_directory_and_overwrites() {
        let dir = scratch_dir("overwrite");
        let sink = FileExportSink::with_dir(dir.clone());
        let mut image = ExportedImage {
            bytes: b"first".to_vec(),
            format: ExportFormat::Png,
            width: 1,
            height: 1,
        };
        let path = sink.deliver(&image).expect("first write");
        image.bytes = b"second".to_vec();
        assert_eq!(sink.deliver(&image).expect("second write"), path);
        assert_eq!(fs::read(&path).expect("read back"), b"second");
        fs::remove_dir_all(dir).expect("cleanup");
    }
}
