use std::{
    io,
    path::{Path, PathBuf},
};

use image::ImageFormat;
use mask_painter::SourceFile;

pub(super) const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

fn is_image(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok_and(|f| {
        f.extensions_str()
            .iter()
            .any(|ext| EXTENSIONS.contains(ext))
    })
}

pub(super) fn read_file(path: &Path) -> io::Result<SourceFile> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(SourceFile::with_guessed_mime(name, bytes))
}

/// Every supported image in `dir`, sorted by file name.
pub(super) fn read_dir(dir: &Path) -> io::Result<Vec<SourceFile>> {
    let mut paths = std::fs::read_dir(dir)?
        .map(|entry| Ok(entry?.path()))
        .collect::<io::Result<Vec<PathBuf>>>()?;
    paths.retain(|p| p.is_file() && is_image(p));
    paths.sort();
    paths.iter().map(|p| read_file(p)).collect()
}
