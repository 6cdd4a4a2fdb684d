//! Blocking extraction of supported archive formats into a workspace directory.

use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{ConvertError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    SevenZ,
    Tar,
    TarGz,
    Gzip,
    Rar,
}

impl ArchiveKind {
    /// Recognize an archive from its file name.
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".tar") {
            Some(ArchiveKind::Tar)
        } else if name.ends_with(".gz") {
            Some(ArchiveKind::Gzip)
        } else if name.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else if name.ends_with(".7z") {
            Some(ArchiveKind::SevenZ)
        } else if name.ends_with(".rar") {
            Some(ArchiveKind::Rar)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::SevenZ => "7z",
            ArchiveKind::Tar => "tar",
            ArchiveKind::TarGz => "tar.gz",
            ArchiveKind::Gzip => "gzip",
            ArchiveKind::Rar => "rar",
        }
    }
}

/// Files produced by one extraction
#[derive(Debug, Default)]
pub struct Extracted {
    /// Extracted regular files, relative to the workspace, sorted
    pub files: Vec<PathBuf>,
    /// Entry names refused because they would land outside the workspace
    pub rejected: Vec<String>,
}

/// Extract `archive` into `dest`. Runs blocking I/O; call from `spawn_blocking`.
pub fn extract(kind: ArchiveKind, archive: &Path, dest: &Path) -> Result<Extracted> {
    let rejected = match kind {
        ArchiveKind::Zip => extract_zip(archive, dest)?,
        ArchiveKind::Tar => extract_tar(File::open(archive)?, dest)?,
        ArchiveKind::TarGz => extract_tar(flate2::read::GzDecoder::new(File::open(archive)?), dest)?,
        ArchiveKind::Gzip => {
            extract_gzip(archive, dest)?;
            Vec::new()
        }
        ArchiveKind::SevenZ => {
            sevenz_rust::decompress_file(archive, dest)
                .map_err(|e| ConvertError::Extraction(format!("7z: {}", e)))?;
            Vec::new()
        }
        ArchiveKind::Rar => {
            return Err(ConvertError::Unsupported(
                "rar archives cannot be extracted".to_string(),
            ))
        }
    };

    Ok(Extracted {
        files: list_files(dest),
        rejected,
    })
}

/// Relative path of an entry, if it stays inside the workspace.
fn contained(name: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<Vec<String>> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)
        .map_err(|e| ConvertError::Extraction(format!("zip: {}", e)))?;
    let mut rejected = Vec::new();

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| ConvertError::Extraction(format!("zip: {}", e)))?;

        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            warn!(entry = %entry.name(), "Refusing zip entry outside extraction directory");
            rejected.push(entry.name().to_string());
            continue;
        };

        let target = dest.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
    }
    Ok(rejected)
}

fn extract_tar<R: io::Read>(reader: R, dest: &Path) -> Result<Vec<String>> {
    let mut archive = tar::Archive::new(reader);
    let mut rejected = Vec::new();

    let entries = archive
        .entries()
        .map_err(|e| ConvertError::Extraction(format!("tar: {}", e)))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| ConvertError::Extraction(format!("tar: {}", e)))?;
        let name = entry.path()?.to_string_lossy().to_string();

        if contained(&name).is_none() {
            warn!(entry = %name, "Refusing tar entry outside extraction directory");
            rejected.push(name);
            continue;
        }
        if !entry.unpack_in(dest)? {
            rejected.push(name);
        }
    }
    Ok(rejected)
}

fn extract_gzip(archive: &Path, dest: &Path) -> Result<()> {
    let name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| {
            let lower = n.to_lowercase();
            lower.ends_with(".gz").then(|| n[..n.len() - 3].to_string())
        })
        .filter(|n| contained(n).is_some())
        .unwrap_or_else(|| "content".to_string());

    let mut decoder = flate2::read::GzDecoder::new(File::open(archive)?);
    let mut out = File::create(dest.join(name))?;
    io::copy(&mut decoder, &mut out)
        .map_err(|e| ConvertError::Extraction(format!("gzip: {}", e)))?;
    Ok(())
}

/// Regular files below `root`, relative and sorted. Symlinks are ignored.
fn list_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    files.sort();
    files
}
