//! In-memory copy of a WordprocessingML zip package.

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use markdown_assemble_utils::atomic_write_bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{BuildError, BuildResult};

/// Parts in archive order. Replaced parts keep their position, new parts go
/// to the end.
#[derive(Debug)]
pub(crate) struct Package {
    source: PathBuf,
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    pub fn open(path: &Path) -> BuildResult<Self> {
        let file = File::open(path).map_err(|_| BuildError::MissingFile {
            path: path.to_path_buf(),
        })?;
        let package_error = |source| BuildError::Package {
            path: path.to_path_buf(),
            source,
        };
        let mut archive = ZipArchive::new(file).map_err(package_error)?;

        let mut parts = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(package_error)?;
            if entry.is_dir() {
                continue;
            }
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|source| BuildError::io(path, source))?;
            parts.push((entry.name().to_string(), bytes));
        }

        Ok(Self {
            source: path.to_path_buf(),
            parts,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|(part, _)| part == name)
    }

    pub fn text(&self, name: &str) -> BuildResult<String> {
        let bytes = self
            .parts
            .iter()
            .find(|(part, _)| part == name)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| BuildError::InvalidPart {
                part: name.to_string(),
            })?;
        String::from_utf8(bytes).map_err(|err| BuildError::xml(name, err))
    }

    pub fn set(&mut self, name: &str, bytes: Vec<u8>) {
        match self.parts.iter_mut().find(|(part, _)| part == name) {
            Some((_, existing)) => *existing = bytes,
            None => self.parts.push((name.to_string(), bytes)),
        }
    }

    /// Zip the parts and atomically replace `path`.
    pub fn write(&self, path: &Path) -> BuildResult<()> {
        let package_error = |source| BuildError::Package {
            path: path.to_path_buf(),
            source,
        };
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for (name, bytes) in &self.parts {
            writer
                .start_file(name.as_str(), options)
                .map_err(package_error)?;
            writer
                .write_all(bytes)
                .map_err(|source| BuildError::io(path, source))?;
        }

        let bytes = writer.finish().map_err(package_error)?.into_inner();
        atomic_write_bytes(path, &bytes).map_err(|source| BuildError::io(path, source))
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}
