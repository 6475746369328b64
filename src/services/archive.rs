use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::errors::{StudioError, StudioResult};

/// Bundle files into a Deflate ZIP, each stored under its base name.
pub fn create_zip(paths: &[PathBuf], output: &Path) -> StudioResult<PathBuf> {
    let file = File::create(output)?;
    let mut writer = zip::ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                StudioError::InvalidInput(format!("Not a file path: {}", path.display()))
            })?;
        writer.start_file(name, options)?;
        writer.write_all(&std::fs::read(path)?)?;
    }

    writer.finish()?.flush()?;
    info!("Packed {} files into {}", paths.len(), output.display());
    Ok(output.to_path_buf())
}
