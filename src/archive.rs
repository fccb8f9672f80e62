//! Image blob codec
//!
//! An image blob is a ZIP archive holding exactly one `*.image` entry and a
//! `*.changes` entry with the same stem. Entries land in the build working
//! directory as `squeak.image` / `squeak.changes` regardless of their
//! archived names.

use crate::error::{SqueakerError, SqueakerResult};
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::warn;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const IMAGE_NAME: &str = "squeak.image";
pub const CHANGES_NAME: &str = "squeak.changes";

/// Extract the image and its changes file from a blob into `workdir`.
///
/// Pre-existing `squeak.image` / `squeak.changes` files are left alone with
/// a warning.
pub fn extract_image(blob_path: &Path, workdir: &Path) -> SqueakerResult<()> {
    let file = File::open(blob_path)
        .map_err(|e| SqueakerError::io(format!("opening blob {}", blob_path.display()), e))?;
    let mut archive = ZipArchive::new(file)?;

    // Entry names in archive index order; the first *.image decides the stem.
    let names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).map(|f| f.name().to_string()))
        .collect::<Result<_, _>>()?;

    let image_entry = names
        .iter()
        .find(|n| n.ends_with(".image"))
        .ok_or_else(|| SqueakerError::ArchiveMalformed("no *.image entry".to_string()))?
        .clone();
    let stem = image_entry.trim_end_matches(".image");
    let changes_entry = format!("{}.changes", stem);
    if !names.iter().any(|n| n == &changes_entry) {
        return Err(SqueakerError::ArchiveMalformed(format!(
            "no {} entry to match {}",
            changes_entry, image_entry
        )));
    }

    extract_entry(&mut archive, &image_entry, &workdir.join(IMAGE_NAME))?;
    extract_entry(&mut archive, &changes_entry, &workdir.join(CHANGES_NAME))?;
    Ok(())
}

fn extract_entry(
    archive: &mut ZipArchive<File>,
    entry: &str,
    dest: &Path,
) -> SqueakerResult<()> {
    if dest.exists() {
        warn!("not overwriting existing {}", dest.display());
        return Ok(());
    }

    let mut reader = archive.by_name(entry)?;
    let mut writer = File::create(dest)
        .map_err(|e| SqueakerError::io(format!("creating {}", dest.display()), e))?;
    io::copy(&mut reader, &mut writer)
        .map_err(|e| SqueakerError::io(format!("extracting {} to {}", entry, dest.display()), e))?;
    Ok(())
}

/// Pack `squeak.image` + `squeak.changes` from `workdir` into a new ZIP at
/// `dest`
pub fn pack_image(workdir: &Path, dest: &Path) -> SqueakerResult<()> {
    let out = File::create(dest)
        .map_err(|e| SqueakerError::io(format!("creating archive {}", dest.display()), e))?;
    let mut writer = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for name in [IMAGE_NAME, CHANGES_NAME] {
        let src = workdir.join(name);
        let mut reader = File::open(&src).map_err(|e| {
            SqueakerError::io(format!("opening {} for archiving", src.display()), e)
        })?;
        writer.start_file(name, options)?;
        io::copy(&mut reader, &mut writer)
            .map_err(|e| SqueakerError::io(format!("archiving {}", src.display()), e))?;
    }

    writer.finish()?;
    Ok(())
}
