use std::path::Path;

use super::filter::{strip_blocks, RECONSTRUCTION_BLOCK_TYPE};
use super::mat;
use super::model::{Record, RecordIndex, SourceFormat};
use super::normalize::{normalize_mat, normalize_unv};
use super::unv::{self, UnvBlock};
use crate::error::{Error, FormatError, Result};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Pick the backend for a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.mat`         – MAT level 5 container of record structs
/// * `.unv` / `.uff` – universal text file
pub fn detect_format(path: &Path) -> Result<SourceFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "mat" => Ok(SourceFormat::Tabular),
        "unv" | "uff" => Ok(SourceFormat::Universal),
        "" => Err(Error::UnsupportedFormat(format!(
            "{} (no extension)",
            path.display()
        ))),
        other => Err(Error::UnsupportedFormat(format!(".{other}"))),
    }
}

/// Load every selectable record of a test-lab export.
///
/// Fails as a whole: no partial index is ever returned.
pub fn load_testlab_file(path: &Path) -> Result<RecordIndex> {
    log::info!("Loading test-lab file {}", path.display());
    let format = detect_format(path)?;
    log::info!("File type detected: .{format}");

    let records = match format {
        SourceFormat::Tabular => {
            let mat = mat::read_mat_file(path).map_err(|e| parse_error(path, e))?;
            normalize_mat(&mat)?
        }
        SourceFormat::Universal => {
            let blocks = read_blocks(path, &read_text(path)?)?;
            normalize_unv(blocks)?
        }
    };

    let index = RecordIndex::new(format, file_name(path), records);
    log::info!("Loaded {} records from {}", index.len(), index.file_name);
    Ok(index)
}

/// Load the first response function of a reconstructed FRF file.
///
/// Type 151 blocks are stripped from the text before parsing.
pub fn load_reconstructed_file(path: &Path) -> Result<Record> {
    log::info!("Loading reconstructed file {}", path.display());
    if detect_format(path)? != SourceFormat::Universal {
        return Err(Error::UnsupportedFormat(format!(
            "{} (reconstructed FRFs must be universal files)",
            path.display()
        )));
    }

    let text = read_text(path)?;
    let filtered = strip_blocks(&text, RECONSTRUCTION_BLOCK_TYPE);
    let blocks = read_blocks(path, &filtered)?;
    if blocks.len() > 1 {
        log::info!("File contains {} datasets, using the first function", blocks.len());
    }

    let record = normalize_unv(blocks)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::EmptyDataset(file_name(path)))?;
    log::debug!(
        "Reconstructed data: {} points x {} columns",
        record.ordinate.len(),
        record.ordinate.columns()
    );
    Ok(record)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| parse_error(path, FormatError::Io(e)))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_blocks(path: &Path, text: &str) -> Result<Vec<UnvBlock>> {
    let blocks = unv::parse_blocks(text).map_err(|e| parse_error(path, e))?;
    if blocks.is_empty() {
        return Err(Error::EmptyDataset(file_name(path)));
    }
    log::debug!("Parsed {} datasets", blocks.len());
    Ok(blocks)
}

fn parse_error(path: &Path, source: FormatError) -> Error {
    Error::parse(path.display().to_string(), source)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use matrw::{matfile, matvar};

    use super::*;
    use crate::data::mat::fixtures::{bytes, save, with_dims};
    use crate::data::model::Ordinate;

    fn write(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("a.MAT")).unwrap(), SourceFormat::Tabular);
        assert_eq!(detect_format(Path::new("a.unv")).unwrap(), SourceFormat::Universal);
        assert_eq!(detect_format(Path::new("a.uff")).unwrap(), SourceFormat::Universal);
        assert!(matches!(
            detect_format(Path::new("a.csv")),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(matches!(
            detect_format(Path::new("noext")),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_load_mat_index() {
        let dir = tempfile::tempdir().unwrap();
        let frf = matvar!([
            { Name: "a", X_Data: [1.0, 2.0], Y_Data: [(1.0, 0.0), (1.0, 1.0)] },
            { Name: "b", X_Data: [1.0, 2.0], Y_Data: [3.0, 4.0] },
        ]);
        let path = save(dir.path(), "run.mat", matfile!(FRF: frf), true);
        let index = load_testlab_file(&path).unwrap();
        assert_eq!(index.source_format, SourceFormat::Tabular);
        assert_eq!(index.file_name, "run.mat");
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("FRF_1").unwrap().ordinate, Ordinate::Real(vec![3.0, 4.0]));
    }

    #[test]
    fn test_corrupt_mat_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "bad.mat", b"not a mat file");
        assert!(matches!(load_testlab_file(&path), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_mat_with_oversized_dimensions_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let frf = matvar!([
            { Name: "a", X_Data: [1.0], Y_Data: [2.0] },
            { Name: "b", X_Data: [1.0], Y_Data: [3.0] },
        ]);
        let corrupt = with_dims(bytes(matfile!(FRF: frf), false), i32::MAX as u32, 3);
        let path = write(&dir, "huge.mat", &corrupt);
        assert!(matches!(load_testlab_file(&path), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_empty_unv_is_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "empty.unv", b"\n\n");
        assert!(matches!(load_testlab_file(&path), Err(Error::EmptyDataset(_))));
    }

    #[test]
    fn test_missing_file_is_parse_error() {
        let err = load_testlab_file(Path::new("/nonexistent/dir/file.unv")).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse {
                source: FormatError::Io(_),
                ..
            }
        ));
    }

    #[test]
    fn test_reconstructed_without_function_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "r.unv", b"    -1\n   151\nheader\n    -1\n    -1\n   164\nunits\n    -1\n");
        assert!(matches!(
            load_reconstructed_file(&path),
            Err(Error::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_reconstructed_rejects_mat() {
        assert!(matches!(
            load_reconstructed_file(Path::new("x.mat")),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
