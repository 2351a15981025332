//! MAT level 5 containers, decoded by `matrw`.
//!
//! This module only adapts the decoder: reading, panic containment and the
//! few array views the normalizer needs. Record semantics live in
//! `normalize`.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use matrw::{MatFile, MatVariable, MatlabType, NumericArray};

use crate::error::FormatError;

/// Read and decode a MAT file from disk.
pub fn read_mat_file(path: &Path) -> Result<MatFile, FormatError> {
    let bytes = std::fs::read(path)?;
    log::debug!("Read {} bytes from {}", bytes.len(), path.display());
    read_mat(&bytes)
}

/// Decode an in-memory MAT file.
///
/// The decoder panics on some corrupt headers (oversized dimensions,
/// truncated endian flags, invalid character data). Those panics stay in
/// here and come back as an invalid container.
pub fn read_mat(bytes: &[u8]) -> Result<MatFile, FormatError> {
    match panic::catch_unwind(AssertUnwindSafe(|| matrw::load_matfile_from_u8(bytes))) {
        Ok(decoded) => Ok(decoded?),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "decoder aborted".to_string());
            log::warn!("MAT decoder rejected the container: {message}");
            Err(FormatError::invalid_value("MAT container", message))
        }
    }
}

/// Dimensions with singleton axes removed.
pub fn squeezed_dims(array: &NumericArray) -> Vec<usize> {
    array.dim.iter().copied().filter(|&d| d != 1).collect()
}

/// Real and imaginary parts widened to `f64`.
///
/// `None` for character and logical arrays.
pub fn numeric_parts(array: &NumericArray) -> Option<(Vec<f64>, Option<Vec<f64>>)> {
    let real = widen(&array.value)?;
    let imag = match &array.value_cmp {
        Some(values) => Some(widen(values)?),
        None => None,
    };
    Some((real, imag))
}

fn widen(values: &MatlabType) -> Option<Vec<f64>> {
    let widened = match values {
        MatlabType::F64(v) => v.clone(),
        MatlabType::F32(v) => v.iter().map(|&x| f64::from(x)).collect(),
        MatlabType::I8(v) => v.iter().map(|&x| f64::from(x)).collect(),
        MatlabType::U8(v) => v.iter().map(|&x| f64::from(x)).collect(),
        MatlabType::I16(v) => v.iter().map(|&x| f64::from(x)).collect(),
        MatlabType::U16(v) => v.iter().map(|&x| f64::from(x)).collect(),
        MatlabType::I32(v) => v.iter().map(|&x| f64::from(x)).collect(),
        MatlabType::U32(v) => v.iter().map(|&x| f64::from(x)).collect(),
        MatlabType::I64(v) => v.iter().map(|&x| x as f64).collect(),
        MatlabType::U64(v) => v.iter().map(|&x| x as f64).collect(),
        MatlabType::UTF8(_) | MatlabType::UTF16(_) | MatlabType::BOOL(_) => return None,
    };
    Some(widened)
}

/// Contents of a character array.
pub fn text(value: &MatVariable) -> Option<String> {
    match value {
        MatVariable::NumericArray(array) => match &array.value {
            MatlabType::UTF8(chars) | MatlabType::UTF16(chars) => Some(chars.iter().collect()),
            _ => None,
        },
        _ => None,
    }
}

/// MAT files written by the same crate, for tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::{Path, PathBuf};

    use matrw::{save_matfile_v7, MatFile};

    pub fn save(dir: &Path, name: &str, mat: MatFile, compress: bool) -> PathBuf {
        let path = dir.join(name);
        save_matfile_v7(path.to_str().unwrap(), mat, compress).unwrap();
        path
    }

    pub fn bytes(mat: MatFile, compress: bool) -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::read(save(dir.path(), "fixture.mat", mat, compress)).unwrap()
    }

    /// Offset of the first variable's dimension values in an uncompressed
    /// file: 128-byte header, matrix tag, array-flags subelement, dims tag.
    pub const FIRST_DIMS_OFFSET: usize = 128 + 8 + 16 + 8;

    /// Overwrite the first variable's two dimensions.
    pub fn with_dims(mut bytes: Vec<u8>, rows: u32, cols: u32) -> Vec<u8> {
        let at = FIRST_DIMS_OFFSET;
        bytes[at..at + 4].copy_from_slice(&rows.to_le_bytes());
        bytes[at + 4..at + 8].copy_from_slice(&cols.to_le_bytes());
        bytes
    }
}
