use matrw::{MatFile, MatVariable, Structure};
use ndarray::{Array2, ShapeBuilder};
use num_complex::Complex64;

use super::mat::{numeric_parts, squeezed_dims, text};
use super::model::{Ordinate, Record, Source, RESPONSE_FUNCTION_TYPE};
use super::unv::{ResponseFunction, UnvBlock};
use crate::error::{Error, Result};

/// Browse group of universal response functions.
pub const UNIVERSAL_GROUP: &str = "Functions (Type 58)";

const TABULAR_X_LABEL: &str = "Freq";
const TABULAR_X_UNITS: &str = "Hz";

// ---------------------------------------------------------------------------
// MAT container → records
// ---------------------------------------------------------------------------

/// Collect every record-shaped entry of a MAT file.
///
/// A one-element struct is a record named after its variable. Struct arrays
/// and cell arrays are groups whose elements are addressed `{variable}_{i}`.
/// Entries without `Name`, `X_Data` and `Y_Data` are container metadata and
/// are skipped.
pub fn normalize_mat(mat: &MatFile) -> Result<Vec<Record>> {
    let mut records = Vec::new();

    for (key, value) in mat.iter() {
        if key.starts_with("__") {
            continue;
        }
        match value {
            MatVariable::Structure(s) => records.extend(tabular_record(key, None, s)?),
            MatVariable::StructureArray(array) if array.value.len() == 1 => {
                if let Some(MatVariable::Structure(s)) = array.value.first() {
                    records.extend(tabular_record(key, None, s)?);
                }
            }
            MatVariable::StructureArray(array) => {
                for (i, element) in array.value.iter().enumerate() {
                    if let MatVariable::Structure(s) = element {
                        records.extend(tabular_record(&format!("{key}_{i}"), Some(key.as_str()), s)?);
                    }
                }
            }
            MatVariable::CellArray(cell) => {
                for (i, item) in cell.value.iter().enumerate() {
                    match item {
                        MatVariable::Structure(s) => {
                            records.extend(tabular_record(&format!("{key}_{i}"), Some(key.as_str()), s)?);
                        }
                        _ => log::debug!("Skipping non-record cell {key}[{i}]"),
                    }
                }
            }
            _ => log::debug!("Skipping non-record variable {key}"),
        }
    }

    Ok(records)
}

/// Try to read one struct element as a record.
///
/// `Ok(None)` when the element is not record-shaped; `Err` when it is but
/// its data cannot form a valid record.
pub fn tabular_record(identity: &str, group: Option<&str>, element: &Structure) -> Result<Option<Record>> {
    let (Some(name), Some(x_data), Some(y_data)) = (
        element.get("Name"),
        element.get("X_Data"),
        element.get("Y_Data"),
    ) else {
        return Ok(None);
    };

    let name = text(name).unwrap_or_else(|| format!("Record {identity}"));

    let abscissa = match x_data {
        MatVariable::NumericArray(n) if squeezed_dims(n).len() <= 1 => match numeric_parts(n) {
            Some((real, None)) => real,
            _ => return Err(Error::malformed(identity, "X_Data is not a real vector")),
        },
        _ => return Err(Error::malformed(identity, "X_Data is not a real vector")),
    };
    let ordinate = tabular_ordinate(identity, y_data)?;
    check_lengths(identity, &abscissa, &ordinate)?;

    let abscissa_label = text_field(element, "X_Label").unwrap_or_else(|| TABULAR_X_LABEL.to_string());
    let abscissa_units = text_field(element, "X_Units").unwrap_or_else(|| TABULAR_X_UNITS.to_string());
    log::debug!("Record {identity} ({name}): {} points", abscissa.len());

    Ok(Some(Record {
        identity: identity.to_string(),
        name,
        group: group.map(str::to_string),
        abscissa,
        ordinate,
        abscissa_label,
        abscissa_units,
        source: Source::Tabular,
    }))
}

fn text_field(element: &Structure, name: &str) -> Option<String> {
    element.get(name).and_then(text)
}

/// Squeezed `Y_Data`: vectors stay vectors, a real matrix becomes columns.
fn tabular_ordinate(identity: &str, value: &MatVariable) -> Result<Ordinate> {
    let MatVariable::NumericArray(n) = value else {
        return Err(Error::malformed(identity, "Y_Data is not numeric"));
    };
    let Some((real, imag)) = numeric_parts(n) else {
        return Err(Error::malformed(identity, "Y_Data is not numeric"));
    };
    let shape = squeezed_dims(n);
    match (shape.as_slice(), imag) {
        ([] | [_], None) => Ok(Ordinate::Real(real)),
        ([] | [_], Some(imag)) => Ok(Ordinate::Complex(
            real.iter()
                .zip(&imag)
                .map(|(&re, &im)| Complex64::new(re, im))
                .collect(),
        )),
        (&[rows, cols], None) => Array2::from_shape_vec((rows, cols).f(), real)
            .map(Ordinate::Columns)
            .map_err(|e| Error::malformed(identity, e.to_string())),
        ([_, _], Some(_)) => Err(Error::malformed(identity, "2-D complex Y_Data")),
        (dims, _) => Err(Error::malformed(
            identity,
            format!("Y_Data has {} dimensions", dims.len()),
        )),
    }
}

// ---------------------------------------------------------------------------
// Universal blocks → records
// ---------------------------------------------------------------------------

/// Expose the response-function blocks; other block kinds are dropped.
///
/// Identity is the block's position in the parsed sequence.
pub fn normalize_unv(blocks: Vec<UnvBlock>) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (i, block) in blocks.into_iter().enumerate() {
        match block {
            UnvBlock::Function(function) => records.push(universal_record(i, function)?),
            UnvBlock::Other { type_tag, .. } => {
                log::debug!("Dataset {i} has type {type_tag}, not exposed");
            }
        }
    }
    Ok(records)
}

fn universal_record(index: usize, function: ResponseFunction) -> Result<Record> {
    let ResponseFunction { header, x, data } = function;
    let identity = index.to_string();
    let name = header
        .pair_name()
        .unwrap_or_else(|| format!("Record {}", index + 1));

    let ordinate = Ordinate::Columns(data);
    check_lengths(&identity, &x, &ordinate)?;

    let abscissa_label = header.display_xlabel().to_string();
    let abscissa_units = header.xunits_description().to_string();

    Ok(Record {
        identity,
        name,
        group: Some(UNIVERSAL_GROUP.to_string()),
        abscissa: x,
        ordinate,
        abscissa_label,
        abscissa_units,
        source: Source::Universal {
            type_tag: RESPONSE_FUNCTION_TYPE,
            header: Box::new(header),
        },
    })
}

fn check_lengths(identity: &str, abscissa: &[f64], ordinate: &Ordinate) -> Result<()> {
    if abscissa.len() != ordinate.len() {
        return Err(Error::malformed(
            identity,
            format!(
                "abscissa has {} values but ordinate has {}",
                abscissa.len(),
                ordinate.len()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use matrw::{matfile, matvar};

    use super::*;
    use crate::data::mat::fixtures::bytes;
    use crate::data::mat::read_mat;
    use crate::data::model::SourceFormat;
    use crate::data::unv::FunctionHeader;

    fn decode(mat: MatFile, compress: bool) -> MatFile {
        read_mat(&bytes(mat, compress)).unwrap()
    }

    #[test]
    fn test_struct_array_becomes_group() {
        let frf = matvar!([
            { Name: "H11", X_Data: [1.0, 2.0], Y_Data: [(1.0, 0.0), (0.0, 1.0)] },
            { Name: "H12", X_Data: [1.0, 2.0], Y_Data: [0.1, 0.2] },
        ]);
        let records = normalize_mat(&decode(matfile!(FRF: frf), false)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identity, "FRF_0");
        assert_eq!(records[0].group.as_deref(), Some("FRF"));
        assert_eq!(records[0].name, "H11");
        assert_eq!(records[0].abscissa_caption(), "Freq (Hz)");
        assert_eq!(records[0].source_format(), SourceFormat::Tabular);
        assert!(matches!(records[0].ordinate, Ordinate::Complex(_)));
        assert_eq!(records[1].ordinate, Ordinate::Real(vec![0.1, 0.2]));
    }

    #[test]
    fn test_singleton_struct_uses_variable_name() {
        let coh = matvar!({
            Name: "Coherence",
            X_Data: [10.0, 20.0, 30.0],
            Y_Data: [0.9, 0.95, 1.0],
            X_Label: "Frequency",
            X_Units: "rad/s",
        });
        let mat = decode(matfile!(coh: coh, meta: matvar!("run 7")), true);
        let records = normalize_mat(&mat).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identity, "coh");
        assert_eq!(records[0].group, None);
        assert_eq!(records[0].ordinate, Ordinate::Real(vec![0.9, 0.95, 1.0]));
        assert_eq!(records[0].abscissa_caption(), "Frequency (rad/s)");
    }

    #[test]
    fn test_cell_of_structs_and_non_record_entries() {
        let runs = matvar!([
            { Name: "A", X_Data: [1.0], Y_Data: [2.0] },
            { Comment: "not data" },
            [1.0, 2.0],
        ]);
        let records = normalize_mat(&decode(matfile!(runs: runs), false)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identity, "runs_0");
        assert_eq!(records[0].group.as_deref(), Some("runs"));
        assert_eq!(records[0].ordinate, Ordinate::Real(vec![2.0]));
    }

    #[test]
    fn test_length_mismatch_is_malformed() {
        let bad = matvar!({ Name: "bad", X_Data: [1.0, 2.0, 3.0], Y_Data: [1.0, 2.0] });
        let err = normalize_mat(&decode(matfile!(bad: bad), false)).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { ref identity, .. } if identity == "bad"));
    }

    #[test]
    fn test_complex_abscissa_is_malformed() {
        let bad = matvar!({ Name: "c", X_Data: [(1.0, 1.0)], Y_Data: [1.0] });
        let err = normalize_mat(&decode(matfile!(c: bad), false)).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { .. }));
    }

    #[test]
    fn test_matrix_y_data_becomes_columns() {
        let m = matvar!({
            Name: 5.0,
            X_Data: [1.0, 2.0],
            Y_Data: [[1.0, 10.0], [2.0, 20.0]],
        });
        let records = normalize_mat(&decode(matfile!(m: m), false)).unwrap();
        // A non-text Name falls back to a positional label.
        assert_eq!(records[0].name, "Record m");
        assert_eq!(records[0].ordinate.rows(), vec![vec![1.0, 10.0], vec![2.0, 20.0]]);
    }

    #[test]
    fn test_unv_keeps_only_response_functions() {
        let header = FunctionHeader::response(12, 3, 1, 3);
        let function = ResponseFunction {
            header,
            x: vec![1.0, 2.0],
            data: Array2::from_shape_vec((2, 2), vec![3.0, 4.0, 0.0, 5.0]).unwrap(),
        };
        let blocks = vec![
            UnvBlock::Other { type_tag: 164, lines: vec![] },
            UnvBlock::Function(function.clone()),
            UnvBlock::Function(ResponseFunction {
                header: FunctionHeader::default(),
                ..function
            }),
        ];
        let records = normalize_unv(blocks).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identity, "1");
        assert_eq!(records[0].name, "Resp:12:3/Ref:1:3");
        assert_eq!(records[0].group.as_deref(), Some(UNIVERSAL_GROUP));
        assert_eq!(records[0].type_tag(), Some(RESPONSE_FUNCTION_TYPE));
        assert_eq!(records[0].abscissa_caption(), "Frequency (Hz)");
        assert_eq!(records[1].identity, "2");
        assert_eq!(records[1].name, "Record 3");
    }
}
