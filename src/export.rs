//! Save path: rewrite a packed complex FRF as a real amplitude record and
//! write it as a universal file.

use std::borrow::Cow;
use std::path::Path;

use ndarray::Array2;
use serde::Serialize;

use crate::data::model::{Ordinate, Record, Source, SourceFormat, RESPONSE_FUNCTION_TYPE};
use crate::data::unv;
use crate::error::{Error, Result};
use crate::frf::{classify, complex_samples, Classification, ComplexLayout};

/// Ordinate axis label of an exported amplitude record.
pub const AMPLITUDE_LABEL: &str = "AMPLITUDE";

/// Declared values per point of an exported record (magnitude, zero).
pub const EXPORT_VALUES_PER_POINT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportOutcome {
    /// Packed complex FRF written as linear magnitude.
    Transformed,
    /// Not a packed complex FRF; written as loaded.
    PassthroughUnchanged,
}

/// Build the record that gets written for `record`.
///
/// A universal response function with packed real/imaginary columns becomes
/// a copy whose ordinate is `[magnitude, 0]` per point and whose header
/// declares real data. Any other universal record is returned as-is. The
/// input is never modified.
///
/// The declared data type keeps the source precision: complex double
/// becomes real double (code 4) and complex single becomes real single
/// (code 2). Exporters that always declare code 2 write double sources
/// with E13.5 values; here they keep E20.12.
pub fn prepare_export(record: &Record) -> Result<(Cow<'_, Record>, ExportOutcome)> {
    if record.source_format() == SourceFormat::Tabular {
        return Err(Error::UnsupportedExport(format!(
            "record {} (saving from MAT files is not supported)",
            record.identity
        )));
    }

    let packed = classify(record)? == Classification::Complex(ComplexLayout::PackedColumns);
    if !packed || record.type_tag() != Some(RESPONSE_FUNCTION_TYPE) {
        log::info!(
            "Record {} is not a complex FRF, exporting unchanged",
            record.identity
        );
        return Ok((Cow::Borrowed(record), ExportOutcome::PassthroughUnchanged));
    }

    let samples = complex_samples(record, ComplexLayout::PackedColumns);
    let mut data = Array2::<f64>::zeros((samples.len(), EXPORT_VALUES_PER_POINT));
    for (i, c) in samples.iter().enumerate() {
        data[[i, 0]] = c.norm();
    }

    let mut exported = record.clone();
    exported.ordinate = Ordinate::Columns(data);
    if let Source::Universal { header, .. } = &mut exported.source {
        header.data_type = header.data_type.to_real();
        header.z_axis.spec_data_type = 0;
        header.num_values_per_point = EXPORT_VALUES_PER_POINT;
        header.ordinate_axis.label = AMPLITUDE_LABEL.to_string();
    }
    Ok((Cow::Owned(exported), ExportOutcome::Transformed))
}

/// Transform (when applicable) and write `record` to `destination`.
pub fn export_record(record: &Record, destination: &Path) -> Result<ExportOutcome> {
    let (prepared, outcome) = prepare_export(record)?;
    unv::write_record(&prepared, destination)?;
    match outcome {
        ExportOutcome::Transformed => log::info!(
            "Saved transformed record {} to {}",
            record.identity,
            destination.display()
        ),
        ExportOutcome::PassthroughUnchanged => log::info!(
            "Record {} was not a complex FRF; saved original data to {}",
            record.identity,
            destination.display()
        ),
    }
    Ok(outcome)
}

/// Suggested file name for an export, e.g. `Linear_Resp_1_3-Ref_1_3.unv`.
pub fn default_export_file_name(record_name: &str) -> String {
    let cleaned = record_name.replace(':', "_").replace('/', "-");
    format!("Linear_{}.unv", cleaned.trim())
}
