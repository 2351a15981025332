//! Frequency-response classification and magnitude/phase derivation.
//!
//! A record's ordinate is complex when it holds complex samples, or when a
//! universal record packs real and imaginary parts into its first two
//! columns. Complex ordinates become magnitude + phase (degrees, principal
//! value, never unwrapped); everything else passes through as a value series.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::data::model::{Ordinate, Record, SourceFormat};
use crate::error::{Error, Result};

/// Fixed magnitude-axis bounds used on a logarithmic scale.
pub const LOG_SCALE_MIN: f64 = 1e-3;
pub const LOG_SCALE_MAX: f64 = 1e2;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// How complex samples are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexLayout {
    /// Complex element type.
    Native,
    /// Universal data: column 0 real part, column 1 imaginary part.
    PackedColumns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Complex(ComplexLayout),
    Real,
}

/// Decide whether a record's ordinate is complex.
///
/// Fails with `MalformedRecord` when abscissa and ordinate lengths differ or
/// the ordinate has no columns.
pub fn classify(record: &Record) -> Result<Classification> {
    validate(record)?;
    let class = match &record.ordinate {
        Ordinate::Complex(_) => Classification::Complex(ComplexLayout::Native),
        Ordinate::Columns(a)
            if record.source_format() == SourceFormat::Universal && a.ncols() >= 2 =>
        {
            Classification::Complex(ComplexLayout::PackedColumns)
        }
        _ => Classification::Real,
    };
    Ok(class)
}

fn validate(record: &Record) -> Result<()> {
    if record.abscissa.len() != record.ordinate.len() {
        return Err(Error::malformed(
            &record.identity,
            format!(
                "abscissa has {} values but ordinate has {}",
                record.abscissa.len(),
                record.ordinate.len()
            ),
        ));
    }
    if record.ordinate.columns() == 0 {
        return Err(Error::malformed(&record.identity, "ordinate has 0 columns"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Derived series
// ---------------------------------------------------------------------------

/// Series derived from one record; recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifiedSeries {
    Frf {
        magnitude: Vec<f64>,
        phase_degrees: Vec<f64>,
    },
    Real {
        value: Vec<f64>,
    },
}

/// Complex samples of a record classified as complex.
pub fn complex_samples(record: &Record, layout: ComplexLayout) -> Vec<Complex64> {
    match (&record.ordinate, layout) {
        (Ordinate::Complex(v), _) => v.clone(),
        (Ordinate::Columns(a), ComplexLayout::PackedColumns) => a
            .rows()
            .into_iter()
            .map(|row| Complex64::new(row[0], row[1]))
            .collect(),
        (Ordinate::Columns(a), ComplexLayout::Native) => {
            a.column(0).iter().map(|&re| Complex64::new(re, 0.0)).collect()
        }
        (Ordinate::Real(v), _) => v.iter().map(|&re| Complex64::new(re, 0.0)).collect(),
    }
}

/// Phase in degrees within (-180, 180].
pub fn phase_degrees(value: Complex64) -> f64 {
    let deg = value.arg().to_degrees();
    // atan2 only reaches -pi for a negative real part with imaginary -0.0.
    if deg <= -180.0 {
        180.0
    } else {
        deg
    }
}

/// Classify a record and derive its display series.
pub fn transform(record: &Record) -> Result<ClassifiedSeries> {
    match classify(record)? {
        Classification::Complex(layout) => {
            let samples = complex_samples(record, layout);
            Ok(ClassifiedSeries::Frf {
                magnitude: samples.iter().map(|c| c.norm()).collect(),
                phase_degrees: samples.iter().map(|&c| phase_degrees(c)).collect(),
            })
        }
        Classification::Real => {
            if record.ordinate.columns() > 1 {
                log::warn!(
                    "Record {} has {} real columns, showing column 0",
                    record.identity,
                    record.ordinate.columns()
                );
            }
            let value = record.ordinate.first_column().ok_or_else(|| {
                Error::malformed(&record.identity, "real ordinate has no first column")
            })?;
            Ok(ClassifiedSeries::Real { value })
        }
    }
}

// ---------------------------------------------------------------------------
// Display hook
// ---------------------------------------------------------------------------

/// Presentation options; they never change series values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    /// Plot FRF magnitude on a log axis.
    pub log_scale: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self { log_scale: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AxisScale {
    Linear,
    Log { min: f64, max: f64 },
}

impl DisplayOptions {
    /// Vertical scale for a series' main (magnitude or value) axis.
    pub fn value_scale(&self, series: &ClassifiedSeries) -> AxisScale {
        match series {
            ClassifiedSeries::Frf { .. } if self.log_scale => AxisScale::Log {
                min: LOG_SCALE_MIN,
                max: LOG_SCALE_MAX,
            },
            _ => AxisScale::Linear,
        }
    }
}

/// Everything a plot of one record needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPlot {
    pub title: String,
    pub x_label: String,
    pub x: Vec<f64>,
    pub series: ClassifiedSeries,
    pub value_scale: AxisScale,
}

/// Classified series plus presentation hints for `record`.
pub fn classified_series(record: &Record, options: &DisplayOptions) -> Result<SeriesPlot> {
    let series = transform(record)?;
    Ok(SeriesPlot {
        title: record.name.clone(),
        x_label: record.abscissa_caption(),
        x: record.abscissa.clone(),
        value_scale: options.value_scale(&series),
        series,
    })
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;
    use crate::data::model::Source;
    use crate::data::unv::FunctionHeader;

    fn record(abscissa: Vec<f64>, ordinate: Ordinate, source: Source) -> Record {
        Record {
            identity: "r".to_string(),
            name: "Resp:1:3/Ref:1:3".to_string(),
            group: None,
            abscissa,
            ordinate,
            abscissa_label: "Freq".to_string(),
            abscissa_units: "Hz".to_string(),
            source,
        }
    }

    fn universal() -> Source {
        Source::Universal {
            type_tag: 58,
            header: Box::new(FunctionHeader::response(1, 3, 1, 3)),
        }
    }

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_native_complex_scenario() {
        let ord = Ordinate::Complex(vec![
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 1.0),
            Complex64::new(-1.0, 0.0),
        ]);
        let r = record(vec![1.0, 2.0, 3.0], ord, Source::Tabular);
        assert_eq!(classify(&r).unwrap(), Classification::Complex(ComplexLayout::Native));
        let ClassifiedSeries::Frf {
            magnitude,
            phase_degrees,
        } = transform(&r).unwrap()
        else {
            panic!("expected FRF");
        };
        assert!(close(&magnitude, &[1.0, 1.0, 1.0]));
        assert!(close(&phase_degrees, &[0.0, 90.0, 180.0]));
    }

    #[test]
    fn test_packed_columns() {
        let cols = Array2::from_shape_vec((2, 2), vec![3.0, 4.0, 0.0, 5.0]).unwrap();
        let r = record(vec![1.0, 2.0], Ordinate::Columns(cols), universal());
        assert_eq!(
            classify(&r).unwrap(),
            Classification::Complex(ComplexLayout::PackedColumns)
        );
        let ClassifiedSeries::Frf {
            magnitude,
            phase_degrees,
        } = transform(&r).unwrap()
        else {
            panic!("expected FRF");
        };
        assert!(close(&magnitude, &[5.0, 5.0]));
        assert!((phase_degrees[0] - 53.130102354).abs() < 1e-6);
        assert!((phase_degrees[1] - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_columns_outside_universal_are_real() {
        let cols = Array2::from_shape_vec((2, 2), vec![3.0, 4.0, 0.0, 5.0]).unwrap();
        let r = record(vec![1.0, 2.0], Ordinate::Columns(cols), Source::Tabular);
        assert_eq!(classify(&r).unwrap(), Classification::Real);
        assert_eq!(
            transform(&r).unwrap(),
            ClassifiedSeries::Real {
                value: vec![3.0, 0.0]
            }
        );
    }

    #[test]
    fn test_single_column_universal_is_real() {
        let cols = Array2::from_shape_vec((3, 1), vec![0.1, 0.5, 0.9]).unwrap();
        let r = record(vec![1.0, 2.0, 3.0], Ordinate::Columns(cols), universal());
        assert_eq!(
            transform(&r).unwrap(),
            ClassifiedSeries::Real {
                value: vec![0.1, 0.5, 0.9]
            }
        );
    }

    #[test]
    fn test_phase_is_not_unwrapped() {
        let r = record(
            vec![1.0, 2.0],
            Ordinate::Complex(vec![Complex64::new(-1.0, 0.01), Complex64::new(-1.0, -0.01)]),
            Source::Tabular,
        );
        let ClassifiedSeries::Frf { phase_degrees, .. } = transform(&r).unwrap() else {
            panic!("expected FRF");
        };
        assert!(phase_degrees[0] > 179.0);
        assert!(phase_degrees[1] < -179.0);
    }

    #[test]
    fn test_minus_180_maps_to_180() {
        assert_eq!(phase_degrees(Complex64::new(-1.0, -0.0)), 180.0);
    }

    #[test]
    fn test_length_mismatch_is_malformed() {
        let r = record(vec![1.0, 2.0, 3.0], Ordinate::Real(vec![1.0, 2.0]), Source::Tabular);
        assert!(matches!(classify(&r), Err(Error::MalformedRecord { .. })));
        assert!(matches!(transform(&r), Err(Error::MalformedRecord { .. })));
    }

    #[test]
    fn test_zero_columns_is_malformed() {
        let r = record(vec![1.0, 2.0], Ordinate::Columns(Array2::zeros((2, 0))), universal());
        assert!(matches!(classify(&r), Err(Error::MalformedRecord { .. })));
    }

    #[test]
    fn test_log_scale_does_not_touch_values() {
        let r = record(
            vec![1.0],
            Ordinate::Complex(vec![Complex64::new(1e-6, 0.0)]),
            Source::Tabular,
        );
        let log = classified_series(&r, &DisplayOptions { log_scale: true }).unwrap();
        let linear = classified_series(&r, &DisplayOptions { log_scale: false }).unwrap();
        assert_eq!(log.series, linear.series);
        assert_eq!(
            log.value_scale,
            AxisScale::Log {
                min: LOG_SCALE_MIN,
                max: LOG_SCALE_MAX
            }
        );
        assert_eq!(linear.value_scale, AxisScale::Linear);
        assert_eq!(log.x_label, "Freq (Hz)");
    }

    #[test]
    fn test_real_series_always_linear() {
        let r = record(vec![1.0], Ordinate::Real(vec![0.5]), Source::Tabular);
        let plot = classified_series(&r, &DisplayOptions::default()).unwrap();
        assert_eq!(plot.value_scale, AxisScale::Linear);
    }

    #[test]
    fn test_display_options_from_json() {
        let opts: DisplayOptions = serde_json::from_str("{}").unwrap();
        assert!(opts.log_scale);
        let opts: DisplayOptions = serde_json::from_str(r#"{"log_scale": false}"#).unwrap();
        assert!(!opts.log_scale);
    }
}
