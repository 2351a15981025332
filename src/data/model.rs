use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array2, Axis};
use num_complex::Complex64;

use super::unv::FunctionHeader;

/// Block type tag of a universal-file response function.
pub const RESPONSE_FUNCTION_TYPE: u32 = 58;

// ---------------------------------------------------------------------------
// SourceFormat / Source – where a record came from
// ---------------------------------------------------------------------------

/// The two supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// MAT container (`.mat`).
    Tabular,
    /// Universal text file (`.unv` / `.uff`).
    Universal,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Tabular => write!(f, "mat"),
            SourceFormat::Universal => write!(f, "unv"),
        }
    }
}

/// Format-specific provenance of a record.
///
/// Universal records keep every non-sample field of their block so that an
/// export can copy them unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Tabular,
    Universal {
        type_tag: u32,
        header: Box<FunctionHeader>,
    },
}

impl Source {
    pub fn format(&self) -> SourceFormat {
        match self {
            Source::Tabular => SourceFormat::Tabular,
            Source::Universal { .. } => SourceFormat::Universal,
        }
    }

    pub fn type_tag(&self) -> Option<u32> {
        match self {
            Source::Tabular => None,
            Source::Universal { type_tag, .. } => Some(*type_tag),
        }
    }
}

// ---------------------------------------------------------------------------
// Ordinate – raw dependent-axis samples before classification
// ---------------------------------------------------------------------------

/// Raw ordinate samples, one element per abscissa point.
#[derive(Debug, Clone, PartialEq)]
pub enum Ordinate {
    /// One real value per point.
    Real(Vec<f64>),
    /// One complex value per point.
    Complex(Vec<Complex64>),
    /// `points × columns` real matrix (packed real/imaginary, or real/zero).
    Columns(Array2<f64>),
}

impl Ordinate {
    /// Number of points (rows).
    pub fn len(&self) -> usize {
        match self {
            Ordinate::Real(v) => v.len(),
            Ordinate::Complex(v) => v.len(),
            Ordinate::Columns(a) => a.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values per point.
    pub fn columns(&self) -> usize {
        match self {
            Ordinate::Real(_) | Ordinate::Complex(_) => 1,
            Ordinate::Columns(a) => a.ncols(),
        }
    }

    /// The first real column, or `None` for complex data.
    pub fn first_column(&self) -> Option<Vec<f64>> {
        match self {
            Ordinate::Real(v) => Some(v.clone()),
            Ordinate::Complex(_) => None,
            Ordinate::Columns(a) if a.ncols() > 0 => Some(a.column(0).to_vec()),
            Ordinate::Columns(_) => None,
        }
    }

    /// Row-major rows, one `Vec` per point.
    pub fn rows(&self) -> Vec<Vec<f64>> {
        match self {
            Ordinate::Real(v) => v.iter().map(|&y| vec![y]).collect(),
            Ordinate::Complex(v) => v.iter().map(|c| vec![c.re, c.im]).collect(),
            Ordinate::Columns(a) => a.axis_iter(Axis(0)).map(|row| row.to_vec()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Record – the unified logical entity
// ---------------------------------------------------------------------------

/// One measurement record, regardless of the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Stable lookup key within its [`RecordIndex`].
    pub identity: String,
    /// Human-readable name shown when browsing.
    pub name: String,
    /// Browse group (container variable or block kind); `None` for top-level entries.
    pub group: Option<String>,
    /// Independent axis (typically frequency), same length as `ordinate`.
    pub abscissa: Vec<f64>,
    pub ordinate: Ordinate,
    pub abscissa_label: String,
    pub abscissa_units: String,
    pub source: Source,
}

impl Record {
    pub fn source_format(&self) -> SourceFormat {
        self.source.format()
    }

    pub fn type_tag(&self) -> Option<u32> {
        self.source.type_tag()
    }

    /// Universal-file header, if any.
    pub fn header(&self) -> Option<&FunctionHeader> {
        match &self.source {
            Source::Universal { header, .. } => Some(header.as_ref()),
            Source::Tabular => None,
        }
    }

    /// Axis caption, e.g. `"Freq (Hz)"`.
    pub fn abscissa_caption(&self) -> String {
        format!("{} ({})", self.abscissa_label, self.abscissa_units)
    }
}

// ---------------------------------------------------------------------------
// RecordIndex – identity → Record lookup for one loaded file
// ---------------------------------------------------------------------------

/// All selectable records of one loaded file, in load order.
#[derive(Debug, Clone)]
pub struct RecordIndex {
    pub source_format: SourceFormat,
    /// File name the records were loaded from.
    pub file_name: String,
    records: Vec<Record>,
    by_identity: BTreeMap<String, usize>,
}

impl RecordIndex {
    /// Build the lookup. Later duplicates of an identity are dropped.
    pub fn new(source_format: SourceFormat, file_name: impl Into<String>, records: Vec<Record>) -> Self {
        let mut kept = Vec::with_capacity(records.len());
        let mut by_identity = BTreeMap::new();
        for record in records {
            if by_identity.contains_key(&record.identity) {
                log::warn!("Duplicate record identity {}, keeping the first", record.identity);
                continue;
            }
            by_identity.insert(record.identity.clone(), kept.len());
            kept.push(record);
        }
        RecordIndex {
            source_format,
            file_name: file_name.into(),
            records: kept,
            by_identity,
        }
    }

    pub fn get(&self, identity: &str) -> Option<&Record> {
        self.by_identity.get(identity).map(|&i| &self.records[i])
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.by_identity.contains_key(identity)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records grouped for browsing, groups in order of first appearance.
    pub fn groups(&self) -> Vec<(Option<&str>, Vec<&Record>)> {
        let mut groups: Vec<(Option<&str>, Vec<&Record>)> = Vec::new();
        for record in &self.records {
            let key = record.group.as_deref();
            match groups.iter_mut().find(|(g, _)| *g == key) {
                Some((_, members)) => members.push(record),
                None => groups.push((key, vec![record])),
            }
        }
        groups
    }
}
