//! Universal file (UFF/UNV) text format.
//!
//! A file is a sequence of blocks, each opened and closed by a line reading
//! `-1`; the first line inside a block is its integer type tag. Only
//! response-function blocks (type 58) are decoded. Every other block is kept
//! as opaque lines.
//!
//! Type 58 layout (ASCII variant):
//!
//! | Record | Content                                                         |
//! |--------|-----------------------------------------------------------------|
//! | 1-5    | free-text identification lines                                  |
//! | 6      | function type/id, version, load case, response and reference   |
//! |        | entity/node/direction (`2(I5,I10),2(1X,10A1,I10,I4)`)           |
//! | 7      | ordinate data type, points, spacing, min, increment, z value   |
//! |        | (`3I10,3E13.5`)                                                 |
//! | 8-11   | axis characteristics for abscissa, ordinate, denominator and z |
//! |        | (`I10,3I5,2(1X,20A1)`)                                          |
//! | 12     | data values                                                     |

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use ndarray::{Array2, Axis};

use super::model::{Ordinate, Record, Source, RESPONSE_FUNCTION_TYPE};
use crate::error::{Error, FormatError, Result};

const DELIMITER: &str = "-1";
const HEADER_RECORDS: usize = 11;

/// Abscissa caption shown for a blank record 8 label.
pub const DEFAULT_XLABEL: &str = "Abscissa";

// ---------------------------------------------------------------------------
// Header field types
// ---------------------------------------------------------------------------

/// Record 7 ordinate data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdinateDataType {
    RealSingle,
    RealDouble,
    ComplexSingle,
    ComplexDouble,
}

impl OrdinateDataType {
    pub fn code(self) -> i64 {
        match self {
            OrdinateDataType::RealSingle => 2,
            OrdinateDataType::RealDouble => 4,
            OrdinateDataType::ComplexSingle => 5,
            OrdinateDataType::ComplexDouble => 6,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            2 => Some(OrdinateDataType::RealSingle),
            4 => Some(OrdinateDataType::RealDouble),
            5 => Some(OrdinateDataType::ComplexSingle),
            6 => Some(OrdinateDataType::ComplexDouble),
            _ => None,
        }
    }

    pub fn is_complex(self) -> bool {
        matches!(
            self,
            OrdinateDataType::ComplexSingle | OrdinateDataType::ComplexDouble
        )
    }

    pub fn is_double(self) -> bool {
        matches!(
            self,
            OrdinateDataType::RealDouble | OrdinateDataType::ComplexDouble
        )
    }

    /// The real type of the same precision.
    pub fn to_real(self) -> Self {
        if self.is_double() {
            OrdinateDataType::RealDouble
        } else {
            OrdinateDataType::RealSingle
        }
    }

    fn number_format(self) -> NumberFormat {
        if self.is_double() {
            NumberFormat::DOUBLE
        } else {
            NumberFormat::SINGLE
        }
    }
}

/// Record 7 abscissa spacing flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbscissaSpacing {
    Uneven,
    Even,
}

impl AbscissaSpacing {
    fn code(self) -> i64 {
        match self {
            AbscissaSpacing::Uneven => 0,
            AbscissaSpacing::Even => 1,
        }
    }
}

/// Records 8-11: one axis' data characteristics.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AxisSpec {
    pub spec_data_type: i64,
    pub len_unit_exp: i64,
    pub force_unit_exp: i64,
    pub temp_unit_exp: i64,
    pub label: String,
    pub units: String,
}

impl AxisSpec {
    pub fn labelled(label: &str, units: &str) -> Self {
        AxisSpec {
            label: label.to_string(),
            units: units.to_string(),
            ..AxisSpec::default()
        }
    }
}

/// Every non-sample field of a type 58 block.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionHeader {
    pub id_lines: [String; 5],
    pub func_type: i64,
    pub func_id: i64,
    pub ver_num: i64,
    pub load_case_id: i64,
    pub rsp_ent_name: String,
    pub rsp_node: Option<i64>,
    pub rsp_dir: Option<i64>,
    pub ref_ent_name: String,
    pub ref_node: Option<i64>,
    pub ref_dir: Option<i64>,
    pub data_type: OrdinateDataType,
    pub abscissa_spacing: AbscissaSpacing,
    pub abscissa_min: f64,
    pub abscissa_inc: f64,
    pub z_axis_value: f64,
    pub abscissa_axis: AxisSpec,
    pub ordinate_axis: AxisSpec,
    pub denominator_axis: AxisSpec,
    pub z_axis: AxisSpec,
    /// Ordinate values stored per abscissa point.
    pub num_values_per_point: usize,
}

impl Default for FunctionHeader {
    fn default() -> Self {
        FunctionHeader {
            id_lines: std::array::from_fn(|_| "NONE".to_string()),
            func_type: 4,
            func_id: 1,
            ver_num: 1,
            load_case_id: 0,
            rsp_ent_name: "NONE".to_string(),
            rsp_node: None,
            rsp_dir: None,
            ref_ent_name: "NONE".to_string(),
            ref_node: None,
            ref_dir: None,
            data_type: OrdinateDataType::RealDouble,
            abscissa_spacing: AbscissaSpacing::Even,
            abscissa_min: 0.0,
            abscissa_inc: 0.0,
            z_axis_value: 0.0,
            abscissa_axis: AxisSpec {
                spec_data_type: 18,
                ..AxisSpec::labelled("Frequency", "Hz")
            },
            ordinate_axis: AxisSpec::default(),
            denominator_axis: AxisSpec::default(),
            z_axis: AxisSpec::default(),
            num_values_per_point: 1,
        }
    }
}

impl FunctionHeader {
    /// Header for a response/reference pair.
    pub fn response(rsp_node: i64, rsp_dir: i64, ref_node: i64, ref_dir: i64) -> Self {
        FunctionHeader {
            rsp_node: Some(rsp_node),
            rsp_dir: Some(rsp_dir),
            ref_node: Some(ref_node),
            ref_dir: Some(ref_dir),
            ..FunctionHeader::default()
        }
    }

    pub fn xlabel(&self) -> &str {
        &self.abscissa_axis.label
    }

    /// `xlabel`, or [`DEFAULT_XLABEL`] when it is blank.
    pub fn display_xlabel(&self) -> &str {
        match self.xlabel() {
            "" => DEFAULT_XLABEL,
            label => label,
        }
    }

    pub fn xunits_description(&self) -> &str {
        &self.abscissa_axis.units
    }

    pub fn ylabel(&self) -> &str {
        &self.ordinate_axis.label
    }

    /// Complex-definition flag, carried as the z-axis specific data type.
    pub fn z_def_type(&self) -> i64 {
        self.z_axis.spec_data_type
    }

    /// `"Resp:{node}:{dir}/Ref:{node}:{dir}"`, if all four fields are present.
    pub fn pair_name(&self) -> Option<String> {
        Some(format!(
            "Resp:{}:{}/Ref:{}:{}",
            self.rsp_node?, self.rsp_dir?, self.ref_node?, self.ref_dir?
        ))
    }
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// A decoded type 58 block.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFunction {
    pub header: FunctionHeader,
    /// Abscissa values.
    pub x: Vec<f64>,
    /// `points × num_values_per_point` ordinate values.
    pub data: Array2<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnvBlock {
    Function(ResponseFunction),
    /// Any block type without a grammar here; lines after the tag, verbatim.
    Other { type_tag: u32, lines: Vec<String> },
}

impl UnvBlock {
    pub fn type_tag(&self) -> u32 {
        match self {
            UnvBlock::Function(_) => RESPONSE_FUNCTION_TYPE,
            UnvBlock::Other { type_tag, .. } => *type_tag,
        }
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Split universal-file text into blocks and decode the type 58 ones.
pub fn parse_blocks(content: &str) -> std::result::Result<Vec<UnvBlock>, FormatError> {
    let lines: Vec<&str> = content.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let trimmed = lines[i].trim();
        if trimmed != DELIMITER {
            if !trimmed.is_empty() {
                log::warn!("Ignoring text outside a dataset at line {}", i + 1);
            }
            i += 1;
            continue;
        }

        let open = i;
        let body_start = i + 1;
        i = body_start;
        while i < lines.len() && lines[i].trim() != DELIMITER {
            i += 1;
        }
        if i == lines.len() {
            if body_start == lines.len() {
                log::debug!("Ignoring trailing delimiter at line {}", open + 1);
                break;
            }
            return Err(FormatError::syntax(open + 1, "dataset is not closed by -1"));
        }

        let body = &lines[body_start..i];
        i += 1;
        if body.is_empty() {
            log::debug!("Skipping empty dataset at line {}", open + 1);
            continue;
        }
        blocks.push(parse_block(body, body_start + 1)?);
    }

    Ok(blocks)
}

fn parse_block(body: &[&str], first_line: usize) -> std::result::Result<UnvBlock, FormatError> {
    let tag = body[0].split_whitespace().next().unwrap_or("");
    let type_tag: u32 = match tag.parse() {
        Ok(t) => t,
        Err(_) => {
            if tag.ends_with('b') && tag[..tag.len() - 1].parse::<u32>().is_ok() {
                return Err(FormatError::UnsupportedVersion {
                    format: "universal dataset".to_string(),
                    version: format!("{tag} (binary)"),
                });
            }
            return Err(FormatError::syntax(
                first_line,
                format!("invalid dataset type '{tag}'"),
            ));
        }
    };

    if type_tag == RESPONSE_FUNCTION_TYPE {
        parse_function(&body[1..], first_line + 1).map(UnvBlock::Function)
    } else {
        log::debug!("Keeping dataset type {type_tag} at line {first_line} as opaque lines");
        Ok(UnvBlock::Other {
            type_tag,
            lines: body[1..].iter().map(|l| l.to_string()).collect(),
        })
    }
}

fn parse_function(lines: &[&str], first_line: usize) -> std::result::Result<ResponseFunction, FormatError> {
    if lines.len() < HEADER_RECORDS {
        return Err(FormatError::syntax(
            first_line,
            format!(
                "response function needs {HEADER_RECORDS} header records, found {}",
                lines.len()
            ),
        ));
    }

    let id_lines: [String; 5] = std::array::from_fn(|k| lines[k].trim_end().to_string());

    let rec6 = lines[5];
    let rec6_line = first_line + 5;
    let rec7 = lines[6];
    let rec7_line = first_line + 6;

    let code = required_int(column(rec7, 0, 10), "ordinate data type", rec7_line)?;
    let data_type = OrdinateDataType::from_code(code).ok_or_else(|| {
        FormatError::invalid_value("ordinate data type", format!("unknown code {code}"))
    })?;
    let num_pts = required_int(column(rec7, 10, 20), "number of points", rec7_line)?;
    let num_pts = usize::try_from(num_pts).map_err(|_| {
        FormatError::invalid_value("number of points", format!("{num_pts} is negative"))
    })?;
    let abscissa_spacing = match optional_int(column(rec7, 20, 30)).unwrap_or(0) {
        1 => AbscissaSpacing::Even,
        _ => AbscissaSpacing::Uneven,
    };
    let abscissa_min = optional_float(column(rec7, 30, 43), "abscissa minimum", rec7_line)?;
    let abscissa_inc = optional_float(column(rec7, 43, 56), "abscissa increment", rec7_line)?;
    let z_axis_value = optional_float(column(rec7, 56, 69), "z-axis value", rec7_line)?;

    // Data values (record 12 onwards).
    let mut values = Vec::new();
    for (k, line) in lines[HEADER_RECORDS..].iter().enumerate() {
        let line_no = first_line + HEADER_RECORDS + k;
        for token in line.split_whitespace() {
            values.push(parse_fortran_f64(token).ok_or_else(|| {
                FormatError::syntax(line_no, format!("'{token}' is not a number"))
            })?);
        }
    }

    let x_columns = match abscissa_spacing {
        AbscissaSpacing::Even => 0,
        AbscissaSpacing::Uneven => 1,
    };
    let num_values_per_point = if num_pts == 0 {
        if data_type.is_complex() {
            2
        } else {
            1
        }
    } else {
        // Each point needs at least one ordinate value; this also bounds
        // `num_pts` by the values actually read.
        if values.len() % num_pts != 0 || values.len() / num_pts <= x_columns {
            return Err(FormatError::syntax(
                first_line + HEADER_RECORDS,
                format!("{} values do not fill {num_pts} points", values.len()),
            ));
        }
        values.len() / num_pts - x_columns
    };

    let mut x = Vec::with_capacity(num_pts);
    let mut samples = Vec::with_capacity(num_pts * num_values_per_point);
    let stride = num_values_per_point + x_columns;
    for i in 0..num_pts {
        let point = &values[i * stride..(i + 1) * stride];
        match abscissa_spacing {
            AbscissaSpacing::Even => x.push(abscissa_min + i as f64 * abscissa_inc),
            AbscissaSpacing::Uneven => x.push(point[0]),
        }
        samples.extend_from_slice(&point[x_columns..]);
    }
    let data = Array2::from_shape_vec((num_pts, num_values_per_point), samples)
        .map_err(|e| FormatError::syntax(first_line + HEADER_RECORDS, e.to_string()))?;

    let header = FunctionHeader {
        id_lines,
        func_type: optional_int(column(rec6, 0, 5)).unwrap_or(0),
        func_id: optional_int(column(rec6, 5, 15)).unwrap_or(0),
        ver_num: optional_int(column(rec6, 15, 20)).unwrap_or(0),
        load_case_id: optional_int(column(rec6, 20, 30)).unwrap_or(0),
        rsp_ent_name: column(rec6, 31, 41).to_string(),
        rsp_node: optional_int(column(rec6, 41, 51)),
        rsp_dir: optional_int(column(rec6, 51, 55)),
        ref_ent_name: column(rec6, 56, 66).to_string(),
        ref_node: optional_int(column(rec6, 66, 76)),
        ref_dir: optional_int(column(rec6, 76, 80)),
        data_type,
        abscissa_spacing,
        abscissa_min,
        abscissa_inc,
        z_axis_value,
        abscissa_axis: parse_axis(lines[7]),
        ordinate_axis: parse_axis(lines[8]),
        denominator_axis: parse_axis(lines[9]),
        z_axis: parse_axis(lines[10]),
        num_values_per_point,
    };
    if header.rsp_node.is_none() {
        log::debug!("Record 6 at line {rec6_line} has no response node");
    }

    Ok(ResponseFunction { header, x, data })
}

fn parse_axis(line: &str) -> AxisSpec {
    AxisSpec {
        spec_data_type: optional_int(column(line, 0, 10)).unwrap_or(0),
        len_unit_exp: optional_int(column(line, 10, 15)).unwrap_or(0),
        force_unit_exp: optional_int(column(line, 15, 20)).unwrap_or(0),
        temp_unit_exp: optional_int(column(line, 20, 25)).unwrap_or(0),
        label: column(line, 26, 46).to_string(),
        units: column(line, 47, 67).to_string(),
    }
}

/// Trimmed fixed-width field `[start, end)`; empty when the line is short.
fn column(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).unwrap_or("").trim()
}

fn optional_int(field: &str) -> Option<i64> {
    field.parse().ok()
}

fn required_int(field: &str, name: &str, line: usize) -> std::result::Result<i64, FormatError> {
    field
        .parse()
        .map_err(|_| FormatError::syntax(line, format!("{name}: '{field}' is not an integer")))
}

fn optional_float(field: &str, name: &str, line: usize) -> std::result::Result<f64, FormatError> {
    if field.is_empty() {
        return Ok(0.0);
    }
    parse_fortran_f64(field)
        .ok_or_else(|| FormatError::syntax(line, format!("{name}: '{field}' is not a number")))
}

/// Parse a Fortran-style real, accepting `D` exponents.
fn parse_fortran_f64(token: &str) -> Option<f64> {
    if token.contains(['D', 'd']) {
        token.replace(['D', 'd'], "E").parse().ok()
    } else {
        token.parse().ok()
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct NumberFormat {
    width: usize,
    decimals: usize,
}

impl NumberFormat {
    const SINGLE: NumberFormat = NumberFormat { width: 13, decimals: 5 };
    const DOUBLE: NumberFormat = NumberFormat { width: 20, decimals: 12 };

    fn per_line(self) -> usize {
        80 / self.width
    }

    fn format(self, value: f64) -> String {
        fortran_e(value, self.width, self.decimals)
    }
}

/// `Ew.d` rendering with a signed two-digit (or wider) exponent.
fn fortran_e(value: f64, width: usize, decimals: usize) -> String {
    let body = if value.is_finite() {
        let s = format!("{value:.decimals$E}");
        match s.split_once('E') {
            Some((mantissa, exp)) => {
                let exp: i32 = exp.parse().unwrap_or(0);
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}E{sign}{:02}", exp.abs())
            }
            None => s,
        }
    } else {
        value.to_string()
    };
    if body.len() >= width {
        format!(" {body}")
    } else {
        format!("{body:>width$}")
    }
}

fn fixed_text(text: &str, width: usize) -> String {
    let clipped: String = text.chars().take(width).collect();
    format!("{clipped:<width$}")
}

fn optional_field(value: Option<i64>, width: usize) -> String {
    match value {
        Some(v) => format!("{v:>width$}"),
        None => " ".repeat(width),
    }
}

/// Write blocks in order, each framed by `-1` delimiters.
pub fn write_blocks<W: Write>(writer: &mut W, blocks: &[UnvBlock]) -> io::Result<()> {
    for block in blocks {
        match block {
            UnvBlock::Function(function) => write_function(writer, function)?,
            UnvBlock::Other { type_tag, lines } => {
                writeln!(writer, "{DELIMITER:>6}")?;
                writeln!(writer, "{type_tag:>6}")?;
                for line in lines {
                    writeln!(writer, "{line}")?;
                }
                writeln!(writer, "{DELIMITER:>6}")?;
            }
        }
    }
    Ok(())
}

fn write_function<W: Write>(w: &mut W, function: &ResponseFunction) -> io::Result<()> {
    let ResponseFunction { header: h, x, data } = function;
    if data.nrows() != x.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} abscissa values but {} ordinate rows", x.len(), data.nrows()),
        ));
    }
    if h.num_values_per_point != data.ncols() {
        log::warn!(
            "Header declares {} values per point, data has {}; writing the data",
            h.num_values_per_point,
            data.ncols()
        );
    }

    let numbers = h.data_type.number_format();
    let even = even_grid(x, h);
    let spacing = if even.is_some() {
        AbscissaSpacing::Even
    } else {
        AbscissaSpacing::Uneven
    };
    let (min, inc) = even.unwrap_or_else(|| {
        let min = x.first().copied().unwrap_or(h.abscissa_min);
        let inc = if x.len() > 1 { x[1] - x[0] } else { h.abscissa_inc };
        (min, inc)
    });

    writeln!(w, "{DELIMITER:>6}")?;
    writeln!(w, "{RESPONSE_FUNCTION_TYPE:>6}")?;
    for id in &h.id_lines {
        writeln!(w, "{}", fixed_text(id, 80).trim_end())?;
    }
    writeln!(
        w,
        "{:>5}{:>10}{:>5}{:>10} {}{}{} {}{}{}",
        h.func_type,
        h.func_id,
        h.ver_num,
        h.load_case_id,
        fixed_text(&h.rsp_ent_name, 10),
        optional_field(h.rsp_node, 10),
        optional_field(h.rsp_dir, 4),
        fixed_text(&h.ref_ent_name, 10),
        optional_field(h.ref_node, 10),
        optional_field(h.ref_dir, 4),
    )?;
    writeln!(
        w,
        "{:>10}{:>10}{:>10}{}{}{}",
        h.data_type.code(),
        x.len(),
        spacing.code(),
        NumberFormat::SINGLE.format(min),
        NumberFormat::SINGLE.format(inc),
        NumberFormat::SINGLE.format(h.z_axis_value),
    )?;
    for axis in [&h.abscissa_axis, &h.ordinate_axis, &h.denominator_axis, &h.z_axis] {
        writeln!(
            w,
            "{:>10}{:>5}{:>5}{:>5} {} {}",
            axis.spec_data_type,
            axis.len_unit_exp,
            axis.force_unit_exp,
            axis.temp_unit_exp,
            fixed_text(&axis.label, 20),
            fixed_text(&axis.units, 20),
        )?;
    }

    let mut line = String::new();
    let mut on_line = 0;
    for (i, row) in data.axis_iter(Axis(0)).enumerate() {
        let point = (spacing == AbscissaSpacing::Uneven)
            .then_some(x[i])
            .into_iter()
            .chain(row.iter().copied());
        for value in point {
            line.push_str(&numbers.format(value));
            on_line += 1;
            if on_line == numbers.per_line() {
                writeln!(w, "{line}")?;
                line.clear();
                on_line = 0;
            }
        }
    }
    if on_line > 0 {
        writeln!(w, "{line}")?;
    }
    writeln!(w, "{DELIMITER:>6}")
}

/// `(min, inc)` when the header asks for even spacing and the abscissa is
/// exactly reproduced by the `E13.5` renderings of min and increment.
fn even_grid(x: &[f64], h: &FunctionHeader) -> Option<(f64, f64)> {
    if h.abscissa_spacing != AbscissaSpacing::Even || x.is_empty() {
        return None;
    }
    let inc = if x.len() > 1 { x[1] - x[0] } else { h.abscissa_inc };
    let min = parse_fortran_f64(NumberFormat::SINGLE.format(x[0]).trim())?;
    let inc = parse_fortran_f64(NumberFormat::SINGLE.format(inc).trim())?;
    let matches = x.iter().enumerate().all(|(i, &xi)| {
        let grid = min + i as f64 * inc;
        (grid - xi).abs() <= 1e-9 * xi.abs().max(1.0)
    });
    if matches {
        Some((min, inc))
    } else {
        log::debug!("Abscissa is not an exact E13.5 grid, writing uneven spacing");
        None
    }
}

// ---------------------------------------------------------------------------
// Serializer: Record → type 58 block → file
// ---------------------------------------------------------------------------

/// Rebuild the type 58 block a universal record was read from.
pub fn record_to_function(record: &Record) -> Result<ResponseFunction> {
    let header = match &record.source {
        Source::Universal { header, .. } => header.as_ref(),
        Source::Tabular => {
            return Err(Error::UnsupportedExport(format!(
                "record {} (MAT files have no writer)",
                record.identity
            )))
        }
    };
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

    let data = match &record.ordinate {
        Ordinate::Columns(a) => a.clone(),
        Ordinate::Real(v) => Array2::from_shape_vec((v.len(), 1), v.clone())
            .map_err(|e| Error::malformed(&record.identity, e.to_string()))?,
        Ordinate::Complex(v) => {
            let flat: Vec<f64> = v.iter().flat_map(|c| [c.re, c.im]).collect();
            Array2::from_shape_vec((v.len(), 2), flat)
                .map_err(|e| Error::malformed(&record.identity, e.to_string()))?
        }
    };

    // Axis text stays as read unless the record carries a different caption.
    let mut header = header.clone();
    if record.abscissa_label != header.display_xlabel() {
        header.abscissa_axis.label = record.abscissa_label.clone();
    }
    if record.abscissa_units != header.xunits_description() {
        header.abscissa_axis.units = record.abscissa_units.clone();
    }
    header.num_values_per_point = data.ncols();

    Ok(ResponseFunction {
        header,
        x: record.abscissa.clone(),
        data,
    })
}

/// Write one record as a single-block universal file.
pub fn write_record(record: &Record, path: &Path) -> Result<()> {
    let block = UnvBlock::Function(record_to_function(record)?);
    let write_err = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    write_blocks(&mut writer, std::slice::from_ref(&block)).map_err(write_err)?;
    writer.flush().map_err(write_err)?;
    log::info!("Wrote record {} to {}", record.identity, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize::normalize_unv;

    fn sample_function() -> ResponseFunction {
        let mut header = FunctionHeader::response(101, 3, 1, -3);
        header.data_type = OrdinateDataType::ComplexDouble;
        header.num_values_per_point = 2;
        header.ordinate_axis = AxisSpec::labelled("Accel/Force", "g/N");
        ResponseFunction {
            header,
            x: vec![0.0, 0.5, 1.0],
            data: Array2::from_shape_vec((3, 2), vec![1.0, 0.0, 0.0, -2.5, 3.0, 4.0]).unwrap(),
        }
    }

    fn written(blocks: &[UnvBlock]) -> String {
        let mut buf = Vec::new();
        write_blocks(&mut buf, blocks).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_fortran_e_formatting() {
        assert_eq!(fortran_e(1234.5, 13, 5), "  1.23450E+03");
        assert_eq!(fortran_e(-0.001, 13, 5), " -1.00000E-03");
        assert_eq!(fortran_e(0.0, 13, 5), "  0.00000E+00");
        assert_eq!(fortran_e(1.0, 20, 12).len(), 20);
        assert_eq!(parse_fortran_f64("1.5D+02"), Some(150.0));
        assert_eq!(parse_fortran_f64("-2.5E-01"), Some(-0.25));
    }

    #[test]
    fn test_write_then_read_function() {
        let original = sample_function();
        let text = written(&[UnvBlock::Function(original.clone())]);
        let blocks = parse_blocks(&text).unwrap();
        assert_eq!(blocks.len(), 1);
        let UnvBlock::Function(read) = &blocks[0] else {
            panic!("expected a response function");
        };
        assert_eq!(read.header.rsp_node, Some(101));
        assert_eq!(read.header.ref_dir, Some(-3));
        assert_eq!(read.header.data_type, OrdinateDataType::ComplexDouble);
        assert_eq!(read.header.abscissa_spacing, AbscissaSpacing::Even);
        assert_eq!(read.header.num_values_per_point, 2);
        assert_eq!(read.header.ylabel(), "Accel/Force");
        assert_eq!(read.header.xunits_description(), "Hz");
        assert_eq!(read.x, original.x);
        assert_eq!(read.data, original.data);
    }

    #[test]
    fn test_uneven_abscissa_survives() {
        let mut f = sample_function();
        f.x = vec![1.0, 2.0, 4.0];
        let text = written(&[UnvBlock::Function(f.clone())]);
        let UnvBlock::Function(read) = &parse_blocks(&text).unwrap()[0] else {
            panic!("expected a response function");
        };
        assert_eq!(read.header.abscissa_spacing, AbscissaSpacing::Uneven);
        assert_eq!(read.x, f.x);
        assert_eq!(read.data, f.data);
    }

    #[test]
    fn test_other_blocks_kept_opaque() {
        let text = "    -1\n   164\n         1SI - mks (Newton)     2\n    -1\n";
        let blocks = parse_blocks(text).unwrap();
        assert_eq!(
            blocks,
            vec![UnvBlock::Other {
                type_tag: 164,
                lines: vec!["         1SI - mks (Newton)     2".to_string()],
            }]
        );
        assert_eq!(written(&blocks), "    -1\n   164\n         1SI - mks (Newton)     2\n    -1\n");
    }

    #[test]
    fn test_empty_blocks_and_trailing_delimiter_skipped() {
        let blocks = parse_blocks("    -1\n    -1\n    -1\n    15\nnode\n    -1\n    -1\n").unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].type_tag(), 15);
    }

    #[test]
    fn test_unterminated_block_is_error() {
        let err = parse_blocks("    -1\n    15\nnode\n").unwrap_err();
        assert!(matches!(err, FormatError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_binary_dataset_rejected() {
        let err = parse_blocks("    -1\n    58b     1     1\n    -1\n").unwrap_err();
        assert!(matches!(err, FormatError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_value_count_must_divide_points() {
        let mut text = written(&[UnvBlock::Function(sample_function())]);
        // Drop the closing delimiter and append a stray value.
        text.truncate(text.len() - "    -1\n".len());
        text.push_str("  1.00000E+00\n    -1\n");
        let err = parse_blocks(&text).unwrap_err();
        assert!(matches!(err, FormatError::Syntax { .. }));
    }

    #[test]
    fn test_declared_points_without_values_is_error() {
        let text = written(&[UnvBlock::Function(sample_function())]);
        // Delimiter, type tag and the 11 header records; record 7 says 2e9 points.
        let mut lines: Vec<String> = text.lines().take(2 + HEADER_RECORDS).map(str::to_string).collect();
        lines[8].replace_range(10..20, "2000000000");
        lines.push("    -1".to_string());
        let err = parse_blocks(&(lines.join("\n") + "\n")).unwrap_err();
        assert!(matches!(err, FormatError::Syntax { .. }));
    }

    #[test]
    fn test_blank_abscissa_label_written_back_blank() {
        let mut f = sample_function();
        f.header.abscissa_axis.label.clear();
        let records = normalize_unv(vec![UnvBlock::Function(f)]).unwrap();
        assert_eq!(records[0].abscissa_label, DEFAULT_XLABEL);

        let back = record_to_function(&records[0]).unwrap();
        assert_eq!(back.header.xlabel(), "");
        let UnvBlock::Function(reread) = &parse_blocks(&written(&[UnvBlock::Function(back)])).unwrap()[0] else {
            panic!("expected a response function");
        };
        assert_eq!(reread.header.xlabel(), "");

        let mut renamed = records[0].clone();
        renamed.abscissa_label = "Time".to_string();
        assert_eq!(record_to_function(&renamed).unwrap().header.xlabel(), "Time");
    }

    #[test]
    fn test_blank_nodes_read_as_missing() {
        let mut f = sample_function();
        f.header.rsp_node = None;
        let text = written(&[UnvBlock::Function(f)]);
        let UnvBlock::Function(read) = &parse_blocks(&text).unwrap()[0] else {
            panic!("expected a response function");
        };
        assert_eq!(read.header.rsp_node, None);
        assert_eq!(read.header.pair_name(), None);
        assert_eq!(read.header.rsp_dir, Some(3));
    }
}
