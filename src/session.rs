use std::path::Path;

use crate::data::loader::{load_reconstructed_file, load_testlab_file};
use crate::data::model::{Record, RecordIndex};
use crate::error::{Error, Result};
use crate::export::{default_export_file_name, export_record, ExportOutcome};
use crate::frf::{classified_series, DisplayOptions, SeriesPlot};

// ---------------------------------------------------------------------------
// Reconstructed trace
// ---------------------------------------------------------------------------

/// Amplitude trace of a reconstructed FRF file.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedTrace {
    pub name: String,
    pub x: Vec<f64>,
    /// Ordinate column 0.
    pub amplitude: Vec<f64>,
}

impl ReconstructedTrace {
    pub fn from_record(name: impl Into<String>, record: &Record) -> Result<Self> {
        let amplitude = record
            .ordinate
            .first_column()
            .ok_or_else(|| Error::malformed(&record.identity, "no real amplitude column"))?;
        if amplitude.len() != record.abscissa.len() {
            return Err(Error::malformed(
                &record.identity,
                format!(
                    "abscissa has {} values but ordinate has {}",
                    record.abscissa.len(),
                    amplitude.len()
                ),
            ));
        }
        Ok(Self {
            name: name.into(),
            x: record.abscissa.clone(),
            amplitude,
        })
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// One viewer session, independent of any rendering.
///
/// All operations take `&self`/`&mut self`, so loads and exports against one
/// session are serialized by the borrow checker.
#[derive(Debug, Default)]
pub struct Session {
    /// Loaded test-lab records (None until a file loads successfully).
    pub index: Option<RecordIndex>,

    /// Identity of the selected record.
    pub selected: Option<String>,

    pub display: DisplayOptions,

    /// Trace from the last reconstructed file.
    pub reconstructed: Option<ReconstructedTrace>,

    /// Status / error message for the caller to show.
    pub status_message: Option<String>,
}

impl Session {
    pub fn new(display: DisplayOptions) -> Self {
        Self {
            display,
            ..Self::default()
        }
    }

    /// Back to the "no file loaded" state.
    pub fn reset_testlab(&mut self) {
        self.index = None;
        self.selected = None;
    }

    /// Replace the loaded index with the records of `path`.
    ///
    /// On failure the session holds no index at all.
    pub fn load_testlab(&mut self, path: &Path) -> Result<&RecordIndex> {
        self.reset_testlab();
        match load_testlab_file(path) {
            Ok(index) => {
                self.status_message = Some(format!("Loaded: {}", index.file_name));
                Ok(self.index.insert(index))
            }
            Err(e) => {
                log::error!("Failed to load test-lab file {}: {e}", path.display());
                self.status_message = Some("File loading failed.".to_string());
                Err(e)
            }
        }
    }

    /// Load a reconstructed FRF file; the test-lab index is untouched.
    pub fn load_reconstructed(&mut self, path: &Path) -> Result<&ReconstructedTrace> {
        let loaded = load_reconstructed_file(path).and_then(|record| {
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ReconstructedTrace::from_record(format!("Reconstructed: {file}"), &record)
        });
        match loaded {
            Ok(trace) => Ok(self.reconstructed.insert(trace)),
            Err(e) => {
                log::error!("Failed to load reconstructed file {}: {e}", path.display());
                self.status_message = Some(format!("Failed to load reconstructed FRF file: {e}"));
                Err(e)
            }
        }
    }

    /// Select a record; unknown identities clear the selection.
    pub fn select(&mut self, identity: &str) -> Option<&Record> {
        let known = self
            .index
            .as_ref()
            .is_some_and(|index| index.contains(identity));
        self.selected = known.then(|| identity.to_string());
        self.selected_record()
    }

    pub fn selected_record(&self) -> Option<&Record> {
        let identity = self.selected.as_deref()?;
        self.index.as_ref()?.get(identity)
    }

    /// Plot data for the selection under the current display options.
    pub fn selected_plot(&self) -> Option<Result<SeriesPlot>> {
        self.selected_record()
            .map(|record| classified_series(record, &self.display))
    }

    /// Export is offered only for a selection that classifies cleanly.
    pub fn can_export(&self) -> bool {
        matches!(self.selected_plot(), Some(Ok(_)))
    }

    /// Suggested export file name for the selection.
    pub fn suggested_export_name(&self) -> Option<String> {
        self.selected_record()
            .map(|record| default_export_file_name(&record.name))
    }

    /// Export the selected record; in-memory records are never modified.
    pub fn export_selected(&mut self, destination: &Path) -> Result<ExportOutcome> {
        let record = self
            .selected_record()
            .ok_or_else(|| Error::UnsupportedExport("no record selected".to_string()))?;
        let result = export_record(record, destination);
        self.status_message = Some(match &result {
            Ok(ExportOutcome::Transformed) => format!(
                "Successfully saved transformed record to {}",
                destination.display()
            ),
            Ok(ExportOutcome::PassthroughUnchanged) => format!(
                "Record was not a complex FRF. Saved original data to {}",
                destination.display()
            ),
            Err(e) => format!("Failed to save to .unv file: {e}"),
        });
        result
    }
}
