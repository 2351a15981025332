//! Experimental modal analysis viewer core: load test-lab and reconstructed
//! frequency response functions, classify them for display, and export
//! complex FRFs as linear amplitude universal files.

pub mod data;
pub mod error;
pub mod export;
pub mod frf;
pub mod session;

pub use data::loader::{detect_format, load_reconstructed_file, load_testlab_file};
pub use data::model::{Ordinate, Record, RecordIndex, Source, SourceFormat};
pub use error::{Error, FormatError, Result};
pub use export::{export_record, ExportOutcome};
pub use frf::{classified_series, classify, transform, DisplayOptions, SeriesPlot};
pub use session::Session;
