//! emav: inspect and export experimental modal analysis FRF files.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use emav::export::default_export_file_name;
use emav::frf::{ClassifiedSeries, SeriesPlot};
use emav::session::{ReconstructedTrace, Session};
use emav::DisplayOptions;

#[derive(Parser)]
#[command(name = "emav")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// List the records of a test-lab file (.mat, .unv)
    List {
        file: PathBuf,
    },

    /// Show the classified series of one record
    Show {
        file: PathBuf,

        /// Record identity as printed by `list`
        id: String,

        /// Linear magnitude axis instead of logarithmic
        #[arg(long)]
        linear: bool,
    },

    /// Export one universal record, complex FRFs as linear amplitude
    Export {
        file: PathBuf,

        id: String,

        /// Destination .unv file (defaults to Linear_<name>.unv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the amplitude trace of a reconstructed FRF file
    Recon {
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.command {
        Commands::List { file } => list(&file, cli.format),
        Commands::Show { file, id, linear } => {
            let display = DisplayOptions { log_scale: !linear };
            show(&file, &id, display, cli.format)
        }
        Commands::Export { file, id, output } => export(&file, &id, output),
        Commands::Recon { file } => recon(&file, cli.format),
    }
}

fn open(file: &Path, display: DisplayOptions) -> Result<Session> {
    let mut session = Session::new(display);
    session
        .load_testlab(file)
        .with_context(|| format!("loading {}", file.display()))?;
    Ok(session)
}

fn list(file: &Path, format: OutputFormat) -> Result<()> {
    let session = open(file, DisplayOptions::default())?;
    let Some(index) = session.index.as_ref() else {
        bail!("no records loaded");
    };

    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = index
                .records()
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "identity": r.identity,
                        "name": r.name,
                        "group": r.group,
                        "points": r.abscissa.len(),
                        "format": r.source_format().to_string(),
                    })
                })
                .collect();
            serde_json::to_writer_pretty(&mut out, &entries)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            writer.write_record(["identity", "name", "group", "points"])?;
            for r in index.records() {
                let points = r.abscissa.len().to_string();
                writer.write_record([
                    r.identity.as_str(),
                    r.name.as_str(),
                    r.group.as_deref().unwrap_or(""),
                    points.as_str(),
                ])?;
            }
            writer.flush()?;
        }
        OutputFormat::Text => {
            writeln!(out, "{} ({} records)", index.file_name, index.len())?;
            for (group, records) in index.groups() {
                let indent = match group {
                    Some(g) => {
                        writeln!(out, "{g}")?;
                        "    "
                    }
                    None => "",
                };
                for r in records {
                    writeln!(out, "{indent}{:<12} {}", r.identity, r.name)?;
                }
            }
        }
    }
    Ok(())
}

fn show(file: &Path, id: &str, display: DisplayOptions, format: OutputFormat) -> Result<()> {
    let mut session = open(file, display)?;
    if session.select(id).is_none() {
        bail!("no record with identity {id:?} in {}", file.display());
    }
    let plot = match session.selected_plot() {
        Some(plot) => plot.with_context(|| format!("classifying record {id}"))?,
        None => bail!("no record selected"),
    };

    let out = io::stdout().lock();
    match format {
        OutputFormat::Json => write_json(out, &plot),
        OutputFormat::Csv => write_plot_csv(out, &plot),
        OutputFormat::Text => write_plot_text(out, &plot),
    }
}

fn write_json<W: Write, T: serde::Serialize>(mut out: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_plot_csv<W: Write>(out: W, plot: &SeriesPlot) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    match &plot.series {
        ClassifiedSeries::Frf {
            magnitude,
            phase_degrees,
        } => {
            writer.write_record([plot.x_label.as_str(), "magnitude", "phase_deg"])?;
            for ((x, m), p) in plot.x.iter().zip(magnitude).zip(phase_degrees) {
                writer.write_record([x.to_string(), m.to_string(), p.to_string()])?;
            }
        }
        ClassifiedSeries::Real { value } => {
            writer.write_record([plot.x_label.as_str(), "value"])?;
            for (x, v) in plot.x.iter().zip(value) {
                writer.write_record([x.to_string(), v.to_string()])?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

fn write_plot_text<W: Write>(mut out: W, plot: &SeriesPlot) -> Result<()> {
    writeln!(out, "{}", plot.title)?;
    match &plot.series {
        ClassifiedSeries::Frf {
            magnitude,
            phase_degrees,
        } => {
            writeln!(out, "{:>14} {:>14} {:>10}", plot.x_label, "Magnitude", "Phase (deg)")?;
            for ((x, m), p) in plot.x.iter().zip(magnitude).zip(phase_degrees) {
                writeln!(out, "{x:>14.6} {m:>14.6e} {p:>10.2}")?;
            }
        }
        ClassifiedSeries::Real { value } => {
            writeln!(out, "{:>14} {:>14}", plot.x_label, "Value")?;
            for (x, v) in plot.x.iter().zip(value) {
                writeln!(out, "{x:>14.6} {v:>14.6e}")?;
            }
        }
    }
    Ok(())
}

fn export(file: &Path, id: &str, output: Option<PathBuf>) -> Result<()> {
    let mut session = open(file, DisplayOptions::default())?;
    let Some(record) = session.select(id) else {
        bail!("no record with identity {id:?} in {}", file.display());
    };
    let destination = output.unwrap_or_else(|| PathBuf::from(default_export_file_name(&record.name)));

    session
        .export_selected(&destination)
        .with_context(|| format!("exporting record {id} to {}", destination.display()))?;
    if let Some(message) = &session.status_message {
        println!("{message}");
    }
    Ok(())
}

fn recon(file: &Path, format: OutputFormat) -> Result<()> {
    let mut session = Session::default();
    let trace: ReconstructedTrace = session
        .load_reconstructed(file)
        .with_context(|| format!("loading reconstructed file {}", file.display()))?
        .clone();

    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Json => write_json(
            out,
            &serde_json::json!({
                "name": trace.name,
                "x": trace.x,
                "amplitude": trace.amplitude,
            }),
        ),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            writer.write_record(["x", "amplitude"])?;
            for (x, a) in trace.x.iter().zip(&trace.amplitude) {
                writer.write_record([x.to_string(), a.to_string()])?;
            }
            writer.flush()?;
            Ok(())
        }
        OutputFormat::Text => {
            writeln!(out, "{} ({} points)", trace.name, trace.x.len())?;
            for (x, a) in trace.x.iter().zip(&trace.amplitude) {
                writeln!(out, "{x:>14.6} {a:>14.6e}")?;
            }
            Ok(())
        }
    }
}
