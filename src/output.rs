use std::fs;
use std::io;
use std::path::Path;

use crate::sweep::SweepPoint;
use crate::utils::prelude::*;

pub const PENALTY_TABLE: &str = "ideal_vs_simple_penalty";
pub const SIZE_TABLE: &str = "ideal_vs_simple_rho_fixed";

fn tsv_writer<W: io::Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        // the headers carry an extra leading column for the row label
        .flexible(true)
        .from_writer(writer)
}

/// One row per sweep point: `index, mean penalty, rho, total mean delay`
pub fn write_penalty_table<W: io::Write>(writer: W, points: &[SweepPoint], mean_delay: f64) -> Result<()> {
    let mut wtr = tsv_writer(writer);
    wtr.write_record(&["", "penalty", "rho", "avg_delay"])?;
    for point in points {
        wtr.write_record(&[
            point.index.to_string(),
            point.report.mean_penalty().to_string(),
            point.rho.to_string(),
            mean_delay.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// One row per sweep point and observed message size: `mean penalty, size, rho`
pub fn write_size_table<W: io::Write>(writer: W, points: &[SweepPoint]) -> Result<()> {
    let mut wtr = tsv_writer(writer);
    wtr.write_record(&["", "penalty", "size", "rho"])?;
    for point in points {
        for (size, mean) in point.report.per_size() {
            wtr.write_record(&[mean.value().to_string(), size.to_string(), point.rho.to_string()])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Write both tables into `dir`, creating it if needed
pub fn write_sweep(dir: &Path, points: &[SweepPoint], mean_delay: f64) -> Result<()> {
    fs::create_dir_all(dir)?;

    let path = dir.join(PENALTY_TABLE);
    write_penalty_table(fs::File::create(&path)?, points, mean_delay)?;
    info!(path = %path.display(), rows = points.len(), "wrote penalty table");

    let path = dir.join(SIZE_TABLE);
    write_size_table(fs::File::create(&path)?, points)?;
    info!(path = %path.display(), "wrote per size penalty table");

    Ok(())
}
