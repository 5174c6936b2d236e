//! Writing recorded series for offline analysis and visualization.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::recorder::Recorder;

/// The field delimiter of exported matrices.
pub const DELIMITER: u8 = b';';

/// Writes the occupancy of every cell as a delimited matrix, one row per
/// frame, headed `second;c0;c1;…`.
pub fn write_occupancy_matrix<W: Write>(recorder: &Recorder, writer: W) -> Result<()> {
    let mut csv = csv::WriterBuilder::new().delimiter(DELIMITER).from_writer(writer);

    let cells = recorder.frames().first().map_or(0, |f| f.cells.len());
    let header = std::iter::once("second".to_string()).chain((0..cells).map(|c| format!("c{c}")));
    csv.write_record(header)?;

    for frame in recorder.frames() {
        let row = std::iter::once(frame.second.to_string())
            .chain(frame.cells.occupancy.iter().map(|o| o.to_string()));
        csv.write_record(row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes the occupancy matrix to a file.
pub fn export_occupancy_matrix(recorder: &Recorder, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_occupancy_matrix(recorder, BufWriter::new(file))?;
    log::info!("Wrote {} frames to {}", recorder.len(), path.display());
    Ok(())
}

/// Writes the per-segment series as JSON.
pub fn write_series_json<W: Write>(recorder: &Recorder, writer: W) -> Result<()> {
    serde_json::to_writer(writer, &recorder.series_by_segment())?;
    Ok(())
}
