use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::io::delimiter_for;
use crate::model::MarginalEstimates;

/// Write `example_id, probability, n_votes` rows in estimate order.
///
/// Probabilities are written at full precision and read back exactly.
pub fn write_marginals<W: Write>(
    writer: W,
    estimates: &MarginalEstimates,
    delimiter: u8,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    writer.write_record(["example_id", "probability", "n_votes"])?;
    for m in estimates {
        writer.write_record([
            m.example_id.to_string(),
            m.probability.to_string(),
            m.n_votes.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_marginals_to_path<P: AsRef<Path>>(estimates: &MarginalEstimates, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    write_marginals(std::io::BufWriter::new(file), estimates, delimiter_for(path))?;
    log::info!("Wrote {} marginals to {}", estimates.len(), path.display());
    Ok(())
}
