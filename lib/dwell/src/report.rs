use crate::accum::Accumulator;
use crate::io::open_writer;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Serialize the final report: one `<id> <duration>\r\n` line per vehicle.
///
/// Policy: entries whose accumulated duration is non-zero are emitted,
/// negative totals included; lines are ordered by id so the same report
/// always serializes to the same bytes. Returns the number of lines written.
pub fn write_report(accum: &Accumulator, path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    let mut entries = accum.entries();
    entries.sort_unstable_by_key(|e| e.0);

    let mut writer = open_writer(path)?;
    for (id, duration_secs) in &entries {
        write!(writer, "{id} {duration_secs}\r\n")
            .with_context(|| format!("write report {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush report {}", path.display()))?;
    Ok(entries.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_sorted_crlf_lines() {
        let mut acc = Accumulator::sparse();
        acc.add(20, 120);
        acc.add(3, 60);
        acc.add(7, -30);
        acc.add(9, 0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let written = write_report(&acc, &path).unwrap();
        assert_eq!(written, 3);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "3 60\r\n7 -30\r\n20 120\r\n");
    }
}
