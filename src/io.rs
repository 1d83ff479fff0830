//! Reading LORs and raw images from disk.

pub mod raw;

use std::io::BufRead;
use std::path::Path;

use crate::error::{Error, Result};
use crate::system_matrix::LOR;
use crate::utils::parse_lor;

/// Read LORs from a text file: one whitespace-separated
/// `t1 t2 x1 y1 z1 x2 y2 z2` record per line (times in ps, positions in mm).
/// Blank lines are skipped.
pub fn read_lors(path: &Path) -> Result<Vec<LOR>> {
    let file = std::fs::File::open(path)?;
    let mut lors = vec![];
    for (n, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let lor = parse_lor(&line)
            .map_err(|reason| Error::MalformedLor { line: n + 1, reason })?;
        lors.push(lor);
    }
    Ok(lors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    #[test]
    fn read_lors_from_text() -> Result<()> {
        use std::io::Write;
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("lors.txt");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "0.0 100.0  -390.0 1.0 2.0  390.0 -1.0 -2.0")?;
        writeln!(file)?;
        writeln!(file, "50.0 0.0  0.1 -390.0 7.5  -0.1 390.0 -7.5")?;

        let lors = read_lors(&path)?;
        assert_eq!(lors.len(), 2);
        assert_float_eq!(lors[0].dt, 100.0, ulps <= 1);
        assert_float_eq!(lors[0].p2.x, 390.0, ulps <= 1);
        assert_float_eq!(lors[1].dt, -50.0, ulps <= 1);
        Ok(())
    }

    #[test]
    fn malformed_lor_reports_line_number() -> Result<()> {
        use std::io::Write;
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("lors.txt");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "0.0 0.0  -390.0 0.0 0.0  390.0 0.0 0.0")?;
        writeln!(file, "0.0 0.0  -390.0 0.0 0.0")?;

        match read_lors(&path) {
            Err(Error::MalformedLor { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected MalformedLor, got {:?}", other.map(|l| l.len())),
        }
        Ok(())
    }
}
