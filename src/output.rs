//! Line-oriented writer for the final result set.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::TaskResult;

/// Create or truncate `path` and write one line per result.
///
/// Returns the number of lines written.
pub fn write_results(path: &Path, results: &[TaskResult]) -> Result<usize> {
    let write = || -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for result in results {
            writeln!(writer, "{result}")?;
        }
        writer.flush()
    };
    write().map_err(|source| Error::OutputWrite {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(results.len())
}
