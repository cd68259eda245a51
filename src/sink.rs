use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::record::{SbRecord, HEADER};

/// Append-only CSV output for one partition's finished records. The file
/// is never rewritten in place; a logical output is the concatenation of
/// all appends across restarts.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append fully-formed records. The header row is written only when
    /// the file does not exist yet or is empty.
    pub fn append(&self, records: &[SbRecord]) -> Result<()> {
        let write_header = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open sink {}", self.path.display()))?;
        let mut w = BufWriter::new(file);

        if write_header {
            write_row(&mut w, &HEADER)?;
        }
        for record in records {
            write_row(&mut w, &record.csv_fields())?;
        }
        w.flush()?;
        Ok(())
    }
}

/// Count data rows (excluding the header) in an existing sink file.
pub fn count_rows(path: &Path) -> Result<usize> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read sink {}", path.display()))?;
    Ok(text.lines().count().saturating_sub(1))
}

fn write_row<W: Write>(w: &mut W, fields: &[&str]) -> Result<()> {
    let mut first = true;
    for field in fields {
        if !first {
            write!(w, ",")?;
        }
        first = false;
        if needs_quotes(field) {
            write!(w, "\"{}\"", field.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", field)?;
        }
    }
    writeln!(w)?;
    Ok(())
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

// ── Tests ──
