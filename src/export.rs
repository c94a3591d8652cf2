use crate::table::{ColumnSlot, Table};
use crate::{GalleryError, Result};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes every column, marks included, in the order they were loaded.
/// The file is written next to `path` first and renamed over it, so a
/// failed write leaves the previous contents in place.
pub fn save_table(table: &Table, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;

    {
        let mut writer = csv::Writer::from_writer(BufWriter::new(temp.as_file_mut()));
        let schema = table.schema();
        writer.write_record(schema.headers())?;

        for row in table.rows() {
            let record = schema.layout().iter().map(|slot| match slot {
                ColumnSlot::Dir => row.dir.as_str(),
                ColumnSlot::File => row.file.as_str(),
                ColumnSlot::Mark => {
                    if row.marked {
                        "True"
                    } else {
                        "False"
                    }
                }
                ColumnSlot::Attribute(index) => {
                    row.attributes.get(*index).map(|v| v.display()).unwrap_or("")
                }
            });
            writer.write_record(record)?;
        }
        writer.flush()?;
    }

    // The temp file is created owner-only; keep the mode of the file it replaces.
    if let Ok(metadata) = std::fs::metadata(path) {
        temp.as_file().set_permissions(metadata.permissions())?;
    }
    temp.persist(path).map_err(|e| GalleryError::Io(e.error))?;
    log::info!("Saved {} rows to {:?}", table.len(), path);
    Ok(())
}

/// Overwrites the file the table was loaded from.
pub fn save_marks(table: &Table) -> Result<()> {
    save_table(table, table.source())
}

pub fn save_as(table: &Table, path: &Path) -> Result<()> {
    save_table(table, path)
}

pub fn confirm_save_message(table: &Table) -> String {
    format!(
        "This will overwrite the CSV file:\n\n{}\n\nMarked files: {}\n\nDo you want to continue?",
        table.source().display(),
        table.marked_count()
    )
}

/// Writes one `dir/file` path per marked row and returns how many were
/// written. Nothing is created when no row is marked.
pub fn export_marked(table: &Table, path: &Path) -> Result<usize> {
    let marked = table.marked_ids();
    if marked.is_empty() {
        return Err(GalleryError::NothingMarked);
    }

    let mut out = BufWriter::new(std::fs::File::create(path)?);
    for id in &marked {
        if let Some(row_path) = table.path(*id) {
            writeln!(out, "{}", row_path.to_string_lossy())?;
        }
    }
    out.flush()?;

    log::info!("Exported {} marked paths to {:?}", marked.len(), path);
    Ok(marked.len())
}
