use crate::domain::allocation::AllocationRecord;
use crate::domain::model::ProjectId;
use crate::utils::error::{BudgetError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn write_csv<W: Write>(writer: W, records: &[AllocationRecord]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_string(records: &[AllocationRecord]) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, records)?;
    String::from_utf8(buffer).map_err(|e| BudgetError::StorageError {
        message: format!("CSV output is not valid UTF-8: {}", e),
    })
}

/// Writes the rows of a project in every requested format and returns the files created.
pub fn export_records(
    dir: &Path,
    project: ProjectId,
    records: &[AllocationRecord],
    formats: &[String],
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for format in formats {
        let path = dir.join(format!("project-{}-allocations.{}", project, format));
        match format.as_str() {
            "csv" => {
                let file = fs::File::create(&path)?;
                write_csv(file, records)?;
            }
            "json" => {
                let data = serde_json::to_vec_pretty(records)?;
                fs::write(&path, data)?;
            }
            other => {
                return Err(BudgetError::InvalidConfigValueError {
                    field: "formats".to_string(),
                    value: other.to_string(),
                    reason: "Unsupported export format".to_string(),
                });
            }
        }
        tracing::debug!("Exported {} rows to {}", records.len(), path.display());
        written.push(path);
    }

    Ok(written)
}
