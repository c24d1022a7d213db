//! CSV export.

use std::path::Path;

use crate::error::Result;
use crate::types::UnifiedTable;

use super::write_atomically;

/// Write the table as comma-separated UTF-8 with a header row.
pub fn write_csv(table: &UnifiedTable, path: &Path) -> Result<()> {
    write_atomically(path, |out| {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(&table.columns)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()
    })
}
