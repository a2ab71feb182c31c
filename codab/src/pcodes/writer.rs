//! Published p-code tables.

use std::path::{Path, PathBuf};

use super::{PcodeLengths, PcodeRow};
use crate::table::{Cell, Column, CsvOptions, Table, TableError};

const CSV_OPTIONS: CsvOptions = CsvOptions {
    bom: true,
    hxl: true,
};

pub const PCODES_STEM: &str = "global_pcodes";
pub const PCODES_ADM_1_2_STEM: &str = "global_pcodes_adm_1_2";
pub const LENGTHS_STEM: &str = "global_pcode_lengths";

pub fn pcode_columns() -> Vec<Column> {
    vec![
        Column::text("Location").with_hxl("#country+code"),
        Column::int("Admin Level").with_hxl("#geo+admin_level"),
        Column::text("P-Code").with_hxl("#adm+code"),
        Column::text("Name").with_hxl("#adm+name"),
        Column::text("Parent P-Code").with_hxl("#adm+code+parent"),
        Column::text("Valid from date").with_hxl("#date+start"),
    ]
}

pub fn length_columns() -> Vec<Column> {
    let mut columns = vec![
        Column::text("Location").with_hxl("#country+code"),
        Column::int("Country Length").with_hxl("#country+len"),
    ];
    for level in 1..=5 {
        columns.push(
            Column::text(&format!("Admin {} Length", level)).with_hxl(&format!("#adm{}+len", level)),
        );
    }
    columns
}

pub fn pcode_table<'r>(rows: impl IntoIterator<Item = &'r PcodeRow>) -> Result<Table, TableError> {
    let mut table = Table::new(pcode_columns());
    for row in rows {
        table.push_row(vec![
            Cell::Text(row.location.clone()),
            Cell::Int(row.admin_level as i64),
            Cell::text(row.pcode.as_deref()),
            Cell::text(row.name.as_deref()),
            Cell::text(row.parent_pcode.as_deref()),
            Cell::text(row.valid_on.as_deref()),
        ])?;
    }
    Ok(table)
}

pub fn length_table(lengths: &[PcodeLengths]) -> Result<Table, TableError> {
    let mut table = Table::new(length_columns());
    for entry in lengths {
        let mut cells = vec![
            Cell::Text(entry.location.clone()),
            entry
                .country_length
                .map_or(Cell::Null, |n| Cell::Int(n as i64)),
        ];
        cells.extend(entry.levels.iter().map(|l| Cell::text(l.as_deref())));
        table.push_row(cells)?;
    }
    Ok(table)
}

/// Write the three p-code tables as CSV (BOM, HXL row) and Parquet.
pub fn write_pcodes(
    dir: &Path,
    rows: &[PcodeRow],
    lengths: &[PcodeLengths],
) -> Result<Vec<PathBuf>, TableError> {
    let mut written = Vec::new();
    written.extend(pcode_table(rows)?.write_both(&dir.join(PCODES_STEM), CSV_OPTIONS)?);
    written.extend(
        pcode_table(rows.iter().filter(|r| r.admin_level <= 2))?
            .write_both(&dir.join(PCODES_ADM_1_2_STEM), CSV_OPTIONS)?,
    );
    written.extend(length_table(lengths)?.write_both(&dir.join(LENGTHS_STEM), CSV_OPTIONS)?);
    Ok(written)
}
