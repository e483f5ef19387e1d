use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;

use crate::table::{Cell, Table};

/// 表をCSVとして書き出す。
///
/// 1行目に列名を出力し、以降は行単位でセルを出力する。列の長さが足りない行の
/// セルは空フィールドとして出力する。
///
/// # Arguments
///
/// * `table` - 書き出す表
/// * `writer` - 出力先
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    if table.is_empty() {
        return Ok(());
    }

    let mut csv_writer = Writer::from_writer(writer);

    csv_writer
        .write_record(table.keys())
        .context("Failed to write csv header")?;

    let row_count = table.values().map(Vec::len).max().unwrap_or(0);
    for row in 0..row_count {
        let record: Vec<String> = table
            .values()
            .map(|cells| cells.get(row).unwrap_or(&Cell::Empty).to_field())
            .collect();
        csv_writer
            .write_record(&record)
            .with_context(|| format!("Failed to write csv row: {}", row))?;
    }

    csv_writer.flush().context("Failed to flush csv writer")?;

    Ok(())
}

/// 表を指定されたパスにCSVファイルとして書き出す。
pub fn write_csv_file(table: &Table, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    write_csv(table, file).with_context(|| format!("Failed to write csv: {}", path.display()))?;

    Ok(())
}
