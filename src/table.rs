use indexmap::IndexMap;

use crate::aggregate::{AllDaysDurations, TotalDurations};

/// 日付列の列名。
pub const DAYS_COLUMN: &str = "Days";
/// 活動名列の列名。
pub const ACTIVITY_COLUMN: &str = "Activity";
/// long形式の値列の列名。
pub const MINUTES_COLUMN: &str = "Minutes";
/// 全期間合計列の列名。
pub const TOTAL_COLUMN: &str = "Total Minutes";

/// 表の1セル。列の長さを揃えるための空セルを含む。
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    /// CSVの1フィールドとして出力する文字列を返す。
    pub fn to_field(&self) -> String {
        match self {
            Cell::Text(value) => value.clone(),
            Cell::Number(value) => value.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

/// 列名からセル列へのマッピング。挿入順がそのまま列順になる。
pub type Table = IndexMap<String, Vec<Cell>>;

/// 集計結果をwide形式の表と合計の表に変換する。
///
/// wide形式は`Days`列に続けて活動ごとの列を発見順(日毎の挿入順、日内は活動の
/// 挿入順)に並べ、活動がなかった日は明示的に`0`を入れる。合計の表は活動名と
/// 全期間合計(分)の2列で、`totals`の挿入順に並ぶ。
///
/// # Arguments
///
/// * `all_days` - 日付ごとの活動時間
/// * `totals` - 全期間の活動時間
pub fn to_wide(all_days: &AllDaysDurations, totals: &TotalDurations) -> (Table, Table) {
    let mut wide = Table::new();
    wide.insert(
        DAYS_COLUMN.to_string(),
        all_days.keys().map(|day| Cell::Text(day.clone())).collect(),
    );

    let mut activities: Vec<String> = Vec::new();
    for daily in all_days.values() {
        for activity in daily.keys() {
            if !activities.contains(activity) {
                activities.push(activity.clone());
            }
        }
    }

    for activity in activities {
        let cells = all_days
            .values()
            .map(|daily| Cell::Number(daily.get(&activity).copied().unwrap_or(0.0)))
            .collect();
        wide.insert(activity, cells);
    }

    let mut totals_table = Table::new();
    totals_table.insert(
        ACTIVITY_COLUMN.to_string(),
        totals.keys().map(|name| Cell::Text(name.clone())).collect(),
    );
    totals_table.insert(
        TOTAL_COLUMN.to_string(),
        totals.values().map(|value| Cell::Number(*value)).collect(),
    );

    (wide, totals_table)
}

/// wide形式の表をlong形式に変換する。
///
/// `Days`列を行の識別子として残し、(日付, 活動名, 値)の3列に展開する。
/// 行は活動列ごとに全日付を並べる列優先の順序で、値の欠落や重複はない。
pub fn to_long(wide: &Table) -> Table {
    let days = wide.get(DAYS_COLUMN).cloned().unwrap_or_default();

    let mut day_cells = Vec::new();
    let mut activity_cells = Vec::new();
    let mut value_cells = Vec::new();
    for (column, cells) in wide.iter().filter(|(name, _)| name.as_str() != DAYS_COLUMN) {
        for (day, cell) in days.iter().zip(cells) {
            day_cells.push(day.clone());
            activity_cells.push(Cell::Text(column.clone()));
            value_cells.push(cell.clone());
        }
    }

    let mut long = Table::new();
    long.insert(DAYS_COLUMN.to_string(), day_cells);
    long.insert(ACTIVITY_COLUMN.to_string(), activity_cells);
    long.insert(MINUTES_COLUMN.to_string(), value_cells);
    long
}

/// 2つの表を横に連結して1つの表にする。
///
/// 列の長さが揃っていない場合は、最長の列に合わせて`Cell::Empty`で埋める。
pub fn combine(left: &Table, right: &Table) -> Table {
    let mut combined: Table = left
        .iter()
        .chain(right.iter())
        .map(|(name, cells)| (name.clone(), cells.clone()))
        .collect();

    let max_len = combined.values().map(Vec::len).max().unwrap_or(0);
    for cells in combined.values_mut() {
        cells.resize(max_len, Cell::Empty);
    }

    combined
}
