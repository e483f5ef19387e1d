use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use log::info;

use crate::aggregate::{aggregate, TotalDurations};
use crate::datetime;
use crate::export::write_csv_file;
use crate::google_calendar::CalendarRepository;
use crate::table::{combine, to_long, to_wide};

/// wide形式(日毎の表と合計の表の連結)の出力ファイル名。
pub const WIDE_FILE_NAME: &str = "schedule_data.csv";
/// long形式の出力ファイル名。
pub const LONG_FILE_NAME: &str = "schedule_data_long.csv";

/// 集計結果を出力するコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct ExportArgs {
    #[clap(
        short = 's',
        long = "start-date",
        help = "Sets a custom start date in the format YYYY-MM-DD (default: 30 days before the end date)",
        parse(try_from_str = parse_date),
    )]
    start_date: Option<DateTime<Utc>>,

    #[clap(
        short = 'e',
        long = "end-date",
        help = "Sets a custom end date in the format YYYY-MM-DD (default: today)",
        parse(try_from_str = parse_date),
    )]
    end_date: Option<DateTime<Utc>>,

    #[clap(
        short = 'o',
        long = "output-dir",
        help = "Directory to write the exported csv files",
        default_value = ".",
        parse(from_os_str),
    )]
    output_dir: PathBuf,
}

/// カレンダーのイベントを集計してCSVに出力するコマンド。
pub struct ExportCommand<'a, T: CalendarRepository> {
    calendar_client: &'a T,
}

impl<'a, T: CalendarRepository> ExportCommand<'a, T> {
    /// 新しい`ExportCommand`を返す。
    ///
    /// # Arguments
    /// * `calendar_client` - カレンダーからイベントを取得するためのリポジトリ
    pub fn new(calendar_client: &'a T) -> Self {
        Self { calendar_client }
    }

    /// 指定された期間のイベントを取得して集計し、wide形式とlong形式のCSVを出力する。
    ///
    /// 終了日が指定されていない場合は現在日時を、開始日が指定されていない場合は
    /// 終了日の30日前を利用する。集計に失敗した場合はファイルを一切出力しない。
    /// Consoleでの表示のために全期間の合計を返す。
    ///
    /// # Arguments
    ///
    /// * `args` - コマンドの引数
    pub async fn run(&self, args: ExportArgs) -> Result<TotalDurations> {
        let end_at = args.end_date.unwrap_or_else(datetime::now);
        let start_at = args
            .start_date
            .unwrap_or_else(|| end_at - chrono::Duration::days(30));
        info!("Start at: {}, End at: {}", start_at, end_at);

        let events = self
            .calendar_client
            .read_events(&start_at, &end_at)
            .await
            .context("Failed to retrieve calendar events")?;
        info!("Calendar events retrieved successfully.");

        let (all_days, totals) = aggregate(&events).context("Failed to aggregate events")?;

        let (wide, totals_table) = to_wide(&all_days, &totals);
        let long = to_long(&wide);
        let combined = combine(&wide, &totals_table);

        let wide_path = args.output_dir.join(WIDE_FILE_NAME);
        write_csv_file(&combined, &wide_path)?;
        info!("Wrote wide table: {}", wide_path.display());

        let long_path = args.output_dir.join(LONG_FILE_NAME);
        write_csv_file(&long, &long_path)?;
        info!("Wrote long table: {}", long_path.display());

        Ok(totals)
    }
}

/// 日付をパースする。
///
/// Localタイムゾーンでその日の00:00:00を表すUTC日時に変換する。
fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    let naive_date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Failed to parse date: {}", s))?;
    let naive_datetime = naive_date
        .and_hms_opt(0, 0, 0)
        .context("Failed to set hour, minute, and second")?;
    let datetime = Local
        .from_local_datetime(&naive_datetime)
        .single()
        .context("Failed to convert to DateTime<Local>")?
        .to_utc();

    Ok(datetime)
}
