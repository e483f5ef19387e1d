use indexmap::IndexMap;
use thiserror::Error;

use crate::event::CalendarEvent;
use crate::normalize::normalize_name;

/// 1日分の活動名ごとの合計時間(分)。
pub type DailyDurations = IndexMap<String, f64>;

/// 日付文字列(YYYY-MM-DD)ごとの`DailyDurations`。
pub type AllDaysDurations = IndexMap<String, DailyDurations>;

/// 全期間の活動名ごとの合計時間(分)。
pub type TotalDurations = IndexMap<String, f64>;

/// 集計処理のエラー。
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("no events found")]
    EmptyInput,
    #[error("events are not sorted by start time: {current} appears after {previous}")]
    UnsortedEvents { previous: String, current: String },
}

/// イベント列から日毎と全期間の活動時間を集計する。
///
/// イベントは開始時刻の昇順で渡されることを前提とし、順序が崩れている場合は
/// `AggregateError::UnsortedEvents`を返す。日付はイベント自身のタイムゾーンでの
/// 開始日時から求める。活動名は既出の活動名に対して正規化した上で加算する。
///
/// # Arguments
///
/// * `events` - 開始時刻の昇順に並んだカレンダーイベント
///
/// # Examples
///
/// ```
/// let (all_days, totals) = aggregate(&events).unwrap();
/// ```
pub fn aggregate(
    events: &[CalendarEvent],
) -> Result<(AllDaysDurations, TotalDurations), AggregateError> {
    if events.is_empty() {
        return Err(AggregateError::EmptyInput);
    }

    let mut all_days = AllDaysDurations::new();
    let mut totals = TotalDurations::new();
    let mut current_day = events[0].start.date_naive();
    let mut daily = DailyDurations::new();
    let mut previous_start = events[0].start;

    for (i, event) in events.iter().enumerate() {
        if event.start < previous_start {
            return Err(AggregateError::UnsortedEvents {
                previous: previous_start.to_rfc3339(),
                current: event.start.to_rfc3339(),
            });
        }
        previous_start = event.start;

        let duration_minutes = (event.end - event.start).num_milliseconds() as f64 / 60_000.0;
        let name = normalize_name(&event.summary, totals.keys().map(String::as_str));
        let day = event.start.date_naive();

        // 日付が変わったタイミングで前日分を確定する
        if day != current_day {
            all_days.insert(current_day.to_string(), std::mem::take(&mut daily));
            current_day = day;
        }

        *daily.entry(name.clone()).or_insert(0.0) += duration_minutes;
        *totals.entry(name).or_insert(0.0) += duration_minutes;

        // 最終イベントの日は次の日付が来ないため、ここで確定する
        if i == events.len() - 1 {
            all_days.insert(current_day.to_string(), std::mem::take(&mut daily));
        }
    }

    Ok((all_days, totals))
}
