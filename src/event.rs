use chrono::{DateTime, FixedOffset};

#[derive(Clone, Debug, PartialEq)]
pub struct CalendarEvent {
    pub summary: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}
