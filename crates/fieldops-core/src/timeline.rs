//! Date-grouped projection of a flat comment collection.
//!
//! Pure and stateless: the same input always yields the same output, and
//! the projection is rebuilt from scratch on every render. Source order
//! is not trusted; items are sorted ascending by timestamp (oldest first
//! for chat) before day separators are inserted.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Anything that can be placed on a thread timeline.
pub trait Timestamped {
    /// Unix timestamp in seconds
    fn timestamp(&self) -> u64;
}

/// One display row of a projected thread.
#[derive(Debug, PartialEq)]
pub enum ThreadItem<'a, M> {
    /// Day boundary between messages
    Separator { label: String, date: NaiveDate },
    Message(&'a M),
}

/// Project `messages` into a display-ready sequence, grouping by the
/// calendar day each timestamp falls on in `tz`. `today` anchors the
/// relative separator labels.
pub fn build<'a, M, Tz>(messages: &'a [M], tz: &Tz, today: NaiveDate) -> Vec<ThreadItem<'a, M>>
where
    M: Timestamped,
    Tz: TimeZone,
{
    let mut ordered: Vec<&M> = messages.iter().collect();
    // Stable sort keeps same-second messages in their incoming order
    ordered.sort_by_key(|m| m.timestamp());

    let mut items = Vec::with_capacity(ordered.len() + 4);
    let mut current_day: Option<NaiveDate> = None;
    for message in ordered {
        let day = local_day(tz, message.timestamp());
        if current_day != Some(day) {
            items.push(ThreadItem::Separator {
                label: day_label(day, today),
                date: day,
            });
            current_day = Some(day);
        }
        items.push(ThreadItem::Message(message));
    }
    items
}

/// [`build`] with the device's local timezone and today's date.
pub fn build_local<M: Timestamped>(messages: &[M]) -> Vec<ThreadItem<'_, M>> {
    build(messages, &chrono::Local, chrono::Local::now().date_naive())
}

fn local_day<Tz: TimeZone>(tz: &Tz, timestamp: u64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp(timestamp as i64, 0)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .with_timezone(tz)
        .date_naive()
}

/// Human label for a day separator relative to `today`: "Today",
/// "Yesterday", the weekday name inside the last week, or an absolute
/// date beyond that.
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        return "Today".to_string();
    }
    if today.pred_opt() == Some(date) {
        return "Yesterday".to_string();
    }
    let age = today.signed_duration_since(date).num_days();
    if (2..7).contains(&age) {
        return date.format("%A").to_string();
    }
    date.format("%-d %B %Y").to_string()
}
