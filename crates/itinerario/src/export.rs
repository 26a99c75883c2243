//! ICS and CSV renderings of the catalog.

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, Utc};
use csv::{QuoteStyle, WriterBuilder};
use icalendar::{
    Calendar, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike, Property,
};

use crate::types::ActivityItem;

pub const PRODID: &str = "-//Itinerario//Itinerary//EN";
pub const UID_DOMAIN: &str = "itinerario";

const CSV_HEADER: [&str; 5] = ["Date", "Time", "Title", "Type", "Multi-Day"];

/// RFC 5545 calendar with one `VEVENT` per item.
///
/// Timed single-day items last one hour. Untimed single-day items and all
/// multi-day items are all-day events whose `DTEND` is the day after the
/// last day.
pub fn to_ics(items: &[ActivityItem], stamp: DateTime<Utc>) -> String {
    let mut calendar = Calendar::empty();
    calendar
        .append_property(Property::new("VERSION", "2.0"))
        .append_property(Property::new("PRODID", PRODID))
        .append_property(Property::new("CALSCALE", "GREGORIAN"))
        .append_property(Property::new("METHOD", "PUBLISH"));

    for item in items {
        calendar.push(to_event(item, stamp));
    }
    calendar.to_string()
}

fn to_event(item: &ActivityItem, stamp: DateTime<Utc>) -> Event {
    let (start, end) = event_bounds(item);
    Event::new()
        .uid(&format!("{}@{UID_DOMAIN}", item.id))
        .timestamp(stamp)
        .starts(start)
        .ends(end)
        .summary(&item.title)
        .add_property("CATEGORIES", &item.category.as_str().to_uppercase())
        .done()
}

/// `DTSTART`/`DTEND` values. Timed items are floating local times.
fn event_bounds(item: &ActivityItem) -> (DatePerhapsTime, DatePerhapsTime) {
    let start = item.start_date();
    match (item.end_date(), item.start_time) {
        (None, Some(time)) => {
            let begin = start.and_time(time);
            let finish = begin + TimeDelta::hours(1);
            (
                CalendarDateTime::Floating(begin).into(),
                CalendarDateTime::Floating(finish).into(),
            )
        }
        (end, _) => {
            let last = end.unwrap_or(start);
            (
                DatePerhapsTime::Date(start),
                DatePerhapsTime::Date(day_after(last)),
            )
        }
    }
}

fn day_after(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

/// CSV with a `Date,Time,Title,Type,Multi-Day` header. Every cell is quoted.
pub fn to_csv(items: &[ActivityItem]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for item in items {
        let date = item.start_date().format("%Y-%m-%d").to_string();
        let time = item.start_time.map(format_time).unwrap_or_default();
        let multi_day = if item.is_multi_day() { "Yes" } else { "No" };
        writer.write_record([
            date.as_str(),
            time.as_str(),
            item.title.as_str(),
            item.category.as_str(),
            multi_day,
        ])?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}
