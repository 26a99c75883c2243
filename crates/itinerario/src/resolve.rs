//! Which activities are active on a given calendar day.
//!
//! Single-day items match their start date exactly. Multi-day items match
//! every date in `start..=end`. All comparisons are on [`NaiveDate`], so
//! month and year boundaries need no special handling.

use chrono::NaiveDate;

use crate::types::ActivityItem;

/// Whether `item` occupies `date`.
pub fn spans(item: &ActivityItem, date: NaiveDate) -> bool {
    match item.end_date() {
        None => item.start_date() == date,
        Some(end) => item.start_date() <= date && date <= end,
    }
}

/// Items active on `target`, in catalog order.
///
/// A single-day item that falls inside a multi-day range is returned
/// alongside it; nothing is deduplicated or ranked here.
pub fn activities_on_date(catalog: &[ActivityItem], target: NaiveDate) -> Vec<&ActivityItem> {
    catalog.iter().filter(|item| spans(item, target)).collect()
}

/// Stable sort placing multi-day items before single-day ones.
pub fn multi_day_first<'a>(items: &[&'a ActivityItem]) -> Vec<&'a ActivityItem> {
    let mut sorted = items.to_vec();
    sorted.sort_by_key(|item| !item.is_multi_day());
    sorted
}

/// The multi-day item that banners a calendar cell, if any.
pub fn primary_for_day<'a>(active: &[&'a ActivityItem]) -> Option<&'a ActivityItem> {
    active.iter().copied().find(|item| item.is_multi_day())
}
