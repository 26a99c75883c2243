//! Search, category filtering and timeline grouping.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::resolve::spans;
use crate::types::{ActivityItem, Category};

/// A search term plus an optional category restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    search: Option<String>,
    category: Option<Category>,
}

impl Filter {
    pub fn new(search: Option<&str>, category: Option<Category>) -> Self {
        let search = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        Self { search, category }
    }

    /// Build a filter from raw query values. `"all"`, empty and unknown
    /// category names mean no category restriction.
    pub fn from_query(search: Option<&str>, category: Option<&str>) -> Self {
        let category = category
            .filter(|c| !c.trim().is_empty() && !c.trim().eq_ignore_ascii_case("all"))
            .and_then(|c| c.parse().ok());
        Self::new(search, category)
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn is_active(&self) -> bool {
        self.search.is_some() || self.category.is_some()
    }

    pub fn matches(&self, item: &ActivityItem) -> bool {
        if let Some(category) = self.category {
            if item.category != category {
                return false;
            }
        }
        match &self.search {
            None => true,
            Some(term) => {
                item.title.to_lowercase().contains(term.as_str())
                    || item.category.as_str().contains(term.as_str())
            }
        }
    }

    /// Matching items, in catalog order.
    pub fn apply(&self, items: &[ActivityItem]) -> Vec<ActivityItem> {
        items.iter().filter(|i| self.matches(i)).cloned().collect()
    }
}

/// Number of items per category. Every category is present, possibly zero.
pub fn category_counts(items: &[ActivityItem]) -> BTreeMap<Category, usize> {
    let mut counts: BTreeMap<Category, usize> = Category::ALL.into_iter().map(|c| (c, 0)).collect();
    for item in items {
        *counts.entry(item.category).or_default() += 1;
    }
    counts
}

/// Items grouped by start date, dates ascending, catalog order within a date.
pub fn group_by_date(items: &[ActivityItem]) -> BTreeMap<NaiveDate, Vec<&ActivityItem>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&ActivityItem>> = BTreeMap::new();
    for item in items {
        by_date.entry(item.start_date()).or_default().push(item);
    }
    by_date
}

/// Where an item sits relative to today, for timeline styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    Past,
    Today,
    Upcoming,
}

impl DayStatus {
    pub fn of(item: &ActivityItem, today: NaiveDate) -> Self {
        if spans(item, today) {
            DayStatus::Today
        } else if item.last_date() < today {
            DayStatus::Past
        } else {
            DayStatus::Upcoming
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            DayStatus::Past => "past",
            DayStatus::Today => "today",
            DayStatus::Upcoming => "upcoming",
        }
    }
}
