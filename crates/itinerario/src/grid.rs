//! Calendar grid construction.
//!
//! A grid is rendered in rows of seven columns. Leading `Empty` cells push
//! the first real day under its weekday column; trailing cells are never
//! padded.

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::resolve::activities_on_date;
use crate::types::ActivityItem;

/// First column of the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

/// One slot of a calendar grid.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    Empty,
    Day {
        date: NaiveDate,
        activities: Vec<&'a ActivityItem>,
    },
}

impl Cell<'_> {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Empty => None,
            Cell::Day { date, .. } => Some(*date),
        }
    }
}

/// Column index of `date`, 0 being the first day of the week.
pub fn weekday_offset(date: NaiveDate, week_start: WeekStart) -> usize {
    let weekday = date.weekday();
    match week_start {
        WeekStart::Sunday => weekday.num_days_from_sunday() as usize,
        WeekStart::Monday => weekday.num_days_from_monday() as usize,
    }
}

pub fn weekday_labels(week_start: WeekStart) -> [&'static str; 7] {
    match week_start {
        WeekStart::Sunday => ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
        WeekStart::Monday => ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"],
    }
}

/// Sunday-first grid for `window_start..=window_end`.
pub fn build_grid<'a>(
    window_start: NaiveDate,
    window_end: NaiveDate,
    catalog: &'a [ActivityItem],
) -> Vec<Cell<'a>> {
    build_grid_with(WeekStart::Sunday, window_start, window_end, catalog)
}

pub fn build_grid_with<'a>(
    week_start: WeekStart,
    window_start: NaiveDate,
    window_end: NaiveDate,
    catalog: &'a [ActivityItem],
) -> Vec<Cell<'a>> {
    debug_assert!(window_start <= window_end, "grid window is reversed");

    let offset = weekday_offset(window_start, week_start);
    let days = (window_end - window_start).num_days().max(-1) + 1;

    let mut cells = Vec::with_capacity(offset + days as usize);
    cells.extend(std::iter::repeat_with(|| Cell::Empty).take(offset));
    cells.extend(
        window_start
            .iter_days()
            .take_while(|date| *date <= window_end)
            .map(|date| Cell::Day {
                date,
                activities: activities_on_date(catalog, date),
            }),
    );
    cells
}

/// Split a display window into per-month windows, clipped to the display
/// window at both ends.
pub fn month_windows(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut windows = Vec::new();
    let mut first = start;

    while first <= end {
        let Some(next_month) = first
            .with_day(1)
            .and_then(|d| d.checked_add_months(Months::new(1)))
        else {
            windows.push((first, end));
            break;
        };
        let Some(month_last) = next_month.checked_sub_days(Days::new(1)) else {
            break;
        };
        windows.push((first, month_last.min(end)));
        first = next_month;
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn leading_empties(cells: &[Cell]) -> usize {
        cells.iter().take_while(|c| **c == Cell::Empty).count()
    }

    fn expected_len(start: NaiveDate, end: NaiveDate) -> usize {
        weekday_offset(start, WeekStart::Sunday) + (end - start).num_days() as usize + 1
    }

    #[test]
    fn test_wednesday_window_has_three_leading_empties() {
        // 2025-01-01 is a Wednesday
        let start = ymd(2025, 1, 1);
        let cells = build_grid(start, ymd(2025, 1, 31), &[]);

        assert_eq!(weekday_offset(start, WeekStart::Sunday), 3);
        assert_eq!(leading_empties(&cells), 3);
        assert_eq!(cells[3].date(), Some(start));
    }

    #[test]
    fn test_grid_length_single_month() {
        // July 2025 starts on a Tuesday
        let (start, end) = (ymd(2025, 7, 1), ymd(2025, 7, 31));
        let cells = build_grid(start, end, &[]);

        assert_eq!(cells.len(), expected_len(start, end));
        assert_eq!(cells.len(), 2 + 31);
    }

    #[test]
    fn test_grid_length_cross_month() {
        let (start, end) = (ymd(2025, 7, 27), ymd(2025, 8, 9));
        let cells = build_grid(start, end, &[]);

        assert_eq!(cells.len(), expected_len(start, end));
        assert_eq!(leading_empties(&cells), 0);
        assert_eq!(cells.last().and_then(Cell::date), Some(end));
    }

    #[test]
    fn test_no_trailing_padding() {
        let cells = build_grid(ymd(2025, 8, 1), ymd(2025, 8, 31), &[]);
        assert!(matches!(cells.last(), Some(Cell::Day { .. })));
    }

    #[test]
    fn test_single_day_window() {
        let d = ymd(2025, 7, 5); // Saturday
        let cells = build_grid(d, d, &[]);
        assert_eq!(cells.len(), 7);
        assert_eq!(cells[6].date(), Some(d));
    }

    #[test]
    fn test_cells_carry_resolved_activities() {
        let catalog = vec![
            ActivityItem::multi_day(
                "eilat",
                "Eilat",
                Category::Leisure,
                ymd(2025, 7, 31),
                ymd(2025, 8, 2),
            )
            .unwrap(),
            ActivityItem::single("pizza", "Pizza Night", Category::Leisure, ymd(2025, 8, 1)),
        ];
        let cells = build_grid(ymd(2025, 8, 1), ymd(2025, 8, 3), &catalog);

        let counts: Vec<usize> = cells
            .iter()
            .filter_map(|c| match c {
                Cell::Day { activities, .. } => Some(activities.len()),
                Cell::Empty => None,
            })
            .collect();
        assert_eq!(counts, vec![2, 1, 0]);
    }

    #[test]
    fn test_monday_week_start() {
        // 2025-07-06 is a Sunday
        let d = ymd(2025, 7, 6);
        assert_eq!(weekday_offset(d, WeekStart::Sunday), 0);
        assert_eq!(weekday_offset(d, WeekStart::Monday), 6);

        let cells = build_grid_with(WeekStart::Monday, d, ymd(2025, 7, 7), &[]);
        assert_eq!(leading_empties(&cells), 6);
        assert_eq!(cells.len(), 8);
    }

    #[test]
    fn test_weekday_labels() {
        assert_eq!(weekday_labels(WeekStart::Sunday)[0], "Sun");
        assert_eq!(weekday_labels(WeekStart::Monday)[6], "Sun");
    }

    #[test]
    fn test_month_windows_full_months() {
        let windows = month_windows(ymd(2025, 7, 1), ymd(2025, 8, 31));
        assert_eq!(
            windows,
            vec![
                (ymd(2025, 7, 1), ymd(2025, 7, 31)),
                (ymd(2025, 8, 1), ymd(2025, 8, 31)),
            ]
        );
    }

    #[test]
    fn test_month_windows_clipped() {
        let windows = month_windows(ymd(2025, 7, 7), ymd(2025, 8, 13));
        assert_eq!(
            windows,
            vec![
                (ymd(2025, 7, 7), ymd(2025, 7, 31)),
                (ymd(2025, 8, 1), ymd(2025, 8, 13)),
            ]
        );
    }

    #[test]
    fn test_month_windows_cross_year_and_leap_february() {
        let windows = month_windows(ymd(2023, 12, 15), ymd(2024, 2, 29));
        assert_eq!(
            windows,
            vec![
                (ymd(2023, 12, 15), ymd(2023, 12, 31)),
                (ymd(2024, 1, 1), ymd(2024, 1, 31)),
                (ymd(2024, 2, 1), ymd(2024, 2, 29)),
            ]
        );
    }

    #[test]
    fn test_month_windows_reversed_is_empty() {
        assert!(month_windows(ymd(2025, 8, 1), ymd(2025, 7, 1)).is_empty());
    }
}
