//! Icon lookup for activity titles.
//!
//! The tables are plain data. Lookup order: exact (case-insensitive) title,
//! then the first keyword contained in the title, then the category
//! fallback. Add new entries to the tables; do not add branches.

use crate::types::Category;

/// Titles that get a dedicated icon regardless of keywords.
const EXACT_TITLES: &[(&str, &str)] = &[
    ("fun", "🎉"),
    ("shiva assur b'tammuz", "🕊️"),
    ("neot kedumim", "🌾"),
    ("raft building", "🛶"),
    ("goat herding", "🐐"),
    ("goodbye :(", "👋"),
    ("tefillin at army base", "🕯️"),
    ("akko's tunisian synagogue", "🕍"),
    ("rosh hanikra", "🏞️"),
    ("tiveria tayelet", "🚶"),
    ("aqua kef", "💦"),
    ("rechov yerushalayim", "🏙️"),
    ("biking the kineret", "🚴"),
    ("meiron", "🕍"),
    ("chevron", "🏘️"),
    ("shuva- grill for the soldiers", "🍖"),
    ("ein mabua", "💧"),
    ("susya", "🏜️"),
    ("sleep at gemalia desert oasis", "🏜️"),
    ("s'dei chemed's got talent", "🎤"),
    ("unwind session", "🫧"),
    ("personal time", "🤍"),
    ("reflection", "🤔"),
    ("quiet hour", "🤫"),
    ("open block", "📦"),
    ("flex time", "🔄"),
    ("group hangout", "👥"),
    ("chill session", "🧊"),
    ("social hour", "🗣️"),
    ("free period", "🕒"),
    ("break time", "☕"),
    ("relaxation", "🧘"),
];

/// Substring rules, first match wins. Order matters: more specific phrases
/// sit above the generic words they contain.
const KEYWORDS: &[(&str, &str)] = &[
    ("kever", "🕯️"),
    ("orientation", "📋"),
    ("welcome", "👋"),
    ("departure", "✈️"),
    ("arrival", "🚌"),
    ("check in", "📝"),
    ("check out", "📋"),
    ("camp day", "🏕️"),
    ("chill day", "😌"),
    ("water sports", "🏄"),
    ("sports", "⚽"),
    ("gaga", "🏃"),
    ("dodgeball", "⚾"),
    ("capture the flag", "🚩"),
    ("capture the counselor", "🎯"),
    ("banana boating", "🍌"),
    ("fear factor", "😱"),
    ("stomp", "👟"),
    ("ice mall", "❄️"),
    ("dolphins", "🐬"),
    ("bbq", "🍖"),
    ("pizza", "🍕"),
    ("sushi", "🍣"),
    ("forest walk", "🌲"),
    ("natural spring", "💧"),
    ("cave", "🕳️"),
    ("haunted house", "👻"),
    ("blind museum", "🕶️"),
    ("nova festival", "🎪"),
    ("memorial", "🕊️"),
    ("sderot", "🏘️"),
    ("yad v'shem", "🕯️"),
    ("tisha bav", "🕊️"),
    ("hidden waterfall", "🌊"),
    ("black canyon", "🏔️"),
    ("party boat", "🎉"),
    ("grape harvest", "🍇"),
    ("red canyon", "🏜️"),
    ("timna park", "🏞️"),
    ("hot ones", "🌶️"),
    ("shabbos", "🕯️"),
    ("tzfat", "🏔️"),
    ("tzfas", "🏔️"),
    ("kotel", "🕊️"),
    ("wall", "🕊️"),
    ("museum", "🏛️"),
    ("market", "🛒"),
    ("shuk", "🛒"),
    ("beach", "🏖️"),
    ("eilat", "🏖️"),
    ("hiking", "🥾"),
    ("hike", "🥾"),
    ("yurts", "⛺"),
    ("overnight", "⛺"),
    ("old city", "🏰"),
    ("flight", "✈️"),
    ("travel", "✈️"),
    ("pool", "🏊"),
    ("swim", "🏊"),
    ("meal", "🍽️"),
    ("dinner", "🍽️"),
    ("tour", "🚌"),
    ("activity", "🎯"),
    ("masada", "🏜️"),
    ("dead sea", "🌊"),
    ("golan", "⛰️"),
    ("rafting", "🛶"),
    ("chocolate", "🍫"),
    ("paintball", "🎨"),
    ("archery", "🏹"),
    ("donkey", "🦙"),
    ("snorkeling", "🤿"),
    ("scuba", "🤿"),
    ("glass", "🪟"),
    ("atv", "🏍️"),
    ("sailing", "⛵"),
    ("boat", "⛵"),
    ("bonfire", "🔥"),
    ("smores", "🍫"),
    ("kumzits", "🎵"),
    ("learning", "📖"),
    ("shiur", "📚"),
    ("davening", "🙏"),
    ("kiddush", "🍷"),
    ("fabrengen", "🎉"),
    ("boys start", "🚀"),
    ("boys end", "🏁"),
    ("talent show", "🎭"),
    ("improv", "🎪"),
    ("dig", "⛏️"),
    ("nap", "😴"),
];

/// Icon used when no title rule matches.
pub fn fallback_icon(category: Category) -> &'static str {
    match category {
        Category::Spiritual => "🙏",
        Category::Adventure => "⛰️",
        Category::Educational => "📚",
        Category::Leisure => "🛋️",
        Category::Travel => "🚐",
        Category::Cultural => "🎨",
    }
}

/// Icon for a category badge or filter tab.
pub fn category_icon(category: Category) -> &'static str {
    match category {
        Category::Spiritual => "🕊️",
        Category::Adventure => "🏔️",
        Category::Educational => "📚",
        Category::Leisure => "🏖️",
        Category::Travel => "✈️",
        Category::Cultural => "🏛️",
    }
}

fn title_icon(title: &str) -> Option<&'static str> {
    let normalized = title.trim().to_lowercase();

    EXACT_TITLES
        .iter()
        .find(|(exact, _)| *exact == normalized)
        .or_else(|| KEYWORDS.iter().find(|(kw, _)| normalized.contains(kw)))
        .map(|(_, icon)| *icon)
}

/// Icon for an activity card.
pub fn icon_for(title: &str, category: Category) -> &'static str {
    title_icon(title).unwrap_or_else(|| fallback_icon(category))
}

/// Whether a title matched a specific rule rather than the category fallback.
pub fn has_specific_icon(title: &str) -> bool {
    title_icon(title).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_exact_title_match_is_case_insensitive() {
        assert_eq!(icon_for("  Rosh Hanikra ", Category::Adventure), "🏞️");
        assert_eq!(icon_for("GOODBYE :(", Category::Travel), "👋");
    }

    #[test]
    fn test_exact_title_beats_keywords() {
        assert_eq!(icon_for("Fun", Category::Leisure), "🎉");
        assert_eq!(icon_for("Sleep at Gemalia Desert Oasis", Category::Travel), "🏜️");
    }

    #[test]
    fn test_keyword_first_match_wins() {
        // "welcome" sits above "arrival"
        assert_eq!(icon_for("Arrival & Welcome", Category::Travel), "👋");
        // "old city" sits above "tour"
        assert_eq!(icon_for("Jerusalem Old City Tour", Category::Cultural), "🏰");
        // "masada" sits above "dead sea"
        assert_eq!(icon_for("Masada & Dead Sea", Category::Adventure), "🏜️");
    }

    #[test]
    fn test_specific_phrases_precede_generic_words() {
        assert_eq!(icon_for("Water Sports Day", Category::Adventure), "🏄");
        assert_eq!(icon_for("Blind Museum", Category::Cultural), "🕶️");
        assert_eq!(icon_for("Party Boat", Category::Leisure), "🎉");
    }

    #[test]
    fn test_category_fallback() {
        assert_eq!(icon_for("Mystery Block", Category::Spiritual), "🙏");
        assert_eq!(icon_for("Mystery Block", Category::Leisure), "🛋️");
        assert_eq!(icon_for("", Category::Cultural), "🎨");
    }

    #[test]
    fn test_has_specific_icon() {
        assert!(has_specific_icon("Eilat Beach Resort"));
        assert!(!has_specific_icon("Mystery Block"));
    }

    #[test]
    fn test_tables_have_no_duplicate_keys() {
        let exact: HashSet<_> = EXACT_TITLES.iter().map(|(k, _)| *k).collect();
        assert_eq!(exact.len(), EXACT_TITLES.len());

        let keywords: HashSet<_> = KEYWORDS.iter().map(|(k, _)| *k).collect();
        assert_eq!(keywords.len(), KEYWORDS.len());
    }

    #[test]
    fn test_tables_are_lowercase() {
        for (key, _) in EXACT_TITLES.iter().chain(KEYWORDS) {
            assert_eq!(*key, key.to_lowercase(), "{key} is not lowercase");
        }
    }

    #[test]
    fn test_every_category_has_icons() {
        for category in Category::ALL {
            assert!(!fallback_icon(category).is_empty());
            assert!(!category_icon(category).is_empty());
        }
    }
}
