//! Bilingual (English / Hebrew) term tables
//!
//! Every alias is lower-case. Matching is done against the lower-cased
//! utterance. Short ASCII aliases (three characters or fewer) must stand
//! alone as a word so that `rr` does not fire inside "error" or `es`
//! inside "trades"; everything else matches as a substring.

use crate::entities::dates;
use lazy_static::lazy_static;
use std::collections::HashSet;

/// A named group of aliases, e.g. a strategy and its spellings
#[derive(Debug, Clone, Copy)]
pub struct TermGroup {
    pub key: &'static str,
    pub aliases: &'static [&'static str],
}

/// Static keyword lists
pub const LOSS_TERMS: &[&str] = &["loss", "lost", "הפסד", "הפסדתי"];

/// Profit-and-loss mentions; includes every loss alias
pub const PNL_TERMS: &[&str] = &[
    "pnl", "p&l", "profit", "won",
    "loss", "lost",
    "רווח והפסד", "רווח", "הפסד", "ריווח", "הפסדתי", "הרווחתי",
];

pub const RR_TERMS: &[&str] = &["rr", "r:r", "risk/reward", "סיכון/סיכוי", "יחס סיכון"];

pub const WINRATE_TERMS: &[&str] = &["winrate", "win rate", "אחוז הצלחה"];

pub const SYMBOL_TERMS: &[&str] = &["nq", "es", "btc", "eth"];

pub const ANALYSIS_TERMS: &[&str] = &[
    "analyze", "analysis", "flaws", "weaknesses", "strengths", "good at", "bad at",
    "improve", "performance",
    "ניתוח", "נתח", "טעויות", "חולשות", "חוזקות", "טוב ב", "להשתפר", "ביצועים",
];

/// Strategy tags, in the order they are reported
pub const STRATEGY_GROUPS: &[TermGroup] = &[
    TermGroup { key: "smt", aliases: &["smt", "smart money technique"] },
    TermGroup { key: "ifvg", aliases: &["ifvg", "inversion fair value gap"] },
    TermGroup { key: "turtle soup", aliases: &["turtle soup", "צבי מרק"] },
    TermGroup { key: "amd", aliases: &["amd", "accumulation manipulation distribution"] },
    TermGroup { key: "breakout", aliases: &["breakout", "break out", "פריצה"] },
    TermGroup { key: "reversal", aliases: &["reversal", "היפוך"] },
    TermGroup { key: "scalp", aliases: &["scalp", "סקאלפ"] },
];

// Intent keywords (plain substring match)
pub const ADD_KEYWORDS: &[&str] = &["הוסף", "add", "log"];
pub const UPDATE_KEYWORDS: &[&str] = &["עדכן", "update", "שנה", "edit"];
pub const DELETE_KEYWORDS: &[&str] = &["מחק", "delete", "remove"];
pub const SEARCH_KEYWORDS: &[&str] = &["חפש", "מצא", "search", "find", "show me", "הצג"];
pub const COMPARE_KEYWORDS: &[&str] = &["השווה", "compare"];
pub const SUMMARY_KEYWORDS: &[&str] = &["סיכום", "summary"];

pub const CASUAL_GREETINGS: &[&str] = &["מה קורה", "מה נשמע", "what's up", "how's it going", "מה חדש"];
pub const HOW_ARE_YOU: &[&str] = &["מה שלומך", "how are you"];
pub const WHAT_NOW: &[&str] = &["מה עכשיו", "what now", "מה הלאה"];
pub const GREETINGS: &[&str] = &["היי", "שלום", "hey", "hello"];

/// Words that look like tickers but never are
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "so", "to", "of", "in", "on", "at", "by",
    "for", "from", "with", "into", "onto", "off", "out", "up", "down", "over", "as",
    "is", "it", "its", "was", "were", "be", "been", "am", "are", "do", "did", "does",
    "done", "have", "has", "had", "got", "get", "gets", "i", "im", "me", "my", "mine",
    "we", "us", "our", "you", "your", "he", "she", "they", "them", "their", "this",
    "that", "these", "those", "there", "here", "what", "when", "where", "which", "who",
    "why", "how", "all", "any", "some", "no", "not", "yes", "ok", "okay", "please",
    "thanks", "thank", "just", "also", "then", "than", "too", "very", "more", "most",
    "less", "much", "many", "one", "two", "three", "four", "five", "ten", "last",
    "first", "next", "new", "old", "my", "trade", "trades", "trading", "entry",
    "exit", "stop", "target", "long", "short", "buy", "sell", "bought", "sold",
    "made", "make", "took", "take", "went", "go", "it's", "can", "could", "would",
    "should", "will", "let", "lets", "want", "need", "like", "about", "again",
    "dollar", "usd", "bucks", "points", "pts", "ticks", "tick", "today", "tonight",
    "ago", "day", "days", "week", "weeks", "month", "months", "year", "years",
    "yday", "morning", "night", "since", "before", "after", "pm", "setup", "was",
    "with", "plan", "note",
    "notes", "hi", "show", "tell", "give", "list", "all", "strat", "had", "great",
    "good", "bad", "nice", "win", "wins", "winner", "again", "only", "same",
];

lazy_static! {
    /// Every ASCII word that appears in a stop-word or a non-symbol alias
    static ref RESERVED_WORDS: HashSet<String> = {
        let mut words: HashSet<String> = STOP_WORDS.iter().map(|w| w.to_string()).collect();
        words.extend(dates::MONTHS.split('|').map(str::to_string));
        words.extend(dates::WEEKDAYS.split('|').map(str::to_string));

        let alias_lists: [&[&str]; 17] = [
            LOSS_TERMS, PNL_TERMS, RR_TERMS, WINRATE_TERMS, ANALYSIS_TERMS,
            ADD_KEYWORDS, UPDATE_KEYWORDS, DELETE_KEYWORDS, SEARCH_KEYWORDS,
            COMPARE_KEYWORDS, SUMMARY_KEYWORDS, CASUAL_GREETINGS, HOW_ARE_YOU,
            WHAT_NOW, GREETINGS, &["strategy", "symbol", "ticker"], &["rate", "ratio"],
        ];
        let strategy_aliases = STRATEGY_GROUPS.iter().flat_map(|g| g.aliases.iter());

        for alias in alias_lists.iter().flat_map(|list| list.iter()).chain(strategy_aliases) {
            for word in alias.split(|c: char| !c.is_ascii_alphanumeric()) {
                if !word.is_empty() {
                    words.insert(word.to_string());
                }
            }
        }

        words
    };
}

/// Check whether `alias` occurs in the lower-cased `text`
pub fn mentions(text: &str, alias: &str) -> bool {
    let short_word = alias.len() <= 3 && alias.chars().all(|c| c.is_ascii_alphanumeric());
    if !short_word {
        return text.contains(alias);
    }

    text.match_indices(alias).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + alias.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

pub fn mentions_any(text: &str, aliases: &[&str]) -> bool {
    aliases.iter().any(|alias| mentions(text, alias))
}

/// Plain substring test used by the intent keyword lists
pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}

/// Strategy keys mentioned in the lower-cased text, deduplicated, in table order
pub fn strategy_tags(text: &str) -> Vec<String> {
    STRATEGY_GROUPS
        .iter()
        .filter(|group| mentions_any(text, group.aliases))
        .map(|group| group.key.to_string())
        .collect()
}

pub fn is_known_symbol(word: &str) -> bool {
    SYMBOL_TERMS.contains(&word)
}

/// Lower-case word that can never be a ticker
pub fn is_reserved_word(word: &str) -> bool {
    !is_known_symbol(word) && RESERVED_WORDS.contains(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_aliases_need_word_boundaries() {
        assert!(mentions("my rr was 2", "rr"));
        assert!(mentions("r r rr", "rr"));
        assert!(!mentions("there was an error", "rr"));
        assert!(!mentions("show me all trades", "es"));
        assert!(mentions("es was choppy", "es"));
        assert!(mentions("took an smt entry", "smt"));
    }

    #[test]
    fn test_long_aliases_match_substrings() {
        assert!(mentions("clean breakouts today", "breakout"));
        assert!(mentions("הפסדתי 200 היום", "הפסד"));
        assert!(mentions_any("what's my winrate?", WINRATE_TERMS));
    }

    #[test]
    fn test_loss_aliases_are_pnl_aliases() {
        for alias in LOSS_TERMS {
            assert!(PNL_TERMS.contains(alias), "{} missing from PNL_TERMS", alias);
        }
    }

    #[test]
    fn test_strategy_tags_are_deduplicated_and_ordered() {
        let tags = strategy_tags("amd then smt, smart money technique again");
        assert_eq!(tags, vec!["smt".to_string(), "amd".to_string()]);
        assert_eq!(strategy_tags("it was a turtle soup"), vec!["turtle soup".to_string()]);
        assert!(strategy_tags("no setup here").is_empty());
    }

    #[test]
    fn test_reserved_words() {
        assert!(is_reserved_word("lost"));
        assert!(is_reserved_word("smt"));
        assert!(is_reserved_word("the"));
        assert!(!is_reserved_word("nq"));
        assert!(!is_reserved_word("aapl"));
    }

    #[test]
    fn test_calendar_words_are_reserved() {
        for word in ["march", "april", "august", "sept", "dec", "wednesday", "saturday", "pm"] {
            assert!(is_reserved_word(word), "{} should be reserved", word);
        }
    }
}
