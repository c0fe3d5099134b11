//! Entity extraction
//!
//! Turns a raw utterance into a sparse set of structured values: PnL,
//! risk/reward, ticker symbol, strategy tags and a date. Only fields that
//! were actually detected are set. Ambiguity is resolved by taking the
//! first match; nothing here ever fails.

pub mod dates;

use crate::lexicon::{self, LOSS_TERMS, PNL_TERMS, RR_TERMS};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"-?\d+(?:\.\d+)?").unwrap();
    static ref SYMBOL_RE: Regex = Regex::new(r"(?i)\b[a-z]{2,6}\d{0,2}\b").unwrap();
}

/// Characters removed before looking for numbers
const NUMBER_NOISE: &[char] = &[',', '$', '₪', '€', '£'];

/// Structured values detected in one utterance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strategies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl Entities {
    pub fn is_empty(&self) -> bool {
        *self == Entities::default()
    }
}

/// Every signed decimal number in the text, in order of appearance
pub fn parse_numbers(text: &str) -> Vec<f64> {
    let cleaned: String = text.chars().filter(|c| !NUMBER_NOISE.contains(c)).collect();

    NUMBER_RE
        .find_iter(&cleaned)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

/// Pick a ticker-looking token.
///
/// Stop-words and lexicon words are skipped. A well-known symbol or a token
/// typed in upper case wins; otherwise the first remaining candidate is used.
pub fn extract_symbol(text: &str) -> Option<String> {
    let mut fallback = None;

    for token in SYMBOL_RE.find_iter(text).map(|m| m.as_str()) {
        let lower = token.to_ascii_lowercase();
        if lexicon::is_reserved_word(&lower) {
            continue;
        }

        let typed_upper = !token.chars().any(|c| c.is_ascii_lowercase());
        if lexicon::is_known_symbol(&lower) || typed_upper {
            return Some(token.to_ascii_uppercase());
        }

        if fallback.is_none() {
            fallback = Some(token.to_ascii_uppercase());
        }
    }

    fallback
}

/// Extract entities, resolving relative dates against `now`
pub fn extract_entities(text: &str, now: DateTime<Utc>) -> Entities {
    let lower = text.to_lowercase();
    let mut entities = Entities::default();

    if let Some(&first) = parse_numbers(text).first() {
        if lexicon::mentions_any(&lower, PNL_TERMS) {
            let forced_loss = lexicon::mentions_any(&lower, LOSS_TERMS) || first < 0.0;
            entities.pnl = Some(if forced_loss { -first.abs() } else { first });
        }
        if lexicon::mentions_any(&lower, RR_TERMS) {
            entities.rr = Some(first.abs());
        }
    }

    entities.symbol = extract_symbol(text);
    entities.strategies = lexicon::strategy_tags(&lower);
    entities.date = dates::resolve(&lower, now);

    debug!(utterance = %text, ?entities, "Extracted entities");

    entities
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap()
    }

    #[test]
    fn test_parse_numbers_strips_separators_and_currency() {
        assert_eq!(parse_numbers("made $1,250.50 then -30"), vec![1250.5, -30.0]);
        assert!(parse_numbers("no digits here").is_empty());
    }

    #[test]
    fn test_loss_alias_forces_negative_pnl() {
        let cases = ["lost 150 on NQ", "loss of 200", "הפסדתי 300 היום", "pnl -80"];
        for c in cases {
            let e = extract_entities(c, now());
            let pnl = e.pnl.unwrap_or_else(|| panic!("no pnl for {}", c));
            assert!(pnl < 0.0, "{} gave {}", c, pnl);
        }
    }

    #[test]
    fn test_profit_stays_positive() {
        let e = extract_entities("profit 420 on ES", now());
        assert_eq!(e.pnl, Some(420.0));
        assert_eq!(e.symbol.as_deref(), Some("ES"));
    }

    #[test]
    fn test_no_pnl_without_alias() {
        let e = extract_entities("NQ 300", now());
        assert_eq!(e.pnl, None);
        assert_eq!(e.symbol.as_deref(), Some("NQ"));
    }

    #[test]
    fn test_rr_and_pnl_share_first_number() {
        let e = extract_entities("profit 2 with rr 3", now());
        assert_eq!(e.pnl, Some(2.0));
        assert_eq!(e.rr, Some(2.0));
    }

    #[test]
    fn test_symbol_skips_common_words() {
        assert_eq!(extract_symbol("lost 150 dollars, it was a breakout"), None);
        assert_eq!(extract_symbol("add a trade on nq"), Some("NQ".to_string()));
        assert_eq!(extract_symbol("bought tsla calls"), Some("TSLA".to_string()));
        assert_eq!(extract_symbol("closed MNQ1 early"), Some("MNQ1".to_string()));
    }

    #[test]
    fn test_strategies_and_sparse_output() {
        let e = extract_entities("hello there", now());
        assert!(e.is_empty());

        let e = extract_entities("won 500 with smt and turtle soup", now());
        assert_eq!(e.strategies, vec!["smt".to_string(), "turtle soup".to_string()]);
    }

    #[test]
    fn test_date_is_extracted() {
        let e = extract_entities("show me yesterday's trades", now());
        assert_eq!(e.date.map(|d| d.date_naive()), Some(now().date_naive().pred_opt().unwrap()));
    }

    #[test]
    fn test_month_names_are_not_symbols() {
        let e = extract_entities("show me trades from march 3rd", now());
        assert_eq!(e.symbol, None);
        assert_eq!(
            e.date.map(|d| d.date_naive()),
            chrono::NaiveDate::from_ymd_opt(2024, 3, 3)
        );

        assert_eq!(extract_symbol("april 5"), None);
        assert_eq!(extract_symbol("august 2 on wednesday at 3 pm"), None);
        assert_eq!(extract_symbol("nq on march 3rd"), Some("NQ".to_string()));
    }
}
