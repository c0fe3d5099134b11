//! Intent Classifier
//!
//! Maps an utterance to exactly one [`Intent`] by walking an ordered rule
//! table. The first rule that matches wins, so the table order *is* the
//! priority:
//!
//! | # | Rule | Intent |
//! |---|------|--------|
//! | 1 | analysis terms | `get_analysis` |
//! | 2 | add keywords or a PnL alias | `add_trade` |
//! | 3 | update keywords | `update_trade` |
//! | 4 | delete keywords | `delete_trade` |
//! | 5 | search keywords | `search_trades` |
//! | 6 | compare keywords | `compare_strategies` |
//! | 7 | summary keywords or a win-rate alias | `get_summary` |
//! | 8 | casual greetings | `casual_greeting` |
//! | 9 | "how are you" | `how_are_you` |
//! | 10 | "what now" | `what_now` |
//! | 11 | bare greetings | `greeting` |
//! | - | nothing matched | `unknown` |

use crate::lexicon::{self, *};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    GetAnalysis,
    AddTrade,
    UpdateTrade,
    DeleteTrade,
    SearchTrades,
    CompareStrategies,
    GetSummary,
    CasualGreeting,
    HowAreYou,
    WhatNow,
    Greeting,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::GetAnalysis => "get_analysis",
            Intent::AddTrade => "add_trade",
            Intent::UpdateTrade => "update_trade",
            Intent::DeleteTrade => "delete_trade",
            Intent::SearchTrades => "search_trades",
            Intent::CompareStrategies => "compare_strategies",
            Intent::GetSummary => "get_summary",
            Intent::CasualGreeting => "casual_greeting",
            Intent::HowAreYou => "how_are_you",
            Intent::WhatNow => "what_now",
            Intent::Greeting => "greeting",
            Intent::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the priority table
pub struct IntentRule {
    pub intent: Intent,
    /// Plain substring keywords
    pub keywords: &'static [&'static str],
    /// Lexicon alias tables, matched with [`lexicon::mentions_any`]
    pub terms: &'static [&'static [&'static str]],
}

impl IntentRule {
    pub fn matches(&self, lower: &str) -> bool {
        lexicon::contains_any(lower, self.keywords)
            || self.terms.iter().any(|aliases| lexicon::mentions_any(lower, aliases))
    }
}

/// Ordered rule table; earlier rows take precedence
pub const INTENT_RULES: &[IntentRule] = &[
    IntentRule { intent: Intent::GetAnalysis, keywords: &[], terms: &[ANALYSIS_TERMS] },
    IntentRule { intent: Intent::AddTrade, keywords: ADD_KEYWORDS, terms: &[PNL_TERMS] },
    IntentRule { intent: Intent::UpdateTrade, keywords: UPDATE_KEYWORDS, terms: &[] },
    IntentRule { intent: Intent::DeleteTrade, keywords: DELETE_KEYWORDS, terms: &[] },
    IntentRule { intent: Intent::SearchTrades, keywords: SEARCH_KEYWORDS, terms: &[] },
    IntentRule { intent: Intent::CompareStrategies, keywords: COMPARE_KEYWORDS, terms: &[] },
    IntentRule { intent: Intent::GetSummary, keywords: SUMMARY_KEYWORDS, terms: &[WINRATE_TERMS] },
    IntentRule { intent: Intent::CasualGreeting, keywords: CASUAL_GREETINGS, terms: &[] },
    IntentRule { intent: Intent::HowAreYou, keywords: HOW_ARE_YOU, terms: &[] },
    IntentRule { intent: Intent::WhatNow, keywords: WHAT_NOW, terms: &[] },
    IntentRule { intent: Intent::Greeting, keywords: GREETINGS, terms: &[] },
];

/// Intent classifier
pub struct IntentClassifier;

impl IntentClassifier {
    /// Classify an utterance; pure function of its text
    pub fn classify(utterance: &str) -> Intent {
        let lower = utterance.to_lowercase();

        INTENT_RULES
            .iter()
            .find(|rule| rule.matches(&lower))
            .map(|rule| rule.intent)
            .unwrap_or(Intent::Unknown)
    }
}
