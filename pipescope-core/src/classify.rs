//! Query complexity classifier
//!
//! Rule-based and deterministic: the same message always yields the same
//! label. Messages are scored on four signals and the score is mapped onto
//! the ordinal bands.
//!
//! ## Scoring
//!
//! | Signal | Points |
//! |--------|--------|
//! | Word count | `<= 8`: 0, `<= 20`: 1, `<= 40`: 2, otherwise 3 |
//! | Distinct technical terms | `< 2`: 0, `< 4`: 1, otherwise 2 |
//! | Code markers present | 1 |
//! | Clause count `>= 3` | 1 |
//!
//! | Score | Label |
//! |-------|-------|
//! | 0 | simple |
//! | 1-2 | moderate |
//! | 3-4 | complex |
//! | 5+ | advanced |
//!
//! Empty or whitespace-only input is always `simple`. Input longer than
//! [`LONG_MESSAGE_WORDS`] words or [`LONG_MESSAGE_CHARS`] characters is
//! always `advanced`, whatever the other signals say.

use crate::types::{ComplexityLabel, MessageFeatures};
use std::collections::BTreeSet;

/// Word count above which a message is `advanced` outright.
pub const LONG_MESSAGE_WORDS: usize = 60;

/// Character count above which a message is `advanced` outright.
pub const LONG_MESSAGE_CHARS: usize = 400;

const TECHNICAL_TERMS: &[&str] = &[
    "algorithm",
    "analytics",
    "api",
    "application",
    "async",
    "cache",
    "cluster",
    "clusters",
    "concurrency",
    "container",
    "containers",
    "data",
    "database",
    "databases",
    "debug",
    "deploy",
    "design",
    "distributed",
    "docker",
    "index",
    "kafka",
    "kubernetes",
    "latency",
    "learning",
    "machine",
    "microservices",
    "model",
    "models",
    "network",
    "networks",
    "neural",
    "nosql",
    "optimize",
    "performance",
    "pipeline",
    "python",
    "query",
    "real-time",
    "rest",
    "rust",
    "schema",
    "spark",
    "sql",
    "streaming",
    "thread",
    "threads",
    "transaction",
    "transactions",
    "warehouse",
];

const CONNECTIVES: &[&str] = &["and", "then", "while", "but", "because", "which"];

const QUESTION_OPENERS: &[&str] = &[
    "what", "how", "why", "can", "could", "should", "is", "does",
];

/// Punctuation stripped from both ends of a token before keyword matching.
const TOKEN_PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '(', ')', '[', ']', '{', '}', '"', '\'', '`',
];

/// Classifier output: the band and the features that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub label: ComplexityLabel,
    pub features: MessageFeatures,
    /// Raw score before band mapping; `None` when a short-circuit rule applied
    pub score: Option<u32>,
}

/// Classify a message. Never fails.
pub fn classify(message: &str) -> Classification {
    let features = extract_features(message);

    if features.word_count == 0 {
        return Classification {
            label: ComplexityLabel::Simple,
            features,
            score: None,
        };
    }

    if features.word_count > LONG_MESSAGE_WORDS || features.char_count > LONG_MESSAGE_CHARS {
        return Classification {
            label: ComplexityLabel::Advanced,
            features,
            score: None,
        };
    }

    let score = score(&features);
    Classification {
        label: label_for_score(score),
        features,
        score: Some(score),
    }
}

/// Extract the classifier's features from a message.
pub fn extract_features(message: &str) -> MessageFeatures {
    let text = message.trim();
    if text.is_empty() {
        return MessageFeatures::default();
    }

    let tokens: Vec<String> = text
        .split_whitespace()
        .map(|word| word.trim_matches(TOKEN_PUNCTUATION).to_lowercase())
        .collect();

    let technical: BTreeSet<&str> = tokens
        .iter()
        .map(String::as_str)
        .filter(|token| TECHNICAL_TERMS.contains(token))
        .collect();

    let separators = text.chars().filter(|c| matches!(c, ',' | ';')).count();
    let connectives = tokens
        .iter()
        .filter(|token| CONNECTIVES.contains(&token.as_str()))
        .count();

    MessageFeatures {
        char_count: text.chars().count(),
        word_count: tokens.len(),
        clause_count: 1 + separators + connectives,
        technical_terms: technical.len(),
        has_code: has_code(text),
        has_question: has_question(text, tokens.first()),
    }
}

fn has_code(text: &str) -> bool {
    text.contains("```")
        || text.contains("def ")
        || text.contains("fn ")
        || text.contains("()")
        || text.to_lowercase().contains("function")
        || (text.contains('{') && text.contains('}'))
}

fn has_question(text: &str, first_token: Option<&String>) -> bool {
    if text.contains('?') {
        return true;
    }
    // "what's" counts as "what"
    first_token
        .and_then(|token| token.split('\'').next())
        .is_some_and(|word| QUESTION_OPENERS.contains(&word))
}

fn score(features: &MessageFeatures) -> u32 {
    let length = match features.word_count {
        0..=8 => 0,
        9..=20 => 1,
        21..=40 => 2,
        _ => 3,
    };
    let technical = match features.technical_terms {
        0..=1 => 0,
        2..=3 => 1,
        _ => 2,
    };
    let code = u32::from(features.has_code);
    let clauses = u32::from(features.clause_count >= 3);

    length + technical + code + clauses
}

fn label_for_score(score: u32) -> ComplexityLabel {
    match score {
        0 => ComplexityLabel::Simple,
        1..=2 => ComplexityLabel::Moderate,
        3..=4 => ComplexityLabel::Complex,
        _ => ComplexityLabel::Advanced,
    }
}
