//! Local lexicon sentiment scoring.
//!
//! Sentiment of a task is never taken from the remote model; it is derived
//! here from the task text alone so identical text always gets the same
//! label.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use taskmind_core::Sentiment;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]+(?:'[a-z]+)?").unwrap());

static POSITIVE: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "achieve", "awesome", "celebrate", "clean", "complete", "easy", "enjoy", "excellent",
        "excited", "exciting", "fantastic", "fun", "glad", "good", "great", "happy", "improve",
        "improved", "launch", "love", "nice", "opportunity", "perfect", "pleased", "progress",
        "reward", "simple", "smooth", "success", "successful", "thanks", "win", "wonderful",
    ]
    .into_iter()
    .collect()
});

static NEGATIVE: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "angry", "annoying", "awful", "bad", "blocked", "broken", "bug", "crash", "crashes",
        "difficult", "disaster", "error", "fail", "failed", "failing", "failure", "frustrated",
        "frustrating", "hard", "hate", "issue", "late", "mess", "outage", "pain", "painful",
        "problem", "sad", "stress", "stressful", "stuck", "terrible", "tired", "ugly", "worried",
        "worse", "worst", "wrong",
    ]
    .into_iter()
    .collect()
});

static NEGATORS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "not", "no", "never", "don't", "doesn't", "isn't", "wasn't", "won't", "can't", "without",
    ]
    .into_iter()
    .collect()
});

/// Signed lexicon score; a negator directly before a word flips it.
pub fn sentiment_score(text: &str) -> i32 {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = WORD_RE.find_iter(&lowered).map(|m| m.as_str()).collect();

    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let polarity = if POSITIVE.contains(*word) {
                1
            } else if NEGATIVE.contains(*word) {
                -1
            } else {
                0
            };
            let negated = i > 0 && NEGATORS.contains(words[i - 1]);
            if negated {
                -polarity
            } else {
                polarity
            }
        })
        .sum()
}

/// Classify task text as positive, negative or neutral.
pub fn analyze_sentiment(text: &str) -> Sentiment {
    match sentiment_score(text) {
        s if s > 0 => Sentiment::Positive,
        s if s < 0 => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}
