//! Search metrics extracted from the solver's console output.
//!
//! This is the only place that knows the client's log phrasing:
//!
//! ```text
//! Found solution of length 42.
//! #Expanded:    4,230, #Frontier:      512, #Generated:    9,871, Time: 1.204 s
//! Memory used: 0.42 GB
//! Unable to solve level.
//! ```
//!
//! Extraction is total: any line that does not parse leaves the affected
//! field unknown and the rest of the record intact.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const SOLUTION_MARKER: &str = "Found solution of length";
const STATS_MARKER: &str = "#Expanded:";
const MEMORY_MARKER: &str = "Memory used:";
const FAILURE_MARKER: &str = "Unable to solve level";

/// Metrics recovered from one run's output. Every field may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialMetrics {
    /// Whether the final verdict in the output is a solution.
    pub solved: bool,
    /// Length of the reported solution.
    pub solution_length: Option<u64>,
    /// Nodes expanded, from the last statistics line reporting it.
    pub expanded: Option<u64>,
    /// Frontier size, from the last statistics line reporting it.
    pub frontier: Option<u64>,
    /// Nodes generated, from the last statistics line reporting it.
    pub generated: Option<u64>,
    /// Search time in seconds as reported by the client.
    pub time_seconds: Option<f64>,
    /// Memory usage, verbatim.
    pub memory: Option<String>,
}

struct StatsPatterns {
    expanded: Regex,
    frontier: Regex,
    generated: Regex,
    time: Regex,
}

fn stats_patterns() -> &'static StatsPatterns {
    static PATTERNS: OnceLock<StatsPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // One token, then any number of three-digit groups: "4,230,326",
        // "4.230.326", "4 230", "4'230". "1x2" stays one (unparseable) token.
        let count = r"\s*([^\s,]+(?:[,.' \u{00A0}\u{202F}][0-9]{3})*)";
        StatsPatterns {
            expanded: Regex::new(&format!("#Expanded:{count}")).expect("static regex"),
            frontier: Regex::new(&format!("#Frontier:{count}")).expect("static regex"),
            generated: Regex::new(&format!("#Generated:{count}")).expect("static regex"),
            time: Regex::new(r"Time:\s*([0-9][0-9.,]*)\s*s").expect("static regex"),
        }
    })
}

/// Parses the combined output of one run.
pub fn extract(raw: &str) -> PartialMetrics {
    let mut metrics = PartialMetrics::default();

    for line in raw.lines() {
        if let Some(idx) = line.find(SOLUTION_MARKER) {
            // A truncated marker with no readable length is not a solution.
            if let Some(length) = parse_count(&line[idx + SOLUTION_MARKER.len()..]) {
                metrics.solved = true;
                metrics.solution_length = Some(length);
            }
        }

        if line.contains(STATS_MARKER) {
            merge_stats(&mut metrics, line);
        }

        if let Some(idx) = line.find(MEMORY_MARKER) {
            let amount = line[idx + MEMORY_MARKER.len()..].trim();
            if !amount.is_empty() {
                metrics.memory = Some(amount.to_string());
            }
        }

        if line.contains(FAILURE_MARKER) {
            metrics.solved = false;
        }
    }

    metrics
}

/// Fields missing from this line keep their previous value.
fn merge_stats(metrics: &mut PartialMetrics, line: &str) {
    let patterns = stats_patterns();
    let capture = |re: &Regex| re.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str());

    if let Some(value) = capture(&patterns.expanded).and_then(parse_count) {
        metrics.expanded = Some(value);
    }
    if let Some(value) = capture(&patterns.frontier).and_then(parse_count) {
        metrics.frontier = Some(value);
    }
    if let Some(value) = capture(&patterns.generated).and_then(parse_count) {
        metrics.generated = Some(value);
    }
    if let Some(value) = capture(&patterns.time).and_then(parse_seconds) {
        metrics.time_seconds = Some(value);
    }
}

fn is_group_separator(c: char) -> bool {
    matches!(c, ',' | '.' | '\'' | '_' | ' ' | '\u{00A0}' | '\u{202F}')
}

/// Parses an integer count, dropping grouping separators and trailing
/// punctuation. Returns `None` on anything else.
pub fn parse_count(raw: &str) -> Option<u64> {
    let trimmed = raw
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
    if trimmed.is_empty() || !trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let mut digits = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if !is_group_separator(c) {
            return None;
        }
    }
    digits.parse().ok()
}

/// Parses a seconds value written with either `.` or `,` as decimal mark.
///
/// With both marks present the last one is the decimal mark. A lone comma is
/// a decimal mark (the client always prints three decimals). Several commas
/// and no dot are grouping.
pub fn parse_seconds(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_end_matches(&['s', ' '][..]);
    if s.is_empty() {
        return None;
    }

    let last_dot = s.rfind('.');
    let last_comma = s.rfind(',');
    let normalized = match (last_dot, last_comma) {
        (Some(d), Some(c)) if c > d => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (None, Some(_)) if s.matches(',').count() == 1 => s.replace(',', "."),
        (None, Some(_)) => s.replace(',', ""),
        _ => s.to_string(),
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}
