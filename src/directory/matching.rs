//! Tolerant patient-name matching.
//!
//! Rules are tried in priority order and the first rule with any candidate
//! wins: exact (case-insensitive), substring in either direction, then
//! last-token equality. Ties prefer the name whose length is closest to the
//! query, then the earliest record.

use crate::models::PatientRecord;

/// Which rule produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Substring,
    LastName,
}

/// Lowercase and collapse internal whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|token| token.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Find the best record for `query`. Returns the record's position and the rule used.
pub fn find_match(records: &[PatientRecord], query: &str) -> Option<(usize, MatchKind)> {
    let query = normalize_name(query);
    if query.is_empty() {
        return None;
    }

    let names: Vec<String> = records.iter().map(|r| normalize_name(&r.full_name)).collect();

    if let Some(pos) = names.iter().position(|name| *name == query) {
        return Some((pos, MatchKind::Exact));
    }

    let substring = closest(&names, &query, |name| {
        name.contains(query.as_str()) || query.contains(name)
    });
    if let Some(pos) = substring {
        return Some((pos, MatchKind::Substring));
    }

    let query_last = query.rsplit(' ').next().unwrap_or_default();
    let last_name = closest(&names, &query, |name| {
        name.rsplit(' ').next().unwrap_or_default() == query_last
    });
    last_name.map(|pos| (pos, MatchKind::LastName))
}

fn closest<F>(names: &[String], query: &str, accept: F) -> Option<usize>
where
    F: Fn(&str) -> bool,
{
    let query_len = query.chars().count();
    names
        .iter()
        .enumerate()
        .filter(|(_, name)| !name.is_empty() && accept(name))
        // min_by_key keeps the first of equal keys, i.e. insertion order
        .min_by_key(|(_, name)| name.chars().count().abs_diff(query_len))
        .map(|(pos, _)| pos)
}
