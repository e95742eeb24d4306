//! Percentile and ranking math for comparing homes.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Share of `population` that `value` beats, counting ties as half, 0-100.
///
/// Returns `None` for an empty population.
pub fn percentile_rank(value: f64, population: &[f64], higher_is_better: bool) -> Option<f64> {
    if population.is_empty() {
        return None;
    }
    let (worse, ties) = population.iter().fold((0usize, 0usize), |(worse, ties), &p| {
        let beaten = if higher_is_better { p < value } else { p > value };
        if p == value {
            (worse, ties + 1)
        } else if beaten {
            (worse + 1, ties)
        } else {
            (worse, ties)
        }
    });
    let pct = (worse as f64 + ties as f64 / 2.0) / population.len() as f64 * 100.0;
    Some((pct * 10.0).round() / 10.0)
}

/// Letter grade for a heat-loss factor per square foot (BTU/hr/°F/ft²).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

pub fn efficiency_grade(heat_loss_per_sqft: f64) -> Grade {
    match heat_loss_per_sqft {
        v if v < 0.15 => Grade::A,
        v if v < 0.20 => Grade::B,
        v if v < 0.27 => Grade::C,
        v if v < 0.35 => Grade::D,
        _ => Grade::F,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// 1-based; tied scores share a rank and the next rank is skipped
    pub rank: usize,
    pub name: String,
    pub score: f64,
    pub percentile: f64,
}

/// Order entries best first and assign competition ranks ("1224").
pub fn rank(entries: &[LeaderboardEntry], higher_is_better: bool) -> Vec<RankedEntry> {
    let mut sorted: Vec<&LeaderboardEntry> = entries.iter().filter(|e| e.score.is_finite()).collect();
    sorted.sort_by(|a, b| {
        let ord = a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal);
        let ord = if higher_is_better { ord.reverse() } else { ord };
        ord.then_with(|| a.name.cmp(&b.name))
    });
    let scores: Vec<f64> = sorted.iter().map(|e| e.score).collect();

    let mut ranked: Vec<RankedEntry> = Vec::with_capacity(sorted.len());
    for (i, entry) in sorted.iter().enumerate() {
        let rank = match ranked.last() {
            Some(prev) if prev.score == entry.score => prev.rank,
            _ => i + 1,
        };
        ranked.push(RankedEntry {
            rank,
            name: entry.name.clone(),
            score: entry.score,
            percentile: percentile_rank(entry.score, &scores, higher_is_better).unwrap_or(0.0),
        });
    }
    ranked
}
