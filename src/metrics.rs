use serde::{Deserialize, Serialize};

const AVERAGE_WORD_LENGTH: f64 = 5.0;
/// Live samples at or above this are treated as noise
pub const MAX_PLAUSIBLE_WPM: u32 = 300;

/// Running tallies for one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub correct_chars: usize,
    pub incorrect_chars: usize,
    pub extra_chars: usize,
    pub words_correct: usize,
    pub words_wrong: usize,
    /// Consecutive correct words; zeroed by any wrong word
    pub combo: usize,
    pub best_combo: usize,
}

impl Counters {
    pub fn record_correct_word(&mut self) {
        self.words_correct += 1;
        self.combo += 1;
        self.best_combo = self.best_combo.max(self.combo);
    }

    pub fn record_wrong_word(&mut self) {
        self.words_wrong += 1;
        self.combo = 0;
    }
}

fn wpm(chars: usize, minutes: f64) -> f64 {
    (chars as f64 / AVERAGE_WORD_LENGTH) / minutes
}

/// Instantaneous WPM, or `None` when the value is implausible (`<= 0` or `>= 300`)
pub fn live_wpm(chars: usize, seconds_elapsed: u64) -> Option<u32> {
    if seconds_elapsed == 0 {
        return None;
    }
    let value = wpm(chars, seconds_elapsed as f64 / 60.0).round();
    if value <= 0.0 || value >= MAX_PLAUSIBLE_WPM as f64 {
        None
    } else {
        Some(value as u32)
    }
}

/// One WPM sample per elapsed second
#[derive(Debug, Clone, Default)]
pub struct WpmSampler {
    history: Vec<u32>,
    live: u32,
}

impl WpmSampler {
    /// Append samples for every whole second up to `seconds_elapsed`.
    ///
    /// Implausible values are recorded as 0 so the series stays aligned with
    /// elapsed seconds, but they leave the live reading untouched.
    pub fn sample_until(&mut self, seconds_elapsed: u64, chars_typed: usize) -> usize {
        let mut added = 0;
        while (self.history.len() as u64) < seconds_elapsed {
            let second = self.history.len() as u64 + 1;
            match live_wpm(chars_typed, second) {
                Some(value) => {
                    self.live = value;
                    self.history.push(value);
                }
                None => self.history.push(0),
            }
            added += 1;
        }
        added
    }

    pub fn live(&self) -> u32 {
        self.live
    }

    pub fn history(&self) -> &[u32] {
        &self.history
    }

    /// `(second, wpm)` points for charting
    pub fn chart_points(&self) -> Vec<(f64, f64)> {
        self.history
            .iter()
            .enumerate()
            .map(|(i, &w)| ((i + 1) as f64, w as f64))
            .collect()
    }
}

/// Characters credited for the scored words: each word plus its trailing
/// space, minus the space after the last one.
pub fn total_chars_typed<'a>(scored_words: impl IntoIterator<Item = &'a str>) -> usize {
    scored_words
        .into_iter()
        .map(|w| w.chars().count() + 1)
        .sum::<usize>()
        .saturating_sub(1)
}

pub fn net_wpm(total_chars: usize, elapsed_ms: u64) -> u32 {
    if elapsed_ms == 0 {
        return 0;
    }
    wpm(total_chars, elapsed_ms as f64 / 60_000.0).round() as u32
}

pub fn accuracy(total_chars: usize, incorrect_chars: usize, extra_chars: usize) -> u32 {
    let denominator = total_chars + incorrect_chars + extra_chars;
    if denominator == 0 {
        return 0;
    }
    (total_chars as f64 / denominator as f64 * 100.0).round() as u32
}

fn mean_and_std_dev(samples: &[u32]) -> Option<(f64, f64)> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / n;
    let variance = samples
        .iter()
        .map(|&s| {
            let diff = s as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    Some((mean, variance.sqrt()))
}

/// `100 * (1 - cv)` of the WPM series, floored at 0; 100 with no signal
pub fn consistency(wpm_history: &[u32]) -> u32 {
    match mean_and_std_dev(wpm_history) {
        Some((mean, std_dev)) if mean > 0.0 => {
            (100.0 * (1.0 - std_dev / mean)).round().max(0.0) as u32
        }
        _ => 100,
    }
}

/// Figures computed once at completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalMetrics {
    pub wpm: u32,
    pub accuracy: u32,
    pub consistency: u32,
    pub total_chars: usize,
    pub duration_ms: u64,
}

impl FinalMetrics {
    pub fn compute(
        total_chars: usize,
        counters: &Counters,
        wpm_history: &[u32],
        duration_ms: u64,
    ) -> Self {
        Self {
            wpm: net_wpm(total_chars, duration_ms),
            accuracy: accuracy(total_chars, counters.incorrect_chars, counters.extra_chars),
            consistency: consistency(wpm_history),
            total_chars,
            duration_ms,
        }
    }
}
