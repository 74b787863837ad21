use rand::Rng;
use std::collections::{BTreeSet, VecDeque};

/// Words must be strictly longer than this to be hidden
pub const MIN_HIDDEN_LEN: usize = 3;
pub const HIDE_PROBABILITY: f64 = 0.25;
/// Used when no word was drawn and the text has more than `FALLBACK_INDEX` words
pub const FALLBACK_INDEX: usize = 5;

/// Source of Bernoulli trials for cloze selection
pub trait ClozeRng {
    /// True with probability `p`
    fn chance(&mut self, p: f64) -> bool;
}

/// Any `rand` generator
pub struct RandSource<R: Rng>(pub R);

impl RandSource<rand::rngs::ThreadRng> {
    pub fn thread() -> Self {
        Self(rand::thread_rng())
    }
}

impl<R: Rng> ClozeRng for RandSource<R> {
    fn chance(&mut self, p: f64) -> bool {
        self.0.gen_bool(p)
    }
}

/// Replays a fixed list of draws, then answers `false`
#[derive(Debug, Clone, Default)]
pub struct ScriptedDraws(VecDeque<bool>);

impl ScriptedDraws {
    pub fn new(draws: impl IntoIterator<Item = bool>) -> Self {
        Self(draws.into_iter().collect())
    }
}

impl ClozeRng for ScriptedDraws {
    fn chance(&mut self, _p: f64) -> bool {
        self.0.pop_front().unwrap_or(false)
    }
}

/// Pick the word indices to hide.
///
/// Only eligible words consume a draw. Never empty for texts with more than
/// `FALLBACK_INDEX` words.
pub fn select_cloze(words: &[String], rng: &mut dyn ClozeRng) -> BTreeSet<usize> {
    let mut hidden: BTreeSet<usize> = words
        .iter()
        .enumerate()
        .filter(|(_, word)| word.chars().count() > MIN_HIDDEN_LEN)
        .filter(|_| rng.chance(HIDE_PROBABILITY))
        .map(|(i, _)| i)
        .collect();

    if hidden.is_empty() && words.len() > FALLBACK_INDEX {
        hidden.insert(FALLBACK_INDEX);
    }

    log::debug!("cloze hides {} of {} words", hidden.len(), words.len());
    hidden
}

/// Where the typist starts: the first hidden word, or 0
pub fn first_target(hidden: &BTreeSet<usize>) -> usize {
    hidden.first().copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn only_long_words_are_drawn() {
        // eligible: "hello" (0), "world" (2), "again" (4)
        let w = words("hello a world is again");
        let mut draws = ScriptedDraws::new([true, false, true]);
        assert_eq!(select_cloze(&w, &mut draws), BTreeSet::from([0, 4]));
    }

    #[test]
    fn length_counts_characters() {
        // "été" is three chars but five bytes
        let w = words("été étés");
        let mut draws = ScriptedDraws::new([true, true]);
        assert_eq!(select_cloze(&w, &mut draws), BTreeSet::from([1]));
    }

    #[test]
    fn fallback_forces_index_five() {
        let w = words("aaaa bbbb cccc dddd eeee ffff gggg");
        let mut draws = ScriptedDraws::default();
        assert_eq!(select_cloze(&w, &mut draws), BTreeSet::from([FALLBACK_INDEX]));
    }

    #[test]
    fn no_fallback_for_short_texts() {
        let w = words("aaaa bbbb cccc dddd eeee");
        let mut draws = ScriptedDraws::default();
        assert!(select_cloze(&w, &mut draws).is_empty());
    }

    #[test]
    fn never_empty_above_five_words() {
        let mut rng = RandSource(StdRng::seed_from_u64(7));
        for n in 6..40 {
            let w: Vec<String> = (0..n).map(|i| format!("w{i}")).collect();
            let hidden = select_cloze(&w, &mut rng);
            assert!(!hidden.is_empty());
            assert!(hidden.iter().all(|&i| i < w.len()));
        }
    }

    #[test]
    fn first_target_is_lowest() {
        assert_eq!(first_target(&BTreeSet::from([9, 3, 12])), 3);
        assert_eq!(first_target(&BTreeSet::new()), 0);
    }
}
