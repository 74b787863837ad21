use std::collections::BTreeSet;

use crate::segment::LineRange;

/// The line containing `word_index`, or `None` if no range covers it
pub fn line_of(line_ranges: &[LineRange], word_index: usize) -> Option<usize> {
    // Ranges are sorted and disjoint
    let candidate = line_ranges.partition_point(|range| range.end < word_index);
    line_ranges
        .get(candidate)
        .filter(|range| range.contains(word_index))
        .map(|_| candidate)
}

/// The typist's word pointer and the stack of submitted attempts
#[derive(Debug, Clone, Default)]
pub struct NavigationIndex {
    current: usize,
    word_count: usize,
    history: Vec<String>,
}

impl NavigationIndex {
    pub fn new(word_count: usize, start: usize) -> Self {
        Self {
            current: start.min(word_count),
            word_count,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_at_end(&self) -> bool {
        self.current >= self.word_count
    }

    pub fn is_last_word(&self) -> bool {
        self.current + 1 == self.word_count
    }

    /// Step past the current word.
    ///
    /// With `targets`, words outside the set are context only and are
    /// stepped over silently.
    pub fn advance(&mut self, attempt: String, targets: Option<&BTreeSet<usize>>) {
        if self.is_at_end() {
            return;
        }
        self.history.push(attempt);
        self.current += 1;
        if let Some(targets) = targets {
            while self.current < self.word_count && !targets.contains(&self.current) {
                self.current += 1;
            }
        }
    }

    /// Step back to the previous typed word and hand back its attempt.
    ///
    /// `None` means there is nothing to go back to.
    pub fn retreat(&mut self, targets: Option<&BTreeSet<usize>>) -> Option<String> {
        let previous = match targets {
            Some(targets) => targets.range(..self.current).next_back().copied()?,
            None => self.current.checked_sub(1)?,
        };
        self.current = previous;
        Some(self.history.pop().unwrap_or_default())
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges() -> Vec<LineRange> {
        vec![
            LineRange { start: 0, end: 2 },
            LineRange { start: 3, end: 3 },
            LineRange { start: 4, end: 7 },
        ]
    }

    #[test]
    fn line_lookup() {
        let r = ranges();
        assert_eq!(line_of(&r, 0), Some(0));
        assert_eq!(line_of(&r, 2), Some(0));
        assert_eq!(line_of(&r, 3), Some(1));
        assert_eq!(line_of(&r, 7), Some(2));
        assert_eq!(line_of(&r, 8), None);
        assert_eq!(line_of(&[], 0), None);
    }

    #[test]
    fn advance_and_retreat() {
        let mut nav = NavigationIndex::new(3, 0);
        nav.advance("one".into(), None);
        nav.advance("twx".into(), None);
        assert_eq!(nav.current(), 2);
        assert!(nav.is_last_word());

        assert_eq!(nav.retreat(None), Some("twx".to_string()));
        assert_eq!(nav.current(), 1);
        assert_eq!(nav.history(), &["one".to_string()]);
    }

    #[test]
    fn retreat_at_start_is_noop() {
        let mut nav = NavigationIndex::new(3, 0);
        assert_eq!(nav.retreat(None), None);
        assert_eq!(nav.current(), 0);
    }

    #[test]
    fn targets_skip_context_words() {
        let targets = BTreeSet::from([1, 4]);
        let mut nav = NavigationIndex::new(6, 1);
        nav.advance("a".into(), Some(&targets));
        assert_eq!(nav.current(), 4);
        nav.advance("b".into(), Some(&targets));
        assert!(nav.is_at_end());

        assert_eq!(nav.retreat(Some(&targets)), Some("b".to_string()));
        assert_eq!(nav.current(), 4);
        assert_eq!(nav.retreat(Some(&targets)), Some("a".to_string()));
        assert_eq!(nav.current(), 1);
        assert_eq!(nav.retreat(Some(&targets)), None);
        assert_eq!(nav.current(), 1);
    }

    #[test]
    fn advance_stops_at_end() {
        let mut nav = NavigationIndex::new(1, 0);
        nav.advance("x".into(), None);
        nav.advance("y".into(), None);
        assert_eq!(nav.current(), 1);
        assert_eq!(nav.history().len(), 1);
    }
}
