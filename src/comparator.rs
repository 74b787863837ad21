//! Per-keystroke comparison of the raw input buffer against a target word.

/// Display class of a single character position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Correct,
    Incorrect,
    /// Not typed yet
    Pending,
    /// Typed beyond the end of the target word
    Extra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharCell {
    /// Target char for target positions, typed char for extras
    pub ch: char,
    pub class: CharClass,
}

/// Lifecycle of one word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WordState {
    #[default]
    Empty,
    Typing,
    Correct,
    Incorrect,
}

/// What a buffer change means for the current word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction<'a> {
    /// Whitespace-only buffer: clear it, touch nothing
    Reset,
    Typing,
    /// Submit the trimmed attempt
    Submit(&'a str),
}

/// Classify every target position plus any extras. Case-sensitive.
pub fn compare(buffer: &str, target: &str) -> Vec<CharCell> {
    let typed: Vec<char> = buffer.chars().collect();
    let mut cells: Vec<CharCell> = target
        .chars()
        .enumerate()
        .map(|(i, expected)| {
            let class = match typed.get(i) {
                None => CharClass::Pending,
                Some(&c) if c == expected => CharClass::Correct,
                Some(_) => CharClass::Incorrect,
            };
            CharCell { ch: expected, class }
        })
        .collect();

    let target_len = cells.len();
    cells.extend(typed.iter().skip(target_len).map(|&ch| CharCell {
        ch,
        class: CharClass::Extra,
    }));
    cells
}

pub fn classify(buffer: &str, target: &str) -> Vec<CharClass> {
    compare(buffer, target).into_iter().map(|c| c.class).collect()
}

/// Decide whether `buffer` submits the word.
///
/// A trailing space submits; the last word of the text also submits as soon
/// as it matches exactly.
pub fn interpret<'a>(buffer: &'a str, target: &str, is_last_word: bool) -> InputAction<'a> {
    let trimmed = buffer.trim();
    if !buffer.is_empty() && trimmed.is_empty() {
        return InputAction::Reset;
    }
    if buffer.ends_with(' ') {
        return InputAction::Submit(trimmed);
    }
    if is_last_word && trimmed == target {
        return InputAction::Submit(trimmed);
    }
    InputAction::Typing
}

/// The class of the single character `next` appended to `prev`, if that is
/// what happened. Whitespace and edits other than one appended char yield `None`.
pub fn appended_class(prev: &str, next: &str, target: &str) -> Option<CharClass> {
    let added = next.strip_prefix(prev)?;
    let mut chars = added.chars();
    let c = chars.next()?;
    if chars.next().is_some() || c.is_whitespace() {
        return None;
    }

    let position = prev.chars().count();
    Some(match target.chars().nth(position) {
        Some(expected) if expected == c => CharClass::Correct,
        Some(_) => CharClass::Incorrect,
        None => CharClass::Extra,
    })
}

/// Outcome of comparing a submitted attempt with its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub correct: bool,
    /// Attempt characters past the target's end
    pub extra: usize,
    /// Target characters past the attempt's end
    pub missing: usize,
}

pub fn score(attempt: &str, target: &str) -> Submission {
    let typed = attempt.chars().count();
    let expected = target.chars().count();
    Submission {
        correct: attempt == target,
        extra: typed.saturating_sub(expected),
        missing: expected.saturating_sub(typed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use CharClass::*;

    fn typed_prefix(buffer: &str, target: &str) -> Vec<CharClass> {
        classify(buffer, target)
            .into_iter()
            .filter(|c| *c != Pending)
            .collect()
    }

    #[test]
    fn hello_sequence() {
        assert_eq!(typed_prefix("h", "hello"), vec![Correct]);
        assert_eq!(typed_prefix("he", "hello"), vec![Correct, Correct]);
        assert_eq!(typed_prefix("hel", "hello"), vec![Correct, Correct, Correct]);
        assert_eq!(
            typed_prefix("helxo", "hello"),
            vec![Correct, Correct, Correct, Incorrect, Correct]
        );
        assert_matches!(interpret("hello ", "hello", false), InputAction::Submit("hello"));
        assert!(score("hello", "hello").correct);
    }

    #[test]
    fn pending_and_extra() {
        assert_eq!(classify("", "ab"), vec![Pending, Pending]);
        let cells = compare("abcd", "ab");
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[2], CharCell { ch: 'c', class: Extra });
        assert_eq!(cells[3], CharCell { ch: 'd', class: Extra });
    }

    #[test]
    fn case_sensitive() {
        assert_eq!(classify("Hi", "hi"), vec![Incorrect, Correct]);
        assert!(!score("Hi", "hi").correct);
    }

    #[test]
    fn whitespace_only_resets() {
        assert_matches!(interpret(" ", "word", false), InputAction::Reset);
        assert_matches!(interpret("\t  ", "word", true), InputAction::Reset);
        assert_matches!(interpret("", "word", false), InputAction::Typing);
    }

    #[test]
    fn last_word_auto_finishes() {
        assert_matches!(interpret("end", "end", true), InputAction::Submit("end"));
        assert_matches!(interpret("end", "end", false), InputAction::Typing);
        assert_matches!(interpret("en", "end", true), InputAction::Typing);
    }

    #[test]
    fn wrong_submission_counts_missing_and_extra() {
        assert_eq!(
            score("hel", "hello"),
            Submission {
                correct: false,
                extra: 0,
                missing: 2
            }
        );
        assert_eq!(
            score("helloo", "hello"),
            Submission {
                correct: false,
                extra: 1,
                missing: 0
            }
        );
    }

    #[test]
    fn appended_character() {
        assert_eq!(appended_class("", "h", "hi"), Some(Correct));
        assert_eq!(appended_class("h", "hx", "hi"), Some(Incorrect));
        assert_eq!(appended_class("hi", "hii", "hi"), Some(Extra));
        assert_eq!(appended_class("hi", "hi ", "hi"), None);
        assert_eq!(appended_class("hi", "h", "hi"), None);
        assert_eq!(appended_class("", "hi", "hi"), None);
    }
}
