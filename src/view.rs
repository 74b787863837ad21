//! Read-only projection of a [`Session`] for renderers.

use crate::comparator::{self, CharCell, CharClass, WordState};
use crate::session::{GameMode, Session};

/// Placeholder shown for each char of a hidden word
pub const MASK_CHAR: char = '_';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordView {
    pub index: usize,
    pub cells: Vec<CharCell>,
    pub state: WordState,
    pub masked: bool,
    pub is_current: bool,
    /// Under the rhythm cursor
    pub is_music: bool,
}

impl WordView {
    /// Text to draw, one char per cell
    pub fn text(&self) -> String {
        self.cells.iter().map(|c| c.ch).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineView {
    Break,
    Words {
        words: Vec<WordView>,
        translation: Option<String>,
        is_current: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub combo: usize,
    pub best_combo: usize,
    pub live_wpm: u32,
    pub live_accuracy: u32,
    pub words_done: usize,
    pub word_count: usize,
    pub elapsed_ms: u64,
}

impl Snapshot {
    /// Whole percent of the text covered by the typist
    pub fn progress(&self) -> u16 {
        if self.word_count == 0 {
            return 0;
        }
        ((self.words_done * 100) / self.word_count) as u16
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub title: String,
    pub artist: String,
    pub mode: GameMode,
    pub lines: Vec<LineView>,
    pub buffer: String,
    pub snapshot: Snapshot,
    pub notice: Option<&'static str>,
    pub finished: bool,
}

impl SessionView {
    pub fn build(session: &Session, now_ms: u64, show_translation: bool) -> Self {
        let seg = session.segmentation();
        let current = session.current_word_index();
        let music = session.music_word_index();
        let current_line = session.current_line_index();

        let mut word_line = 0;
        let lines = seg
            .lines
            .iter()
            .zip(&seg.trans_lines)
            .map(|(line, trans)| {
                let Some(words) = line else {
                    return LineView::Break;
                };
                let range = seg.line_ranges[word_line];
                let is_current = current_line == Some(word_line);
                word_line += 1;

                let words = words
                    .iter()
                    .enumerate()
                    .map(|(offset, target)| {
                        word_view(session, range.start + offset, target, current, music)
                    })
                    .collect();
                LineView::Words {
                    words,
                    translation: trans
                        .as_ref()
                        .filter(|t| show_translation && !t.is_empty())
                        .cloned(),
                    is_current,
                }
            })
            .collect();

        let counters = session.counters();
        let elapsed_ms = session
            .started_at()
            .map_or(0, |started| now_ms.saturating_sub(started));

        Self {
            title: session.title().to_string(),
            artist: session.artist().to_string(),
            mode: session.mode(),
            lines,
            buffer: session.buffer().to_string(),
            snapshot: Snapshot {
                combo: counters.combo,
                best_combo: counters.best_combo,
                live_wpm: session.live_wpm(),
                live_accuracy: session.live_accuracy(),
                words_done: session.history().len().min(session.scored_word_count()),
                word_count: session.scored_word_count(),
                elapsed_ms,
            },
            notice: session.rhythm_notice(),
            finished: session.is_finished(),
        }
    }

    pub fn words(&self) -> impl Iterator<Item = &WordView> {
        self.lines.iter().flat_map(|line| match line {
            LineView::Words { words, .. } => words.as_slice(),
            LineView::Break => &[],
        })
    }
}

fn word_view(
    session: &Session,
    index: usize,
    target: &str,
    current: usize,
    music: Option<usize>,
) -> WordView {
    let is_current = index == current && !session.is_finished();
    let masked = session.is_masked(index);

    let typed = if is_current {
        Some(session.buffer())
    } else {
        session.attempt(index)
    };

    let mut cells = match typed {
        Some(typed) => comparator::compare(typed, target),
        None => comparator::compare("", target),
    };

    if masked {
        // hide the target, keep what the typist entered
        let typed: Vec<char> = typed.unwrap_or("").chars().collect();
        for (i, cell) in cells.iter_mut().enumerate() {
            if cell.class != CharClass::Extra {
                cell.ch = match (cell.class, typed.get(i)) {
                    (CharClass::Pending, _) | (_, None) => MASK_CHAR,
                    (_, Some(&c)) => c,
                };
            }
        }
    }

    WordView {
        index,
        cells,
        state: session.word_state(index),
        masked,
        is_current,
        is_music: music == Some(index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloze::ScriptedDraws;
    use crate::lyrics::Song;

    fn session(text: &str, mode: GameMode, draws: ScriptedDraws) -> Session {
        let mut draws = draws;
        Session::new(&Song::custom(text), mode, &mut draws).unwrap()
    }

    #[test]
    fn breaks_and_lines_follow_the_text() {
        let s = session("one two\n\nthree", GameMode::Normal, ScriptedDraws::default());
        let view = SessionView::build(&s, 0, true);
        assert_eq!(view.lines.len(), 3);
        assert_eq!(view.lines[1], LineView::Break);
        assert_matches::assert_matches!(&view.lines[0], LineView::Words { is_current: true, .. });
        let indices: Vec<usize> = view.words().map(|w| w.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn current_word_shows_buffer_classes() {
        let mut s = session("hello world", GameMode::Normal, ScriptedDraws::default());
        s.type_char('h', 0);
        s.type_char('x', 0);
        let view = SessionView::build(&s, 0, true);
        let word = view.words().next().unwrap();
        assert!(word.is_current);
        let classes: Vec<CharClass> = word.cells.iter().map(|c| c.class).collect();
        assert_eq!(
            classes,
            vec![
                CharClass::Correct,
                CharClass::Incorrect,
                CharClass::Pending,
                CharClass::Pending,
                CharClass::Pending
            ]
        );
    }

    #[test]
    fn masked_words_render_as_placeholders() {
        let mut s = session("say something", GameMode::Cloze, ScriptedDraws::new([true]));
        s.type_char('s', 0);
        s.type_char('x', 0);
        let view = SessionView::build(&s, 0, true);
        let hidden = view.words().nth(1).unwrap();
        assert!(hidden.masked);
        assert_eq!(hidden.text(), "sx_______");

        let context = view.words().next().unwrap();
        assert!(!context.masked);
        assert_eq!(context.text(), "say");
    }

    #[test]
    fn solved_cloze_word_is_revealed() {
        let mut s = session("say something now", GameMode::Cloze, ScriptedDraws::new([true]));
        for c in "something ".chars() {
            s.type_char(c, 0);
        }
        let view = SessionView::build(&s, 0, true);
        let solved = view.words().nth(1).unwrap();
        assert!(!solved.masked);
        assert_eq!(solved.text(), "something");
        assert_eq!(solved.state, WordState::Correct);
    }

    #[test]
    fn translation_can_be_hidden() {
        let mut song = Song::custom("bonjour");
        song.translation = Some("hello".to_string());
        let s = Session::new(&song, GameMode::Normal, &mut ScriptedDraws::default()).unwrap();

        let shown = SessionView::build(&s, 0, true);
        assert_matches::assert_matches!(
            &shown.lines[0],
            LineView::Words { translation: Some(t), .. } if t == "hello"
        );
        let hidden = SessionView::build(&s, 0, false);
        assert_matches::assert_matches!(&hidden.lines[0], LineView::Words { translation: None, .. });
    }

    #[test]
    fn snapshot_tracks_progress() {
        let mut s = session("a b c d", GameMode::Normal, ScriptedDraws::default());
        for c in "a b ".chars() {
            s.type_char(c, 1_000);
        }
        let view = SessionView::build(&s, 3_000, true);
        assert_eq!(view.snapshot.progress(), 50);
        assert_eq!(view.snapshot.combo, 2);
        assert_eq!(view.snapshot.elapsed_ms, 2_000);
        assert_eq!(view.snapshot.live_accuracy, 100);
    }

    #[test]
    fn cloze_progress_counts_targets_only() {
        let mut s = session("aa bb cc dd ee ff gg", GameMode::Cloze, ScriptedDraws::default());
        assert_eq!(s.current_word_index(), 5);
        let view = SessionView::build(&s, 0, true);
        assert_eq!(view.snapshot.word_count, 1);
        assert_eq!(view.snapshot.progress(), 0);

        for c in "ff ".chars() {
            s.type_char(c, 0);
        }
        assert_eq!(SessionView::build(&s, 0, true).snapshot.progress(), 100);
    }
}
