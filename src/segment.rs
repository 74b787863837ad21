//! Turns raw lyric text into lines, a flat word sequence and the table that
//! maps a word index back to its line.

use crate::lyrics::SyncedLine;

/// Inclusive span of word indices covered by one rendered line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn contains(&self, word_index: usize) -> bool {
        (self.start..=self.end).contains(&word_index)
    }

    pub fn word_count(&self) -> usize {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    /// Document order; `None` marks a stanza break
    pub lines: Vec<Option<Vec<String>>>,
    /// Parallel to `lines`; breaks stay breaks, word lines always get a string
    pub trans_lines: Vec<Option<String>>,
    pub words: Vec<String>,
    /// One entry per word line (stanza breaks have none)
    pub line_ranges: Vec<LineRange>,
}

impl Segmentation {
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Lines of words only, in order, paired with their translation
    pub fn word_lines(&self) -> impl Iterator<Item = (&[String], &str)> {
        self.lines
            .iter()
            .zip(&self.trans_lines)
            .filter_map(|(line, trans)| {
                line.as_deref()
                    .map(|words| (words, trans.as_deref().unwrap_or("")))
            })
    }
}

/// The text to segment: with rhythm on and a usable timeline, the timeline's
/// own lines win so that pacing lines up one-to-one with rendered lines.
pub fn effective_text(text: &str, rhythm: bool, timeline: &[SyncedLine]) -> String {
    if rhythm && timeline.len() > 1 {
        timeline
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        text.to_string()
    }
}

/// Segment `text`. Pure: identical inputs give identical output.
pub fn segment(
    text: &str,
    translation: Option<&str>,
    rhythm: bool,
    timeline: &[SyncedLine],
) -> Segmentation {
    let source = effective_text(text, rhythm, timeline);
    let trans_supply: Vec<&str> = translation
        .map(|t| t.split('\n').map(str::trim).collect())
        .unwrap_or_default();
    let mut trans_cursor = 0;

    let mut seg = Segmentation::default();

    for raw_line in source.split('\n') {
        let line = raw_line.trim();
        if line.is_empty() {
            seg.lines.push(None);
            seg.trans_lines.push(None);
            continue;
        }

        // Blank translation lines are stanza padding; skip to the next real one
        while trans_cursor < trans_supply.len() && trans_supply[trans_cursor].is_empty() {
            trans_cursor += 1;
        }
        let trans = match trans_supply.get(trans_cursor) {
            Some(t) => {
                trans_cursor += 1;
                t.to_string()
            }
            None => String::new(),
        };

        let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        let start = seg.words.len();
        seg.words.extend(words.iter().cloned());
        seg.line_ranges.push(LineRange {
            start,
            end: seg.words.len() - 1,
        });
        seg.lines.push(Some(words));
        seg.trans_lines.push(Some(trans));
    }

    seg
}
