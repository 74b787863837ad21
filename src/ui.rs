pub mod charting;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use itertools::Itertools;
use unicode_width::UnicodeWidthStr;

use lyrik::{
    comparator::CharClass,
    session::RaceOutcome,
    view::{LineView, SessionView, WordView},
};

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

struct Styles {
    bold: Style,
    correct: Style,
    incorrect: Style,
    pending: Style,
    extra: Style,
    masked: Style,
    italic: Style,
    music: Style,
    cyan_italic: Style,
}

impl Styles {
    fn new() -> Self {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let dim_bold = bold.add_modifier(Modifier::DIM);
        Self {
            bold,
            correct: bold.fg(Color::Green),
            incorrect: bold.fg(Color::Red),
            pending: dim_bold,
            extra: bold.fg(Color::Red).add_modifier(Modifier::CROSSED_OUT),
            masked: dim_bold.fg(Color::Yellow),
            italic: Style::default().add_modifier(Modifier::ITALIC),
            music: Style::default().bg(Color::Magenta),
            cyan_italic: Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
        }
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let styles = Styles::new();
        match self.state {
            AppState::Loading => {
                Paragraph::new(Span::styled(
                    "loading lyrics...",
                    styles.italic.fg(Color::Yellow),
                ))
                .alignment(Alignment::Center)
                .render(centered_row(area), buf);
            }
            AppState::Typing => render_typing(self, area, buf, &styles),
            AppState::Results => render_results(self, area, buf, &styles),
        }
    }
}

fn centered_row(area: Rect) -> Rect {
    Rect {
        y: area.y + area.height / 2,
        height: area.height.min(1),
        ..area
    }
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer, styles: &Styles) {
    let view = SessionView::build(&app.session, app.now_ms, app.config.show_translation);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN.min(area.height / 4))
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(1), // live stats
            Constraint::Length(1), // notice
            Constraint::Min(1),    // lyrics
            Constraint::Length(1), // legend
        ])
        .split(area);

    let title = if view.artist.is_empty() {
        format!("{} [{}]", view.title, view.mode)
    } else {
        format!("{} - {} [{}]", view.title, view.artist, view.mode)
    };
    Paragraph::new(Span::styled(title, styles.bold))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let snap = view.snapshot;
    Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   combo {}   {}%",
            snap.live_wpm,
            snap.live_accuracy,
            snap.combo,
            snap.progress()
        ),
        styles.pending,
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let notice = app.notice.as_deref().or(view.notice);
    if let Some(notice) = notice {
        Paragraph::new(Span::styled(notice.to_string(), styles.cyan_italic))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
    }

    let lines = lyric_lines(&view, styles);
    let visible = chunks[3].height as usize;
    let current_row = current_row(&view);
    let first = current_row.saturating_sub(visible / 3);

    let widest = lines.iter().map(Line::width).max().unwrap_or(0);
    let alignment = if widest <= chunks[3].width as usize {
        Alignment::Center
    } else {
        Alignment::Left
    };
    Paragraph::new(lines.into_iter().skip(first).collect::<Vec<_>>())
        .alignment(alignment)
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        "(tab) speak / (←) restart / (→) next song / (esc)ape",
        styles.italic,
    ))
    .render(chunks[4], buf);
}

/// Row of `lines` holding the current word, counting translation rows
fn current_row(view: &SessionView) -> usize {
    let mut row = 0;
    for line in &view.lines {
        match line {
            LineView::Words {
                is_current: true, ..
            } => return row,
            LineView::Words { translation, .. } => row += 1 + usize::from(translation.is_some()),
            LineView::Break => row += 1,
        }
    }
    row
}

fn lyric_lines(view: &SessionView, styles: &Styles) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for line in &view.lines {
        match line {
            LineView::Break => lines.push(Line::default()),
            LineView::Words {
                words, translation, ..
            } => {
                let mut spans = Vec::new();
                for (i, word) in words.iter().enumerate() {
                    if i > 0 {
                        spans.push(Span::raw(" "));
                    }
                    spans.extend(word_spans(word, styles));
                }
                lines.push(Line::from(spans));
                if let Some(translation) = translation {
                    lines.push(Line::from(Span::styled(translation.clone(), styles.italic)));
                }
            }
        }
    }
    lines
}

fn word_spans(word: &WordView, styles: &Styles) -> Vec<Span<'static>> {
    word.cells
        .iter()
        .map(|cell| {
            let mut style = match cell.class {
                CharClass::Correct => styles.correct,
                CharClass::Incorrect => styles.incorrect,
                CharClass::Extra => styles.extra,
                CharClass::Pending if word.masked => styles.masked,
                CharClass::Pending => styles.pending,
            };
            if word.is_current {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            if word.is_music {
                style = style.patch(styles.music);
            }
            Span::styled(cell.ch.to_string(), style)
        })
        .collect()
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer, styles: &Styles) {
    let Some(report) = app.session.report() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // chart
            Constraint::Length(1), // stats
            Constraint::Length(1), // race / best
            Constraint::Length(2), // missed words
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let points = app.session.wpm_sampler().chart_points();
    let bounds = charting::chart_bounds(&points);
    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(Style::default().fg(Color::Magenta))
        .graph_type(GraphType::Line)
        .data(&points)];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([1.0, bounds.seconds])
                .labels(vec![
                    Span::styled("1", styles.bold),
                    Span::styled(charting::format_label(bounds.seconds), styles.bold),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, bounds.wpm])
                .labels(vec![
                    Span::styled("0", styles.bold),
                    Span::styled(charting::format_label(bounds.wpm), styles.bold),
                ]),
        )
        .render(chunks[0], buf);

    let m = report.metrics;
    Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   {} consistency   best combo {}",
            m.wpm, m.accuracy, m.consistency, report.counters.best_combo
        ),
        styles.bold,
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let race = match report.race {
        RaceOutcome::NoRace => None,
        RaceOutcome::Won => Some("you beat the music"),
        RaceOutcome::Lost => Some("the music finished first"),
    };
    let best = app.best_wpm.map(|best| format!("best on this song: {best} wpm"));
    let summary = race.map(str::to_string).into_iter().chain(best).join("   ");
    Paragraph::new(Span::styled(summary, styles.cyan_italic))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let missed = if report.missed_words.is_empty() {
        "no missed words".to_string()
    } else {
        format!("missed: {}", report.missed_words.join(", "))
    };
    let alignment = if missed.width() <= chunks[3].width as usize {
        Alignment::Center
    } else {
        Alignment::Left
    };
    Paragraph::new(Span::styled(missed, styles.incorrect.remove_modifier(Modifier::BOLD)))
        .alignment(alignment)
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);

    Paragraph::new(Span::styled("(r)etry / (n)ew / (esc)ape", styles.italic))
        .render(chunks[5], buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_app;
    use lyrik::runtime::KeyAction;
    use lyrik::session::GameMode;

    fn rendered(app: &App) -> String {
        let area = Rect::new(0, 0, 80, 24);
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn typing_screen_shows_lyrics_and_title() {
        let app = test_app("hello world\n\nsecond stanza", GameMode::Normal);
        let screen = rendered(&app);
        assert!(screen.contains("Custom [normal]"));
        assert!(screen.contains("hello world"));
        assert!(screen.contains("second stanza"));
    }

    #[test]
    fn cloze_words_are_masked() {
        let mut app = test_app("aa bb cc dd ee secret gg", GameMode::Cloze);
        // index 5 is hidden by the draw or, failing that, by the fallback
        let screen = rendered(&app);
        assert!(screen.contains("______"));
        assert!(!screen.contains("secret"));

        for c in "secret ".chars() {
            app.on_key(KeyAction::Char(c));
        }
        assert_eq!(app.state, AppState::Results);
    }

    #[test]
    fn results_screen_lists_missed_words() {
        let mut app = test_app("one two", GameMode::Normal);
        for c in "onx ".chars() {
            app.on_key(KeyAction::Char(c));
        }
        app.now_ms = 3_000;
        for c in "two".chars() {
            app.on_key(KeyAction::Char(c));
        }
        let screen = rendered(&app);
        assert!(screen.contains("wpm"));
        assert!(screen.contains("missed: one"));
        assert!(screen.contains("(r)etry"));
    }

    #[test]
    fn rhythm_notice_without_timeline() {
        let app = test_app("no timing here", GameMode::Rhythm);
        let screen = rendered(&app);
        assert!(screen.contains("fixed pacing"));
    }

    #[test]
    fn render_large_text() {
        let app = test_app(&"word ".repeat(1000), GameMode::Normal);
        let area = Rect::new(0, 0, 80, 24);
        let mut buffer = Buffer::empty(area);
        (&app).render(area, &mut buffer);
        assert_eq!(*buffer.area(), area);
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let app = test_app("hello", GameMode::Normal);
        let area = Rect::new(0, 0, 12, 3);
        let mut buffer = Buffer::empty(area);
        (&app).render(area, &mut buffer);
    }
}
