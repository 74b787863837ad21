use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::cloze::{self, ClozeRng};
use crate::comparator::{self, CharClass, InputAction, WordState};
use crate::error::{Error, Result};
use crate::hooks::{NullHook, WordHook};
use crate::lyrics::Song;
use crate::metrics::{self, Counters, FinalMetrics, WpmSampler};
use crate::navigation::{line_of, NavigationIndex};
use crate::results::SessionResult;
use crate::rhythm::{RhythmScheduler, RhythmStep, TimerHandle};
use crate::segment::{self, Segmentation};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameMode {
    #[default]
    Normal,
    /// Some words are hidden and typed from memory; the rest are context
    Cloze,
    /// Race a music cursor paced by the synced lyrics
    Rhythm,
}

/// Everything that can happen to a session, processed one at a time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The raw input buffer changed
    KeyInput(String),
    /// Metrics clock; samples every whole second elapsed since the last sample
    TimerTick,
    RhythmTick(TimerHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordOutcome {
    pub index: usize,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Session already over, or nothing to do
    Ignored,
    /// Whitespace-only buffer was cleared
    Reset,
    Typing,
    Submitted(WordOutcome),
    /// The submission that ended the session
    Completed(WordOutcome),
    /// Went back to the previous typed word
    Retreated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Input(InputOutcome),
    /// Number of WPM samples appended
    Sampled(usize),
    Rhythm(RhythmStep),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceOutcome {
    /// Not a rhythm session
    NoRace,
    Won,
    Lost,
}

/// Computed once, when the last word is submitted
#[derive(Debug, Clone, PartialEq)]
pub struct FinalReport {
    pub metrics: FinalMetrics,
    pub counters: Counters,
    /// Distinct missed target words, in first-miss order
    pub missed_words: Vec<String>,
    pub race: RaceOutcome,
    pub cpu_expected_ms: Option<u64>,
    pub wpm_history: Vec<u32>,
}

/// One typing attempt over one text. Replaced, never reused, for a new game.
pub struct Session {
    title: String,
    artist: String,
    mode: GameMode,
    seg: Segmentation,
    hidden: BTreeSet<usize>,
    revealed: BTreeSet<usize>,
    nav: NavigationIndex,
    buffer: String,
    attempts: BTreeMap<usize, String>,
    outcomes: Vec<WordState>,
    counters: Counters,
    missed: Vec<String>,
    sampler: WpmSampler,
    started_at: Option<u64>,
    finished_at: Option<u64>,
    rhythm: Option<RhythmScheduler>,
    hook: Box<dyn WordHook>,
    speak_words: bool,
    report: Option<FinalReport>,
    result_taken: bool,
}

/// Cloze targets, when cloze mode actually hides something
fn active_targets(mode: GameMode, hidden: &BTreeSet<usize>) -> Option<&BTreeSet<usize>> {
    (mode == GameMode::Cloze && !hidden.is_empty()).then_some(hidden)
}

impl Session {
    pub fn new(song: &Song, mode: GameMode, rng: &mut dyn ClozeRng) -> Result<Self> {
        let rhythm = mode == GameMode::Rhythm;
        let timeline = if rhythm { song.timeline() } else { Vec::new() };
        let seg = segment::segment(
            &song.lyrics,
            song.translation.as_deref(),
            rhythm,
            &timeline,
        );
        if seg.words.is_empty() {
            return Err(Error::EmptyText);
        }

        let hidden = if mode == GameMode::Cloze {
            cloze::select_cloze(&seg.words, rng)
        } else {
            BTreeSet::new()
        };
        let start = cloze::first_target(&hidden);
        let word_count = seg.words.len();

        let scheduler = rhythm
            .then(|| RhythmScheduler::new(timeline, seg.line_ranges.clone(), word_count));

        log::info!(
            "new {mode} session: \"{}\" ({word_count} words, {} lines)",
            song.title,
            seg.line_ranges.len()
        );

        Ok(Self {
            title: song.title.clone(),
            artist: song.artist.clone(),
            mode,
            hidden,
            revealed: BTreeSet::new(),
            nav: NavigationIndex::new(word_count, start),
            buffer: String::new(),
            attempts: BTreeMap::new(),
            outcomes: vec![WordState::Empty; word_count],
            counters: Counters::default(),
            missed: Vec::new(),
            sampler: WpmSampler::default(),
            started_at: None,
            finished_at: None,
            rhythm: scheduler,
            hook: Box::new(NullHook),
            speak_words: false,
            report: None,
            result_taken: false,
            seg,
        })
    }

    pub fn with_hook(mut self, hook: Box<dyn WordHook>, speak_words: bool) -> Self {
        self.hook = hook;
        self.speak_words = speak_words;
        self
    }

    pub fn handle(&mut self, event: SessionEvent, now_ms: u64) -> EventOutcome {
        match event {
            SessionEvent::KeyInput(buffer) => EventOutcome::Input(self.on_input(&buffer, now_ms)),
            SessionEvent::TimerTick => EventOutcome::Sampled(self.sample(now_ms)),
            SessionEvent::RhythmTick(handle) => EventOutcome::Rhythm(self.fire_rhythm(handle, now_ms)),
        }
    }

    /// Host tick: sample metrics, then fire the rhythm tick if it is due
    pub fn on_tick(&mut self, now_ms: u64) -> Vec<EventOutcome> {
        let mut outcomes = vec![self.handle(SessionEvent::TimerTick, now_ms)];
        if let Some(handle) = self.rhythm.as_ref().and_then(|r| r.due(now_ms)) {
            outcomes.push(self.handle(SessionEvent::RhythmTick(handle), now_ms));
        }
        outcomes
    }

    pub fn type_char(&mut self, c: char, now_ms: u64) -> InputOutcome {
        let mut next = self.buffer.clone();
        next.push(c);
        self.handle_input(next, now_ms)
    }

    /// Delete the last typed char, or go back a word when the buffer is empty
    pub fn backspace(&mut self, now_ms: u64) -> InputOutcome {
        if self.buffer.is_empty() {
            return if self.navigate_back() {
                InputOutcome::Retreated
            } else {
                InputOutcome::Ignored
            };
        }
        let mut next = self.buffer.clone();
        next.pop();
        self.handle_input(next, now_ms)
    }

    fn handle_input(&mut self, buffer: String, now_ms: u64) -> InputOutcome {
        match self.handle(SessionEvent::KeyInput(buffer), now_ms) {
            EventOutcome::Input(outcome) => outcome,
            _ => InputOutcome::Ignored,
        }
    }

    fn on_input(&mut self, buffer: &str, now_ms: u64) -> InputOutcome {
        if self.is_finished() {
            return InputOutcome::Ignored;
        }
        let index = self.nav.current();
        let target = self.seg.words[index].clone();

        let attempt = match comparator::interpret(buffer, &target, self.nav.is_last_word()) {
            InputAction::Reset => {
                self.buffer.clear();
                self.outcomes[index] = WordState::Empty;
                return InputOutcome::Reset;
            }
            InputAction::Typing => None,
            InputAction::Submit(attempt) => Some(attempt.to_string()),
        };

        if !buffer.is_empty() {
            self.start_clock(now_ms);
        }

        match comparator::appended_class(&self.buffer, buffer, &target) {
            Some(CharClass::Correct) => self.counters.correct_chars += 1,
            Some(CharClass::Incorrect) => self.counters.incorrect_chars += 1,
            // extras are counted once, at submission
            _ => {}
        }

        match attempt {
            None => {
                self.buffer = buffer.to_string();
                self.outcomes[index] = if buffer.is_empty() {
                    WordState::Empty
                } else {
                    WordState::Typing
                };
                InputOutcome::Typing
            }
            Some(attempt) => self.submit(index, &target, attempt, now_ms),
        }
    }

    fn submit(&mut self, index: usize, target: &str, attempt: String, now_ms: u64) -> InputOutcome {
        let score = comparator::score(&attempt, target);
        self.counters.extra_chars += score.extra;

        if score.correct {
            self.counters.record_correct_word();
            if self.speak_words {
                self.hook.speak(target);
            }
            if active_targets(self.mode, &self.hidden).is_some_and(|t| t.contains(&index)) {
                self.revealed.insert(index);
            }
        } else {
            self.counters.record_wrong_word();
            if !self.missed.iter().any(|w| w == target) {
                self.missed.push(target.to_string());
            }
            if !self.is_masked(index) {
                self.counters.incorrect_chars += score.missing;
            }
        }
        log::debug!(
            "word {index} {:?} submitted as {:?} ({})",
            target,
            attempt,
            if score.correct { "correct" } else { "wrong" }
        );

        self.outcomes[index] = if score.correct {
            WordState::Correct
        } else {
            WordState::Incorrect
        };
        self.attempts.insert(index, attempt.clone());
        self.buffer.clear();
        self.nav
            .advance(attempt, active_targets(self.mode, &self.hidden));

        let outcome = WordOutcome {
            index,
            correct: score.correct,
        };
        if self.nav.is_at_end() {
            self.complete(now_ms);
            InputOutcome::Completed(outcome)
        } else {
            InputOutcome::Submitted(outcome)
        }
    }

    /// Return to the previous typed word with its last attempt restored.
    /// False when already at the first word or the session is over.
    pub fn navigate_back(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        match self.nav.retreat(active_targets(self.mode, &self.hidden)) {
            Some(previous) => {
                let index = self.nav.current();
                self.attempts.remove(&index);
                self.outcomes[index] = if previous.is_empty() {
                    WordState::Empty
                } else {
                    WordState::Typing
                };
                self.buffer = previous;
                true
            }
            None => false,
        }
    }

    fn start_clock(&mut self, now_ms: u64) {
        if self.started_at.is_some() {
            return;
        }
        self.started_at = Some(now_ms);
        if let Some(rhythm) = self.rhythm.as_mut() {
            rhythm.start(now_ms);
        }
    }

    fn sample(&mut self, now_ms: u64) -> usize {
        match (self.started_at, self.finished_at) {
            (Some(started), None) => {
                let seconds = now_ms.saturating_sub(started) / 1_000;
                let chars = self.chars_typed_so_far();
                self.sampler.sample_until(seconds, chars)
            }
            _ => 0,
        }
    }

    fn fire_rhythm(&mut self, handle: TimerHandle, now_ms: u64) -> RhythmStep {
        match self.rhythm.as_mut() {
            Some(rhythm) => rhythm.fire(handle, now_ms),
            None => RhythmStep::Stale,
        }
    }

    fn complete(&mut self, now_ms: u64) {
        self.finished_at = Some(now_ms);
        if let Some(rhythm) = self.rhythm.as_mut() {
            rhythm.cancel();
        }

        let total_chars = metrics::total_chars_typed(self.scored_words());
        let duration_ms = now_ms.saturating_sub(self.started_at.unwrap_or(now_ms));
        let final_metrics =
            FinalMetrics::compute(total_chars, &self.counters, self.sampler.history(), duration_ms);

        let race = match &self.rhythm {
            None => RaceOutcome::NoRace,
            Some(rhythm) => match rhythm.cpu_finished_at().or(rhythm.cpu_expected_finish_at()) {
                Some(cpu) if cpu < now_ms => RaceOutcome::Lost,
                _ => RaceOutcome::Won,
            },
        };

        log::info!(
            "session complete: {} wpm, {}% accuracy, {} consistency",
            final_metrics.wpm,
            final_metrics.accuracy,
            final_metrics.consistency
        );

        self.report = Some(FinalReport {
            metrics: final_metrics,
            counters: self.counters.clone(),
            missed_words: self.missed.clone(),
            race,
            cpu_expected_ms: self
                .rhythm
                .as_ref()
                .map(RhythmScheduler::estimate_cpu_duration_ms),
            wpm_history: self.sampler.history().to_vec(),
        });
    }

    /// Cancel the pending rhythm tick; call before discarding the session
    pub fn stop(&mut self) {
        if let Some(rhythm) = self.rhythm.as_mut() {
            rhythm.cancel();
        }
    }

    /// The record for persistence, handed out exactly once after completion
    pub fn take_result(&mut self) -> Option<SessionResult> {
        if self.result_taken {
            return None;
        }
        let report = self.report.as_ref()?;
        self.result_taken = true;
        Some(SessionResult {
            title: self.title.clone(),
            artist: self.artist.clone(),
            mode: self.mode.to_string(),
            wpm: report.metrics.wpm,
            accuracy: report.metrics.accuracy,
            words_correct: report.counters.words_correct,
            words_wrong: report.counters.words_wrong,
            total_chars: report.metrics.total_chars,
            incorrect_chars: report.counters.incorrect_chars,
            extra_chars: report.counters.extra_chars,
            duration_seconds: (report.metrics.duration_ms as f64 / 1_000.0).round() as u64,
        })
    }

    /// Speak the current word on request
    pub fn speak_current(&mut self) {
        if let Some(word) = self.current_word().map(str::to_string) {
            self.hook.speak(&word);
        }
    }

    fn scored_words(&self) -> impl Iterator<Item = &str> {
        let targets = active_targets(self.mode, &self.hidden);
        self.seg
            .words
            .iter()
            .enumerate()
            .filter(move |(i, _)| targets.map_or(true, |t| t.contains(i)))
            .map(|(_, w)| w.as_str())
    }

    fn chars_typed_so_far(&self) -> usize {
        let targets = active_targets(self.mode, &self.hidden);
        let completed: usize = self.seg.words[..self.nav.current()]
            .iter()
            .enumerate()
            .filter(|(i, _)| targets.map_or(true, |t| t.contains(i)))
            .map(|(_, w)| w.chars().count() + 1)
            .sum();
        completed + self.buffer.chars().count()
    }

    /// Words the typist has to type: the cloze targets, or every word
    pub fn scored_word_count(&self) -> usize {
        active_targets(self.mode, &self.hidden).map_or(self.seg.words.len(), BTreeSet::len)
    }

    pub fn is_scored(&self, index: usize) -> bool {
        active_targets(self.mode, &self.hidden).map_or(true, |t| t.contains(&index))
    }

    /// Hidden from the typist and not yet revealed by a correct answer
    pub fn is_masked(&self, index: usize) -> bool {
        active_targets(self.mode, &self.hidden).is_some_and(|t| t.contains(&index))
            && !self.revealed.contains(&index)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn segmentation(&self) -> &Segmentation {
        &self.seg
    }

    pub fn words(&self) -> &[String] {
        &self.seg.words
    }

    pub fn current_word_index(&self) -> usize {
        self.nav.current()
    }

    pub fn current_word(&self) -> Option<&str> {
        self.seg.words.get(self.nav.current()).map(String::as_str)
    }

    /// Line holding the current word; `None` once past the end
    pub fn current_line_index(&self) -> Option<usize> {
        line_of(&self.seg.line_ranges, self.nav.current())
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn history(&self) -> &[String] {
        self.nav.history()
    }

    pub fn attempt(&self, index: usize) -> Option<&str> {
        self.attempts.get(&index).map(String::as_str)
    }

    pub fn word_state(&self, index: usize) -> WordState {
        self.outcomes.get(index).copied().unwrap_or_default()
    }

    pub fn hidden(&self) -> &BTreeSet<usize> {
        &self.hidden
    }

    pub fn revealed(&self) -> &BTreeSet<usize> {
        &self.revealed
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn missed_words(&self) -> &[String] {
        &self.missed
    }

    pub fn wpm_history(&self) -> &[u32] {
        self.sampler.history()
    }

    pub fn wpm_sampler(&self) -> &WpmSampler {
        &self.sampler
    }

    pub fn live_wpm(&self) -> u32 {
        self.sampler.live()
    }

    pub fn live_accuracy(&self) -> u32 {
        metrics::accuracy(
            self.counters.correct_chars,
            self.counters.incorrect_chars,
            self.counters.extra_chars,
        )
    }

    pub fn rhythm(&self) -> Option<&RhythmScheduler> {
        self.rhythm.as_ref()
    }

    pub fn music_word_index(&self) -> Option<usize> {
        self.rhythm.as_ref().map(RhythmScheduler::music_word_index)
    }

    /// Shown when rhythm mode has to fall back to fixed pacing
    pub fn rhythm_notice(&self) -> Option<&'static str> {
        match &self.rhythm {
            Some(rhythm) if !rhythm.has_timeline() => {
                Some("no synced lyrics for this song, the music cursor uses fixed pacing")
            }
            _ => None,
        }
    }

    pub fn started_at(&self) -> Option<u64> {
        self.started_at
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn report(&self) -> Option<&FinalReport> {
        self.report.as_ref()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("title", &self.title)
            .field("mode", &self.mode)
            .field("words", &self.seg.words.len())
            .field("current", &self.nav.current())
            .field("buffer", &self.buffer)
            .field("counters", &self.counters)
            .field("finished", &self.is_finished())
            .finish()
    }
}
