//! Timeline-driven "music cursor" that races the typist.
//!
//! The scheduler never owns a timer. It records the one pending tick it wants
//! (a [`TimerHandle`] plus a due time) and the host fires it back through
//! [`RhythmScheduler::fire`]. A handle that is no longer pending is stale and
//! does nothing, so cancelling is just forgetting the pending tick.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::lyrics::SyncedLine;
use crate::navigation::line_of;
use crate::segment::LineRange;

pub const DEFAULT_LINE_MS: u64 = 4_500;
pub const MIN_LINE_MS: u64 = 1_800;
pub const MAX_LINE_MS: u64 = 8_000;
/// Floor for timeline-derived delays
pub const MIN_DELAY_MS: u64 = 100;
/// CPU estimate per word when there is no timeline
pub const MS_PER_WORD_ESTIMATE: u64 = 650;

/// Handles are unique across schedulers, so one left over from a replaced
/// session can never match a newer session's pending tick.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingTick {
    handle: TimerHandle,
    due_ms: u64,
    /// Last word of the line the tick was scheduled for
    line_end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RhythmStep {
    /// Not the pending handle; ignored
    Stale,
    /// Cursor already past the scheduled line; scheduled again without moving
    Rescheduled,
    Advanced,
    /// The music cursor reached the end of the text
    Finished,
}

#[derive(Debug, Clone)]
pub struct RhythmScheduler {
    timeline: Vec<SyncedLine>,
    line_ranges: Vec<LineRange>,
    word_count: usize,
    music_word_index: usize,
    anchor_ms: Option<u64>,
    pending: Option<PendingTick>,
    cpu_finished_at: Option<u64>,
    cpu_expected_finish_at: Option<u64>,
}

impl RhythmScheduler {
    pub fn new(timeline: Vec<SyncedLine>, line_ranges: Vec<LineRange>, word_count: usize) -> Self {
        Self {
            timeline,
            line_ranges,
            word_count,
            music_word_index: 0,
            anchor_ms: None,
            pending: None,
            cpu_finished_at: None,
            cpu_expected_finish_at: None,
        }
    }

    /// True when line timing comes from a real timeline
    pub fn has_timeline(&self) -> bool {
        self.timeline.len() >= 2
    }

    pub fn is_started(&self) -> bool {
        self.anchor_ms.is_some()
    }

    pub fn music_word_index(&self) -> usize {
        self.music_word_index
    }

    pub fn anchor_ms(&self) -> Option<u64> {
        self.anchor_ms
    }

    pub fn cpu_finished_at(&self) -> Option<u64> {
        self.cpu_finished_at
    }

    pub fn cpu_expected_finish_at(&self) -> Option<u64> {
        self.cpu_expected_finish_at
    }

    /// Line under the music cursor
    pub fn music_line(&self) -> Option<usize> {
        line_of(&self.line_ranges, self.music_word_index)
    }

    /// Anchor the clock at the first keystroke and schedule the first tick.
    /// Later calls do nothing.
    pub fn start(&mut self, now_ms: u64) -> Option<TimerHandle> {
        if self.is_started() {
            return None;
        }
        self.anchor_ms = Some(now_ms);
        self.cpu_expected_finish_at = Some(now_ms + self.estimate_cpu_duration_ms());
        log::debug!(
            "rhythm started, cpu expected in {}ms",
            self.estimate_cpu_duration_ms()
        );
        self.schedule(now_ms)
    }

    /// Forget the pending tick; any handle already handed out turns stale
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            log::debug!("rhythm tick {:?} cancelled", pending.handle);
        }
    }

    pub fn pending(&self) -> Option<TimerHandle> {
        self.pending.map(|p| p.handle)
    }

    /// The pending handle if its due time has come
    pub fn due(&self, now_ms: u64) -> Option<TimerHandle> {
        self.pending
            .filter(|p| p.due_ms <= now_ms)
            .map(|p| p.handle)
    }

    pub fn next_due_ms(&self) -> Option<u64> {
        self.pending.map(|p| p.due_ms)
    }

    pub fn fire(&mut self, handle: TimerHandle, now_ms: u64) -> RhythmStep {
        let pending = match self.pending {
            Some(p) if p.handle == handle => p,
            _ => return RhythmStep::Stale,
        };
        self.pending = None;

        // a late fire after the cursor has left the scheduled line only reschedules
        if self.music_word_index > pending.line_end {
            self.schedule(now_ms);
            return RhythmStep::Rescheduled;
        }

        self.music_word_index += 1;
        if self.music_word_index >= self.word_count {
            self.cpu_finished_at = Some(now_ms);
            log::debug!("rhythm cursor finished at {now_ms}");
            return RhythmStep::Finished;
        }

        self.schedule(now_ms);
        RhythmStep::Advanced
    }

    /// Whole-run estimate: the timeline span plus one default line for the
    /// last entry, or a per-word heuristic without a timeline
    pub fn estimate_cpu_duration_ms(&self) -> u64 {
        match (self.timeline.first(), self.timeline.last()) {
            (Some(first), Some(last)) if self.has_timeline() => {
                last.time_ms.saturating_sub(first.time_ms) + DEFAULT_LINE_MS
            }
            _ => self.word_count as u64 * MS_PER_WORD_ESTIMATE,
        }
    }

    /// How long `line` lasts, clamped to `[MIN_LINE_MS, MAX_LINE_MS]`
    pub fn line_duration_ms(&self, line: usize) -> u64 {
        if !self.has_timeline() {
            return DEFAULT_LINE_MS;
        }
        match (self.timeline.get(line), self.timeline.get(line + 1)) {
            (Some(current), Some(next)) => next
                .time_ms
                .saturating_sub(current.time_ms)
                .clamp(MIN_LINE_MS, MAX_LINE_MS),
            _ => DEFAULT_LINE_MS,
        }
    }

    /// Delay before the cursor leaves its current word
    pub fn delay_ms(&self, now_ms: u64) -> Option<u64> {
        let line = self.music_line()?;
        let range = self.line_ranges[line];
        let words_in_line = range.word_count() as u64;

        let start = match self.line_start_elapsed(line) {
            Some(start) => start,
            None => return Some(self.line_duration_ms(line) / words_in_line),
        };
        let next_start = self
            .line_start_elapsed(line + 1)
            .unwrap_or(start + self.line_duration_ms(line));

        let offset = (self.music_word_index - range.start) as u64;
        let target = start + (next_start.saturating_sub(start)) * (offset + 1) / words_in_line;
        let elapsed = now_ms.saturating_sub(self.anchor_ms.unwrap_or(now_ms));

        Some(target.saturating_sub(elapsed).max(MIN_DELAY_MS))
    }

    /// Offset of `line`'s timestamp from the first timeline entry
    fn line_start_elapsed(&self, line: usize) -> Option<u64> {
        if !self.has_timeline() {
            return None;
        }
        let base = self.timeline.first()?.time_ms;
        self.timeline
            .get(line)
            .map(|entry| entry.time_ms.saturating_sub(base))
    }

    fn schedule(&mut self, now_ms: u64) -> Option<TimerHandle> {
        if self.music_word_index >= self.word_count {
            return None;
        }
        let line_end = self.line_ranges[self.music_line()?].end;
        let delay = self.delay_ms(now_ms)?;

        let handle = TimerHandle::next();
        self.pending = Some(PendingTick {
            handle,
            due_ms: now_ms + delay,
            line_end,
        });
        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(lens: &[usize]) -> Vec<LineRange> {
        let mut start = 0;
        lens.iter()
            .map(|&len| {
                let range = LineRange {
                    start,
                    end: start + len - 1,
                };
                start += len;
                range
            })
            .collect()
    }

    fn timeline(times: &[u64]) -> Vec<SyncedLine> {
        times
            .iter()
            .map(|&t| SyncedLine::new(t, format!("line at {t}")))
            .collect()
    }

    #[test]
    fn line_duration_clamps() {
        let s = RhythmScheduler::new(timeline(&[0, 4_000, 4_200, 20_000]), ranges(&[1, 1, 1, 1]), 4);
        assert_eq!(s.line_duration_ms(0), 4_000);
        assert_eq!(s.line_duration_ms(1), MIN_LINE_MS);
        assert_eq!(s.line_duration_ms(2), MAX_LINE_MS);
        assert_eq!(s.line_duration_ms(3), DEFAULT_LINE_MS);
    }

    #[test]
    fn no_timeline_uses_default_per_word() {
        let mut s = RhythmScheduler::new(vec![], ranges(&[3]), 3);
        assert!(!s.has_timeline());
        s.start(0);
        assert_eq!(s.next_due_ms(), Some(1_500));
        assert_eq!(s.estimate_cpu_duration_ms(), 3 * MS_PER_WORD_ESTIMATE);
    }

    #[test]
    fn single_entry_timeline_falls_back() {
        let mut s = RhythmScheduler::new(timeline(&[1_000]), ranges(&[2]), 2);
        assert!(!s.has_timeline());
        s.start(0);
        assert_eq!(s.next_due_ms(), Some(DEFAULT_LINE_MS / 2));
    }

    #[test]
    fn precise_interpolation() {
        // Two lines of two words; second line starts 4s after the first
        let mut s = RhythmScheduler::new(timeline(&[10_000, 14_000]), ranges(&[2, 2]), 4);
        let h = s.start(500).unwrap();
        // first word ends halfway through the first line
        assert_eq!(s.next_due_ms(), Some(500 + 2_000));
        assert_eq!(s.estimate_cpu_duration_ms(), 4_000 + DEFAULT_LINE_MS);
        assert_eq!(s.cpu_expected_finish_at(), Some(500 + 8_500));

        assert_eq!(s.fire(h, 2_500), RhythmStep::Advanced);
        assert_eq!(s.music_word_index(), 1);
        // word two ends at 4s elapsed; 2s elapsed so far
        assert_eq!(s.next_due_ms(), Some(2_500 + 2_000));
    }

    #[test]
    fn late_fire_floors_delay() {
        let mut s = RhythmScheduler::new(timeline(&[0, 2_000]), ranges(&[2, 1]), 3);
        let h = s.start(0).unwrap();
        // Fired very late: the next target is already behind
        assert_eq!(s.fire(h, 5_000), RhythmStep::Advanced);
        assert_eq!(s.next_due_ms(), Some(5_000 + MIN_DELAY_MS));
    }

    #[test]
    fn runs_to_the_end() {
        let mut s = RhythmScheduler::new(vec![], ranges(&[1, 1]), 2);
        let mut now = 0;
        let mut h = s.start(now).unwrap();
        now += DEFAULT_LINE_MS;
        assert_eq!(s.fire(h, now), RhythmStep::Advanced);
        h = s.pending().unwrap();
        now += DEFAULT_LINE_MS;
        assert_eq!(s.fire(h, now), RhythmStep::Finished);
        assert_eq!(s.cpu_finished_at(), Some(now));
        assert_eq!(s.pending(), None);
    }

    #[test]
    fn fire_after_cursor_left_the_line_only_reschedules() {
        let mut s = RhythmScheduler::new(vec![], ranges(&[1, 2]), 3);
        let h = s.start(0).unwrap();
        // cursor moved on to the second line while the tick was in flight
        s.music_word_index = 1;

        assert_eq!(s.fire(h, DEFAULT_LINE_MS), RhythmStep::Rescheduled);
        assert_eq!(s.music_word_index(), 1);
        let next = s.pending().unwrap();
        assert_ne!(next, h);
        assert_eq!(s.next_due_ms(), Some(DEFAULT_LINE_MS + DEFAULT_LINE_MS / 2));

        assert_eq!(s.fire(next, 7_000), RhythmStep::Advanced);
        assert_eq!(s.music_word_index(), 2);
    }

    #[test]
    fn stale_handles_are_ignored() {
        let mut s = RhythmScheduler::new(vec![], ranges(&[2]), 2);
        let h = s.start(0).unwrap();
        s.cancel();
        assert_eq!(s.fire(h, 10_000), RhythmStep::Stale);
        assert_eq!(s.music_word_index(), 0);
        assert_eq!(s.due(10_000), None);
    }

    #[test]
    fn handles_from_another_scheduler_are_stale() {
        let mut old = RhythmScheduler::new(vec![], ranges(&[2]), 2);
        let old_handle = old.start(0).unwrap();
        let mut new = RhythmScheduler::new(vec![], ranges(&[2]), 2);
        new.start(0).unwrap();
        assert_eq!(new.fire(old_handle, 10_000), RhythmStep::Stale);
    }

    #[test]
    fn start_only_once() {
        let mut s = RhythmScheduler::new(vec![], ranges(&[2]), 2);
        assert!(s.start(0).is_some());
        assert!(s.start(100).is_none());
        assert_eq!(s.anchor_ms(), Some(0));
    }

    #[test]
    fn due_respects_time() {
        let mut s = RhythmScheduler::new(vec![], ranges(&[1]), 1);
        let h = s.start(0).unwrap();
        assert_eq!(s.due(DEFAULT_LINE_MS - 1), None);
        assert_eq!(s.due(DEFAULT_LINE_MS), Some(h));
    }
}
