use serde::{Deserialize, Serialize};

/// One timestamped line of synchronized (karaoke style) lyrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedLine {
    pub time_ms: u64,
    pub text: String,
}

impl SyncedLine {
    pub fn new(time_ms: u64, text: impl Into<String>) -> Self {
        Self {
            time_ms,
            text: text.into(),
        }
    }
}

/// Parse `[mm:ss.xx] text` lines into a timeline sorted by timestamp.
///
/// Lines that don't match the format, or that carry no text after the
/// timestamp, are dropped. Out-of-order timestamps are fixed by the sort.
pub fn parse_synced_lyrics(raw: &str) -> Vec<SyncedLine> {
    let mut timeline: Vec<SyncedLine> = raw.lines().filter_map(parse_line).collect();
    // Stable, so lines sharing a timestamp keep their source order
    timeline.sort_by_key(|line| line.time_ms);
    timeline
}

fn parse_line(line: &str) -> Option<SyncedLine> {
    let line = line.trim_start();
    let rest = line.strip_prefix('[')?;
    let (stamp, text) = rest.split_once(']')?;
    let time_ms = parse_timestamp(stamp)?;

    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    Some(SyncedLine::new(time_ms, text))
}

/// `mm:ss` with an optional `.f`, `.ff` or `.fff` fraction
fn parse_timestamp(stamp: &str) -> Option<u64> {
    let (minutes, seconds) = stamp.split_once(':')?;
    let (seconds, fraction) = match seconds.split_once('.') {
        Some((s, f)) => (s, Some(f)),
        None => (seconds, None),
    };

    let minutes = two_digits(minutes)?;
    let seconds = two_digits(seconds)?;

    let fraction_ms = match fraction {
        None => 0,
        Some(f) if (1..=3).contains(&f.len()) && f.bytes().all(|b| b.is_ascii_digit()) => {
            // ".5" is 500ms, ".05" is 50ms, ".005" is 5ms
            let scale = 10u64.pow(3 - f.len() as u32);
            f.parse::<u64>().ok()? * scale
        }
        Some(_) => return None,
    };

    Some(minutes * 60_000 + seconds * 1_000 + fraction_ms)
}

fn two_digits(s: &str) -> Option<u64> {
    if s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}
