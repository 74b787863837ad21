use std::sync::mpsc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use lyrik::cloze::ScriptedDraws;
use lyrik::lyrics::Song;
use lyrik::runtime::{
    key_action, ChannelEventSource, Clock, FixedTicker, KeyAction, LyrikEvent, ManualClock, Runner,
};
use lyrik::session::{GameMode, Session};

fn key(c: char) -> LyrikEvent {
    LyrikEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

/// Drive `session` from `runner` until it finishes or `steps` run out,
/// moving the clock `step_ms` per event
fn drive(
    session: &mut Session,
    runner: &Runner<ChannelEventSource, FixedTicker>,
    clock: &ManualClock,
    step_ms: u64,
    steps: u32,
) {
    for _ in 0..steps {
        let event = runner.step();
        clock.advance(step_ms);
        let now = clock.now_ms();
        match event {
            LyrikEvent::Tick => {
                session.on_tick(now);
            }
            LyrikEvent::Resize => {}
            LyrikEvent::Key(key) => match key_action(&key) {
                KeyAction::Char(c) => {
                    session.type_char(c, now);
                }
                KeyAction::Backspace => {
                    session.backspace(now);
                }
                _ => {}
            },
        }
        if session.is_finished() {
            break;
        }
    }
}

#[test]
fn headless_typing_flow_completes() {
    let mut session = Session::new(
        &Song::custom("hi there"),
        GameMode::Normal,
        &mut ScriptedDraws::default(),
    )
    .unwrap();

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(ChannelEventSource::new(rx), FixedTicker::from_millis(5));
    for c in "hi there".chars() {
        tx.send(key(c)).unwrap();
    }

    let clock = ManualClock::new(0);
    drive(&mut session, &runner, &clock, 100, 100);

    assert!(session.is_finished(), "session should have finished");
    let report = session.report().unwrap();
    assert_eq!(report.counters.words_correct, 2);
    assert_eq!(report.metrics.accuracy, 100);
    assert!(report.metrics.wpm > 0);
}

#[test]
fn headless_backspace_navigates_back() {
    let mut session = Session::new(
        &Song::custom("ab cd"),
        GameMode::Normal,
        &mut ScriptedDraws::default(),
    )
    .unwrap();

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(ChannelEventSource::new(rx), FixedTicker::from_millis(5));
    for ev in [key('a'), key('x'), key(' ')] {
        tx.send(ev).unwrap();
    }
    tx.send(LyrikEvent::Key(KeyEvent::new(
        KeyCode::Backspace,
        KeyModifiers::NONE,
    )))
    .unwrap();

    let clock = ManualClock::new(0);
    drive(&mut session, &runner, &clock, 10, 4);

    assert_eq!(session.current_word_index(), 0);
    assert_eq!(session.buffer(), "ax");
    assert!(!session.is_finished());
}

#[test]
fn headless_ticks_record_wpm_history() {
    let mut session = Session::new(
        &Song::custom("steady typing wins"),
        GameMode::Normal,
        &mut ScriptedDraws::default(),
    )
    .unwrap();

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(ChannelEventSource::new(rx), FixedTicker::from_millis(1));
    tx.send(key('s')).unwrap();

    // one key, then about three seconds of ticks
    let clock = ManualClock::new(0);
    drive(&mut session, &runner, &clock, 250, 13);

    assert_eq!(session.wpm_history().len(), 3);
    assert!(!session.is_finished());
}
