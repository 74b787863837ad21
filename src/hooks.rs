use std::sync::{Arc, Mutex};

/// Fire-and-forget side effect for spoken words
pub trait WordHook: Send {
    fn speak(&mut self, word: &str);
}

/// Does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHook;

impl WordHook for NullHook {
    fn speak(&mut self, _word: &str) {}
}

/// Writes spoken words to the log; stands in where no speech engine exists
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHook;

impl WordHook for LogHook {
    fn speak(&mut self, word: &str) {
        log::info!("speak: {word}");
    }
}

/// Collects spoken words into a shared list
#[derive(Debug, Default, Clone)]
pub struct RecordingHook {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl RecordingHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .map(|words| words.clone())
            .unwrap_or_default()
    }
}

impl WordHook for RecordingHook {
    fn speak(&mut self, word: &str) {
        if let Ok(mut words) = self.spoken.lock() {
            words.push(word.to_string());
        }
    }
}
