use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::source::{LyricsQuery, LyricsSource};
use super::Song;
use crate::error::{Error, Result};

/// Longest single wait before re-checking the current token
const CANCEL_POLL: Duration = Duration::from_millis(20);

/// Cancellation token handed out for every fetch request
#[derive(Debug, Clone)]
pub struct CancelToken {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    fn new(id: u64) -> Self {
        Self {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct FetchReply {
    pub token: u64,
    pub result: Result<Song>,
}

/// Runs lyric fetches off the control thread, at most one live request at a time.
///
/// A newer request cancels the older one, and replies whose token is no longer
/// current are discarded, so a slow response can never land in a newer game.
pub struct Fetcher {
    source: Arc<dyn LyricsSource>,
    tx: Sender<FetchReply>,
    rx: Receiver<FetchReply>,
    current: Option<CancelToken>,
    next_id: u64,
}

impl Fetcher {
    pub fn new(source: Arc<dyn LyricsSource>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            source,
            tx,
            rx,
            current: None,
            next_id: 0,
        }
    }

    /// Start fetching `query`, cancelling whatever was in flight
    pub fn request(&mut self, query: LyricsQuery) -> CancelToken {
        self.cancel();

        self.next_id += 1;
        let token = CancelToken::new(self.next_id);
        self.current = Some(token.clone());

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let worker_token = token.clone();
        thread::spawn(move || {
            let result = source.fetch(&query);
            if worker_token.is_cancelled() {
                return;
            }
            let _ = tx.send(FetchReply {
                token: worker_token.id(),
                result,
            });
        });

        log::debug!("fetch #{} started", token.id());
        token
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            log::debug!("fetch #{} cancelled", token.id());
            token.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.current.is_some()
    }

    /// Non-blocking: the current request's reply, if it has arrived.
    /// A request cancelled through its token reports `FetchCancelled`.
    pub fn poll(&mut self) -> Option<Result<Song>> {
        if let Some(cancelled) = self.take_cancelled() {
            return Some(cancelled);
        }
        while let Ok(reply) = self.rx.try_recv() {
            if let Some(result) = self.accept(reply) {
                return Some(result);
            }
        }
        None
    }

    /// Block up to `timeout` for the current request's reply
    pub fn wait(&mut self, timeout: Duration) -> Option<Result<Song>> {
        let deadline = Instant::now() + timeout;
        while self.is_pending() {
            if let Some(cancelled) = self.take_cancelled() {
                return Some(cancelled);
            }
            let remaining = deadline
                .saturating_duration_since(Instant::now())
                .min(CANCEL_POLL);
            if remaining.is_zero() {
                break;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(reply) => {
                    if let Some(result) = self.accept(reply) {
                        return Some(result);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        None
    }

    fn take_cancelled(&mut self) -> Option<Result<Song>> {
        if !self.current.as_ref()?.is_cancelled() {
            return None;
        }
        let token = self.current.take()?;
        log::debug!("fetch #{} was cancelled by its token", token.id());
        Some(Err(Error::FetchCancelled))
    }

    fn accept(&mut self, reply: FetchReply) -> Option<Result<Song>> {
        match &self.current {
            Some(token) if token.id() == reply.token && !token.is_cancelled() => {
                self.current = None;
                Some(reply.result)
            }
            _ => {
                log::debug!("dropping stale fetch reply #{}", reply.token);
                None
            }
        }
    }
}
