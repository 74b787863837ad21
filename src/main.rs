mod ui;

use clap::{error::ErrorKind, ArgAction, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use itertools::Itertools;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs,
    io::{self, stdin},
    path::{Path, PathBuf},
    sync::Arc,
};

use lyrik::{
    app_dirs::AppDirs,
    cloze::RandSource,
    config::{Config, ConfigStore, FileConfigStore},
    hooks::LogHook,
    logging::init_logging,
    lyrics::{self, ChainSource, FileSource, Fetcher, LyricsQuery, LyricsSource, PresetSource, Song},
    results::{ResultSink, SessionResult, SqliteResultStore},
    runtime::{key_action, Clock, CrosstermEventSource, FixedTicker, KeyAction, LyrikEvent, Runner, SystemClock},
    session::{GameMode, Session},
};

const DEFAULT_SONG: &str = "twinkle";
const HISTORY_LIMIT: usize = 20;

/// type along to song lyrics: plain, fill-in-the-blanks, or racing the music
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A lyrics typing trainer: type songs word by word, recall hidden words in cloze mode, or race a music cursor paced by synchronized lyrics."
)]
pub struct Cli {
    /// game mode (defaults to the saved config)
    #[clap(short = 'm', long, value_enum)]
    mode: Option<GameMode>,

    /// preset or songs-dir song id to play
    #[clap(short = 's', long, conflicts_with_all = ["text", "lyrics"])]
    song: Option<String>,

    /// plain-text lyrics file to type
    #[clap(long, conflicts_with = "text")]
    lyrics: Option<PathBuf>,

    /// synchronized lyrics (.lrc) for --lyrics or --text
    #[clap(long)]
    synced: Option<PathBuf>,

    /// translation file, line-parallel to the lyrics
    #[clap(long)]
    translation: Option<PathBuf>,

    /// custom text to type
    #[clap(short = 't', long)]
    text: Option<String>,

    /// list the built-in songs and exit
    #[clap(long)]
    list: bool,

    /// print recent results and exit
    #[clap(long)]
    history: bool,

    /// pass every correctly typed word to the speech hook
    #[clap(long)]
    speak: bool,

    /// log verbosity, repeat for more (-v info, -vv debug, -vvv trace)
    #[clap(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// log file (defaults to the state directory)
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// save the effective settings as the new defaults
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Command line flags win over the saved config for this run
    fn apply(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if self.speak {
            config.speak_words = true;
        }
    }

    fn custom_song(&self) -> Result<Option<Song>, Box<dyn Error>> {
        let mut song = match (&self.text, &self.lyrics) {
            (Some(text), _) => Song::custom(text.clone()),
            (None, Some(path)) => {
                let mut song = Song::custom(fs::read_to_string(path)?);
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    song.id = stem.to_string();
                    song.title = stem.replace('_', " ");
                }
                song
            }
            (None, None) => return Ok(None),
        };
        song.synced = read_optional(self.synced.as_deref())?;
        song.translation = read_optional(self.translation.as_deref())?;
        Ok(Some(song))
    }

    fn initial_song(&self, source: &dyn LyricsSource) -> Result<Song, Box<dyn Error>> {
        if let Some(song) = self.custom_song()? {
            return Ok(song);
        }
        let id = self.song.as_deref().unwrap_or(DEFAULT_SONG);
        Ok(source.fetch(&LyricsQuery::new(id))?)
    }
}

fn read_optional(path: Option<&Path>) -> io::Result<Option<String>> {
    path.map(fs::read_to_string).transpose()
}

fn build_source(config: &Config) -> Arc<dyn LyricsSource> {
    match &config.songs_dir {
        Some(dir) => Arc::new(ChainSource::new(vec![
            Box::new(FileSource::new(dir)),
            Box::new(PresetSource),
        ])),
        None => Arc::new(PresetSource),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Typing,
    /// Waiting on the fetcher for the next song
    Loading,
    Results,
}

pub struct App {
    pub config: Config,
    pub song: Song,
    pub session: Session,
    pub state: AppState,
    pub now_ms: u64,
    pub best_wpm: Option<u32>,
    /// One-line status, e.g. a failed fetch
    pub notice: Option<String>,
    fetcher: Fetcher,
    store: Option<SqliteResultStore>,
}

impl App {
    pub fn new(
        config: Config,
        song: Song,
        source: Arc<dyn LyricsSource>,
        store: Option<SqliteResultStore>,
    ) -> lyrik::Result<Self> {
        let session = start_session(&config, &song)?;
        Ok(Self {
            config,
            song,
            session,
            state: AppState::Typing,
            now_ms: 0,
            best_wpm: None,
            notice: None,
            fetcher: Fetcher::new(source),
            store,
        })
    }

    /// Same song, fresh session
    pub fn restart(&mut self) {
        self.session.stop();
        match start_session(&self.config, &self.song) {
            Ok(session) => {
                self.session = session;
                self.state = AppState::Typing;
                self.notice = None;
            }
            Err(e) => self.notice = Some(e.to_string()),
        }
    }

    /// Ask the fetcher for the song after the current one
    pub fn request_next_song(&mut self) {
        self.session.stop();
        let next = next_song_id(&self.song.id);
        log::info!("loading next song {next}");
        self.fetcher.request(LyricsQuery::new(next));
        self.state = AppState::Loading;
    }

    pub fn poll_fetch(&mut self) {
        let Some(reply) = self.fetcher.poll() else {
            return;
        };
        match reply.and_then(|song| start_session(&self.config, &song).map(|s| (song, s))) {
            Ok((song, session)) => {
                self.song = song;
                self.session = session;
                self.notice = None;
                self.state = AppState::Typing;
            }
            Err(e) => {
                log::warn!("could not load next song: {e}");
                self.restart();
                self.notice = Some(format!("could not load next song: {e}"));
            }
        }
    }

    /// Quit requested
    pub fn on_key(&mut self, action: KeyAction) -> bool {
        match (self.state, action) {
            (_, KeyAction::Quit) => return true,
            (AppState::Loading, KeyAction::Restart) => {
                self.fetcher.cancel();
                self.restart();
            }
            (AppState::Loading, _) => {}
            (_, KeyAction::Restart) | (AppState::Results, KeyAction::Char('r')) => self.restart(),
            (_, KeyAction::NewSong) | (AppState::Results, KeyAction::Char('n')) => {
                self.request_next_song()
            }
            (AppState::Results, _) => {}
            (AppState::Typing, KeyAction::Speak) => self.session.speak_current(),
            (AppState::Typing, KeyAction::Backspace) => {
                self.session.backspace(self.now_ms);
            }
            (AppState::Typing, KeyAction::Char(c)) => {
                self.session.type_char(c, self.now_ms);
                self.check_finished();
            }
            (AppState::Typing, KeyAction::Ignore) => {}
        }
        false
    }

    pub fn on_tick(&mut self) {
        match self.state {
            AppState::Typing => {
                self.session.on_tick(self.now_ms);
                self.check_finished();
            }
            AppState::Loading => self.poll_fetch(),
            AppState::Results => {}
        }
    }

    fn check_finished(&mut self) {
        if self.state != AppState::Typing || !self.session.is_finished() {
            return;
        }
        self.state = AppState::Results;
        if let Some(result) = self.session.take_result() {
            self.persist(&result);
        }
    }

    fn persist(&mut self, result: &SessionResult) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        if let Err(e) = store.record(result) {
            log::warn!("failed to save result: {e}");
        }
        self.best_wpm = store.best_wpm(&result.title).unwrap_or_else(|e| {
            log::warn!("failed to read best wpm: {e}");
            None
        });
    }
}

fn start_session(config: &Config, song: &Song) -> lyrik::Result<Session> {
    let session = Session::new(song, config.mode, &mut RandSource::thread())?;
    Ok(session.with_hook(Box::new(LogHook), config.speak_words))
}

/// The preset after `current`, wrapping; the first preset for anything else
fn next_song_id(current: &str) -> String {
    let ids: Vec<String> = lyrics::presets()
        .map(|songs| songs.into_iter().map(|s| s.id).collect())
        .unwrap_or_default();
    let next = ids
        .iter()
        .position(|id| id == current)
        .map_or(0, |i| (i + 1) % ids.len());
    ids.get(next)
        .cloned()
        .unwrap_or_else(|| DEFAULT_SONG.to_string())
}

fn print_presets() -> lyrik::Result<()> {
    for song in lyrics::presets()? {
        let extras = [
            song.synced.as_ref().map(|_| "synced"),
            song.translation.as_ref().map(|_| "translated"),
        ]
        .into_iter()
        .flatten()
        .join(", ");
        let extras = if extras.is_empty() {
            extras
        } else {
            format!(" ({extras})")
        };
        println!("{:<16} {} - {}{extras}", song.id, song.title, song.artist);
    }
    Ok(())
}

fn print_history() -> lyrik::Result<()> {
    let store = SqliteResultStore::open_default()?;
    let results = store.recent(HISTORY_LIMIT)?;
    if results.is_empty() {
        println!("no results yet");
    }
    for stored in results {
        let r = &stored.result;
        println!(
            "{}  {:<28} {:<7} {:>3} wpm {:>3}% acc  {}/{} words  {}s",
            stored.finished_at.format("%Y-%m-%d %H:%M"),
            r.title,
            r.mode,
            r.wpm,
            r.accuracy,
            r.words_correct,
            r.words_correct + r.words_wrong,
            r.duration_seconds
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.verbose > 0 || std::env::var_os("RUST_LOG").is_some() {
        let log_file = cli.log_file.clone().unwrap_or_else(AppDirs::log_path);
        init_logging(cli.verbose, &log_file)?;
    }

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply(&mut config);
    if cli.save_config {
        config_store.save(&config)?;
        log::info!("saved config to {}", config_store.path().display());
    }

    if cli.list {
        print_presets()?;
        return Ok(());
    }
    if cli.history {
        print_history()?;
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let source = build_source(&config);
    let song = cli.initial_song(source.as_ref())?;
    let store = SqliteResultStore::open_default()
        .map_err(|e| log::warn!("results will not be saved: {e}"))
        .ok();
    let mut app = App::new(config, song, source, store)?;

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::from_millis(app.config.tick_rate_ms),
    );
    let clock = SystemClock::new();

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        let event = runner.step();
        app.now_ms = clock.now_ms();
        match event {
            LyrikEvent::Tick => app.on_tick(),
            LyrikEvent::Resize => {}
            LyrikEvent::Key(key) => {
                if app.on_key(key_action(&key)) {
                    break;
                }
            }
        }
    }

    app.session.stop();
    Ok(())
}
