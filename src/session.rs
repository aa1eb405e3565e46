//! One connection plus everything derived from it.
//!
//! The transport, scrollback and dump file live behind a single mutex. The
//! read loop runs on its own thread over a duplicate transport handle and only
//! takes the lock to record and render what it got; the input side takes it to
//! write a decoded command. Neither holds the lock across a wait.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::Action;
use crate::codec::{decode, CodecError, Mode};
use crate::config::Config;
use crate::dump::{Direction, DumpFile};
use crate::eol::Eol;
use crate::scrollback::{ScrollDirection, Scrollback, ScrollbackError};
use crate::transport::{Endpoint, FrameFormat, Transport, TransportError, TransportReader};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Scrollback(#[from] ScrollbackError),

    #[error("cannot open dump file {path}: {source}")]
    Dump {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("session state poisoned by a panicked thread")]
    Poisoned,
}

impl SessionError {
    /// Only malformed input leaves the session usable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SessionError::Codec(_))
    }
}

/// Fixed facts about the connection, for the status bar.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub endpoint: Endpoint,
    pub eol: Eol,
    pub line: Option<(u32, FrameFormat)>,
}

impl SessionInfo {
    pub fn describe(&self) -> String {
        match self.line {
            Some((baud, format)) => format!("{} {} {}", self.endpoint, baud, format),
            None => self.endpoint.to_string(),
        }
    }
}

/// Snapshot of what the output pane should show.
#[derive(Debug, Clone, Default)]
pub struct View {
    pub lines: Vec<String>,
    pub display_mode: Mode,
    pub first_line: usize,
    pub total_lines: usize,
    pub at_tail: bool,
}

struct Shared {
    transport: Transport,
    scrollback: Scrollback,
    dump: Option<DumpFile>,
}

impl Shared {
    fn record(&mut self, direction: Direction, bytes: &[u8]) {
        let Some(dump) = self.dump.as_mut() else {
            return;
        };
        if let Err(e) = dump.record(direction, bytes) {
            warn!(path = %dump.path().display(), error = %e, "dump write failed, disabling dump");
            self.dump = None;
        }
    }

    fn ingest(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        self.record(Direction::Inbound, bytes);
        self.scrollback.append(bytes)?;
        Ok(())
    }

    fn close(&mut self) {
        self.transport.close();
        if let Some(mut dump) = self.dump.take() {
            if let Err(e) = dump.flush() {
                warn!(error = %e, "dump flush failed");
            }
        }
    }
}

pub struct Session {
    shared: Arc<Mutex<Shared>>,
    info: SessionInfo,
    input_mode: Mode,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl Session {
    /// Open the transport and dump file named by `config`.
    pub fn open(config: &Config, width: usize, height: usize) -> Result<Self, SessionError> {
        let transport = Transport::open(config)?;
        let dump = match &config.dumpfile {
            Some(path) => Some(DumpFile::open(path).map_err(|source| SessionError::Dump {
                path: path.clone(),
                source,
            })?),
            None => None,
        };
        Ok(Self::new(transport, config.mode, config.eol, dump, width, height))
    }

    pub fn new(
        transport: Transport,
        mode: Mode,
        eol: Eol,
        dump: Option<DumpFile>,
        width: usize,
        height: usize,
    ) -> Self {
        let info = SessionInfo {
            endpoint: transport.endpoint().clone(),
            eol,
            line: transport.line_settings(),
        };
        let shared = Shared {
            transport,
            scrollback: Scrollback::new(mode, width, height, eol),
            dump,
        };
        Self {
            shared: Arc::new(Mutex::new(shared)),
            info,
            input_mode: mode,
            stop: Arc::new(AtomicBool::new(false)),
            reader: None,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Shared>, SessionError> {
        self.shared.lock().map_err(|_| SessionError::Poisoned)
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn input_mode(&self) -> Mode {
        self.input_mode
    }

    pub fn set_input_mode(&mut self, mode: Mode) {
        debug!(mode = mode.name(), "input mode");
        self.input_mode = mode;
    }

    /// Start the read loop. Each chunk is followed by `Action::Redraw`; a
    /// transport failure ends the loop with `Action::Fatal`.
    pub fn spawn_reader(
        &mut self,
        tx: mpsc::UnboundedSender<Action>,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        if self.reader.is_some() {
            return Ok(());
        }
        let reader = self.lock()?.transport.split_reader()?;
        let shared = Arc::clone(&self.shared);
        let stop = Arc::clone(&self.stop);
        let handle = thread::Builder::new()
            .name("ttyterm-reader".into())
            .spawn(move || read_loop(reader, shared, stop, tx, timeout))
            .map_err(TransportError::Io)?;
        self.reader = Some(handle);
        Ok(())
    }

    /// Decode `line` under the input mode and send it. Returns the byte count.
    pub fn send_line(&self, line: &str) -> Result<usize, SessionError> {
        let bytes = decode(line, self.input_mode, self.info.eol)?;
        let mut shared = self.lock()?;
        shared.transport.write(&bytes)?;
        shared.record(Direction::Outbound, &bytes);
        Ok(bytes.len())
    }

    pub fn view(&self) -> Result<View, SessionError> {
        let shared = self.lock()?;
        let scrollback = &shared.scrollback;
        Ok(View {
            lines: scrollback.visible().into_iter().map(|l| l.into_owned()).collect(),
            display_mode: scrollback.mode(),
            first_line: scrollback.first_visible(),
            total_lines: scrollback.total_lines(),
            at_tail: scrollback.is_at_tail(),
        })
    }

    pub fn set_display_mode(&self, mode: Mode) -> Result<(), SessionError> {
        debug!(mode = mode.name(), "display mode");
        self.lock()?.scrollback.set_mode(mode)?;
        Ok(())
    }

    pub fn resize(&self, width: usize, height: usize) -> Result<(), SessionError> {
        self.lock()?.scrollback.resize(width, height)?;
        Ok(())
    }

    pub fn scroll(&self, lines: usize, direction: ScrollDirection) -> Result<(), SessionError> {
        self.lock()?.scrollback.scroll(lines, direction);
        Ok(())
    }

    /// Stop the reader and release the transport. Later calls do nothing.
    pub fn close(&mut self) {
        if self.stop.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.reader.take() {
            if handle.join().is_err() {
                error!("reader thread panicked");
            }
        }
        match self.shared.lock() {
            Ok(mut shared) => shared.close(),
            Err(poisoned) => poisoned.into_inner().close(),
        }
        info!("session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

fn read_loop(
    mut reader: TransportReader,
    shared: Arc<Mutex<Shared>>,
    stop: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<Action>,
    timeout: Duration,
) {
    debug!("reader started");
    while !stop.load(Ordering::Relaxed) {
        let data = match reader.read(timeout) {
            Ok([]) => continue,
            Ok(data) => data,
            Err(e) => {
                if !stop.load(Ordering::Relaxed) {
                    error!(error = %e, "read failed");
                    let _ = tx.send(Action::Fatal(e.to_string()));
                }
                break;
            }
        };
        let ingested = match shared.lock() {
            Ok(mut shared) => shared.ingest(data),
            Err(_) => Err(SessionError::Poisoned),
        };
        if let Err(e) = ingested {
            error!(error = %e, "cannot store received data");
            let _ = tx.send(Action::Fatal(e.to_string()));
            break;
        }
        if tx.send(Action::Redraw).is_err() {
            break;
        }
    }
    debug!("reader stopped");
}
