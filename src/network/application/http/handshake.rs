use super::selector::{Selection, StreamSelector};
use crate::network::Transport;
use crate::network::error::Error;
use crate::network::io::Io;

/// Length of a `Sec-WebSocket-Key` value (16 random bytes, base64).
pub const KEY_LEN: usize = 24;

/// Header names the parser acts on, sorted case-insensitively.
const FIELDS: &[&[u8]] = &[b"Sec-WebSocket-Key:", b"Upgrade:"];
const FIELD_KEY: usize = 0;
const FIELD_UPGRADE: usize = 1;

const WEBSOCKET: &[&[u8]] = &[b"websocket"];

/// What the request asked for.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// An `Upgrade: websocket` header was present.
    pub upgrade: bool,
    /// Raw `Sec-WebSocket-Key` value, if present.
    pub key: Option<[u8; KEY_LEN]>,
}

impl Request {
    /// The upgrade key, if this is a WebSocket upgrade request.
    pub fn websocket_key(&self) -> Option<&[u8; KEY_LEN]> {
        self.key.as_ref().filter(|_| self.upgrade)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    RequestLine,
    Separators,
    HeaderName,
    UpgradeValue,
    KeyValue,
    Done,
}

/// Streaming parser for the HTTP upgrade request.
///
/// Reads exactly the request head and nothing past its terminating blank
/// line, so bytes that follow (a first WebSocket frame, say) stay queued.
/// The request line and every header other than `Upgrade` and
/// `Sec-WebSocket-Key` are skipped without being stored.
#[derive(Debug, Clone)]
pub struct HandshakeParser {
    state: State,
    selector: StreamSelector<'static>,
    request: Request,
}

impl Default for HandshakeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HandshakeParser {
    pub const fn new() -> Self {
        Self {
            state: State::RequestLine,
            selector: StreamSelector::new(FIELDS).fold_case(),
            request: Request {
                upgrade: false,
                key: None,
            },
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Consumes the request head from `io`.
    pub async fn parse<T: Transport, const N: usize, const I: usize>(
        &mut self,
        io: &Io<'_, T, N, I>,
    ) -> Result<Request, Error> {
        loop {
            self.state = match self.state {
                State::RequestLine => {
                    drain_line(io).await?;
                    State::Separators
                }
                State::Separators => {
                    if eat_separators(io).await? {
                        State::Done
                    } else {
                        State::HeaderName
                    }
                }
                State::HeaderName => {
                    self.selector.reset(FIELDS);
                    match select(io, &mut self.selector).await? {
                        Selection::Match(FIELD_KEY) => State::KeyValue,
                        Selection::Match(FIELD_UPGRADE) => State::UpgradeValue,
                        _ => {
                            drain_line(io).await?;
                            State::Separators
                        }
                    }
                }
                State::UpgradeValue => {
                    skip_blanks(io).await?;
                    self.selector.reset(WEBSOCKET);
                    if select(io, &mut self.selector).await? == Selection::Match(0) {
                        self.request.upgrade = true;
                    } else {
                        log::debug!("upgrade to something other than websocket");
                    }
                    drain_line(io).await?;
                    State::Separators
                }
                State::KeyValue => {
                    skip_blanks(io).await?;
                    let mut key = [0u8; KEY_LEN];
                    io.read_exact(&mut key).await?;
                    self.request.key = Some(key);
                    drain_line(io).await?;
                    State::Separators
                }
                State::Done => {
                    log::debug!(
                        "request head parsed: upgrade={} key={}",
                        self.request.upgrade,
                        self.request.key.is_some()
                    );
                    return Ok(self.request);
                }
            };
        }
    }
}

async fn select<T: Transport, const N: usize, const I: usize>(
    io: &Io<'_, T, N, I>,
    selector: &mut StreamSelector<'static>,
) -> Result<Selection, Error> {
    loop {
        let mut outcome = Selection::Pending;
        io.peek_with(|chunk| {
            let (selection, used) = selector.feed(chunk);
            outcome = selection;
            used
        })
        .await?;
        if outcome != Selection::Pending {
            return Ok(outcome);
        }
    }
}

/// Consumes everything up to, not including, the next CR or LF.
async fn drain_line<T: Transport, const N: usize, const I: usize>(
    io: &Io<'_, T, N, I>,
) -> Result<(), Error> {
    loop {
        let mut found = false;
        io.peek_with(|chunk| match chunk.iter().position(|&b| b == b'\r' || b == b'\n') {
            Some(at) => {
                found = true;
                at
            }
            None => chunk.len(),
        })
        .await?;
        if found {
            return Ok(());
        }
    }
}

/// Consumes CR and LF bytes. Returns `true` once a second LF in a row ends
/// the request head; returns `false` in front of the next header line.
async fn eat_separators<T: Transport, const N: usize, const I: usize>(
    io: &Io<'_, T, N, I>,
) -> Result<bool, Error> {
    let mut newlines = 0;
    loop {
        let mut header_follows = false;
        io.peek_with(|chunk| {
            for (at, &b) in chunk.iter().enumerate() {
                match b {
                    b'\n' => {
                        newlines += 1;
                        if newlines == 2 {
                            return at + 1;
                        }
                    }
                    b'\r' => {}
                    _ => {
                        header_follows = true;
                        return at;
                    }
                }
            }
            chunk.len()
        })
        .await?;
        if newlines == 2 {
            return Ok(true);
        }
        if header_follows {
            return Ok(false);
        }
    }
}

/// Consumes spaces and tabs.
async fn skip_blanks<T: Transport, const N: usize, const I: usize>(
    io: &Io<'_, T, N, I>,
) -> Result<(), Error> {
    loop {
        let mut done = false;
        io.peek_with(|chunk| match chunk.iter().position(|&b| b != b' ' && b != b'\t') {
            Some(at) => {
                done = true;
                at
            }
            None => chunk.len(),
        })
        .await?;
        if done {
            return Ok(());
        }
    }
}
