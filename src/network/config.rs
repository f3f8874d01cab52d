use serde::Deserialize;

use super::application::websocket::frame::{Framing, Opcode};
use super::error::Error;

/// Per-server settings shared by every connection.
///
/// Can be built in code (starting from [`Config::default`]) or parsed from a
/// small JSON document:
///
/// ```rust
/// use picows::network::Config;
///
/// let json = br#"{"max_payload":256,"send_threshold":128,"protocol":"chat"}"#;
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.max_payload, 256);
/// assert_eq!(config.protocol, Some("chat"));
/// assert!(!config.binary);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config<'a> {
    /// Upper bound on the payload of one outbound frame.
    pub max_payload: u16,
    /// Payload size at which an open frame is finalized and handed to the transport.
    pub send_threshold: u16,
    /// Send binary frames instead of text frames.
    pub binary: bool,
    /// Poll ticks without traffic before the connection times out.
    pub idle_timeout_polls: Option<u16>,
    /// Value echoed in the `Sec-WebSocket-Protocol` response header.
    #[serde(borrow)]
    pub protocol: Option<&'a str>,
}

impl Default for Config<'_> {
    fn default() -> Self {
        Self {
            max_payload: 1024,
            send_threshold: 512,
            binary: false,
            idle_timeout_polls: None,
            protocol: None,
        }
    }
}

impl<'a> Config<'a> {
    /// Parses and validates a JSON configuration document.
    pub fn from_json(json: &'a [u8]) -> Result<Self, Error> {
        let (config, _) =
            serde_json_core::from_slice::<Config<'a>>(json).map_err(|_| Error::InvalidConfig)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the values are consistent with each other.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_payload == 0 || self.send_threshold == 0 {
            return Err(Error::InvalidConfig);
        }
        if self.send_threshold > self.max_payload {
            return Err(Error::InvalidConfig);
        }
        if self.idle_timeout_polls == Some(0) {
            return Err(Error::InvalidConfig);
        }
        if let Some(protocol) = self.protocol {
            let token = !protocol.is_empty()
                && protocol
                    .bytes()
                    .all(|b| b.is_ascii_graphic() && b != b',' && b != b';');
            if !token {
                return Err(Error::InvalidConfig);
            }
        }
        Ok(())
    }

    /// Framing used for outbound WebSocket data.
    pub fn framing(&self) -> Framing {
        if self.binary {
            Framing::WebSocket(Opcode::Binary)
        } else {
            Framing::WebSocket(Opcode::Text)
        }
    }
}
