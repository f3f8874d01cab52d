//! WebSocket frame header layout (RFC 6455 section 5.2).

/// Longest header this library writes: 2 base bytes plus a 16-bit length.
pub const MAX_HEADER_LEN: usize = 4;

/// Longest header on the wire: 2 base bytes, 64-bit length and a mask.
pub const MAX_WIRE_HEADER_LEN: usize = 14;

const FIN: u8 = 0x80;
const MASKED: u8 = 0x80;
const LEN_16: u8 = 126;
const LEN_64: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
    Reserved(u8),
}

impl Opcode {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x0F {
            0x0 => Opcode::Continuation,
            0x1 => Opcode::Text,
            0x2 => Opcode::Binary,
            0x8 => Opcode::Close,
            0x9 => Opcode::Ping,
            0xA => Opcode::Pong,
            other => Opcode::Reserved(other),
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Opcode::Continuation => 0x0,
            Opcode::Text => 0x1,
            Opcode::Binary => 0x2,
            Opcode::Close => 0x8,
            Opcode::Ping => 0x9,
            Opcode::Pong => 0xA,
            Opcode::Reserved(bits) => bits & 0x0F,
        }
    }

    /// Text or binary.
    pub fn is_data(self) -> bool {
        matches!(self, Opcode::Text | Opcode::Binary)
    }
}

/// How a region of the send ring goes out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Bytes are sent as-is (HTTP responses).
    Raw,
    /// Bytes are wrapped in a complete WebSocket frame with this opcode.
    WebSocket(Opcode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub fin: bool,
    pub opcode: Opcode,
    pub mask: Option<[u8; 4]>,
    pub payload_len: u64,
}

impl FrameHeader {
    /// Header of a complete, unmasked frame as a server sends it.
    pub fn server(opcode: Opcode, payload_len: usize) -> Self {
        Self {
            fin: true,
            opcode,
            mask: None,
            payload_len: payload_len as u64,
        }
    }

    /// Encoded size of this header.
    pub fn encoded_len(&self) -> usize {
        let ext = match self.payload_len {
            0..=125 => 0,
            126..=0xFFFF => 2,
            _ => 8,
        };
        2 + ext + (if self.mask.is_some() { 4 } else { 0 })
    }

    /// Writes the header into `out`, returning the number of bytes used.
    ///
    /// Returns `None` if `out` is too short.
    pub fn encode(&self, out: &mut [u8]) -> Option<usize> {
        let len = self.encoded_len();
        let out = out.get_mut(..len)?;
        out[0] = (if self.fin { FIN } else { 0 }) | self.opcode.bits();
        let masked = if self.mask.is_some() { MASKED } else { 0 };
        let mut at = 2;
        match self.payload_len {
            n @ 0..=125 => out[1] = masked | n as u8,
            n @ 126..=0xFFFF => {
                out[1] = masked | LEN_16;
                out[2..4].copy_from_slice(&(n as u16).to_be_bytes());
                at = 4;
            }
            n => {
                out[1] = masked | LEN_64;
                out[2..10].copy_from_slice(&n.to_be_bytes());
                at = 10;
            }
        }
        if let Some(mask) = self.mask {
            out[at..at + 4].copy_from_slice(&mask);
        }
        Some(len)
    }

    /// Parses a complete header from the front of `bytes`.
    ///
    /// Returns the header and its encoded size, or `None` if `bytes` ends
    /// before the header does.
    pub fn decode(bytes: &[u8]) -> Option<(Self, usize)> {
        let (&b0, rest) = bytes.split_first()?;
        let &b1 = rest.first()?;
        let mut at = 2;
        let payload_len = match b1 & !MASKED {
            LEN_16 => {
                let ext = bytes.get(at..at + 2)?;
                at += 2;
                u16::from_be_bytes([ext[0], ext[1]]) as u64
            }
            LEN_64 => {
                let ext = bytes.get(at..at + 8)?;
                at += 8;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(ext);
                u64::from_be_bytes(raw)
            }
            n => n as u64,
        };
        let mask = if b1 & MASKED != 0 {
            let key = bytes.get(at..at + 4)?;
            at += 4;
            Some([key[0], key[1], key[2], key[3]])
        } else {
            None
        };
        let header = Self {
            fin: b0 & FIN != 0,
            opcode: Opcode::from_bits(b0),
            mask,
            payload_len,
        };
        Some((header, at))
    }
}

/// Number of extended length bytes announced by the 7-bit length field.
pub fn extended_len_bytes(len7: u8) -> usize {
    match len7 & !MASKED {
        LEN_16 => 2,
        LEN_64 => 8,
        _ => 0,
    }
}

/// XORs `buf` with the repeating 4-byte `mask`, starting at mask offset 0.
pub fn apply_mask(buf: &mut [u8], mask: [u8; 4]) {
    for (byte, key) in buf.iter_mut().zip(mask.iter().cycle()) {
        *byte ^= key;
    }
}
