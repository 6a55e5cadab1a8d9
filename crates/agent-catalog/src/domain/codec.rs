//! # Script Codec
//!
//! Wire format of a catalog output script:
//!
//! ```text
//! OP_FALSE OP_RETURN <protocol tag> <UTF-8 JSON payload>
//! ```
//!
//! Pushes use minimal encoding: the opcode byte is the length for 1..=75
//! bytes, otherwise `OP_PUSHDATA1/2/4` followed by a little-endian length.
//!
//! Some serializers keep the pushes after `OP_RETURN` as discrete chunks,
//! others coalesce the whole remainder into the `OP_RETURN` chunk's data.
//! [`decode`] accepts both and yields the same pushes.

use super::entities::AgentPayload;
use super::errors::DecodeError;
use super::value_objects::{
    MAX_DIRECT_PUSH, OP_FALSE, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4, OP_RETURN,
};

/// One parsed script element: an opcode and, for pushes, its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptChunk {
    pub op: u8,
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    pub fn opcode(op: u8) -> Self {
        Self { op, data: None }
    }

    /// A data push with the minimal opcode for its length.
    pub fn push(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let op = match data.len() {
            0 => OP_FALSE,
            n if n <= MAX_DIRECT_PUSH => n as u8,
            n if n <= u8::MAX as usize => OP_PUSHDATA1,
            n if n <= u16::MAX as usize => OP_PUSHDATA2,
            _ => OP_PUSHDATA4,
        };
        Self { op, data: Some(data) }
    }
}

/// An output's locking script in chunked form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockingScript {
    chunks: Vec<ScriptChunk>,
}

impl LockingScript {
    pub fn from_chunks(chunks: Vec<ScriptChunk>) -> Self {
        Self { chunks }
    }

    /// Parse raw script bytes.
    ///
    /// A top-level `OP_RETURN` takes everything after it as one data blob,
    /// the coalesced representation. Truncated pushes are clamped to the
    /// bytes that remain.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut chunks = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            let op = bytes[pos];
            pos += 1;

            if op == OP_RETURN {
                let rest = &bytes[pos..];
                chunks.push(ScriptChunk {
                    op,
                    data: (!rest.is_empty()).then(|| rest.to_vec()),
                });
                break;
            }

            let len = match op {
                1..=75 => op as usize,
                OP_PUSHDATA1 | OP_PUSHDATA2 | OP_PUSHDATA4 => {
                    match read_le_length(bytes, pos, length_width(op)) {
                        Some(len) => {
                            pos += length_width(op);
                            len
                        }
                        None => {
                            chunks.push(ScriptChunk::opcode(op));
                            break;
                        }
                    }
                }
                _ => {
                    chunks.push(ScriptChunk::opcode(op));
                    continue;
                }
            };

            let end = pos.saturating_add(len).min(bytes.len());
            chunks.push(ScriptChunk {
                op,
                data: Some(bytes[pos..end].to_vec()),
            });
            pos = end;
        }

        Self { chunks }
    }

    pub fn chunks(&self) -> &[ScriptChunk] {
        &self.chunks
    }

    /// Serialize back to bytes. An `OP_RETURN` chunk's data is written raw.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for chunk in &self.chunks {
            out.push(chunk.op);
            let Some(data) = &chunk.data else { continue };
            match chunk.op {
                OP_PUSHDATA1 => out.push(data.len() as u8),
                OP_PUSHDATA2 => out.extend_from_slice(&(data.len() as u16).to_le_bytes()),
                OP_PUSHDATA4 => out.extend_from_slice(&(data.len() as u32).to_le_bytes()),
                _ => {}
            }
            out.extend_from_slice(data);
        }
        out
    }

    /// True if the script starts with `OP_FALSE OP_RETURN`.
    pub fn is_data_carrier(&self) -> bool {
        matches!(
            self.chunks.as_slice(),
            [first, second, ..] if first.op == OP_FALSE && second.op == OP_RETURN
        )
    }
}

/// Cursor over a pushdata stream.
///
/// Yields one slice per push. Stops at the end of the buffer or at the first
/// opcode that is not a push; pushes already yielded stay valid. A push whose
/// declared length runs past the buffer is clamped to what remains.
#[derive(Debug, Clone)]
pub struct PushDataReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PushDataReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn halt(&mut self) -> Option<&'a [u8]> {
        self.pos = self.buf.len();
        None
    }
}

impl<'a> Iterator for PushDataReader<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let op = *self.buf.get(self.pos)?;
        self.pos += 1;

        let len = match op {
            1..=75 => op as usize,
            OP_PUSHDATA1 | OP_PUSHDATA2 | OP_PUSHDATA4 => {
                let width = length_width(op);
                match read_le_length(self.buf, self.pos, width) {
                    Some(len) => {
                        self.pos += width;
                        len
                    }
                    None => return self.halt(),
                }
            }
            _ => return self.halt(),
        };

        let start = self.pos;
        let end = start.saturating_add(len).min(self.buf.len());
        self.pos = end;
        Some(&self.buf[start..end])
    }
}

fn length_width(op: u8) -> usize {
    match op {
        OP_PUSHDATA1 => 1,
        OP_PUSHDATA2 => 2,
        _ => 4,
    }
}

fn read_le_length(buf: &[u8], pos: usize, width: usize) -> Option<usize> {
    let field = buf.get(pos..pos.checked_add(width)?)?;
    let mut le = [0u8; 4];
    le[..width].copy_from_slice(field);
    Some(u32::from_le_bytes(le) as usize)
}

/// Append one minimally-encoded push to `script`.
pub fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len == 0 {
        script.push(OP_FALSE);
        return;
    }
    if len <= MAX_DIRECT_PUSH {
        script.push(len as u8);
    } else if len <= u8::MAX as usize {
        script.push(OP_PUSHDATA1);
        script.push(len as u8);
    } else if len <= u16::MAX as usize {
        script.push(OP_PUSHDATA2);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        script.push(OP_PUSHDATA4);
        script.extend_from_slice(&(len as u32).to_le_bytes());
    }
    script.extend_from_slice(data);
}

/// Build `OP_FALSE OP_RETURN` followed by each push.
pub fn encode_pushes<'a>(pushes: impl IntoIterator<Item = &'a [u8]>) -> Vec<u8> {
    let mut script = vec![OP_FALSE, OP_RETURN];
    for data in pushes {
        push_data(&mut script, data);
    }
    script
}

/// Encode a payload as a catalog output script.
pub fn encode(payload: &AgentPayload, protocol_id: &str) -> Vec<u8> {
    let json = payload.to_wire_value(protocol_id).to_string();
    encode_pushes([protocol_id.as_bytes(), json.as_bytes()])
}

/// Recover the data pushes that follow the `OP_FALSE OP_RETURN` prefix.
pub fn decode(script: &LockingScript) -> Result<Vec<Vec<u8>>, DecodeError> {
    let chunks = script.chunks();
    if !script.is_data_carrier() {
        return Err(DecodeError::MissingPrefix);
    }

    // Both forms stop at the first chunk that is not a non-empty push.
    let pushes: Vec<Vec<u8>> = if chunks.len() > 2 {
        chunks[2..]
            .iter()
            .map_while(|chunk| match (chunk.op, &chunk.data) {
                (1..=OP_PUSHDATA4, Some(data)) => Some(data.clone()),
                _ => None,
            })
            .collect()
    } else {
        match &chunks[1].data {
            Some(blob) => PushDataReader::new(blob).map(<[u8]>::to_vec).collect(),
            None => Vec::new(),
        }
    };

    if pushes.len() < 2 {
        return Err(DecodeError::TooFewPushes {
            found: pushes.len(),
        });
    }
    Ok(pushes)
}

/// [`decode`] over raw script bytes.
pub fn decode_bytes(bytes: &[u8]) -> Result<Vec<Vec<u8>>, DecodeError> {
    decode(&LockingScript::from_bytes(bytes))
}
