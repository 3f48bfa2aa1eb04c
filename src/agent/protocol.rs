//! Agent wire protocol.
//!
//! Frames are a 4-byte big-endian length followed by one JSON document.
//! A request is `{id, token, op, args}`; a reply is `{id, ok, value}` or
//! `{id, ok: false, error: {kind, msg}}`.  Byte values (plaintext and
//! decrypted payloads) cross the socket base64-encoded.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha1::{Digest, Sha1};

use crate::crypto::SecurityLevel;
use crate::errors::{Result, VaultError};

/// Version stamp exchanged via `info`; a mismatch makes the client restart
/// the agent.
pub const BINARY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upper bound on a single frame.  Items are small; anything past this is
/// a protocol error, not data.
const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// A single request frame.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub token: String,
    #[serde(flatten)]
    pub op: Op,
}

/// The operations the agent serves, tagged by the `op` field.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "camelCase")]
pub enum Op {
    Info,
    Unlock { password: String },
    IsLocked,
    Lock,
    RefreshAccess,
    Decrypt { level: SecurityLevel, blob: String },
    /// `plaintext` is base64.
    Encrypt { level: SecurityLevel, plaintext: String },
}

/// A single reply frame, correlated by `id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Reply {
    pub id: u64,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireError {
    pub kind: String,
    pub msg: String,
}

impl Reply {
    pub fn ok(id: u64, value: Value) -> Self {
        Reply {
            id,
            ok: true,
            value: Some(value),
            error: None,
        }
    }

    pub fn err(id: u64, error: &VaultError) -> Self {
        Reply {
            id,
            ok: false,
            value: None,
            error: Some(WireError {
                kind: error.kind().to_string(),
                msg: error.to_string(),
            }),
        }
    }
}

/// The `info` reply payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    pub binary_version: String,
    pub pid: u32,
}

/// Write one length-prefixed JSON frame.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    let mut body = serde_json::to_vec(value)
        .map_err(|e| VaultError::Serialization(format!("frame encode: {e}")))?;
    let len = u32::try_from(body.len())
        .map_err(|_| VaultError::Agent("frame too large".into()))?;
    if len > MAX_FRAME_LEN {
        return Err(VaultError::Agent("frame too large".into()));
    }

    let result = writer
        .write_all(&len.to_be_bytes())
        .and_then(|_| writer.write_all(&body))
        .and_then(|_| writer.flush());
    // Frames can carry passwords and plaintext.
    zeroize::Zeroize::zeroize(&mut body);
    result.map_err(VaultError::Io)
}

/// Read one length-prefixed JSON frame.  `Ok(None)` means a clean EOF
/// before any length bytes (peer hung up between requests).
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<Option<T>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(VaultError::Agent(format!("oversized frame ({len} bytes)")));
    }

    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body)?;
    let parsed = serde_json::from_slice(&body)
        .map_err(|e| VaultError::Agent(format!("malformed frame: {e}")));
    // Frames can carry passwords and plaintext.
    zeroize::Zeroize::zeroize(&mut body);
    parsed.map(Some)
}

/// Socket path for a vault: a hash of the canonical vault path under the
/// user's temp directory.
pub fn socket_path(vault_path: &Path) -> PathBuf {
    std::env::temp_dir().join(format!("agilevault-agent-{}.sock", vault_digest(vault_path)))
}

/// The session token lives next to the socket, mode 0600, so only
/// processes running as the same user can present it.
pub fn token_path(vault_path: &Path) -> PathBuf {
    std::env::temp_dir().join(format!("agilevault-agent-{}.token", vault_digest(vault_path)))
}

fn vault_digest(vault_path: &Path) -> String {
    let canonical = std::fs::canonicalize(vault_path).unwrap_or_else(|_| vault_path.to_path_buf());
    let digest = Sha1::digest(canonical.to_string_lossy().as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_roundtrip() {
        let request = Request {
            id: 7,
            token: "tok".into(),
            op: Op::Decrypt {
                level: SecurityLevel::SL5,
                blob: "U2FsdGVkX18…".into(),
            },
        };

        let mut buf = Vec::new();
        write_frame(&mut buf, &request).unwrap();
        let back: Request = read_frame(&mut buf.as_slice()).unwrap().unwrap();
        assert_eq!(back.id, 7);
        assert!(matches!(back.op, Op::Decrypt { .. }));
    }

    #[test]
    fn request_wire_shape() {
        let request = Request {
            id: 1,
            token: "t".into(),
            op: Op::Unlock {
                password: "pw".into(),
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["op"], "unlock");
        assert_eq!(json["args"]["password"], "pw");

        let info = Request {
            id: 2,
            token: "t".into(),
            op: Op::Info,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["op"], "info");
    }

    #[test]
    fn eof_before_frame_is_none() {
        let empty: &[u8] = &[];
        let frame: Option<Request> = read_frame(&mut &*empty).unwrap();
        assert!(frame.is_none());
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&u32::MAX.to_be_bytes());
        let result: Result<Option<Request>> = read_frame(&mut buf.as_slice());
        assert!(result.is_err());
    }

    #[test]
    fn socket_path_is_stable_per_vault() {
        let a = socket_path(Path::new("/tmp/a.agilekeychain"));
        let b = socket_path(Path::new("/tmp/b.agilekeychain"));
        assert_eq!(a, socket_path(Path::new("/tmp/a.agilekeychain")));
        assert_ne!(a, b);
    }
}
