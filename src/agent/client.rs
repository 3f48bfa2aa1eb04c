//! Client stub for the unlock agent.
//!
//! Each call opens a fresh connection to the vault's agent socket, sends
//! one request frame, and reads the matching reply.  `connect` hides the
//! lifecycle: it dials the socket, restarts the agent when the running
//! binary version does not match this client, and spawns one when none is
//! listening.

use std::cell::Cell;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use zeroize::Zeroizing;

use crate::agent::protocol::{self, AgentInfo, Op, Reply, Request, BINARY_VERSION};
use crate::crypto::{Cryptor, SecurityLevel};
use crate::errors::{Result, VaultError};

/// Soft per-request I/O timeout, matching the server side.
const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to poll for a freshly spawned agent's socket.
const SPAWN_WAIT: Duration = Duration::from_secs(1);
const SPAWN_POLL: Duration = Duration::from_millis(10);

/// Handle to a running agent for one vault.
pub struct AgentClient {
    vault_path: PathBuf,
    token: String,
    next_id: Cell<u64>,
    /// The agent's `info` reply captured when the client dialled.
    pub info: AgentInfo,
}

impl AgentClient {
    /// Dial an already-running agent.  Fails if no socket or token file is
    /// present for this vault.
    pub fn dial(vault_path: &Path) -> Result<Self> {
        let token = std::fs::read_to_string(protocol::token_path(vault_path))
            .map_err(|_| VaultError::Agent("no agent is running for this vault".into()))?
            .trim()
            .to_string();

        let client = Self {
            vault_path: vault_path.to_path_buf(),
            token,
            next_id: Cell::new(1),
            info: AgentInfo {
                binary_version: String::new(),
                pid: 0,
            },
        };
        let value = client.request(Op::Info)?;
        let info: AgentInfo = serde_json::from_value(value)
            .map_err(|e| VaultError::Agent(format!("malformed info reply: {e}")))?;
        Ok(Self { info, ..client })
    }

    /// Dial the agent, restarting or starting one as needed.
    ///
    /// A version mismatch means a stale binary is still resident from
    /// before an upgrade: it gets a SIGINT and a fresh agent is spawned.
    pub fn connect(vault_path: &Path) -> Result<Self> {
        match Self::dial(vault_path) {
            Ok(client) if !needs_restart(&client.info) => return Ok(client),
            Ok(client) => {
                if client.info.pid != 0 {
                    unsafe {
                        libc::kill(client.info.pid as libc::pid_t, libc::SIGINT);
                    }
                }
            }
            Err(_) => {}
        }

        spawn_agent(vault_path)?;

        let deadline = Instant::now() + SPAWN_WAIT;
        let mut last_err = VaultError::Agent("agent did not start".into());
        while Instant::now() < deadline {
            match Self::dial(vault_path) {
                Ok(client) => return Ok(client),
                Err(e) => last_err = e,
            }
            std::thread::sleep(SPAWN_POLL);
        }
        Err(last_err)
    }

    /// Unlock the agent's key store with the master password.
    pub fn unlock(&self, master_password: &str) -> Result<()> {
        self.request(Op::Unlock {
            password: master_password.to_string(),
        })?;
        Ok(())
    }

    pub fn is_locked(&self) -> Result<bool> {
        let value = self.request(Op::IsLocked)?;
        value
            .as_bool()
            .ok_or_else(|| VaultError::Agent("malformed isLocked reply".into()))
    }

    /// Zero the agent's unwrapped keys.
    pub fn lock(&self) -> Result<()> {
        self.request(Op::Lock)?;
        Ok(())
    }

    /// Bump the agent's idle timer; errors with `Locked` if it already
    /// relocked.
    pub fn refresh_access(&self) -> Result<()> {
        self.request(Op::RefreshAccess)?;
        Ok(())
    }

    /// One connection, one request, one reply.
    fn request(&self, op: Op) -> Result<Value> {
        let socket_path = protocol::socket_path(&self.vault_path);
        let mut stream = UnixStream::connect(&socket_path)
            .map_err(|_| VaultError::Agent("no agent is running for this vault".into()))?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;

        let id = self.next_id.get();
        self.next_id.set(id + 1);

        protocol::write_frame(
            &mut stream,
            &Request {
                id,
                token: self.token.clone(),
                op,
            },
        )?;

        let reply: Reply = protocol::read_frame(&mut stream)?
            .ok_or_else(|| VaultError::Agent("agent closed the connection".into()))?;
        if reply.id != id {
            return Err(VaultError::Agent(format!(
                "reply id {} does not match request id {id}",
                reply.id
            )));
        }
        if reply.ok {
            Ok(reply.value.unwrap_or(Value::Null))
        } else {
            let error = reply
                .error
                .unwrap_or_else(|| protocol::WireError {
                    kind: "Agent".into(),
                    msg: "agent reported failure without detail".into(),
                });
            Err(VaultError::from_wire(&error.kind, &error.msg))
        }
    }
}

impl Cryptor for AgentClient {
    fn encrypt(&self, level: SecurityLevel, plaintext: &[u8]) -> Result<String> {
        let value = self.request(Op::Encrypt {
            level,
            plaintext: BASE64.encode(plaintext),
        })?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| VaultError::Agent("malformed encrypt reply".into()))
    }

    fn decrypt(&self, level: SecurityLevel, blob: &str) -> Result<Zeroizing<Vec<u8>>> {
        let value = self.request(Op::Decrypt {
            level,
            blob: blob.to_string(),
        })?;
        let encoded = value
            .as_str()
            .ok_or_else(|| VaultError::Agent("malformed decrypt reply".into()))?;
        Ok(Zeroizing::new(BASE64.decode(encoded).map_err(|e| {
            VaultError::Agent(format!("bad plaintext base64 in reply: {e}"))
        })?))
    }
}

/// True when the running agent was built from a different version than
/// this client and must be restarted.
pub fn needs_restart(info: &AgentInfo) -> bool {
    info.binary_version != BINARY_VERSION
}

/// Start a detached agent process for the vault.
fn spawn_agent(vault_path: &Path) -> Result<()> {
    let exe = std::env::current_exe()?;
    std::process::Command::new(exe)
        .arg("agent")
        .arg("--vault")
        .arg(vault_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| VaultError::Agent(format!("failed to start agent: {e}")))?;
    Ok(())
}
