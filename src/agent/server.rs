//! The unlock agent.
//!
//! A per-vault background process that keeps the unwrapped level keys in
//! memory between CLI invocations, so only the first command of a session
//! prompts for the master password.  It serves one request at a time over
//! a local unix socket; clients authenticate with a session token written
//! next to the socket with owner-only permissions.
//!
//! State machine: `Empty --open--> Locked --unlock--> Unlocked`, back to
//! `Locked` on an explicit `lock` or after the idle timeout, and gone on
//! SIGINT.  The idle check runs when a request arrives: a stale
//! `lastAccess` locks the store before the request is considered.

use std::fs;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use serde_json::{json, Value};
use zeroize::Zeroizing;

use crate::agent::protocol::{self, AgentInfo, Op, Reply, Request, BINARY_VERSION};
use crate::crypto::{Cryptor, KeyStore};
use crate::errors::{Result, VaultError};
use crate::vault::format;

/// Keys relock after this much idle time unless configured otherwise.
pub const DEFAULT_IDLE_LOCK: Duration = Duration::from_secs(600);

/// Soft per-stream I/O timeout.
const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval of the accept loop (it must also notice SIGINT).
const ACCEPT_POLL: Duration = Duration::from_millis(25);

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn request_shutdown(_signal: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// A running agent for one vault.
pub struct Agent {
    vault_path: PathBuf,
    keys: KeyStore,
    token: String,
    idle_lock_after: Duration,
    last_access: Instant,
}

impl Agent {
    /// Load the vault's wrapped keys and prepare a locked agent.
    pub fn new(vault_path: &Path) -> Result<Self> {
        let keys = KeyStore::from_key_file(format::read_key_file(&format::data_dir(vault_path))?)?;
        Ok(Self {
            vault_path: vault_path.to_path_buf(),
            keys,
            token: random_token(),
            idle_lock_after: DEFAULT_IDLE_LOCK,
            last_access: Instant::now(),
        })
    }

    pub fn idle_lock_after(mut self, idle: Duration) -> Self {
        self.idle_lock_after = idle;
        self
    }

    /// Bind the socket, publish the session token, and serve requests
    /// until SIGINT/SIGTERM.  Keys are zeroed and the socket and token
    /// files removed on the way out.
    pub fn serve(&mut self) -> Result<()> {
        let socket_path = protocol::socket_path(&self.vault_path);
        let token_path = protocol::token_path(&self.vault_path);

        // A leftover socket from a dead agent would block the bind.
        let _ = fs::remove_file(&socket_path);

        write_private(&token_path, self.token.as_bytes())?;
        let listener = UnixListener::bind(&socket_path)?;
        restrict_permissions(&socket_path)?;
        listener.set_nonblocking(true)?;

        unsafe {
            libc::signal(libc::SIGINT, request_shutdown as libc::sighandler_t);
            libc::signal(libc::SIGTERM, request_shutdown as libc::sighandler_t);
        }

        while !SHUTDOWN.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, _)) => {
                    // A broken client connection must not take the agent
                    // down; the next client simply re-dials.
                    let _ = self.serve_connection(stream);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL);
                }
                Err(e) => {
                    self.shutdown(&socket_path, &token_path);
                    return Err(e.into());
                }
            }
        }

        self.shutdown(&socket_path, &token_path);
        Ok(())
    }

    fn shutdown(&mut self, socket_path: &Path, token_path: &Path) {
        self.keys.lock();
        let _ = fs::remove_file(socket_path);
        let _ = fs::remove_file(token_path);
    }

    fn serve_connection(&mut self, mut stream: UnixStream) -> Result<()> {
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;

        while let Some(request) = protocol::read_frame::<_, Request>(&mut stream)? {
            let reply = self.handle(request);
            protocol::write_frame(&mut stream, &reply)?;
        }
        Ok(())
    }

    /// Process one request.  Requests are strictly serialized by the
    /// single-threaded loop, so an `unlock` ordered before a `decrypt` is
    /// always visible to it.
    fn handle(&mut self, request: Request) -> Reply {
        let id = request.id;
        if request.token != self.token {
            return Reply::err(id, &VaultError::Agent("invalid session token".into()));
        }

        // Idle transition happens before the request is considered.
        if self.keys.is_unlocked() && self.last_access.elapsed() > self.idle_lock_after {
            self.keys.lock();
        }

        match self.dispatch(request.op) {
            Ok(value) => Reply::ok(id, value),
            Err(e) => Reply::err(id, &e),
        }
    }

    fn dispatch(&mut self, op: Op) -> Result<Value> {
        match op {
            Op::Info => Ok(json!(AgentInfo {
                binary_version: BINARY_VERSION.to_string(),
                pid: std::process::id(),
            })),
            Op::Unlock { password } => {
                let password = Zeroizing::new(password);
                self.keys.unlock(&password)?;
                self.last_access = Instant::now();
                Ok(Value::Null)
            }
            Op::IsLocked => Ok(json!(!self.keys.is_unlocked())),
            Op::Lock => {
                self.keys.lock();
                Ok(Value::Null)
            }
            Op::RefreshAccess => {
                if !self.keys.is_unlocked() {
                    return Err(VaultError::Locked);
                }
                self.last_access = Instant::now();
                Ok(Value::Null)
            }
            Op::Decrypt { level, blob } => {
                let plaintext = self.keys.decrypt(level, &blob)?;
                self.last_access = Instant::now();
                Ok(json!(BASE64.encode(&*plaintext)))
            }
            Op::Encrypt { level, plaintext } => {
                let plaintext = Zeroizing::new(
                    BASE64
                        .decode(&plaintext)
                        .map_err(|e| VaultError::Agent(format!("bad plaintext base64: {e}")))?,
                );
                let blob = self.keys.encrypt(level, &plaintext)?;
                self.last_access = Instant::now();
                Ok(json!(blob))
            }
        }
    }
}

fn random_token() -> String {
    let mut raw = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut raw);
    raw.iter().map(|b| format!("{b:02x}")).collect()
}

/// Write a file readable only by its owner.  The restrictive mode is set
/// at creation so the token is never world-readable, even briefly.
fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    // An existing file keeps its old mode; normalize it.
    restrict_permissions(path)
}

fn restrict_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::Vault;
    use tempfile::TempDir;

    fn test_agent(idle: Duration) -> (TempDir, Agent) {
        let dir = TempDir::new().unwrap();
        let vault_path = dir.path().join("test.agilekeychain");
        Vault::create(&vault_path, "hunter2", 1000).unwrap();
        let agent = Agent::new(&vault_path).unwrap().idle_lock_after(idle);
        (dir, agent)
    }

    fn request(agent: &mut Agent, id: u64, op: Op) -> Reply {
        let token = agent.token.clone();
        agent.handle(Request { id, token, op })
    }

    #[test]
    fn starts_locked_and_unlocks() {
        let (_dir, mut agent) = test_agent(DEFAULT_IDLE_LOCK);

        let reply = request(&mut agent, 1, Op::IsLocked);
        assert_eq!(reply.value, Some(json!(true)));

        let reply = request(
            &mut agent,
            2,
            Op::Unlock {
                password: "hunter2".into(),
            },
        );
        assert!(reply.ok);

        let reply = request(&mut agent, 3, Op::IsLocked);
        assert_eq!(reply.value, Some(json!(false)));
    }

    #[test]
    fn wrong_password_reply_is_decrypt_error() {
        let (_dir, mut agent) = test_agent(DEFAULT_IDLE_LOCK);
        let reply = request(
            &mut agent,
            1,
            Op::Unlock {
                password: "wrong".into(),
            },
        );
        assert!(!reply.ok);
        assert_eq!(reply.error.unwrap().kind, "DecryptError");
    }

    #[test]
    fn bad_token_is_rejected() {
        let (_dir, mut agent) = test_agent(DEFAULT_IDLE_LOCK);
        let reply = agent.handle(Request {
            id: 1,
            token: "not-the-token".into(),
            op: Op::IsLocked,
        });
        assert!(!reply.ok);
    }

    #[test]
    fn idle_timeout_locks_before_request() {
        let (_dir, mut agent) = test_agent(Duration::from_millis(50));

        let reply = request(
            &mut agent,
            1,
            Op::Unlock {
                password: "hunter2".into(),
            },
        );
        assert!(reply.ok);

        std::thread::sleep(Duration::from_millis(100));
        let reply = request(
            &mut agent,
            2,
            Op::Decrypt {
                level: crate::crypto::SecurityLevel::SL5,
                blob: "irrelevant".into(),
            },
        );
        assert!(!reply.ok);
        assert_eq!(reply.error.unwrap().kind, "Locked");
    }

    #[test]
    fn refresh_access_keeps_unlocked_state_alive() {
        let (_dir, mut agent) = test_agent(Duration::from_millis(80));

        request(
            &mut agent,
            1,
            Op::Unlock {
                password: "hunter2".into(),
            },
        );
        for id in 2..5 {
            std::thread::sleep(Duration::from_millis(40));
            let reply = request(&mut agent, id, Op::RefreshAccess);
            assert!(reply.ok, "refresh within the idle window must succeed");
        }
    }
}
