//! Engine subprocess lifecycle: unpack the bundled archive, launch, restart.

use crate::config::EngineConfig;
use crate::error::{HostError, HostResult};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// File in the runtime directory recording which archive was extracted.
pub const STAMP_FILE: &str = ".archive-sha256";

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Owns the engine subprocess. Dropping the supervisor stops the engine.
#[derive(Debug)]
pub struct EngineSupervisor {
    config: EngineConfig,
    child: Option<Child>,
}

impl EngineSupervisor {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            child: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Path of the engine executable after extraction.
    pub fn executable_path(&self) -> PathBuf {
        self.config.runtime_dir.join(&self.config.executable)
    }

    /// Unpacks the engine archive into the runtime directory unless the
    /// same archive was already extracted there. Returns whether it
    /// extracted anything.
    pub fn extract(&self) -> HostResult<bool> {
        let Some(archive_path) = &self.config.archive_path else {
            return Ok(false);
        };
        if !archive_path.exists() {
            return Err(HostError::MissingArchive(archive_path.clone()));
        }

        let digest = archive_digest(archive_path)?;
        let stamp_path = self.config.runtime_dir.join(STAMP_FILE);
        let current = fs::read_to_string(&stamp_path).ok();
        if current.as_deref().map(str::trim) == Some(digest.as_str())
            && self.executable_path().exists()
        {
            debug!(dir = ?self.config.runtime_dir, "engine bundle up to date");
            return Ok(false);
        }

        fs::create_dir_all(&self.config.runtime_dir)?;
        let mut archive = ZipArchive::new(File::open(archive_path)?)?;
        archive.extract(&self.config.runtime_dir)?;
        fs::write(&stamp_path, &digest)?;
        info!(
            archive = ?archive_path,
            dir = ?self.config.runtime_dir,
            files = archive.len(),
            "engine bundle extracted"
        );
        Ok(true)
    }

    /// Starts the engine process.
    pub fn launch(&mut self) -> HostResult<()> {
        let path = self.executable_path();
        let mut command = Command::new(&path);
        command
            .args(&self.config.args)
            .current_dir(&self.config.runtime_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(windows)]
        if self.config.hide_window {
            use std::os::windows::process::CommandExt;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        let child = command
            .spawn()
            .map_err(|source| HostError::ProcessLaunch { path: path.clone(), source })?;
        info!(pid = child.id(), path = ?path, "engine started");
        self.child = Some(child);
        Ok(())
    }

    /// Whether the engine process this supervisor started is still alive.
    pub fn is_running(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                warn!(%status, "engine exited");
                self.child = None;
                false
            }
            Err(e) => {
                warn!(error = %e, "cannot query engine process");
                false
            }
        }
    }

    /// Extracts and launches the engine unless it is already running.
    pub fn ensure_running(&mut self) -> HostResult<()> {
        if self.is_running() {
            return Ok(());
        }
        self.extract()?;
        self.launch()
    }

    /// Stops the engine and starts it again.
    pub fn restart(&mut self) -> HostResult<()> {
        info!("restarting engine");
        self.shutdown();
        self.ensure_running()
    }

    /// Stops the engine if it is running.
    pub fn shutdown(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            debug!(pid = child.id(), "engine stopped");
        }
    }
}

impl Drop for EngineSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Hex SHA-256 of a file's contents.
fn archive_digest(path: &Path) -> HostResult<String> {
    let mut hasher = Sha256::new();
    let mut file = File::open(path)?;
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
