use super::{ServiceError, Session};
use directories::ProjectDirs;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const SESSION_FILE: &str = "session.json";
// A session is a few hundred bytes; anything larger is not ours
const MAX_FILE_SIZE: u64 = 64 * 1024;

/// Keeps the last issued session on disk so the next start resumes it.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new() -> Result<Self, ServiceError> {
        let dirs = ProjectDirs::from("com", "agenda", "agenda").ok_or_else(|| {
            ServiceError::Storage(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine data directory",
            ))
        })?;
        Ok(Self::at(dirs.data_dir()))
    }

    pub fn at(dir: &Path) -> Self {
        Self { path: dir.join(SESSION_FILE) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing, oversized or unreadable file is treated as no session.
    pub fn load(&self) -> Option<Session> {
        let metadata = std::fs::metadata(&self.path).ok()?;
        if metadata.len() > MAX_FILE_SIZE {
            log::warn!("Ignoring oversized session file {}", self.path.display());
            return None;
        }
        let file = File::open(&self.path).ok()?;
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(session) => Some(session),
            Err(e) => {
                log::warn!("Ignoring unreadable session file: {}", e);
                None
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), ServiceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(&self.path)?;
        // Bearer tokens: owner only, even when the file already existed.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, session)?;
        writer.flush()?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), ServiceError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
