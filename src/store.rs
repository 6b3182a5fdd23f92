use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use crate::{api::session::Credential, prelude::*};

/// TOML file keeping the credential between the runs.
pub struct SessionFile(PathBuf);

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    #[instrument(skip_all, fields(path = %self.0.display()))]
    pub fn load(&self) -> Result<Option<Credential>> {
        let text = match fs::read_to_string(&self.0) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("no stored session");
                return Ok(None);
            }
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed to read `{}`", self.0.display()));
            }
        };
        let credential = toml::from_str(&text)
            .with_context(|| format!("failed to parse `{}`", self.0.display()))?;
        Ok(Some(credential))
    }

    /// Write the credential, readable by the owner only on Unix.
    #[instrument(skip_all, fields(path = %self.0.display()))]
    pub fn save(&self, credential: &Credential) -> Result {
        let text = toml::to_string(credential)?;
        self.write_private(text.as_bytes())
            .with_context(|| format!("failed to write `{}`", self.0.display()))?;
        debug!("saved");
        Ok(())
    }

    fn write_private(&self, contents: &[u8]) -> std::io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

            options.mode(0o600);
            let mut file = options.open(&self.0)?;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
            file.write_all(contents)
        }
        #[cfg(not(unix))]
        {
            options.open(&self.0)?.write_all(contents)
        }
    }

    /// Forget the session; a missing file is fine.
    #[instrument(skip_all, fields(path = %self.0.display()))]
    pub fn clear(&self) -> Result {
        match fs::remove_file(&self.0) {
            Ok(()) => {
                info!("session cleared");
                Ok(())
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => {
                Err(error).with_context(|| format!("failed to remove `{}`", self.0.display()))
            }
        }
    }
}
