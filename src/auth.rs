use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use tracing::{error, info, warn};

use crate::{Error, Result};

pub fn get_local_passkey(key_path: &Path) -> Result<String> {
    match File::open(key_path) {
        Ok(file) => {
            let mut buffer = String::new();
            let mut reader = BufReader::new(file);
            match reader.read_to_string(&mut buffer) {
                Ok(_) => Ok(buffer.trim().to_string()),
                Err(err) => {
                    error!("Could not read key file {}: {}", key_path.display(), err);
                    Err(err.into())
                }
            }
        }
        Err(err) => {
            error!("Could not open key file {}: {}", key_path.display(), err);
            Err(err.into())
        }
    }
}

/// Accepts `remote_key` only if it matches the local key file. An empty or
/// unreadable key file rejects every token.
pub fn check_auth(remote_key: &str, key_path: &Path) -> Result<()> {
    let local_key = get_local_passkey(key_path).map_err(|_| Error::Unauthorized)?;
    if !local_key.is_empty() && local_key == remote_key.trim() {
        info!("Accepted bake token");
        Ok(())
    } else {
        warn!("Failed to authorize: token mismatch");
        Err(Error::Unauthorized)
    }
}
