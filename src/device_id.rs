// Copyright 2024 The MirageKit Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! A single stable device identity, persisted once per install.

use std::fs;
use std::path::Path;

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId(pub Uuid);

impl DeviceId {
    pub fn as_bytes(&self) -> [u8; 16] {
        *self.0.as_bytes()
    }

    /// Loads the device id from `path`, generating and persisting a fresh
    /// one if the file doesn't exist or can't be parsed.
    pub fn load_or_create(path: &Path) -> std::io::Result<Self> {
        if let Ok(contents) = fs::read_to_string(path) {
            if let Ok(uuid) = Uuid::parse_str(contents.trim()) {
                return Ok(Self(uuid));
            }
        }
        let id = Self(Uuid::new_v4());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, id.0.to_string())?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_or_create_persists_across_calls() {
        let dir = std::env::temp_dir().join(format!("miragekit-test-{}", Uuid::new_v4()));
        let path = dir.join("device_id");

        let first = DeviceId::load_or_create(&path).unwrap();
        let second = DeviceId::load_or_create(&path).unwrap();
        assert_eq!(first, second);

        let _ = fs::remove_dir_all(&dir);
    }
}
