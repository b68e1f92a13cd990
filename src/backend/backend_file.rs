use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, error};
use tokio::fs;

use crate::backend::StoreError;
use crate::user::Users;

type Result<T> = std::result::Result<T, StoreError>;

/// The whole account database: one JSON document, read in full
/// before every operation and rewritten in full after every change.
///
/// Nothing serialises a load/modify/save cycle. Two overlapping
/// signups both start from the same snapshot and the later save wins.
pub struct Backend {
    path: PathBuf,
}

impl Backend {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty store, not an error.
    pub async fn load(&self) -> Result<Users> {
        let path = &self.path;

        let bytes = match fs::read(path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{path:?} doesn't exist yet, no users");
                return Ok(Users::new());
            }
            Err(e) => {
                error!("read {path:?}: {e:?}");
                return Err(StoreError::Io);
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            error!("couldn't parse {path:?}: {e}");
            StoreError::Corrupt
        })
    }

    pub async fn save(&self, users: &Users) -> Result<()> {
        let path = &self.path;

        let json = serde_json::to_vec_pretty(users).map_err(|e| {
            error!("couldn't serialise users: {e:?}");
            StoreError::Corrupt
        })?;

        // write alongside, then swap in, so readers never see half a file
        let tmp = self.tmp_path();

        fs::write(&tmp, json).await.map_err(|e| {
            error!("write {tmp:?}: {e:?}");
            StoreError::Io
        })?;

        fs::rename(&tmp, path).await.map_err(|e| {
            error!("rename {tmp:?} -> {path:?}: {e:?}");
            StoreError::Io
        })
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "users.json".into());
        name.push(".tmp");

        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::user::User;

    fn user(hash: &str) -> User {
        User { pwhash: hash.into() }
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Backend::new(&dir.path().join("users.json"));

        assert_eq!(backend.load().await.unwrap(), Users::new());
        assert!(!backend.path().exists(), "load mustn't create the file");
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Backend::new(&dir.path().join("users.json"));

        let mut users = Users::new();
        users.insert("alice".into(), user("$2b$10$abc"));
        users.insert("Alice".into(), user("$2b$10$def"));
        backend.save(&users).await.unwrap();

        assert_eq!(backend.load().await.unwrap(), users);
        assert!(!dir.path().join("users.json.tmp").exists());
    }

    #[tokio::test]
    async fn save_replaces_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Backend::new(&dir.path().join("users.json"));

        let mut first = Users::new();
        first.insert("bob".into(), user("h1"));
        backend.save(&first).await.unwrap();

        let mut second = Users::new();
        second.insert("carol".into(), user("h2"));
        backend.save(&second).await.unwrap();

        let loaded = backend.load().await.unwrap();
        assert!(!loaded.contains_key("bob"));
        assert_eq!(loaded.get("carol"), Some(&user("h2")));
    }

    #[tokio::test]
    async fn reads_existing_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(
            &path,
            r#"{
  "steve": { "password": "$2b$10$xyz" },
  "alex": { "passwordHash": "$2b$10$uvw" }
}"#,
        )
        .unwrap();

        let users = Backend::new(&path).load().await.unwrap();

        assert_eq!(users.get("steve"), Some(&user("$2b$10$xyz")));
        assert_eq!(users.get("alex"), Some(&user("$2b$10$uvw")));
    }

    #[tokio::test]
    async fn writes_password_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        let backend = Backend::new(&path);

        let mut users = Users::new();
        users.insert("steve".into(), user("$2b$10$xyz"));
        backend.save(&users).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["steve"]["password"], "$2b$10$xyz");
    }

    #[tokio::test]
    async fn corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert_eq!(
            Backend::new(&path).load().await,
            Err(StoreError::Corrupt)
        );
    }
}
