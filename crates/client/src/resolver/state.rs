//! Freshness decision for an entity's cache file.

use std::fmt;
use std::path::Path;
use std::time::SystemTime;

use serde::Serialize;

use super::CacheSettings;
use rmodels_core::{Entity, Error, MarkerDb};

/// Terminal binding state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    /// Existing file is current; bind without network access.
    Fresh,
    /// Truncate the file and reload it from the remote.
    Rebuild,
    /// No writable cache directory; load into a process-lifetime store.
    Ephemeral,
}

impl CacheState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheState::Fresh => "fresh",
            CacheState::Rebuild => "rebuild",
            CacheState::Ephemeral => "ephemeral",
        }
    }
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide the state for `entity`. Never touches the cache file itself.
///
/// Writability is judged by creating and dropping a scratch file in the
/// cache directory, so ownership and ACLs count, not only mode bits.
///
/// | check (in order)                                        | state     |
/// |---------------------------------------------------------|-----------|
/// | file exists and (mtime >= reference, or TTL marker set) | Fresh     |
/// | cache directory exists and is writable                  | Rebuild   |
/// | otherwise                                               | Ephemeral |
pub(crate) async fn decide(
    settings: &CacheSettings, markers: Option<&MarkerDb>, entity: &Entity,
) -> Result<CacheState, Error> {
    let file_name = entity.cache_file_name(&settings.prefix);
    let path = settings.cache_path.join(&file_name);

    if let Some(modified) = file_modified(&path).await {
        let fresh = match settings.ttl {
            None => modified >= entity.reference(),
            Some(_) => marker_present(markers, &file_name).await,
        };
        if fresh {
            return Ok(CacheState::Fresh);
        }
    }

    if dir_writable(&settings.cache_path).await {
        Ok(CacheState::Rebuild)
    } else {
        Ok(CacheState::Ephemeral)
    }
}

async fn file_modified(path: &Path) -> Option<SystemTime> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    if !metadata.is_file() {
        return None;
    }
    metadata.modified().ok()
}

async fn dir_writable(dir: &Path) -> bool {
    let dir = dir.to_path_buf();
    let check = tokio::task::spawn_blocking(move || {
        if !dir.is_dir() {
            return Ok(false);
        }
        tempfile::Builder::new().prefix(".rmodels-").tempfile_in(&dir).map(|_| true)
    })
    .await;

    match check {
        Ok(Ok(writable)) => writable,
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "cache directory is not writable");
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, "writability check did not complete");
            false
        }
    }
}

async fn marker_present(markers: Option<&MarkerDb>, key: &str) -> bool {
    let Some(markers) = markers else {
        tracing::warn!(key, "TTL configured without a marker database, treating cache as expired");
        return false;
    };

    match markers.is_present(key).await {
        Ok(present) => present,
        Err(e) => {
            tracing::warn!(key, error = %e, "TTL marker lookup failed, treating cache as expired");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn settings(dir: &Path, ttl: Option<Duration>) -> CacheSettings {
        CacheSettings { cache_path: dir.to_path_buf(), prefix: "remote".into(), ttl }
    }

    fn touch(path: &Path, modified: SystemTime) {
        let file = std::fs::File::create(path).unwrap();
        file.set_modified(modified).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_in_writable_dir_rebuilds() {
        let dir = TempDir::new().unwrap();
        let state = decide(&settings(dir.path(), None), None, &Entity::new("Celebrity")).await.unwrap();
        assert_eq!(state, CacheState::Rebuild);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_mtime_comparison() {
        let dir = TempDir::new().unwrap();
        let reference = UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        touch(&dir.path().join("remote-celebrity.sqlite"), reference);

        let current = Entity::new("Celebrity").with_reference(reference);
        let state = decide(&settings(dir.path(), None), None, &current).await.unwrap();
        assert_eq!(state, CacheState::Fresh);

        let newer = current.with_reference(reference + Duration::from_secs(1));
        let state = decide(&settings(dir.path(), None), None, &newer).await.unwrap();
        assert_eq!(state, CacheState::Rebuild);
    }

    #[tokio::test]
    async fn test_ttl_marker_decides() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("remote-celebrity.sqlite"), UNIX_EPOCH);
        let markers = MarkerDb::open_in_memory().await.unwrap();
        let settings = settings(dir.path(), Some(Duration::from_secs(60)));
        let entity = Entity::new("Celebrity").with_reference(SystemTime::now());

        let state = decide(&settings, Some(&markers), &entity).await.unwrap();
        assert_eq!(state, CacheState::Rebuild);

        markers.remember("remote-celebrity.sqlite", Duration::from_secs(60)).await.unwrap();
        let state = decide(&settings, Some(&markers), &entity).await.unwrap();
        assert_eq!(state, CacheState::Fresh);

        let state = decide(&settings, None, &entity).await.unwrap();
        assert_eq!(state, CacheState::Rebuild);
    }

    #[tokio::test]
    async fn test_missing_dir_is_ephemeral() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let state = decide(&settings(&missing, None), None, &Entity::new("Celebrity")).await.unwrap();
        assert_eq!(state, CacheState::Ephemeral);
    }

    #[tokio::test]
    async fn test_file_in_place_of_dir_is_ephemeral() {
        let dir = TempDir::new().unwrap();
        let not_a_dir = dir.path().join("cache");
        std::fs::write(&not_a_dir, b"").unwrap();

        let state = decide(&settings(&not_a_dir, None), None, &Entity::new("Celebrity")).await.unwrap();
        assert_eq!(state, CacheState::Ephemeral);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_existing_dir_follows_actual_write_access() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users can still write through 0o555; decide must agree with the OS either way.
        let can_write = std::fs::File::create(locked.join("attempt")).is_ok();
        let _ = std::fs::remove_file(locked.join("attempt"));

        let state = decide(&settings(&locked, None), None, &Entity::new("Celebrity")).await.unwrap();
        let expected = if can_write { CacheState::Rebuild } else { CacheState::Ephemeral };
        assert_eq!(state, expected);
        assert_eq!(std::fs::read_dir(&locked).unwrap().count(), 0);

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CacheState::Fresh.to_string(), "fresh");
        assert_eq!(serde_json::to_string(&CacheState::Ephemeral).unwrap(), "\"ephemeral\"");
    }
}
