//! Cache resolution and the entity registry.
//!
//! On first access an entity is bound to a local store in one of three
//! states (see [`CacheState`]). Bindings live in a registry owned by the
//! resolver; concurrent callers share one resolution per entity, and a
//! failed resolution leaves the entity unbound so the next call retries.

pub mod handle;
pub mod state;

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::{Mutex, OnceCell};

use crate::fetch::{FetchConfig, PageSource, RemoteFetcher};
use crate::ingest::IngestPipeline;
use rmodels_core::{AppConfig, Entity, Error, LocalStore, MarkerDb, RemoteBacked};

pub use handle::ModelHandle;
pub use state::CacheState;

/// SQLite sidecar files removed together with a cache file.
const SIDECAR_SUFFIXES: [&str; 2] = ["-wal", "-shm"];

/// Where cache files live and how freshness is judged.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub cache_path: PathBuf,
    pub prefix: String,
    /// TTL tracking; `None` compares file mtime with the reference stamp.
    pub ttl: Option<Duration>,
}

impl CacheSettings {
    pub fn from_app(config: &AppConfig) -> Self {
        Self { cache_path: config.cache_path.clone(), prefix: config.cache_prefix.clone(), ttl: config.cache_ttl() }
    }
}

/// Top-level resolver: decides, builds and binds entities.
pub struct CacheResolver {
    settings: CacheSettings,
    pipeline: IngestPipeline,
    markers: Option<MarkerDb>,
    registry: Mutex<HashMap<String, Arc<OnceCell<ModelHandle>>>>,
}

impl CacheResolver {
    pub fn new(settings: CacheSettings, source: Arc<dyn PageSource>, markers: Option<MarkerDb>) -> Self {
        Self { settings, pipeline: IngestPipeline::new(source), markers, registry: Mutex::new(HashMap::new()) }
    }

    /// Wire the HTTP fetcher and, when a TTL is configured, the marker database.
    ///
    /// A marker database that cannot be opened on disk falls back to memory.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let fetcher = RemoteFetcher::new(FetchConfig::from_app(config))?;
        let markers = match config.cache_ttl() {
            Some(_) => Some(open_markers(&config.marker_db_path()).await?),
            None => None,
        };

        Ok(Self::new(CacheSettings::from_app(config), Arc::new(fetcher), markers))
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Path of the entity's cache file.
    pub fn cache_file(&self, entity: &Entity) -> PathBuf {
        self.settings.cache_path.join(entity.cache_file_name(&self.settings.prefix))
    }

    /// Resolve an entity to a queryable handle.
    ///
    /// The first successful call binds the entity; later calls return the
    /// same binding without checking freshness again.
    pub async fn resolve(&self, entity: &Entity) -> Result<ModelHandle, Error> {
        let cell = {
            let mut registry = self.registry.lock().await;
            registry.entry(entity.name().to_string()).or_default().clone()
        };

        let handle = cell.get_or_try_init(|| self.bind(entity)).await?;
        Ok(handle.clone())
    }

    /// Resolve a `RemoteBacked` type.
    pub async fn resolve_as<T: RemoteBacked>(&self) -> Result<ModelHandle, Error> {
        self.resolve(&Entity::of::<T>()).await
    }

    /// Whether the entity is currently bound in this process.
    pub async fn is_bound(&self, name: &str) -> bool {
        let registry = self.registry.lock().await;
        registry.get(name).is_some_and(|cell| cell.initialized())
    }

    /// State the resolver would pick for the entity right now.
    pub async fn inspect(&self, entity: &Entity) -> Result<CacheState, Error> {
        state::decide(&self.settings, self.markers.as_ref(), entity).await
    }

    /// Unbind an entity and discard its cache file and TTL marker.
    ///
    /// Returns whether a cache file was removed.
    pub async fn invalidate(&self, name: &str) -> Result<bool, Error> {
        self.registry.lock().await.remove(name);

        let entity = Entity::new(name);
        let file_name = entity.cache_file_name(&self.settings.prefix);

        if let Some(markers) = &self.markers {
            markers.forget(&file_name).await?;
        }

        let removed = remove_cache_file(&self.settings.cache_path.join(&file_name)).await?;
        tracing::info!(entity = name, removed, "invalidated cache");

        Ok(removed)
    }

    async fn bind(&self, entity: &Entity) -> Result<ModelHandle, Error> {
        let state = self.inspect(entity).await?;
        let path = self.cache_file(entity);
        tracing::info!(entity = entity.name(), %state, path = %path.display(), "resolving entity");

        let store = match state {
            CacheState::Fresh => LocalStore::open(&path).await?,
            CacheState::Rebuild => self.rebuild(entity, &path).await?,
            CacheState::Ephemeral => {
                let store = LocalStore::open_in_memory().await?;
                self.pipeline.build(entity, &store).await?;
                store
            }
        };

        Ok(ModelHandle::new(entity.clone(), store, state))
    }

    async fn rebuild(&self, entity: &Entity, path: &Path) -> Result<LocalStore, Error> {
        remove_cache_file(path).await?;
        let store = LocalStore::open(path).await?;

        if let Err(e) = self.pipeline.build(entity, &store).await {
            // A partial file would look fresh on the next access.
            if let Err(cleanup) = remove_cache_file(path).await {
                tracing::warn!(entity = entity.name(), error = %cleanup, "failed to discard partial cache file");
            }
            return Err(e);
        }

        store.checkpoint().await?;
        set_modified(path, entity.reference()).await?;

        if let Some(ttl) = self.settings.ttl {
            self.remember(entity, ttl).await;
        }

        Ok(store)
    }

    async fn remember(&self, entity: &Entity, ttl: Duration) {
        let key = entity.cache_file_name(&self.settings.prefix);
        let Some(markers) = &self.markers else {
            tracing::warn!(key, "TTL configured without a marker database, marker not recorded");
            return;
        };

        if let Err(e) = markers.remember(&key, ttl).await {
            tracing::warn!(key, error = %e, "failed to record TTL marker");
        }
    }
}

async fn open_markers(path: &Path) -> Result<MarkerDb, Error> {
    let markers = match MarkerDb::open(path).await {
        Ok(markers) => markers,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "marker database unavailable, using in-memory markers");
            MarkerDb::open_in_memory().await?
        }
    };

    match markers.purge_expired().await {
        Ok(purged) => tracing::debug!(purged, "purged expired TTL markers"),
        Err(e) => tracing::warn!(error = %e, "failed to purge expired TTL markers"),
    }

    Ok(markers)
}

/// Remove a cache file and its SQLite sidecars.
async fn remove_cache_file(path: &Path) -> Result<bool, Error> {
    let removed = remove_if_exists(path.to_path_buf()).await?;
    for suffix in SIDECAR_SUFFIXES {
        let mut sidecar = OsString::from(path.as_os_str());
        sidecar.push(suffix);
        remove_if_exists(PathBuf::from(sidecar)).await?;
    }
    Ok(removed)
}

async fn remove_if_exists(path: PathBuf) -> Result<bool, Error> {
    match tokio::fs::remove_file(&path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::CacheIo(format!("{}: {e}", path.display()))),
    }
}

/// Force the file's mtime to the entity's reference stamp.
async fn set_modified(path: &Path, reference: SystemTime) -> Result<(), Error> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<(), Error> {
        let file = std::fs::OpenOptions::new().write(true).open(&path)?;
        file.set_modified(reference)?;
        Ok(())
    })
    .await
    .map_err(|e| Error::CacheIo(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedSource, page, respond_sequence};
    use rmodels_core::schema::SchemaDescriptor;
    use rmodels_core::{ColumnType, StoreLocation};
    use serde_json::json;
    use std::time::UNIX_EPOCH;
    use tempfile::TempDir;

    fn reference() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_600_000_000)
    }

    fn celebrity() -> Entity {
        Entity::new("Celebrity").with_reference(reference())
    }

    fn two_pages() -> ScriptedSource {
        ScriptedSource::new(vec![
            page(json!({"current_page": 1, "last_page": 2, "per_page": 1, "data": [{"id": 888, "name": "The Rock"}]})),
            page(json!({"current_page": 2, "last_page": 2, "per_page": 1, "data": [{"id": 999, "name": "Dwayne Johnson"}]})),
        ])
    }

    fn resolver(dir: &Path, source: Arc<ScriptedSource>, ttl: Option<Duration>, markers: Option<MarkerDb>) -> CacheResolver {
        let settings = CacheSettings { cache_path: dir.to_path_buf(), prefix: "remote".into(), ttl };
        CacheResolver::new(settings, source, markers)
    }

    #[tokio::test]
    async fn test_rebuild_then_fresh_without_network() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let source = Arc::new(two_pages());

        let handle = resolver(&dir, source.clone(), None, None).resolve(&celebrity()).await.unwrap();
        assert_eq!(handle.state(), CacheState::Rebuild);
        assert_eq!(handle.count().await.unwrap(), 2);
        assert_eq!(source.call_count(), 3);

        let path = dir.join("remote-celebrity.sqlite");
        assert_eq!(handle.location(), &StoreLocation::File(path.clone()));
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), reference());

        let restarted = Arc::new(two_pages());
        let handle = resolver(&dir, restarted.clone(), None, None).resolve(&celebrity()).await.unwrap();
        assert_eq!(handle.state(), CacheState::Fresh);
        assert_eq!(handle.count().await.unwrap(), 2);
        assert_eq!(restarted.call_count(), 0);
    }

    #[tokio::test]
    async fn test_newer_reference_rebuilds() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        resolver(&dir, Arc::new(two_pages()), None, None).resolve(&celebrity()).await.unwrap();

        let changed = celebrity().with_reference(reference() + Duration::from_secs(60));
        let source = Arc::new(two_pages());
        let handle = resolver(&dir, source.clone(), None, None).resolve(&changed).await.unwrap();

        assert_eq!(handle.state(), CacheState::Rebuild);
        assert_eq!(handle.count().await.unwrap(), 2);
        assert_eq!(source.call_count(), 3);
    }

    #[tokio::test]
    async fn test_ttl_mode_uses_markers() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let markers = MarkerDb::open_in_memory().await.unwrap();
        let ttl = Some(Duration::from_secs(60));

        let first = resolver(&dir, Arc::new(two_pages()), ttl, Some(markers.clone()));
        assert_eq!(first.resolve(&celebrity()).await.unwrap().state(), CacheState::Rebuild);
        assert!(markers.is_present("remote-celebrity.sqlite").await.unwrap());

        let source = Arc::new(two_pages());
        let second = resolver(&dir, source.clone(), ttl, Some(markers.clone()));
        let changed = celebrity().with_reference(SystemTime::now() + Duration::from_secs(3600));
        assert_eq!(second.resolve(&changed).await.unwrap().state(), CacheState::Fresh);
        assert_eq!(source.call_count(), 0);

        markers.forget("remote-celebrity.sqlite").await.unwrap();
        assert_eq!(second.inspect(&changed).await.unwrap(), CacheState::Rebuild);
    }

    #[tokio::test]
    async fn test_unwritable_location_is_ephemeral() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let missing = dir.join("missing");

        let handle = resolver(&missing, Arc::new(two_pages()), None, None)
            .resolve(&celebrity())
            .await
            .unwrap();
        assert_eq!(handle.state(), CacheState::Ephemeral);
        assert_eq!(handle.location(), &StoreLocation::Memory);
        assert_eq!(handle.count().await.unwrap(), 2);
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn test_failed_resolution_stays_unbound() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let source = Arc::new(ScriptedSource::failing());
        let resolver = resolver(&dir, source.clone(), None, None);
        let entity = celebrity().with_schema(SchemaDescriptor::new([("name", ColumnType::String)]));

        let result = resolver.resolve(&entity).await;
        assert!(matches!(result, Err(Error::RemoteUnavailable(_))));
        assert!(!resolver.is_bound("Celebrity").await);
        assert!(!dir.join("remote-celebrity.sqlite").exists());

        assert!(resolver.resolve(&entity).await.is_err());
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_schema_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let source = Arc::new(ScriptedSource::new(vec![page(json!({"data": []}))]));
        let result = resolver(&dir, source, None, None).resolve(&celebrity()).await;

        assert!(matches!(result, Err(Error::EmptySchema(_))));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_build() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let source = Arc::new(two_pages());
        let resolver = resolver(&dir, source.clone(), None, None);
        let entity = celebrity();

        let (a, b) = tokio::join!(resolver.resolve(&entity), resolver.resolve(&entity));
        assert_eq!(a.unwrap().count().await.unwrap(), 2);
        assert_eq!(b.unwrap().count().await.unwrap(), 2);
        assert_eq!(source.call_count(), 3);
        assert!(resolver.is_bound("Celebrity").await);
    }

    #[tokio::test]
    async fn test_invalidate_forces_rebuild() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let markers = MarkerDb::open_in_memory().await.unwrap();
        let source = Arc::new(two_pages());
        let resolver = resolver(&dir, source.clone(), Some(Duration::from_secs(60)), Some(markers.clone()));

        resolver.resolve(&celebrity()).await.unwrap();
        assert!(resolver.invalidate("Celebrity").await.unwrap());
        assert!(!resolver.is_bound("Celebrity").await);
        assert!(!dir.join("remote-celebrity.sqlite").exists());
        assert!(!markers.is_present("remote-celebrity.sqlite").await.unwrap());

        let handle = resolver.resolve(&celebrity()).await.unwrap();
        assert_eq!(handle.state(), CacheState::Rebuild);
        assert_eq!(source.call_count(), 6);

        assert!(resolver.invalidate("Celebrity").await.unwrap());
        assert!(!resolver.invalidate("Celebrity").await.unwrap());
    }

    #[tokio::test]
    async fn test_from_config_opens_markers_only_with_ttl() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let config = AppConfig { cache_path: dir.clone(), domain: "https://yourdomain.com".into(), ..Default::default() };

        let plain = CacheResolver::from_config(&config).await.unwrap();
        assert!(plain.markers.is_none());
        assert!(plain.settings().ttl.is_none());

        let config = AppConfig { cache_ttl_secs: Some(60), ..config };
        let with_ttl = CacheResolver::from_config(&config).await.unwrap();
        assert!(with_ttl.markers.is_some());
        assert!(dir.join("remote-ttl-markers.sqlite").exists());

        let config = AppConfig { marker_db_path: Some(dir.join("missing").join("markers.sqlite")), ..config };
        let fallback = CacheResolver::from_config(&config).await.unwrap();
        assert!(fallback.markers.is_some());
    }

    #[tokio::test]
    async fn test_rebuild_over_http() {
        let first = r#"{"current_page":1,"last_page":2,"per_page":1,"data":[{"id":888,"name":"The Rock","birthday":"1972-05-02"}]}"#;
        let second = r#"{"current_page":2,"last_page":2,"per_page":1,"data":[{"id":999,"name":"Dwayne Johnson","birthday":"1972-05-02"}]}"#;
        let (base, server) = respond_sequence(vec![
            (200, first.to_string()),
            (200, first.to_string()),
            (200, second.to_string()),
        ])
        .await;

        let tmp = TempDir::new().unwrap();
        let fetcher = RemoteFetcher::new(FetchConfig { domain: base, ..Default::default() }).unwrap();
        let settings = CacheSettings { cache_path: tmp.path().to_path_buf(), prefix: "remote".into(), ttl: None };
        let resolver = CacheResolver::new(settings, Arc::new(fetcher), None);

        let handle = resolver.resolve(&celebrity()).await.unwrap();
        assert_eq!(handle.state(), CacheState::Rebuild);
        assert_eq!(handle.count().await.unwrap(), 2);
        let rock = handle.find(888).await.unwrap().unwrap();
        assert_eq!(rock["birthday"], json!("1972-05-02 00:00:00"));

        let requests = server.await.unwrap();
        let lines: Vec<_> = requests.iter().map(|r| r.lines().next().unwrap_or_default().to_string()).collect();
        assert_eq!(
            lines,
            [
                "GET /api/_remote/_models/celebrity?page=1 HTTP/1.1",
                "GET /api/_remote/_models/celebrity?page=1 HTTP/1.1",
                "GET /api/_remote/_models/celebrity?page=2 HTTP/1.1",
            ]
        );
    }

    struct Celebrity;

    impl RemoteBacked for Celebrity {
        fn reference_stamp() -> SystemTime {
            reference()
        }
    }

    #[tokio::test]
    async fn test_resolve_as_and_queries() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let resolver = resolver(&dir, Arc::new(two_pages()), None, None);

        let handle = resolver.resolve_as::<Celebrity>().await.unwrap();
        assert_eq!(handle.entity().name(), "Celebrity");

        let all = handle.all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(handle.find(999).await.unwrap().unwrap()["name"], json!("Dwayne Johnson"));

        let matches = handle.where_eq("name", "The Rock".to_string(), None).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0]["id"], json!(888));

        let page = handle.paginate(2, Some(1)).await.unwrap();
        assert_eq!(page.current_page, Some(2));
        assert_eq!(page.last_page, Some(2));
        assert_eq!(page.data[0]["id"], json!(999));
    }
}
