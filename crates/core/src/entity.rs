//! Remote-backed entities.
//!
//! Any type can opt in by implementing [`RemoteBacked`]; the resolver then
//! works from the [`Entity`] descriptor it produces. Entities can also be
//! declared in configuration and looked up by name through a [`Catalog`].

use std::collections::HashMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use convert_case::{Case, Casing};

use crate::config::{AppConfig, ModelConfig};
use crate::schema::SchemaDescriptor;

/// Capability interface for types mirrored from a remote source.
///
/// Every method has a default, so an empty `impl RemoteBacked for Celebrity {}`
/// mirrors `/celebrity` under the configured API path with an inferred schema.
pub trait RemoteBacked: 'static {
    /// Logical name; defaults to the type's own name.
    fn remote_name() -> &'static str {
        short_type_name::<Self>()
    }

    /// Endpoint override: a path below the API path, or an absolute URL.
    fn remote_endpoint() -> Option<&'static str> {
        None
    }

    /// Explicit schema; `None` means infer from a sample page.
    fn remote_schema() -> Option<SchemaDescriptor> {
        None
    }

    /// Version stamp of the entity's definition.
    ///
    /// A cache file older than this stamp is stale.
    fn reference_stamp() -> SystemTime {
        executable_stamp()
    }

    fn entity() -> Entity
    where
        Self: Sized,
    {
        let mut entity = Entity::new(Self::remote_name()).with_reference(Self::reference_stamp());
        if let Some(endpoint) = Self::remote_endpoint() {
            entity = entity.with_endpoint(endpoint);
        }
        if let Some(schema) = Self::remote_schema() {
            entity = entity.with_schema(schema);
        }
        entity
    }
}

/// Descriptor of a remote-backed entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    name: String,
    endpoint: Option<String>,
    schema: Option<SchemaDescriptor>,
    reference: SystemTime,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), endpoint: None, schema: None, reference: UNIX_EPOCH }
    }

    /// Build the descriptor of a `RemoteBacked` type.
    pub fn of<T: RemoteBacked>() -> Self {
        T::entity()
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_schema(mut self, schema: SchemaDescriptor) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_reference(mut self, reference: SystemTime) -> Self {
        self.reference = reference;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&SchemaDescriptor> {
        self.schema.as_ref()
    }

    pub fn reference(&self) -> SystemTime {
        self.reference
    }

    /// Endpoint to resolve against the configured domain and API path.
    ///
    /// Defaults to `/<kebab-name>`.
    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("/{}", self.name.to_case(Case::Kebab)))
    }

    /// Local table name.
    pub fn table(&self) -> String {
        self.name.to_case(Case::Snake)
    }

    /// Cache file name: `<prefix>-<kebab-name>.sqlite`.
    pub fn cache_file_name(&self, prefix: &str) -> String {
        format!("{prefix}-{}.sqlite", self.name.to_case(Case::Kebab))
    }
}

/// Name to entity lookup for configuration-declared models.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entities: Vec<Entity>,
    by_name: HashMap<String, usize>,
}

impl Catalog {
    /// Build the catalog from the `models` section of the configuration.
    ///
    /// All models share one reference stamp: the config file's mtime when a
    /// file is in use, else the executable's.
    pub fn from_config(config: &AppConfig) -> Self {
        let reference = config
            .config_file
            .as_deref()
            .and_then(path_stamp)
            .unwrap_or_else(executable_stamp);

        let mut catalog = Self::default();
        for model in &config.models {
            catalog.insert(model_entity(model, reference));
        }
        catalog
    }

    pub fn insert(&mut self, entity: Entity) {
        match self.by_name.get(entity.name()) {
            Some(&idx) => self.entities[idx] = entity,
            None => {
                self.by_name.insert(entity.name().to_string(), self.entities.len());
                self.entities.push(entity);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.by_name.get(name).map(|&idx| &self.entities[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

fn model_entity(model: &ModelConfig, reference: SystemTime) -> Entity {
    let mut entity = Entity::new(model.name.clone()).with_reference(reference);
    if let Some(endpoint) = &model.endpoint {
        entity = entity.with_endpoint(endpoint.clone());
    }
    if let Some(schema) = &model.schema {
        entity = entity.with_schema(SchemaDescriptor::new(schema.iter().map(|c| (c.name.clone(), c.kind))));
    }
    entity
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Modification time of the running executable, or the epoch if unknown.
pub fn executable_stamp() -> SystemTime {
    std::env::current_exe()
        .ok()
        .and_then(|path| path_stamp(&path))
        .unwrap_or(UNIX_EPOCH)
}

fn path_stamp(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
