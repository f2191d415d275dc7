//! Process-wide name → vector table.
//!
//! The table lock is held only to look up, insert, or remove an entry;
//! vectors are handed out as `Arc<TypedVector>` and used without it, so
//! operations on different vectors (or many on one) run concurrently.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use indexmap::IndexMap;
use ratchet_persist::{LoadConfig, LoadSummary, SaveSummary};
use ratchet_tensor::{ElementKind, TensorCodec};
use ratchet_vector::{ValidatedConfig, VectorConfig};

use crate::error::RegistryError;
use crate::typed::{KindCodec, TypedVector};

/// Configuration for a [`VectorRegistry`].
#[derive(Clone, Debug, Default)]
pub struct RegistryConfig {
    /// Configuration for every vector the registry creates.
    pub vector: VectorConfig,
    /// Tensor encoding used by `save` and `load`.
    pub codec: TensorCodec,
    /// Decoder settings used by `load`.
    pub load: LoadConfig,
}

/// Named typed tensor vectors.
#[derive(Debug)]
pub struct VectorRegistry {
    vectors: Mutex<IndexMap<String, Arc<TypedVector>>>,
    vector_config: ValidatedConfig,
    codec: TensorCodec,
    load: LoadConfig,
}

static GLOBAL: OnceLock<VectorRegistry> = OnceLock::new();

impl VectorRegistry {
    /// An empty registry with the default configuration.
    pub fn new() -> Self {
        Self {
            vectors: Mutex::new(IndexMap::new()),
            vector_config: ValidatedConfig::default(),
            codec: TensorCodec::default(),
            load: LoadConfig::default(),
        }
    }

    /// An empty registry with a validated configuration.
    pub fn with_config(config: RegistryConfig) -> Result<Self, RegistryError> {
        let RegistryConfig {
            vector,
            codec,
            load,
        } = config;
        Ok(Self {
            vectors: Mutex::new(IndexMap::new()),
            vector_config: vector.validated()?,
            codec,
            load,
        })
    }

    /// The process-wide registry, created on first use.
    pub fn global() -> &'static VectorRegistry {
        GLOBAL.get_or_init(VectorRegistry::new)
    }

    /// Entries are never left half-updated, so a panic while holding the
    /// lock leaves the table usable.
    fn table(&self) -> MutexGuard<'_, IndexMap<String, Arc<TypedVector>>> {
        self.vectors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an empty vector of `kind` under `name`.
    ///
    /// Returns `false`, leaving the existing vector alone, if the name is
    /// taken.
    pub fn create(&self, name: &str, kind: ElementKind) -> bool {
        let mut table = self.table();
        if table.contains_key(name) {
            return false;
        }
        let vector = TypedVector::with_validated(kind, &self.vector_config);
        table.insert(name.to_owned(), Arc::new(vector));
        tracing::debug!(name, %kind, "created vector");
        true
    }

    /// Unregister `name`. Returns `false` if it was not registered.
    ///
    /// Holders of the vector keep using it; it is freed with the last
    /// `Arc`.
    pub fn destroy(&self, name: &str) -> bool {
        let removed = self.table().shift_remove(name);
        if removed.is_some() {
            tracing::debug!(name, "destroyed vector");
        }
        removed.is_some()
    }

    /// The vector registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<TypedVector>, RegistryError> {
        self.table()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_owned(),
            })
    }

    /// Registered names, in creation order.
    pub fn names(&self) -> Vec<String> {
        self.table().keys().cloned().collect()
    }

    /// Number of registered vectors.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    /// Whether no vector is registered.
    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// Save the vector registered under `name` to `path`.
    pub fn save(&self, name: &str, path: impl AsRef<Path>) -> Result<SaveSummary, RegistryError> {
        let vector = self.get(name)?;
        let codec = self.kind_codec(vector.kind());
        Ok(vector.vector().save_to_path(&codec, path)?)
    }

    /// Load a vector of `kind` from `path` and register it under `name`.
    ///
    /// Fails with [`RegistryError::AlreadyExists`] if `name` is taken,
    /// before or after the file is read. Every tensor in the file must be
    /// of `kind`.
    pub fn load(
        &self,
        name: &str,
        kind: ElementKind,
        path: impl AsRef<Path>,
    ) -> Result<LoadSummary, RegistryError> {
        if self.table().contains_key(name) {
            return Err(RegistryError::AlreadyExists {
                name: name.to_owned(),
            });
        }

        let mut vector = TypedVector::with_validated(kind, &self.vector_config);
        let codec = self.kind_codec(kind);
        let summary = vector
            .vector_mut()
            .load_from_path(&codec, path, &self.load)?;

        let mut table = self.table();
        if table.contains_key(name) {
            return Err(RegistryError::AlreadyExists {
                name: name.to_owned(),
            });
        }
        table.insert(name.to_owned(), Arc::new(vector));
        tracing::debug!(name, %kind, elements = summary.elements, "loaded vector");
        Ok(summary)
    }

    fn kind_codec(&self, kind: ElementKind) -> KindCodec {
        KindCodec {
            kind,
            inner: self.codec.clone(),
        }
    }
}

impl Default for VectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
