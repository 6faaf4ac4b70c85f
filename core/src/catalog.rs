//! Model catalog and its shared snapshot.
//!
//! The catalog is fetched from a [`CatalogSource`] once per session and held
//! in a [`CatalogHandle`]. Readers take an `Arc` snapshot and never wait on a
//! fetch in flight; a finished fetch replaces the snapshot wholesale.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;

/// A model offered by the catalog's provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    /// Canonical, provider-stripped identifier (e.g. `gemini-1.5-pro`).
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Methods valid for this model, in the order the backend reported them.
    #[serde(default)]
    pub supported_actions: Vec<String>,
}

impl ModelEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            supported_actions: Vec::new(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_actions = actions.into_iter().map(Into::into).collect();
        self
    }

    /// Human label: the display name when present, otherwise the name.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// The method selected by default for this model.
    pub fn default_action(&self) -> Option<&str> {
        self.supported_actions.first().map(String::as_str)
    }
}

/// Ordered, name-keyed list of models for exactly one provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    provider: String,
    entries: Vec<ModelEntry>,
}

impl Catalog {
    /// Build a catalog, keeping the first entry for any repeated name.
    pub fn new(provider: impl Into<String>, entries: Vec<ModelEntry>) -> Self {
        let provider = provider.into();
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(entries.len());
        for entry in entries {
            if seen.insert(entry.name.clone()) {
                unique.push(entry);
            } else {
                tracing::debug!(provider = %provider, model = %entry.name, "dropping duplicate catalog entry");
            }
        }
        Self {
            provider,
            entries: unique,
        }
    }

    pub fn empty(provider: impl Into<String>) -> Self {
        Self::new(provider, Vec::new())
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact lookup by model name.
    pub fn get(&self, name: &str) -> Option<&ModelEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// First model and its first action, the selection a fresh UI starts on.
    pub fn default_selection(&self) -> Option<(&ModelEntry, Option<&str>)> {
        self.entries
            .first()
            .map(|entry| (entry, entry.default_action()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("failed to list models for {provider}: {message}")]
    Fetch { provider: String, message: String },
}

/// Something that can list the models of one provider.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Provider whose models this source lists.
    fn provider(&self) -> &str;

    async fn list_models(&self) -> Result<Vec<ModelEntry>, CatalogError>;
}

/// Identifies one refresh; later tickets win over earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

#[derive(Debug)]
struct Installed {
    ticket: u64,
    catalog: Arc<Catalog>,
}

#[derive(Debug)]
struct HandleInner {
    installed: RwLock<Installed>,
    next_ticket: AtomicU64,
}

/// Shared, replace-only reference to the current catalog.
#[derive(Debug, Clone)]
pub struct CatalogHandle {
    inner: Arc<HandleInner>,
}

impl CatalogHandle {
    /// A handle holding an empty (not yet loaded) catalog for `provider`.
    pub fn new(provider: impl Into<String>) -> Self {
        Self::with_catalog(Catalog::empty(provider))
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                installed: RwLock::new(Installed {
                    ticket: 0,
                    catalog: Arc::new(catalog),
                }),
                next_ticket: AtomicU64::new(1),
            }),
        }
    }

    /// Current snapshot. Never waits for an outstanding refresh.
    pub fn snapshot(&self) -> Arc<Catalog> {
        let installed = self
            .inner
            .installed
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&installed.catalog)
    }

    /// Reserve a ticket for a refresh that is about to start.
    pub fn begin_refresh(&self) -> RefreshTicket {
        RefreshTicket(self.inner.next_ticket.fetch_add(1, Ordering::SeqCst))
    }

    /// Install `catalog` unless a refresh started later has already landed.
    ///
    /// Returns whether the catalog was installed.
    pub fn install(&self, ticket: RefreshTicket, catalog: Catalog) -> bool {
        let mut installed = self
            .inner
            .installed
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if ticket.0 <= installed.ticket {
            tracing::debug!(
                ticket = ticket.0,
                installed = installed.ticket,
                "discarding stale catalog refresh"
            );
            return false;
        }
        tracing::info!(
            provider = catalog.provider(),
            models = catalog.len(),
            "catalog installed"
        );
        *installed = Installed {
            ticket: ticket.0,
            catalog: Arc::new(catalog),
        };
        true
    }

    /// Fetch from `source` and install the result. A failed fetch installs an
    /// empty catalog so completion degrades to "no candidates".
    pub async fn refresh(&self, source: &dyn CatalogSource) -> bool {
        let ticket = self.begin_refresh();
        self.fetch_and_install(ticket, source).await
    }

    async fn fetch_and_install(&self, ticket: RefreshTicket, source: &dyn CatalogSource) -> bool {
        let catalog = match source.list_models().await {
            Ok(entries) => Catalog::new(source.provider(), entries),
            Err(err) => {
                tracing::warn!("catalog refresh failed, using empty catalog: {err}");
                Catalog::empty(source.provider())
            }
        };
        self.install(ticket, catalog)
    }

    /// Run a refresh in the background. The ticket is taken before spawning,
    /// so call order decides which result wins.
    ///
    /// Earlier refreshes are not aborted and may still be in flight. An
    /// earlier result that lands first is installed and later replaced; one
    /// that lands after a newer result is discarded.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_refresh(&self, source: Arc<dyn CatalogSource>) -> JoinHandle<bool> {
        let handle = self.clone();
        let ticket = self.begin_refresh();
        tokio::spawn(async move { handle.fetch_and_install(ticket, source.as_ref()).await })
    }
}
