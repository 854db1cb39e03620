//! Client-side editing core for storyline tracker entities.
//!
//! [`EntityEditor`] owns the canonical (server-confirmed) state of one
//! entity plus an independent draft the user edits, and drives the
//! save/cancel/delete lifecycle against an abstract [`EntityService`].
//! Confirmation dialogs, transient notifications, and navigation are
//! host-supplied seams so the core stays transport- and UI-agnostic.

use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{Entity, EntityId},
    error::ServiceError,
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{error, info, warn};

pub mod transport;

pub use transport::HttpEntityService;

/// Destinations the editor can ask the host to navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    EntityList { selected: Option<EntityId> },
}

/// How the editor was entered, derived from the host's route parameter.
///
/// Replaces the three-way sentinel overloading of a single id field
/// (0 / not-a-number / numeric) with an explicit tagged state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    /// Reserved identifier ("0"): the editor stays untouched.
    Uninitialized,
    /// No existing entity; editing a fresh template prior to creation.
    Add,
    /// Editing the remote entity with the given identifier.
    Edit(EntityId),
}

impl EditorMode {
    /// Maps a raw route parameter onto an editor mode: "0" and an
    /// empty/whitespace parameter are reserved and ignored, any other
    /// number selects edit-mode, anything non-numeric selects add-mode.
    pub fn from_route_param(param: &str) -> Self {
        let param = param.trim();
        if param.is_empty() {
            return Self::Uninitialized;
        }
        match param.parse::<i64>() {
            Ok(0) => Self::Uninitialized,
            Ok(id) => Self::Edit(EntityId(id)),
            Err(_) => Self::Add,
        }
    }
}

/// Remote CRUD surface for one entity collection.
///
/// The reset event fires when the backing dataset was reloaded wholesale;
/// subscribers are expected to refetch whatever they are holding.
#[async_trait]
pub trait EntityService<E: Entity>: Send + Sync {
    async fn fetch(&self, id: EntityId) -> Result<Option<E>, ServiceError>;
    async fn create(&self, entity: &E) -> Result<E, ServiceError>;
    async fn update(&self, entity: &E) -> Result<(), ServiceError>;
    async fn delete(&self, entity: &E) -> Result<(), ServiceError>;
    fn subscribe_reset(&self) -> broadcast::Receiver<()>;
}

/// Yes/no dialog. `None` asks the dialog's default leave-page question.
#[async_trait]
pub trait ConfirmationService: Send + Sync {
    async fn confirm(&self, prompt: Option<&str>) -> bool;
}

/// Transient, fire-and-forget user-visible message (toast).
pub trait NotificationService: Send + Sync {
    fn notify(&self, message: &str);
}

pub trait Navigator: Send + Sync {
    fn go_to(&self, route: Route);
}

struct EditorState<E> {
    mode: EditorMode,
    /// Last state known to match the remote store.
    canonical: Option<E>,
    /// User's in-progress copy; cloned from canonical, never aliased.
    draft: Option<E>,
    /// Bumped at the start of every initialize/save/delete so a stale
    /// completion cannot overwrite state committed by a newer operation.
    generation: u64,
}

impl<E> EditorState<E> {
    fn is_dirty(&self) -> bool
    where
        E: PartialEq,
    {
        match (&self.canonical, &self.draft) {
            (Some(canonical), Some(draft)) => canonical != draft,
            _ => false,
        }
    }
}

/// Edit/dirty-tracking controller for a single remote entity.
///
/// Constructed per navigation into the entity's detail view; call
/// [`EntityEditor::activate`] on entry and [`EntityEditor::deactivate`]
/// on teardown so the reset-signal listener is scoped to the editor's
/// active lifetime.
pub struct EntityEditor<E: Entity> {
    service: Arc<dyn EntityService<E>>,
    confirmation: Arc<dyn ConfirmationService>,
    notifications: Arc<dyn NotificationService>,
    navigator: Arc<dyn Navigator>,
    inner: Mutex<EditorState<E>>,
    reset_task: Mutex<Option<JoinHandle<()>>>,
}

impl<E: Entity> EntityEditor<E> {
    pub fn new(
        service: Arc<dyn EntityService<E>>,
        confirmation: Arc<dyn ConfirmationService>,
        notifications: Arc<dyn NotificationService>,
        navigator: Arc<dyn Navigator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            service,
            confirmation,
            notifications,
            navigator,
            inner: Mutex::new(EditorState {
                mode: EditorMode::Uninitialized,
                canonical: None,
                draft: None,
                generation: 0,
            }),
            reset_task: Mutex::new(None),
        })
    }

    /// Starts listening for the service's reset signal; each firing re-runs
    /// [`EntityEditor::initialize`] with the last-known mode. Re-activating
    /// replaces (and stops) any previous listener.
    pub async fn activate(self: &Arc<Self>) {
        let mut receiver = self.service.subscribe_reset();
        let editor = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(()) => {
                        let Some(editor) = editor.upgrade() else {
                            break;
                        };
                        let mode = { editor.inner.lock().await.mode };
                        info!(?mode, "data source reset; reinitializing editor");
                        editor.initialize(mode).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "reset listener lagged behind the signal");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        if let Some(previous) = self.reset_task.lock().await.replace(task) {
            previous.abort();
        }
    }

    /// Stops the reset listener. Idempotent: the task is released exactly
    /// once no matter how often teardown fires.
    pub async fn deactivate(&self) {
        if let Some(task) = self.reset_task.lock().await.take() {
            task.abort();
        }
    }

    /// Loads or initializes the edited entity according to `mode`.
    ///
    /// A fetch that finds nothing sends the user back to the list view; a
    /// fetch that fails surfaces a failure notification and leaves state
    /// untouched.
    pub async fn initialize(&self, mode: EditorMode) {
        let generation = {
            let mut inner = self.inner.lock().await;
            inner.mode = mode;
            inner.generation += 1;
            inner.generation
        };

        match mode {
            EditorMode::Uninitialized => {}
            EditorMode::Add => {
                let mut inner = self.inner.lock().await;
                if inner.generation == generation {
                    let template = E::template();
                    inner.draft = Some(template.clone());
                    inner.canonical = Some(template);
                }
            }
            EditorMode::Edit(id) => match self.service.fetch(id).await {
                Ok(Some(entity)) => {
                    let mut inner = self.inner.lock().await;
                    if inner.generation == generation {
                        inner.draft = Some(entity.clone());
                        inner.canonical = Some(entity);
                    }
                }
                Ok(None) => {
                    warn!(id = id.0, "entity not found; returning to list view");
                    self.go_to_list().await;
                }
                Err(err) => self.report_failure("Load", &err),
            },
        }
    }

    /// Discards draft edits by re-cloning the draft from the canonical
    /// state; announces the cancellation unless `notify` is false.
    pub async fn cancel(&self, notify: bool) {
        let label = {
            let mut inner = self.inner.lock().await;
            let Some(canonical) = inner.canonical.clone() else {
                return;
            };
            let label = canonical.label();
            inner.draft = Some(canonical);
            label
        };
        if notify {
            self.notifications
                .notify(&format!("Cancelled changes to {label}"));
        }
    }

    /// True iff the draft differs from the canonical state in any field.
    /// False while nothing is loaded.
    pub async fn is_dirty(&self) -> bool {
        self.inner.lock().await.is_dirty()
    }

    /// Persists the draft: entities without an identifier are created (and
    /// the server-assigned copy adopted, followed by navigation to the list
    /// scoped to the new id); entities with one are updated in place.
    pub async fn save(&self) {
        let Some((generation, merged)) = ({
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            match (&inner.canonical, &inner.draft) {
                (Some(canonical), Some(draft)) => {
                    Some((inner.generation, canonical.merged_with(draft)))
                }
                _ => None,
            }
        }) else {
            warn!("save requested before the editor was initialized");
            return;
        };

        if merged.id().is_none() {
            match self.service.create(&merged).await {
                Ok(created) => {
                    let label = created.label();
                    let selected = created.id();
                    {
                        let mut inner = self.inner.lock().await;
                        if inner.generation != generation {
                            return;
                        }
                        if let Some(id) = created.id() {
                            inner.mode = EditorMode::Edit(id);
                        }
                        inner.draft = Some(created.clone());
                        inner.canonical = Some(created);
                    }
                    self.notifications
                        .notify(&format!("Successfully added {label}"));
                    self.navigator.go_to(Route::EntityList { selected });
                }
                Err(err) => self.report_failure("Add", &err),
            }
            return;
        }

        match self.service.update(&merged).await {
            Ok(()) => {
                let label = merged.label();
                {
                    let mut inner = self.inner.lock().await;
                    if inner.generation != generation {
                        return;
                    }
                    inner.canonical = Some(merged.clone());
                    inner.draft = Some(merged);
                }
                self.notifications
                    .notify(&format!("Successfully saved {label}"));
            }
            Err(err) => self.report_failure("Save", &err),
        }
    }

    /// Asks for confirmation, then deletes the canonical entity. Declining
    /// leaves everything untouched; a remote failure is surfaced without
    /// navigating away.
    pub async fn delete(&self) {
        let Some((generation, entity)) = ({
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            inner
                .canonical
                .clone()
                .map(|entity| (inner.generation, entity))
        }) else {
            return;
        };

        let prompt = format!("Do you want to delete the {}?", entity.label());
        if !self.confirmation.confirm(Some(&prompt)).await {
            return;
        }

        self.cancel(false).await;
        match self.service.delete(&entity).await {
            Ok(()) => {
                let label = entity.label();
                {
                    let mut inner = self.inner.lock().await;
                    if inner.generation != generation {
                        return;
                    }
                    inner.canonical = None;
                    inner.draft = None;
                }
                self.notifications.notify(&format!("Deleted {label}"));
                self.navigator.go_to(Route::EntityList { selected: None });
            }
            Err(err) => self.report_failure("Delete", &err),
        }
    }

    /// Navigation-guard predicate: leaving is permitted when nothing is
    /// loaded, the draft is clean, or the user affirms the leave-page
    /// prompt. Callers must stall navigation until this resolves.
    pub async fn can_leave(&self) -> bool {
        {
            let inner = self.inner.lock().await;
            if inner.canonical.is_none() || !inner.is_dirty() {
                return true;
            }
        }
        self.confirmation.confirm(None).await
    }

    pub async fn mode(&self) -> EditorMode {
        self.inner.lock().await.mode
    }

    pub async fn canonical(&self) -> Option<E> {
        self.inner.lock().await.canonical.clone()
    }

    pub async fn draft(&self) -> Option<E> {
        self.inner.lock().await.draft.clone()
    }

    /// Mutates the draft in place; a no-op while nothing is loaded.
    pub async fn update_draft(&self, apply: impl FnOnce(&mut E)) {
        let mut inner = self.inner.lock().await;
        if let Some(draft) = inner.draft.as_mut() {
            apply(draft);
        }
    }

    async fn go_to_list(&self) {
        let selected = {
            let inner = self.inner.lock().await;
            inner.canonical.as_ref().and_then(Entity::id)
        };
        self.navigator.go_to(Route::EntityList { selected });
    }

    /// Single failure path for every remote call: one user-visible
    /// notification plus a structured log entry, no retries.
    fn report_failure(&self, operation: &str, err: &ServiceError) {
        error!(operation, error = %err, "remote entity call failed");
        self.notifications
            .notify(&format!("{operation} failed: {err}"));
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
