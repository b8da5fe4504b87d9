//! Session service: the operations the bot shell wires to platform
//! commands and component events.
//!
//! The service owns no platform I/O. It hands the shell render-ready
//! values (menus, page views, outcomes) and leaves acknowledgment and
//! message delivery to the caller.

use crate::error::ServiceError;
use crate::pager::{PageView, SelectionState};
use crate::router::{InteractionRouter, RenderInstruction};
use crate::store::PreferenceStore;
use crate::traits::CatalogApi;
use crate::types::{ControlId, Resource, SelectionMode, Subject, SubjectId, SurfaceId, UserId};
use std::collections::BTreeSet;
use std::sync::Arc;

pub const WELCOME_TEXT: &str = "Welcome! What would you like to do?";
pub const REGISTER_PROMPT: &str = "Select subjects to register:";
pub const VIEW_PROMPT: &str = "Select a subject to view resources:";
pub const NO_PREFERENCES_GUIDANCE: &str =
    "You haven't registered any subjects yet. Use the /register command to register subjects.";
pub const FIRST_PREFERENCE_SAVED: &str = "Your first subject preference has been saved!";
pub const PREFERENCE_SAVED: &str = "New subject preference has been saved!";
pub const SUBJECTS_REGISTERED: &str = "Subjects have been registered successfully!";
pub const PREFERENCES_RESET: &str =
    "Your subject preferences have been reset. Use the Register Subjects button to register new subjects.";

/// Stateless actions on the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    RegisterSubjects,
    ViewSubjects,
    ResetPreferences,
}

impl MenuAction {
    pub const ALL: [MenuAction; 3] = [
        MenuAction::RegisterSubjects,
        MenuAction::ViewSubjects,
        MenuAction::ResetPreferences,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuAction::RegisterSubjects => "Register Subjects",
            MenuAction::ViewSubjects => "View Subjects",
            MenuAction::ResetPreferences => "Reset Preferences",
        }
    }

    pub fn custom_id(&self) -> &'static str {
        match self {
            MenuAction::RegisterSubjects => "menu_register",
            MenuAction::ViewSubjects => "menu_view",
            MenuAction::ResetPreferences => "menu_reset",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        MenuAction::ALL.into_iter().find(|a| a.custom_id() == value)
    }
}

#[derive(Debug, Clone)]
pub struct MainMenu {
    pub text: &'static str,
    pub actions: Vec<MenuAction>,
}

/// A surface built but not yet bound to a rendered message. The shell
/// renders the view, learns the platform message id, and attaches it.
#[derive(Debug)]
pub struct PendingSurface {
    prompt: &'static str,
    state: SelectionState,
}

impl PendingSurface {
    pub fn prompt(&self) -> &'static str {
        self.prompt
    }

    pub fn view(&self) -> PageView {
        self.state.page_view()
    }
}

#[derive(Debug)]
pub enum ViewerOutcome {
    Surface(PendingSurface),
    /// Normal empty-state branch, not an error.
    NoPreferences,
}

/// Result of a select-menu commit, for the shell to deliver as followups.
#[derive(Debug)]
pub enum SelectionOutcome {
    /// View-mode pick: the subject's resources plus an optional
    /// preference-saved confirmation (suppressed when the subject was
    /// already registered).
    Resources {
        subject: Subject,
        resources: Vec<Resource>,
        confirmation: Option<&'static str>,
    },
    /// Register-mode batch: the confirmation notice and, when the surface
    /// is still live, the page-0 view to redraw it with.
    Registered {
        notice: &'static str,
        view: Option<PageView>,
    },
}

#[derive(Clone)]
pub struct SubjectService {
    catalog: Arc<dyn CatalogApi>,
    store: PreferenceStore,
    router: InteractionRouter,
}

impl SubjectService {
    pub fn new(catalog: Arc<dyn CatalogApi>, store: PreferenceStore, router: InteractionRouter) -> Self {
        Self {
            catalog,
            store,
            router,
        }
    }

    pub fn router(&self) -> &InteractionRouter {
        &self.router
    }

    /// The welcome menu. Stateless; menu buttons are routed by custom id,
    /// never through the surface registry.
    pub fn start_session(&self, user_id: &UserId) -> MainMenu {
        tracing::debug!(%user_id, "session started");
        MainMenu {
            text: WELCOME_TEXT,
            actions: MenuAction::ALL.to_vec(),
        }
    }

    /// Fetch the catalog and build a registration surface over it.
    pub async fn open_registration(
        &self,
        user_id: &UserId,
    ) -> Result<PendingSurface, ServiceError> {
        let subjects = self.catalog.list_subjects().await?;
        tracing::debug!(%user_id, subjects = subjects.len(), "registration surface opened");
        Ok(PendingSurface {
            prompt: REGISTER_PROMPT,
            state: SelectionState::new(subjects, SelectionMode::Register, user_id.clone()),
        })
    }

    /// Build a viewer surface over the user's registered subset of the
    /// catalog, or the guidance branch when nothing is registered.
    pub async fn open_viewer(&self, user_id: &UserId) -> Result<ViewerOutcome, ServiceError> {
        let Some(registered) = self.store.get(user_id).await? else {
            return Ok(ViewerOutcome::NoPreferences);
        };

        let subjects: Vec<Subject> = self
            .catalog
            .list_subjects()
            .await?
            .into_iter()
            .filter(|s| registered.contains(&s.id))
            .collect();

        if subjects.is_empty() {
            return Ok(ViewerOutcome::NoPreferences);
        }

        tracing::debug!(%user_id, subjects = subjects.len(), "viewer surface opened");
        Ok(ViewerOutcome::Surface(PendingSurface {
            prompt: VIEW_PROMPT,
            state: SelectionState::new(subjects, SelectionMode::View, user_id.clone()),
        }))
    }

    pub async fn reset_preferences(&self, user_id: &UserId) -> Result<(), ServiceError> {
        self.store.reset(user_id).await?;
        tracing::info!(%user_id, "preferences reset");
        Ok(())
    }

    /// Bind a pending surface to the message id the platform assigned.
    pub fn attach(&self, surface_id: SurfaceId, pending: PendingSurface) {
        self.router.register(surface_id, pending.state);
    }

    /// Route a Previous/Next/Done control event.
    pub fn on_control(
        &self,
        surface_id: &SurfaceId,
        control: ControlId,
    ) -> Option<RenderInstruction> {
        self.router.dispatch(surface_id, control)
    }

    /// Commit a select-menu pick against the surface's mode. A stale or
    /// unknown surface commits nothing and reports `None`.
    pub async fn on_select(
        &self,
        surface_id: &SurfaceId,
        values: &[SubjectId],
    ) -> Result<Option<SelectionOutcome>, ServiceError> {
        let Some((mode, owner)) = self.router.selection_context(surface_id) else {
            tracing::debug!(%surface_id, "select event for unknown surface");
            return Ok(None);
        };

        match mode {
            SelectionMode::View => {
                let Some(subject_id) = values.first() else {
                    return Ok(None);
                };
                let Some(subject) = self.router.subject(surface_id, subject_id) else {
                    return Ok(None);
                };

                let resources = self.catalog.list_resources(subject_id).await?;

                // The surface may have expired while the fetch was in
                // flight; a dead surface commits nothing.
                if !self.router.is_active(surface_id) {
                    tracing::debug!(%surface_id, "surface expired during resource fetch");
                    return Ok(None);
                }

                let outcome = self.store.add_one(&owner, subject_id).await?;
                let confirmation = if outcome.created {
                    Some(FIRST_PREFERENCE_SAVED)
                } else if outcome.newly_added {
                    Some(PREFERENCE_SAVED)
                } else {
                    None
                };
                Ok(Some(SelectionOutcome::Resources {
                    subject,
                    resources,
                    confirmation,
                }))
            }
            SelectionMode::Register => {
                let picked: BTreeSet<SubjectId> = values.iter().cloned().collect();
                if picked.is_empty() {
                    return Ok(None);
                }
                self.store.add_many(&owner, &picked).await?;
                let view = self.router.commit_batch(surface_id);
                Ok(Some(SelectionOutcome::Registered {
                    notice: SUBJECTS_REGISTERED,
                    view,
                }))
            }
        }
    }

    /// Fired by the shell's per-surface inactivity timer.
    pub fn expire(&self, surface_id: &SurfaceId) -> Option<RenderInstruction> {
        self.router.expire(surface_id)
    }
}
