//! Interaction router: the process-wide registry tying rendered surfaces
//! to their live selection state.
//!
//! The router exclusively owns the surface-id -> state mapping. Inbound
//! control events are matched here and turned into render instructions;
//! unknown surface ids are a benign race (a click on a message whose state
//! is gone) and dispatch to nothing.

use crate::pager::{NavDirection, PageView, SURFACE_TTL, SelectionState};
use crate::types::{ControlId, SelectionMode, Subject, SubjectId, SurfaceId, UserId};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Followup text sent when a registration batch is closed with Done.
pub const REGISTRATION_COMPLETE_NOTICE: &str =
    "Registration complete! You can select more subjects or close this message.";

/// What the shell should do to a surface after an event was routed.
///
/// Each inbound control event produces at most one instruction, and the
/// shell acknowledges the originating interaction exactly once when
/// applying it. Selection-commit paths never acknowledge on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderInstruction {
    /// Redraw the surface with the given page view.
    Update { surface_id: SurfaceId, view: PageView },
    /// Redraw the surface and send a followup notice.
    UpdateWithNotice {
        surface_id: SurfaceId,
        view: PageView,
        notice: String,
    },
    /// Redraw the surface with every control disabled.
    Disable { surface_id: SurfaceId, view: PageView },
}

#[derive(Clone)]
pub struct InteractionRouter {
    surfaces: Arc<DashMap<SurfaceId, SelectionState>>,
    ttl: Duration,
}

impl Default for InteractionRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionRouter {
    pub fn new() -> Self {
        Self {
            surfaces: Arc::new(DashMap::new()),
            ttl: SURFACE_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// How long a surface lives before the shell's timer expires it.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store state for a rendered surface, overwriting any prior entry for
    /// the same id (last render wins).
    pub fn register(&self, surface_id: SurfaceId, state: SelectionState) {
        self.surfaces.insert(surface_id, state);
    }

    /// Whether a surface is still registered and accepting events. Commit
    /// paths re-check this after every await point that could have raced
    /// with expiry.
    pub fn is_active(&self, surface_id: &SurfaceId) -> bool {
        self.surfaces
            .get(surface_id)
            .map(|s| s.controls_enabled())
            .unwrap_or(false)
    }

    /// Mode and owner of a surface, for routing a selection commit.
    pub fn selection_context(&self, surface_id: &SurfaceId) -> Option<(SelectionMode, UserId)> {
        self.surfaces
            .get(surface_id)
            .map(|s| (s.mode(), s.owner().clone()))
    }

    /// Resolve a picked subject id against the surface's item list.
    pub fn subject(&self, surface_id: &SurfaceId, id: &SubjectId) -> Option<Subject> {
        self.surfaces
            .get(surface_id)?
            .subject(id)
            .cloned()
    }

    /// Route a control event. Absent surfaces dispatch to nothing.
    ///
    /// Previous/Next re-render unconditionally: an out-of-range request is
    /// silently ignored by the state machine, and the surface is redrawn
    /// with its unchanged page. Done resets to page 0, keeps the surface
    /// registered, and carries the completion notice.
    pub fn dispatch(
        &self,
        surface_id: &SurfaceId,
        control: ControlId,
    ) -> Option<RenderInstruction> {
        let mut state = match self.surfaces.get_mut(surface_id) {
            Some(state) => state,
            None => {
                tracing::debug!(%surface_id, ?control, "control event for unknown surface");
                return None;
            }
        };
        if !state.controls_enabled() {
            return None;
        }

        match control {
            ControlId::Previous => {
                state.advance(NavDirection::Previous);
            }
            ControlId::Next => {
                state.advance(NavDirection::Next);
            }
            ControlId::Done => {
                state.reset_page();
                return Some(RenderInstruction::UpdateWithNotice {
                    surface_id: surface_id.clone(),
                    view: state.page_view(),
                    notice: REGISTRATION_COMPLETE_NOTICE.to_string(),
                });
            }
        }

        Some(RenderInstruction::Update {
            surface_id: surface_id.clone(),
            view: state.page_view(),
        })
    }

    /// Close a registration batch: back to page 0, surface stays live so
    /// the user can keep selecting.
    pub fn commit_batch(&self, surface_id: &SurfaceId) -> Option<PageView> {
        let mut state = self.surfaces.get_mut(surface_id)?;
        state.reset_page();
        Some(state.page_view())
    }

    /// Expire a surface: disable its controls and evict the entry. Returns
    /// the disabled view so the shell can redraw the dead message; `None`
    /// if the surface was already gone.
    pub fn expire(&self, surface_id: &SurfaceId) -> Option<RenderInstruction> {
        let (surface_id, mut state) = self.surfaces.remove(surface_id)?;
        state.disable();
        tracing::debug!(%surface_id, age_secs = state.age().as_secs(), "surface expired");
        Some(RenderInstruction::Disable {
            surface_id,
            view: state.page_view(),
        })
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}
