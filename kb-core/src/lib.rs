//! Domain core for KlassBot.
//!
//! Pure selection state (pagination, routing), the preference store, and
//! the catalog contract. Platform adapters are pure I/O and plug in at
//! the edges: `kb-catalog` implements `CatalogApi`, `kb-discord` renders
//! `PageView`s and feeds events back in.

mod error;
mod pager;
mod router;
mod service;
mod store;
mod traits;
mod types;

pub use error::{CatalogError, ServiceError, StoreError};
pub use pager::{
    NavDirection, PAGE_SIZE, PageView, SURFACE_TTL, SelectionState, has_next, has_previous,
    visible_slice,
};
pub use router::{InteractionRouter, REGISTRATION_COMPLETE_NOTICE, RenderInstruction};
pub use service::{
    FIRST_PREFERENCE_SAVED, MainMenu, MenuAction, NO_PREFERENCES_GUIDANCE, PREFERENCE_SAVED,
    PREFERENCES_RESET, PendingSurface, REGISTER_PROMPT, SUBJECTS_REGISTERED, SelectionOutcome,
    SubjectService, VIEW_PROMPT, ViewerOutcome, WELCOME_TEXT,
};
pub use store::{AddOneOutcome, PreferenceStore};
pub use traits::CatalogApi;
pub use types::{ControlId, Resource, SelectionMode, Subject, SubjectId, SurfaceId, UserId};
