//! Paginated selection state machine.
//!
//! Pure computation over an ordered subject list: which slice is visible,
//! which navigation controls apply, and how a surface advances between
//! pages. All I/O (rendering, persistence) happens elsewhere.

use crate::types::{SelectionMode, Subject, SubjectId, UserId};
use std::time::{Duration, Instant};

/// Fixed option count per page, the platform's select-menu cap.
pub const PAGE_SIZE: usize = 25;

/// Fixed lifetime of a rendered surface. Not refreshed on interaction.
pub const SURFACE_TTL: Duration = Duration::from_secs(180);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Previous,
    Next,
}

/// The slice of `items` visible on `page`, clamped to bounds. An
/// out-of-range page yields an empty slice rather than failing.
pub fn visible_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

pub fn has_previous(page: usize) -> bool {
    page > 0
}

pub fn has_next(len: usize, page: usize, page_size: usize) -> bool {
    page.saturating_add(1).saturating_mul(page_size) < len
}

/// Live state of one paginated surface.
///
/// Invariant: `page * PAGE_SIZE < items.len()` whenever `items` is
/// non-empty. `advance` guards both edges, so navigation requests past
/// either end are silent no-ops.
#[derive(Debug, Clone)]
pub struct SelectionState {
    items: Vec<Subject>,
    page: usize,
    mode: SelectionMode,
    owner: UserId,
    controls_enabled: bool,
    created_at: Instant,
}

impl SelectionState {
    pub fn new(items: Vec<Subject>, mode: SelectionMode, owner: UserId) -> Self {
        Self {
            items,
            page: 0,
            mode,
            owner,
            controls_enabled: true,
            created_at: Instant::now(),
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Look up a subject by id across the whole list, not just the visible
    /// page. Select values always come from the current page, but the
    /// commit path should not depend on that.
    pub fn subject(&self, id: &SubjectId) -> Option<&Subject> {
        self.items.iter().find(|s| &s.id == id)
    }

    /// Move one page in `direction` if the corresponding control applies.
    /// Returns whether the page actually changed.
    pub fn advance(&mut self, direction: NavDirection) -> bool {
        match direction {
            NavDirection::Previous if has_previous(self.page) => {
                self.page -= 1;
                true
            }
            NavDirection::Next if has_next(self.items.len(), self.page, PAGE_SIZE) => {
                self.page += 1;
                true
            }
            _ => false,
        }
    }

    /// After a completed registration batch the surface returns to page 0
    /// so the user can keep selecting from the top.
    pub fn reset_page(&mut self) {
        self.page = 0;
    }

    pub fn disable(&mut self) {
        self.controls_enabled = false;
    }

    /// Render snapshot of the current page.
    pub fn page_view(&self) -> PageView {
        let options = visible_slice(&self.items, self.page, PAGE_SIZE).to_vec();
        PageView {
            has_previous: has_previous(self.page),
            has_next: has_next(self.items.len(), self.page, PAGE_SIZE),
            options,
            page: self.page,
            mode: self.mode,
            controls_enabled: self.controls_enabled,
        }
    }
}

/// Everything a renderer needs to draw one page of a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub options: Vec<Subject>,
    pub page: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub mode: SelectionMode,
    pub controls_enabled: bool,
}

impl PageView {
    /// Select-menu pick bounds for this page: View surfaces take exactly
    /// one value, Register surfaces up to the whole visible slice.
    pub fn max_values(&self) -> usize {
        match self.mode {
            SelectionMode::View => 1,
            SelectionMode::Register => self.options.len().max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subjects(n: usize) -> Vec<Subject> {
        (0..n)
            .map(|i| Subject {
                id: SubjectId::new(format!("uuid-{i}")),
                name: format!("Subject {i}"),
            })
            .collect()
    }

    #[test]
    fn thirty_subjects_paginate_into_25_and_5() {
        let items = subjects(30);

        let first = visible_slice(&items, 0, PAGE_SIZE);
        assert_eq!(first.len(), 25);
        assert_eq!(first[0].id.as_str(), "uuid-0");
        assert_eq!(first[24].id.as_str(), "uuid-24");
        assert!(!has_previous(0));
        assert!(has_next(items.len(), 0, PAGE_SIZE));

        let second = visible_slice(&items, 1, PAGE_SIZE);
        assert_eq!(second.len(), 5);
        assert_eq!(second[0].id.as_str(), "uuid-25");
        assert_eq!(second[4].id.as_str(), "uuid-29");
        assert!(has_previous(1));
        assert!(!has_next(items.len(), 1, PAGE_SIZE));
    }

    #[test]
    fn has_next_is_false_exactly_when_slice_covers_the_tail() {
        for len in [0, 1, 24, 25, 26, 50, 51] {
            let items = subjects(len);
            let mut page = 0;
            loop {
                let slice = visible_slice(&items, page, PAGE_SIZE);
                let covers_tail = (page * PAGE_SIZE + slice.len()) >= len;
                assert_eq!(
                    !has_next(len, page, PAGE_SIZE),
                    covers_tail,
                    "len={len} page={page}"
                );
                if !has_next(len, page, PAGE_SIZE) {
                    break;
                }
                page += 1;
            }
        }
    }

    #[test]
    fn out_of_range_page_yields_empty_slice() {
        let items = subjects(10);
        assert!(visible_slice(&items, 3, PAGE_SIZE).is_empty());
        assert!(visible_slice::<Subject>(&[], 0, PAGE_SIZE).is_empty());
    }

    #[test]
    fn advance_is_a_noop_at_either_edge() {
        let mut state = SelectionState::new(subjects(30), SelectionMode::Register, "u1".into());

        assert!(!state.advance(NavDirection::Previous));
        assert_eq!(state.page(), 0);

        assert!(state.advance(NavDirection::Next));
        assert_eq!(state.page(), 1);

        assert!(!state.advance(NavDirection::Next));
        assert_eq!(state.page(), 1);

        assert!(state.advance(NavDirection::Previous));
        assert_eq!(state.page(), 0);
    }

    #[test]
    fn single_page_list_shows_no_controls() {
        let state = SelectionState::new(subjects(25), SelectionMode::View, "u1".into());
        let view = state.page_view();
        assert_eq!(view.options.len(), 25);
        assert!(!view.has_previous);
        assert!(!view.has_next);
    }

    #[test]
    fn reset_page_returns_to_the_first_page() {
        let mut state = SelectionState::new(subjects(60), SelectionMode::Register, "u1".into());
        state.advance(NavDirection::Next);
        state.advance(NavDirection::Next);
        assert_eq!(state.page(), 2);
        state.reset_page();
        assert_eq!(state.page(), 0);
        assert_eq!(state.page_view().options.len(), 25);
    }

    #[test]
    fn max_values_depends_on_mode_and_page_len() {
        let view_state = SelectionState::new(subjects(30), SelectionMode::View, "u1".into());
        assert_eq!(view_state.page_view().max_values(), 1);

        let mut register_state =
            SelectionState::new(subjects(30), SelectionMode::Register, "u1".into());
        assert_eq!(register_state.page_view().max_values(), 25);
        register_state.advance(NavDirection::Next);
        assert_eq!(register_state.page_view().max_values(), 5);
    }
}
