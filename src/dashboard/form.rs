//! Add/edit page form state.

use std::fmt::Display;

use super::gateway::PageDraft;
use super::session::Viewer;
use crate::types::Page;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { page_id: String },
}

/// `Closed -> Open -> Submitting -> Closed`, or back to `Open` with an
/// error message when validation or the write fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PageForm {
    #[default]
    Closed,
    Open {
        mode: FormMode,
        draft: PageDraft,
        error: Option<String>,
    },
    Submitting {
        mode: FormMode,
        draft: PageDraft,
    },
}

impl PageForm {
    /// An empty form. Admins start with the common flag on.
    pub fn open_create(viewer: &Viewer) -> Self {
        PageForm::Open {
            mode: FormMode::Create,
            draft: PageDraft {
                is_common: viewer.is_admin(),
                ..PageDraft::default()
            },
            error: None,
        }
    }

    pub fn open_edit(page: &Page) -> Self {
        PageForm::Open {
            mode: FormMode::Edit {
                page_id: page.id.clone(),
            },
            draft: PageDraft {
                title: page.title.clone(),
                url: page.url.clone(),
                description: page.description.clone(),
                category_id: page.category_id.clone(),
                is_common: page.is_common,
            },
            error: None,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, PageForm::Closed)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PageForm::Open { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    /// Editable draft; only available while the form is open.
    pub fn draft_mut(&mut self) -> Option<&mut PageDraft> {
        match self {
            PageForm::Open { draft, .. } => Some(draft),
            _ => None,
        }
    }

    /// Moves to `Submitting` and hands back what to send. Validation
    /// failures keep the form open with the message; nothing is returned.
    pub fn submit(&mut self) -> Option<(FormMode, PageDraft)> {
        let PageForm::Open { mode, draft, error } = self else {
            return None;
        };

        if let Err(e) = draft.validate() {
            *error = Some(e.to_string());
            return None;
        }

        let (mode, draft) = (mode.clone(), draft.clone());
        *self = PageForm::Submitting {
            mode: mode.clone(),
            draft: draft.clone(),
        };
        Some((mode, draft))
    }

    /// Applies the result of the write started by [`PageForm::submit`].
    pub fn complete<T, E: Display>(&mut self, result: &Result<T, E>) {
        let PageForm::Submitting { mode, draft } = self else {
            return;
        };

        match result {
            Ok(_) => *self = PageForm::Closed,
            Err(e) => {
                *self = PageForm::Open {
                    mode: mode.clone(),
                    draft: draft.clone(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn close(&mut self) {
        *self = PageForm::Closed;
    }
}
