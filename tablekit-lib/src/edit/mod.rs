//! Row editing
//!
//! [`TableEditor`] runs edit sessions against the committed
//! [`Dataset`](crate::model::Dataset): an inline session per existing row,
//! or the synthetic `"new-row"` session for the add-new-row form. What each
//! [`EditMode`] allows is fixed by its [`EditPolicy`].

mod editor;
mod validation;

pub use editor::*;
pub use validation::*;

use serde::Deserialize;
use serde::Serialize;

/// How rows are edited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// Edit in place after an explicit edit action.
    Inline,
    /// Row click starts editing; the new-row form is always shown.
    #[serde(alias = "quickEdit")]
    QuickEdit,
    /// Edit in a dialog owned by the host.
    Dialog,
    /// Edit in a form owned by the host.
    Form,
    /// Not editable.
    #[default]
    None,
}

impl EditMode {
    /// Returns the fixed policy of this mode.
    pub fn policy(self) -> EditPolicy {
        EditPolicy::for_mode(self)
    }
}

/// Per-mode editing behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditPolicy {
    /// The new-row form is open by default.
    pub show_new_row_by_default: bool,
    /// Clicking a row starts editing it.
    pub edit_on_row_click: bool,
    /// Enter saves and Escape cancels.
    pub keyboard: bool,
    /// Starting to edit another row cancels the new-row form.
    pub cancel_new_row_on_other_edit: bool,
    /// Rows can be added through the new-row form.
    pub allows_new_row: bool,
}

impl EditPolicy {
    /// Returns the policy of `mode`.
    ///
    /// | mode | new row shown | edit on click | Enter/Esc | cancels new row |
    /// |---|---|---|---|---|
    /// | inline | no | no | yes | yes |
    /// | quickedit | yes | yes | yes | no |
    /// | dialog, form, none | no | no | no | no |
    pub fn for_mode(mode: EditMode) -> Self {
        match mode {
            EditMode::Inline => Self {
                show_new_row_by_default: false,
                edit_on_row_click: false,
                keyboard: true,
                cancel_new_row_on_other_edit: true,
                allows_new_row: true,
            },
            EditMode::QuickEdit => Self {
                show_new_row_by_default: true,
                edit_on_row_click: true,
                keyboard: true,
                cancel_new_row_on_other_edit: false,
                allows_new_row: true,
            },
            EditMode::Dialog | EditMode::Form | EditMode::None => Self {
                show_new_row_by_default: false,
                edit_on_row_click: false,
                keyboard: false,
                cancel_new_row_on_other_edit: false,
                allows_new_row: false,
            },
        }
    }
}

/// A key pressed inside an edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    /// Enter; `shift` is whether Shift was held.
    Enter {
        /// Shift held.
        shift: bool,
    },
    /// Escape.
    Escape,
    /// Anything else.
    Other,
}
