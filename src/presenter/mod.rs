//! Presentation state for the shopping list screen: the live list with its
//! summary, the add/edit form, confirmation of deletes and user notices.

pub mod form;
pub mod format;
mod list;
pub mod notice;

pub use form::{FormMode, ProductForm};
pub use format::{format_money, product_line, summary_lines};
pub use list::{ListPresenter, ListState, PendingDelete, SaveOutcome};
pub use notice::{Notice, Operation};
