//! Client core for the event-ticketing admin console: the reusable
//! search-filter-paginate-mutate-refetch controller, the multi-step modal
//! state machine, and the strict data-source boundary they sit on.

pub mod config;
pub mod entities;
pub mod error;
pub mod list_view;
pub mod modal;
pub mod mutation;
pub mod source;

pub use config::{load_settings, Settings};
pub use error::{ErrorKind, ViewError};
pub use list_view::{
    derive_visible_items, DisplayState, ListEntity, ListQuery, ListResult, ListView, PageMeta,
    PaginationSource, ViewEvent, DEFAULT_PAGE_SIZE,
};
pub use modal::{
    FlowAdvance, FlowState, ModalFlow, PasswordFlow, PasswordSubmit, StepOutcome,
};
pub use mutation::{
    MutationHandle, MutationIntent, MutationKind, MutationOutcome, MutationReply, SettlePolicy,
};
pub use source::{DataSource, HttpDataSource, WireDecode};
