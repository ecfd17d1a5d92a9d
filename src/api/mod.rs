//! Purpose: Define the supported Rust API boundary for rowdb.
//! Exports: Core types and operations needed by the CLI and embedders.
//! Role: Public, additive-only surface over the `core` modules.
//! Invariants: New items are added here rather than imported from `core` paths.

mod client;

pub use client::ApiResult;

pub use crate::core::database::{Database, LinkReport, LinkStatus, Relationship};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::item::{CellRef, ForeignKeyTarget, Item, RowId};
pub use crate::core::record::{Record, TAG_SEPARATOR, item_from_token};
pub use crate::core::storage::{DirStorage, Storage};
pub use crate::core::table::{ForeignKey, Table};
pub use crate::core::value::ValueType;
pub use client::LocalClient;
