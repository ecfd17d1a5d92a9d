//! Purpose: Library crate behind the `rowdb` CLI and its tests.
//! Exports: `core` (cells, records, tables, database, storage, errors), `api`, `notice`.
//! Role: Embedded table store with column chains and foreign-key resolution.
//! Invariants: `api` is the supported import path; `core` layout may change.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
pub mod notice;
