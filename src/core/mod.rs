// Core modules implementing cells, tables, persistence, and error modeling.
pub mod database;
pub mod error;
pub mod format;
pub mod item;
pub mod record;
pub mod storage;
pub mod table;
pub mod value;
