#[allow(clippy::module_inception)]
mod db;
pub(crate) mod filename;
pub(crate) mod info_log;
pub(crate) mod manifest;
pub(crate) mod table;

pub use db::DB;
