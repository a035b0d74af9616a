pub mod log_format;
pub mod reader;
pub mod record;
pub mod writer;

pub use reader::Reader;
pub use record::WalRecord;
pub use writer::Writer;
