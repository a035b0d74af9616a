pub mod status;

pub use status::{Code, Result, Status};
