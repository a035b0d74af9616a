use serde::{Deserialize, Serialize};

use crate::util::{Result, Status};

/// File-system read-ahead advice applied to table files when a compaction
/// starts reading them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum AccessHint {
    None = 0,
    #[default]
    Normal = 1,
    Sequential = 2,
    WillNeed = 3,
}

impl AccessHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessHint::None => "NONE",
            AccessHint::Normal => "NORMAL",
            AccessHint::Sequential => "SEQUENTIAL",
            AccessHint::WillNeed => "WILLNEED",
        }
    }
}

impl TryFrom<i32> for AccessHint {
    type Error = Status;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(AccessHint::None),
            1 => Ok(AccessHint::Normal),
            2 => Ok(AccessHint::Sequential),
            3 => Ok(AccessHint::WillNeed),
            _ => Err(Status::invalid_argument(format!(
                "unknown access hint {value}"
            ))),
        }
    }
}
