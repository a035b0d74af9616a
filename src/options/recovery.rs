use serde::{Deserialize, Serialize};

use crate::util::{Result, Status};

/// How strictly WAL records are replayed when a database is opened
///
/// | Mode | truncated tail | bad record in the middle |
/// |---|---|---|
/// | `TolerateCorruptedTailRecords` | ignored | Open fails |
/// | `AbsoluteConsistency` | Open fails | Open fails |
/// | `PointInTimeRecovery` | replay stops | replay stops |
/// | `SkipAnyCorruptedRecords` | ignored | record skipped |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum WalRecoveryMode {
    TolerateCorruptedTailRecords = 0,
    AbsoluteConsistency = 1,
    #[default]
    PointInTimeRecovery = 2,
    SkipAnyCorruptedRecords = 3,
}

impl WalRecoveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalRecoveryMode::TolerateCorruptedTailRecords => "kTolerateCorruptedTailRecords",
            WalRecoveryMode::AbsoluteConsistency => "kAbsoluteConsistency",
            WalRecoveryMode::PointInTimeRecovery => "kPointInTimeRecovery",
            WalRecoveryMode::SkipAnyCorruptedRecords => "kSkipAnyCorruptedRecords",
        }
    }
}

impl TryFrom<i32> for WalRecoveryMode {
    type Error = Status;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(WalRecoveryMode::TolerateCorruptedTailRecords),
            1 => Ok(WalRecoveryMode::AbsoluteConsistency),
            2 => Ok(WalRecoveryMode::PointInTimeRecovery),
            3 => Ok(WalRecoveryMode::SkipAnyCorruptedRecords),
            _ => Err(Status::invalid_argument(format!(
                "unknown WAL recovery mode {value}"
            ))),
        }
    }
}
