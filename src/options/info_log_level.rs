use serde::{Deserialize, Serialize};

/// Minimum severity written to the info LOG
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum InfoLogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
    /// Always written, used for the options dump at open.
    Header,
}

impl InfoLogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoLogLevel::Debug => "DEBUG",
            InfoLogLevel::Info => "INFO",
            InfoLogLevel::Warn => "WARN",
            InfoLogLevel::Error => "ERROR",
            InfoLogLevel::Fatal => "FATAL",
            InfoLogLevel::Header => "HEADER",
        }
    }

    /// Level used when the same message is forwarded to the `log` facade.
    pub fn to_log_level(self) -> log::Level {
        match self {
            InfoLogLevel::Debug => log::Level::Debug,
            InfoLogLevel::Info | InfoLogLevel::Header => log::Level::Info,
            InfoLogLevel::Warn => log::Level::Warn,
            InfoLogLevel::Error | InfoLogLevel::Fatal => log::Level::Error,
        }
    }
}
