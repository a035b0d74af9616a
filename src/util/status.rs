use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    Ok,
    NotFound,
    Corruption,
    NotSupported,
    InvalidArgument,
    IOError,
    Incomplete,
    Busy,
    /// The engine refuses writes after an earlier write failure.
    Degraded,
}

#[derive(Debug, Clone)]
pub struct Status {
    code: Code,
    message: Option<String>,
}

impl Status {
    pub fn ok() -> Self {
        Status {
            code: Code::Ok,
            message: None,
        }
    }

    fn with_code(code: Code, msg: impl Into<String>) -> Self {
        Status {
            code,
            message: Some(msg.into()),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::with_code(Code::NotFound, msg)
    }

    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::with_code(Code::Corruption, msg)
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::with_code(Code::NotSupported, msg)
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::with_code(Code::InvalidArgument, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::with_code(Code::IOError, msg)
    }

    pub fn incomplete(msg: impl Into<String>) -> Self {
        Self::with_code(Code::Incomplete, msg)
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Self::with_code(Code::Busy, msg)
    }

    /// Wraps the failure that pushed the engine into read-only mode.
    pub fn degraded(cause: &Status) -> Self {
        Self::with_code(
            Code::Degraded,
            format!("engine is read-only after write failure: {cause}"),
        )
    }

    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok
    }

    pub fn is_not_found(&self) -> bool {
        self.code == Code::NotFound
    }

    pub fn is_corruption(&self) -> bool {
        self.code == Code::Corruption
    }

    pub fn is_not_supported(&self) -> bool {
        self.code == Code::NotSupported
    }

    pub fn is_invalid_argument(&self) -> bool {
        self.code == Code::InvalidArgument
    }

    pub fn is_io_error(&self) -> bool {
        self.code == Code::IOError
    }

    pub fn is_incomplete(&self) -> bool {
        self.code == Code::Incomplete
    }

    pub fn is_degraded(&self) -> bool {
        self.code == Code::Degraded
    }

    pub fn code(&self) -> &Code {
        &self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{:?}: {}", self.code, msg),
            None => write!(f, "{:?}", self.code),
        }
    }
}

impl std::error::Error for Status {}

impl From<std::io::Error> for Status {
    fn from(err: std::io::Error) -> Self {
        Status::io_error(err.to_string())
    }
}

impl From<serde_json::Error> for Status {
    fn from(err: serde_json::Error) -> Self {
        Status::corruption(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Status>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ok() {
        let status = Status::ok();
        assert!(status.is_ok());
        assert_eq!(status.code(), &Code::Ok);
    }

    #[test]
    fn test_status_invalid_argument() {
        let status = Status::invalid_argument("error_if_exists is true");
        assert!(status.is_invalid_argument());
        assert!(!status.is_io_error());
        assert_eq!(status.message(), Some("error_if_exists is true"));
    }

    #[test]
    fn test_degraded_keeps_cause() {
        let cause = Status::io_error("disk full");
        let status = Status::degraded(&cause);
        assert!(status.is_degraded());
        assert!(status.message().unwrap().contains("IOError: disk full"));
    }

    #[test]
    fn test_status_display() {
        let status = Status::io_error("disk full");
        assert_eq!(status.to_string(), "IOError: disk full");
    }
}
