use serde::{Deserialize, Serialize};

/// Status codes returned across the FMI2 C boundary.
///
/// The discriminants match `fmi2Status` from `fmi2FunctionTypes.h`, so the enum can be
/// returned directly from `extern "C"` functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Fmi2Status {
    Ok = 0,
    Warning = 1,
    Discard = 2,
    Error = 3,
    Fatal = 4,
    Pending = 5,
}

impl Fmi2Status {
    /// Lowercase name as used by the FMI standard (`ok`, `warning`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Fmi2Status::Ok => "ok",
            Fmi2Status::Warning => "warning",
            Fmi2Status::Discard => "discard",
            Fmi2Status::Error => "error",
            Fmi2Status::Fatal => "fatal",
            Fmi2Status::Pending => "pending",
        }
    }

    /// The log category conventionally associated with this status, e.g. `logStatusWarning`.
    pub fn log_category(&self) -> String {
        let name = self.name();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => format!("logStatus{}{}", first.to_ascii_uppercase(), chars.as_str()),
            None => "logStatus".to_string(),
        }
    }
}

impl std::fmt::Display for Fmi2Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_category() {
        assert_eq!(Fmi2Status::Warning.log_category(), "logStatusWarning");
        assert_eq!(Fmi2Status::Ok.log_category(), "logStatusOk");
        assert_eq!(Fmi2Status::Fatal.log_category(), "logStatusFatal");
    }

    #[test]
    fn test_discriminants_match_c_header() {
        assert_eq!(Fmi2Status::Ok as i32, 0);
        assert_eq!(Fmi2Status::Discard as i32, 2);
        assert_eq!(Fmi2Status::Pending as i32, 5);
    }
}
