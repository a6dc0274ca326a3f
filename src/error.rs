use std::fmt;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    Status(u16),
    TokenExpired,
    DeviceNotFound(String),
    MalformedStatus(String),
    Protocol(String),
    UnsupportedCapability(String),
    InvalidValue { capability: String, reason: String },
    InvalidInterval(u32),
    NotScheduled(String),
    Io(std::io::Error),
}

impl Error {
    /// Connection failures and non-OK HTTP responses.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Status(_))
    }

    /// True when the vendor host name could not be resolved.
    pub fn is_dns_failure(&self) -> bool {
        let Error::Http(e) = self else {
            return false;
        };
        if !e.is_connect() && !e.is_request() {
            return false;
        }
        let mut source: Option<&(dyn std::error::Error + 'static)> = Some(e);
        while let Some(err) = source {
            let msg = err.to_string();
            if msg.contains("dns error") || msg.contains("failed to lookup address") {
                return true;
            }
            source = err.source();
        }
        false
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Status(code) => write!(f, "error response from API: HTTP {code}"),
            Error::TokenExpired => write!(f, "token expired, please re-authenticate"),
            Error::DeviceNotFound(id) => write!(f, "device not found: {id}"),
            Error::MalformedStatus(msg) => write!(f, "malformed status: {msg}"),
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Error::UnsupportedCapability(name) => write!(f, "unsupported capability: {name}"),
            Error::InvalidValue { capability, reason } => {
                write!(f, "invalid value for {capability}: {reason}")
            }
            Error::InvalidInterval(minutes) => write!(f, "invalid poll interval: {minutes} min"),
            Error::NotScheduled(id) => write!(f, "no poll timer for device {id}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(Error::Status(500).is_transport());
        assert!(!Error::TokenExpired.is_transport());
        assert!(!Error::DeviceNotFound("abc".into()).is_transport());
        assert!(!Error::Status(502).is_dns_failure());
    }

    #[test]
    fn display_messages() {
        assert_eq!(Error::Status(503).to_string(), "error response from API: HTTP 503");
        assert_eq!(Error::DeviceNotFound("42".into()).to_string(), "device not found: 42");
        let err = Error::InvalidValue {
            capability: "onoff".into(),
            reason: "expected bool".into(),
        };
        assert_eq!(err.to_string(), "invalid value for onoff: expected bool");
    }
}
