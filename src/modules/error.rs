use derive_more::{Display, Error, From};

/// Everything that can go wrong between a page event and the page update.
///
/// Only [`DashboardError::Rejected`] carries an application-level failure
/// (`success: false`); the UI treats every other variant as a transport
/// failure.
#[derive(Debug, Display, Error, From)]
pub enum DashboardError {
    #[display("transport error: {_0}")]
    #[from]
    Transport(reqwest::Error),

    #[display("malformed response: {_0}")]
    #[from]
    Decode(serde_json::Error),

    #[display("response is missing its payload")]
    MissingPayload,

    #[display("request rejected: {}", message.as_deref().unwrap_or("no message"))]
    Rejected { message: Option<String> },

    #[display("io error: {_0}")]
    #[from]
    Io(std::io::Error),

    #[display("invalid config: {_0}")]
    #[from]
    Config(toml::de::Error),

    #[display("cannot write config: {_0}")]
    #[from]
    ConfigWrite(toml::ser::Error),

    #[display("invalid url: {_0}")]
    #[from]
    Url(url::ParseError),

    #[display("invalid selector {selector:?}: {detail}")]
    Selector { selector: String, detail: String },

    #[display("clipboard unavailable: {detail}")]
    Clipboard { detail: String },
}

impl DashboardError {
    /// The server-supplied message of an application-level failure.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            DashboardError::Rejected { message } => message.as_deref(),
            _ => None,
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, DashboardError::Rejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_exposes_server_message() {
        let err = DashboardError::Rejected {
            message: Some("rate limited".to_string()),
        };
        assert!(err.is_rejection());
        assert_eq!(err.server_message(), Some("rate limited"));
        assert_eq!(err.to_string(), "request rejected: rate limited");
    }

    #[test]
    fn transport_kinds_have_no_server_message() {
        let err: DashboardError = serde_json::from_str::<serde_json::Value>("<html>")
            .unwrap_err()
            .into();
        assert!(!err.is_rejection());
        assert_eq!(err.server_message(), None);
        assert!(err.to_string().starts_with("malformed response"));
    }
}
