use snafu::Snafu;

pub type Result<T, E = GatewayError> = ::std::result::Result<T, E>;

/// Failure of a typed backend operation, carrying the message the user should see.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum GatewayError {
    /// The backend answered `success: false`, or the request never completed.
    #[snafu(display("{message}"))]
    Rejected {
        action: &'static str,
        message: String,
    },

    /// `getVideos` succeeded but returned no entries.
    #[snafu(display("The backend responded, but no video entries were detected."))]
    EmptyCatalog,
}

impl GatewayError {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Why a single round trip did not produce an envelope. Never leaves [super::Gateway::call].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub(super) enum TransportError {
    #[snafu(display("failed to encode `{action}` request: {source}"))]
    Encode {
        action: &'static str,
        source: serde_json::Error,
    },

    #[snafu(display("request to the backend failed: {source}"))]
    Send { source: reqwest::Error },

    #[snafu(display("HTTP status: {status}"))]
    Status { status: u16 },

    #[snafu(display("backend returned a malformed body: {source}"))]
    Malformed {
        body: String,
        source: serde_json::Error,
    },

    #[snafu(display("`{action}` data does not have the expected shape: {source}"))]
    Shape {
        action: &'static str,
        source: serde_json::Error,
    },
}

impl TransportError {
    /// The diagnostic shown to the user in place of a server message.
    pub(super) fn user_message(&self) -> String {
        match self {
            TransportError::Send { source } if source.is_connect() => NETWORK_BLOCKED_MESSAGE.to_string(),
            TransportError::Send { source } => source.to_string(),
            TransportError::Malformed { .. } => MALFORMED_MESSAGE.to_string(),
            TransportError::Shape { .. } => UNEXPECTED_SHAPE_MESSAGE.to_string(),
            TransportError::Status { .. } | TransportError::Encode { .. } => self.to_string(),
        }
    }
}

pub const NETWORK_BLOCKED_MESSAGE: &str = "The network connection was blocked. Check whether an ad blocker is filtering the request and whether your network can reach the backend.";

pub const MALFORMED_MESSAGE: &str =
    "The server did not return valid JSON, please check the backend script.";

pub const UNEXPECTED_SHAPE_MESSAGE: &str =
    "The server returned data in an unexpected format, please check the backend script.";
