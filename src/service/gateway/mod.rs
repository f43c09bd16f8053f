use std::future::Future;

use derive_new::new;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::{ensure, ResultExt};
use tracing::instrument;
use url::Url;

use crate::model::{Student, StudentId, Video, VideoId};

pub use error::*;

mod error;

const LIST_FALLBACK: &str = "Failed to load the video list.";
const LOGIN_FALLBACK: &str = "Login failed, please check your student ID and password.";
const UNLOCK_FALLBACK: &str =
    "This video cannot be played right now, please contact the administrator.";
const WATCH_FALLBACK: &str = "Failed to record the watched video.";

/// The response body every backend action shares.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }

    /// The payload of a successful envelope, or the server message (`fallback` when blank) as an error.
    pub fn into_result(self, action: &'static str, fallback: &str) -> Result<T> {
        match self {
            Envelope {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            Envelope { message, .. } => RejectedSnafu {
                action,
                message: non_blank(message).unwrap_or_else(|| fallback.to_string()),
            }
            .fail(),
        }
    }
}

fn non_blank(message: Option<String>) -> Option<String> {
    message.filter(|message| !message.trim().is_empty())
}

/// An action payload. Serializes to `{"action": <name>, ...fields}`.
#[derive(Clone, Serialize)]
#[serde(tag = "action")]
pub enum Request<'a> {
    #[serde(rename = "getVideos")]
    GetVideos,
    #[serde(rename = "login")]
    Login {
        #[serde(rename = "studentID")]
        student_id: &'a str,
        password: &'a str,
    },
    #[serde(rename = "unlock")]
    Unlock {
        #[serde(rename = "studentID")]
        student_id: &'a StudentId,
        #[serde(rename = "videoID")]
        video_id: &'a VideoId,
    },
    #[serde(rename = "markWatched")]
    MarkWatched {
        #[serde(rename = "studentID")]
        student_id: &'a StudentId,
        #[serde(rename = "videoID")]
        video_id: &'a VideoId,
    },
}

impl Request<'_> {
    pub fn action(&self) -> &'static str {
        match self {
            Request::GetVideos => "getVideos",
            Request::Login { .. } => "login",
            Request::Unlock { .. } => "unlock",
            Request::MarkWatched { .. } => "markWatched",
        }
    }
}

// passwords stay out of logs
impl std::fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("action", &self.action())
            .finish_non_exhaustive()
    }
}

/// Playback details granted by a successful `unlock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Unlocked {
    #[serde(rename = "videoUrl")]
    pub video_url: String,
    #[new(default)]
    #[serde(rename = "materialLink", default)]
    pub material_link: Option<String>,
}

/// The remote operations the rest of the crate depends on.
pub trait Backend: Send + Sync + 'static {
    /// Fetch the catalog. An empty catalog is an error.
    fn list_videos(&self) -> impl Future<Output = Result<Vec<Video>>> + Send;

    fn login(
        &self, student_id: &str, password: &str,
    ) -> impl Future<Output = Result<Student>> + Send;

    fn unlock(
        &self, student_id: &StudentId, video_id: &VideoId,
    ) -> impl Future<Output = Result<Unlocked>> + Send;

    fn record_watched(
        &self, student_id: &StudentId, video_id: &VideoId,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// HTTP client for the single backend endpoint.
///
/// Every request is a plain `POST` whose body is the JSON-encoded [Request] sent as untyped text,
/// without a `Content-Type` or any custom header. Redirects are followed.
#[derive(Debug, Clone, new)]
pub struct Gateway {
    http: Client,
    endpoint: Url,
}

impl Gateway {
    pub fn connect(endpoint: Url) -> reqwest::Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self::new(http, endpoint))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Perform one round trip. Transport problems come back as a failed envelope, never as an error.
    #[instrument(skip(self, request), fields(action = request.action()))]
    pub async fn call<T: DeserializeOwned>(&self, request: &Request<'_>) -> Envelope<T> {
        match self.round_trip(request).await {
            Ok(envelope) => envelope,
            Err(error) => {
                tracing::error!(%error, "backend request failed");
                Envelope::failure(error.user_message())
            }
        }
    }

    async fn round_trip<T: DeserializeOwned>(
        &self, request: &Request<'_>,
    ) -> ::std::result::Result<Envelope<T>, TransportError> {
        let action = request.action();
        let body = serde_json::to_string(request).context(EncodeSnafu { action })?;

        let response = self
            .http
            .post(self.endpoint.clone())
            .body(body)
            .send()
            .await
            .context(SendSnafu)?;

        let status = response.status();
        ensure!(
            status.is_success(),
            StatusSnafu {
                status: status.as_u16()
            }
        );

        let text = response.text().await.context(SendSnafu)?;
        let envelope: Envelope<Value> =
            serde_json::from_str(&text).with_context(|_| MalformedSnafu { body: text.clone() })?;

        // a failed envelope carries whatever `data` the backend left behind
        if !envelope.success {
            return Ok(Envelope {
                success: false,
                message: envelope.message,
                data: None,
            });
        }

        let data = envelope
            .data
            .map(serde_json::from_value)
            .transpose()
            .context(ShapeSnafu { action })?;

        Ok(Envelope {
            success: true,
            message: envelope.message,
            data,
        })
    }

    /// Decode each catalog row on its own. Rows that do not fit are logged and skipped.
    fn decode_rows(rows: Vec<Value>) -> Vec<Video> {
        rows.into_iter()
            .enumerate()
            .filter_map(|(index, row)| match serde_json::from_value::<Video>(row) {
                Ok(video) => Some(video),
                Err(error) => {
                    tracing::warn!(%error, row = index, "skipping unreadable catalog row");
                    None
                }
            })
            .collect()
    }
}

impl Backend for Gateway {
    #[instrument(skip(self))]
    async fn list_videos(&self) -> Result<Vec<Video>> {
        let rows = self
            .call::<Vec<Value>>(&Request::GetVideos)
            .await
            .into_result("getVideos", LIST_FALLBACK)?;

        let videos = Self::decode_rows(rows);

        ensure!(!videos.is_empty(), EmptyCatalogSnafu);
        tracing::info!(count = videos.len(), "fetched catalog");

        Ok(videos)
    }

    #[instrument(skip(self, password))]
    async fn login(&self, student_id: &str, password: &str) -> Result<Student> {
        let request = Request::Login {
            student_id,
            password,
        };

        let student = self
            .call::<Student>(&request)
            .await
            .into_result("login", LOGIN_FALLBACK)?;

        tracing::info!(student.id = %student.student_id, "signed in");
        Ok(student)
    }

    #[instrument(skip(self))]
    async fn unlock(&self, student_id: &StudentId, video_id: &VideoId) -> Result<Unlocked> {
        let request = Request::Unlock {
            student_id,
            video_id,
        };

        self.call::<Unlocked>(&request)
            .await
            .into_result("unlock", UNLOCK_FALLBACK)
    }

    #[instrument(skip(self))]
    async fn record_watched(&self, student_id: &StudentId, video_id: &VideoId) -> Result<bool> {
        let request = Request::MarkWatched {
            student_id,
            video_id,
        };

        let envelope = self.call::<bool>(&request).await;

        if !envelope.success {
            return RejectedSnafu {
                action: "markWatched",
                message: non_blank(envelope.message).unwrap_or_else(|| WATCH_FALLBACK.to_string()),
            }
            .fail();
        }

        // a bare acknowledgement counts as recorded
        Ok(envelope.data.unwrap_or(true))
    }
}
