use tracing::instrument;

use super::gateway::{self, Backend, GatewayError};
use crate::model::{Video, VideoId, ALL_CATEGORIES};

/// Videos whose title contains `term` (ignoring case) and whose category matches `category`.
///
/// The input order is kept. An empty term matches every title; the [ALL_CATEGORIES] sentinel
/// matches every category. Categories are compared exactly after trimming both sides.
pub fn filter<'a>(videos: &'a [Video], term: &str, category: &str) -> Vec<&'a Video> {
    let term = term.to_lowercase();
    let category = category.trim();

    videos
        .iter()
        .filter(|video| video.title.to_lowercase().contains(&term))
        .filter(|video| category == ALL_CATEGORIES || video.category.trim() == category)
        .collect()
}

/// Catalog view state: the loaded videos plus the user's current search and category.
#[derive(Debug, Clone)]
pub struct Catalog {
    videos: Vec<Video>,
    term: String,
    category: String,
    error: Option<GatewayError>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            videos: Vec::new(),
            term: String::new(),
            category: ALL_CATEGORIES.to_string(),
            error: None,
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reload the catalog. On failure the previous list is kept and the error is kept for display.
    #[instrument(skip_all)]
    pub async fn refresh<B: Backend>(&mut self, backend: &B) -> gateway::Result<usize> {
        match backend.list_videos().await {
            Ok(videos) => {
                self.videos = videos;
                self.error = None;
                Ok(self.videos.len())
            }
            Err(error) => {
                tracing::error!(%error, "could not load the catalog");
                self.error = Some(error.clone());
                Err(error)
            }
        }
    }

    pub fn set_term(&mut self, term: impl Into<String>) {
        self.term = term.into();
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// The last failed refresh, cleared by the next successful one.
    pub fn error(&self) -> Option<&GatewayError> {
        self.error.as_ref()
    }

    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    pub fn visible(&self) -> Vec<&Video> {
        filter(&self.videos, &self.term, &self.category)
    }

    pub fn find(&self, id: &VideoId) -> Option<&Video> {
        self.videos.iter().find(|video| &video.id == id)
    }
}
