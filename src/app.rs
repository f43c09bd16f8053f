use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::instrument;

use crate::model::VideoId;
use crate::service::access::{Access, Selection};
use crate::service::catalog::Catalog;
use crate::service::gateway::{self, Backend};
use crate::service::session::Profile;

/// Everything the front-end drives: the catalog view and the access controller sharing one backend.
#[derive(Debug)]
pub struct App<B> {
    backend: Arc<B>,
    pub catalog: Catalog,
    pub access: Access<B>,
}

impl<B: Backend> App<B> {
    pub fn new(backend: Arc<B>, profile: Profile) -> Self {
        Self {
            access: Access::new(Arc::clone(&backend), profile),
            catalog: Catalog::new(),
            backend,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn refresh(&mut self) -> gateway::Result<usize> {
        self.catalog.refresh(self.backend.as_ref()).await
    }

    /// Select a catalog video by id. `None` when the catalog has no such video.
    #[instrument(skip(self))]
    pub async fn open(&mut self, video_id: &VideoId) -> Option<Selection> {
        let video = self.catalog.find(video_id)?.clone();
        Some(self.access.select(video).await)
    }
}

impl<B> Deref for App<B> {
    type Target = Access<B>;

    fn deref(&self) -> &Self::Target {
        &self.access
    }
}

impl<B> DerefMut for App<B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.access
    }
}
