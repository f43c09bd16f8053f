use std::sync::Arc;

use snafu::{ensure, ResultExt};
use tokio::task::JoinError;
use tracing::instrument;

use super::gateway::{self, Backend, GatewayError, Unlocked};
use super::session::Profile;
use super::watch::{Player, WatchTask};
use crate::model::{StudentId, Video};

pub use error::*;
pub use state::*;

mod error;
mod state;

/// Shown when an unlock could not complete for any reason other than a backend refusal.
pub const UNLOCK_TIMEOUT_MESSAGE: &str =
    "The network request timed out, please check your internet connection.";

/// Outcome of [Access::select].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The video needs a signed-in student. It is kept until a login or [Access::dismiss_login].
    AuthRequired,
    /// An unlock is in flight. See [Access::settle].
    Unlocking,
}

/// Outcome of a successful [Access::login].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Login {
    SignedIn,
    /// The video that was waiting for a login is now unlocking.
    Resumed,
}

/// Gates videos behind a login and drives their unlock and playback.
///
/// At most one [UnlockSession] exists at a time. Selecting another video, closing, or logging
/// out discards it together with its watch timer, and an unlock answer for a discarded
/// session is never applied.
#[derive(Debug)]
pub struct Access<B> {
    backend: Arc<B>,
    profile: Profile,
    session: Option<UnlockSession>,
    awaiting_login: Option<Video>,
    generation: u64,
}

impl<B: Backend> Access<B> {
    pub fn new(backend: Arc<B>, profile: Profile) -> Self {
        Self {
            backend,
            profile,
            session: None,
            awaiting_login: None,
            generation: 0,
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn session(&self) -> Option<&UnlockSession> {
        self.session.as_ref()
    }

    /// The video waiting for a login, if the login prompt is open.
    pub fn awaiting_login(&self) -> Option<&Video> {
        self.awaiting_login.as_ref()
    }

    #[instrument(skip_all, fields(video.id = %video.id))]
    pub async fn select(&mut self, video: Video) -> Selection {
        self.close();
        self.awaiting_login = None;

        if video.requires_login() && !self.profile.is_signed_in().await {
            tracing::info!("login required");
            self.awaiting_login = Some(video);
            return Selection::AuthRequired;
        }

        self.start_unlock(video).await;
        Selection::Unlocking
    }

    async fn start_unlock(&mut self, video: Video) {
        self.generation += 1;

        let student_id = self
            .profile
            .student_id()
            .await
            .unwrap_or_else(StudentId::guest);

        tracing::info!(
            video.id = %video.id,
            student.id = %student_id,
            generation = self.generation,
            "unlocking video"
        );

        let backend = Arc::clone(&self.backend);
        let video_id = video.id.clone();
        let pending = tokio::spawn(async move { backend.unlock(&student_id, &video_id).await });

        let mut session = UnlockSession::new(self.generation, video);
        session.state = UnlockState::Loading;
        session.pending = Some(pending);

        self.session = Some(session);
    }

    /// Whether an unlock request is still waiting for the backend.
    pub fn is_unlocking(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.pending.is_some())
    }

    /// Wait for the in-flight unlock to answer without applying the answer.
    ///
    /// Cancel safe: dropping the future leaves the request pending.
    pub async fn answered(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(pending) = session.pending.as_mut() else {
            return;
        };

        let answer = pending.await;
        session.pending = None;
        session.answer = Some(answer);
    }

    /// Wait for the in-flight unlock, if any, and apply its result.
    pub async fn settle(&mut self) -> Option<&UnlockState> {
        self.answered().await;

        if let Some(session) = self.session.as_mut() {
            if let Some(answer) = session.answer.take() {
                let generation = session.generation;
                self.finish(generation, answer).await;
            }
        }

        self.session.as_ref().map(UnlockSession::state)
    }

    #[instrument(skip(self, result))]
    async fn finish(&mut self, generation: u64, result: Result<gateway::Result<Unlocked>, JoinError>) {
        let Some(session) = self.session.as_mut().filter(|session| session.generation == generation) else {
            tracing::debug!("discarding unlock result of a closed session");
            return;
        };

        let unlocked = match result {
            Ok(Ok(unlocked)) => unlocked,
            Ok(Err(GatewayError::Rejected { message, .. })) => {
                tracing::warn!(video.id = %session.video.id, %message, "unlock rejected");
                session.state = UnlockState::Error(message);
                return;
            }
            Ok(Err(error)) => {
                tracing::error!(%error, "unlock failed");
                session.state = UnlockState::Error(UNLOCK_TIMEOUT_MESSAGE.to_string());
                return;
            }
            Err(error) => {
                tracing::error!(%error, "unlock task failed");
                session.state = UnlockState::Error(UNLOCK_TIMEOUT_MESSAGE.to_string());
                return;
            }
        };

        if session.video.requires_login() {
            match self.profile.update(|student| student.record_usage()).await {
                Ok(Some(usage)) => tracing::info!(usage, "recorded usage"),
                Ok(None) => tracing::warn!("paid video unlocked without a signed-in student"),
                Err(error) => tracing::warn!(%error, "could not persist usage"),
            }
        }

        tracing::info!(video.id = %session.video.id, "video unlocked");

        let playback = Playback::resolve(unlocked, &session.video);
        session.state = UnlockState::Unlocked(playback);
        session.watch = Some(WatchTask::spawn(
            &session.video,
            self.profile.clone(),
            Arc::clone(&self.backend),
        ));
    }

    /// Select the errored video again.
    pub async fn retry(&mut self) -> Option<Selection> {
        let video = self
            .session
            .as_ref()
            .filter(|session| matches!(session.state, UnlockState::Error(_)))
            .map(|session| session.video.clone())?;

        Some(self.select(video).await)
    }

    /// Sign in, then resume the video that was waiting for it.
    #[instrument(skip(self, password))]
    pub async fn login(&mut self, student_id: &str, password: &str) -> Result<Login> {
        ensure!(!student_id.is_empty() && !password.is_empty(), MissingCredentialsSnafu);

        let student = self
            .backend
            .login(student_id, password)
            .await
            .context(LoginSnafu)?;

        if let Err(error) = self.profile.sign_in(student).await {
            tracing::warn!(%error, "could not persist the signed-in student");
        }

        match self.awaiting_login.take() {
            Some(video) => {
                self.start_unlock(video).await;
                Ok(Login::Resumed)
            }
            None => Ok(Login::SignedIn),
        }
    }

    pub fn dismiss_login(&mut self) -> Option<Video> {
        self.awaiting_login.take()
    }

    #[instrument(skip(self))]
    pub async fn logout(&mut self) {
        self.close();
        self.awaiting_login = None;

        if let Err(error) = self.profile.sign_out().await {
            tracing::warn!(%error, "could not clear the saved student");
        }
    }

    /// Close the player, stopping its timer. Returns whether anything was open.
    pub fn close(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };

        tracing::debug!(video.id = %session.video.id, generation = session.generation, "closing player");

        if let Some(watch) = session.watch {
            watch.shutdown();
        }

        true
    }

    /// Returns `false` when no video is playing.
    pub fn set_player(&self, player: Player) -> bool {
        match self.session.as_ref().and_then(|session| session.watch.as_ref()) {
            Some(watch) => {
                watch.set_player(player);
                true
            }
            None => false,
        }
    }

    pub fn pause(&self) -> bool {
        self.set_player(Player::Paused)
    }

    pub fn resume(&self) -> bool {
        self.set_player(Player::Playing)
    }
}
