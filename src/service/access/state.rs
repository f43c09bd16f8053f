use tokio::task::{JoinError, JoinHandle};

use crate::model::Video;
use crate::service::embed::{self, Source};
use crate::service::gateway::{self, Unlocked};
use crate::service::watch::{Player, WatchProgress, WatchTask};

/// Where an unlock session stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockState {
    Locked,
    Loading,
    Unlocked(Playback),
    Error(String),
}

/// What the player needs once a video is unlocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playback {
    /// The URL the backend granted, as-is. Also what "open externally" uses.
    pub video_url: String,
    pub source: Source,
    pub material_link: Option<String>,
}

impl Playback {
    /// Combine an unlock grant with its catalog entry. A blank backend material link falls back to
    /// the catalog one.
    pub fn resolve(unlocked: Unlocked, video: &Video) -> Self {
        let material_link = unlocked
            .material_link
            .filter(|link| !link.trim().is_empty())
            .or_else(|| video.material_link().map(str::to_string));

        Self {
            source: embed::resolve(&unlocked.video_url),
            video_url: unlocked.video_url,
            material_link,
        }
    }
}

/// One video-open event. Dropping it detaches a pending unlock and stops the watch timer.
#[derive(Debug)]
pub struct UnlockSession {
    pub(super) generation: u64,
    pub(super) video: Video,
    pub(super) state: UnlockState,
    pub(super) pending: Option<JoinHandle<gateway::Result<Unlocked>>>,
    /// The answer of `pending`, waiting to be applied.
    pub(super) answer: Option<Result<gateway::Result<Unlocked>, JoinError>>,
    pub(super) watch: Option<WatchTask>,
}

impl UnlockSession {
    pub(super) fn new(generation: u64, video: Video) -> Self {
        Self {
            generation,
            video,
            state: UnlockState::Locked,
            pending: None,
            answer: None,
            watch: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn video(&self) -> &Video {
        &self.video
    }

    pub fn state(&self) -> &UnlockState {
        &self.state
    }

    pub fn playback(&self) -> Option<&Playback> {
        match &self.state {
            UnlockState::Unlocked(playback) => Some(playback),
            _ => None,
        }
    }

    pub fn progress(&self) -> Option<WatchProgress> {
        self.watch.as_ref().map(WatchTask::progress)
    }

    pub fn player(&self) -> Option<Player> {
        self.watch.as_ref().map(WatchTask::player)
    }
}
