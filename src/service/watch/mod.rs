use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use super::gateway::Backend;
use super::session::Profile;
use crate::model::{Video, VideoId};

pub use task::*;

mod task;

/// How often the player is sampled.
pub const TICK: Duration = Duration::from_secs(1);

/// Longest a video ever has to be watched before it is recorded.
pub const THRESHOLD_CAP_SECS: u32 = 300;

/// Seconds of playback after which a video of `duration_minutes` counts as watched.
pub fn threshold(duration_minutes: u32) -> u32 {
    (duration_minutes.saturating_mul(60) / 2).min(THRESHOLD_CAP_SECS)
}

/// What the player reports when sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Player {
    #[default]
    Playing,
    Paused,
}

/// Watch counter of one unlock session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchProgress {
    pub watched_secs: u32,
    pub threshold_secs: u32,
    /// Free videos are never recorded.
    pub recordable: bool,
    pub recorded: bool,
}

impl WatchProgress {
    pub fn for_video(video: &Video) -> Self {
        Self {
            watched_secs: 0,
            threshold_secs: threshold(video.duration_minutes),
            recordable: video.requires_login(),
            recorded: false,
        }
    }

    /// Count one sample. Returns `true` exactly once, on the sample that reaches the threshold.
    pub fn tick(&mut self, player: Player) -> bool {
        if player != Player::Playing {
            return false;
        }

        self.watched_secs = self.watched_secs.saturating_add(1);

        if self.recordable && !self.recorded && self.watched_secs >= self.threshold_secs {
            self.recorded = true;
            return true;
        }

        false
    }
}

/// Append `video_id` to the signed-in student's history and notify the backend.
///
/// The backend call runs in the background and is best-effort: failures are logged and the local
/// history is kept. Nothing happens without a signed-in student or when the video is already in
/// the history. Returns whether the video was newly recorded.
#[instrument(skip(profile, backend))]
pub async fn record_watched<B: Backend>(profile: &Profile, backend: &Arc<B>, video_id: &VideoId) -> bool {
    let Some(student_id) = profile.student_id().await else {
        tracing::debug!("nobody is signed in, watch not recorded");
        return false;
    };

    let appended = match profile.apply(|student| student.record_watched(video_id)).await {
        Some((appended, Ok(()))) => appended,
        Some((appended, Err(error))) => {
            tracing::warn!(%error, "could not persist watched history");
            appended
        }
        None => false,
    };

    if !appended {
        tracing::debug!("video already in watched history");
        return false;
    }

    tracing::info!(student.id = %student_id, "recorded watched video");

    let backend = Arc::clone(backend);
    let video_id = video_id.clone();

    tokio::spawn(async move {
        match backend.record_watched(&student_id, &video_id).await {
            Ok(true) => tracing::debug!(%video_id, "backend recorded watched video"),
            Ok(false) => tracing::warn!(%video_id, "backend declined to record watched video"),
            Err(error) => tracing::warn!(%error, %video_id, "could not record watched video"),
        }
    });

    true
}

#[cfg(test)]
mod tests {
    use crate::model::{Student, StudentId};
    use crate::service::session::{MemoryStore, SessionStore};
    use crate::service::testing::{rejected, FailingStore, ScriptedBackend};

    use super::*;

    fn paid(minutes: u32) -> Video {
        Video::new(VideoId::new("v1"), "Ledger".into(), "Bab 2".into(), false, minutes)
    }

    async fn signed_in() -> Profile {
        let profile = Profile::open(SessionStore::new(Arc::new(MemoryStore::new())));
        profile
            .sign_in(Student::new(StudentId::new("S001"), 0, 10))
            .await
            .unwrap();
        profile
    }

    #[test]
    fn threshold_is_half_the_duration_capped_at_five_minutes() {
        assert_eq!(threshold(4), 120);
        assert_eq!(threshold(10), 300);
        assert_eq!(threshold(60), 300);
        assert_eq!(threshold(0), 0);
    }

    #[test]
    fn progress_fires_once_at_threshold() {
        let mut progress = WatchProgress::for_video(&paid(4));

        for _ in 0..119 {
            assert!(!progress.tick(Player::Playing));
        }
        assert!(progress.tick(Player::Playing));
        assert!(!progress.tick(Player::Playing));
        assert_eq!(progress.watched_secs, 121);
    }

    #[test]
    fn paused_samples_do_not_count() {
        let mut progress = WatchProgress::for_video(&paid(4));

        progress.tick(Player::Paused);
        progress.tick(Player::Playing);

        assert_eq!(progress.watched_secs, 1);
    }

    #[test]
    fn free_videos_are_never_recorded() {
        let free = Video::new(VideoId::new("v2"), "Intro".into(), "基础".into(), true, 1);
        let mut progress = WatchProgress::for_video(&free);

        assert!((0..100).all(|_| !progress.tick(Player::Playing)));
    }

    #[tokio::test]
    async fn record_watched_appends_once() {
        let profile = signed_in().await;
        let backend = Arc::new(ScriptedBackend::default());
        let video = VideoId::new("v1");

        assert!(record_watched(&profile, &backend, &video).await);
        assert!(!record_watched(&profile, &backend, &video).await);
        tokio::task::yield_now().await;

        let student = profile.student().await.unwrap();
        assert_eq!(student.watched_history, vec![video]);
        assert_eq!(backend.watched_count(), 1);
    }

    #[tokio::test]
    async fn backend_failure_keeps_local_history() {
        let profile = signed_in().await;
        let backend = Arc::new(ScriptedBackend::default());
        backend.fail_watched(rejected("markWatched", "sheet locked"));

        assert!(record_watched(&profile, &backend, &VideoId::new("v1")).await);
        tokio::task::yield_now().await;

        assert_eq!(backend.watched_count(), 1);
        assert!(profile.student().await.unwrap().has_watched(&VideoId::new("v1")));
    }

    async fn unsaveable(student: Student) -> Profile {
        let profile = Profile::open(SessionStore::new(Arc::new(FailingStore)));
        assert!(profile.sign_in(student).await.is_err());
        profile
    }

    #[tokio::test]
    async fn unsaved_history_is_not_sent_twice() {
        let video = VideoId::new("v1");
        let mut student = Student::new(StudentId::new("S001"), 0, 10);
        student.record_watched(&video);

        let profile = unsaveable(student).await;
        let backend = Arc::new(ScriptedBackend::default());

        assert!(!record_watched(&profile, &backend, &video).await);
        tokio::task::yield_now().await;

        assert_eq!(backend.watched_count(), 0);
    }

    #[tokio::test]
    async fn unsaved_new_entry_is_still_sent_once() {
        let profile = unsaveable(Student::new(StudentId::new("S001"), 0, 10)).await;
        let backend = Arc::new(ScriptedBackend::default());
        let video = VideoId::new("v1");

        assert!(record_watched(&profile, &backend, &video).await);
        assert!(!record_watched(&profile, &backend, &video).await);
        tokio::task::yield_now().await;

        assert_eq!(backend.watched_count(), 1);
    }

    #[tokio::test]
    async fn nothing_is_recorded_without_a_student() {
        let profile = Profile::open(SessionStore::new(Arc::new(MemoryStore::new())));
        let backend = Arc::new(ScriptedBackend::default());

        assert!(!record_watched(&profile, &backend, &VideoId::new("v1")).await);
        assert_eq!(backend.watched_count(), 0);
    }
}
