use std::sync::Arc;

use tokio::select;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::instrument;

use super::*;

/// Handle to the one-second timer of an unlocked video.
///
/// The timer stops on [WatchTask::shutdown] or when the handle is dropped.
#[derive(Debug)]
pub struct WatchTask {
    _handle: JoinHandle<()>,
    stop: Option<oneshot::Sender<()>>,
    player: watch::Sender<Player>,
    progress: watch::Receiver<WatchProgress>,
}

impl WatchTask {
    #[instrument(skip_all, fields(video.id = %video.id))]
    pub fn spawn<B: Backend>(video: &Video, profile: Profile, backend: Arc<B>) -> Self {
        let (stop, signal) = oneshot::channel();
        let (player, player_rx) = watch::channel(Player::Playing);
        let (progress_tx, progress) = watch::channel(WatchProgress::for_video(video));

        let video_id = video.id.clone();
        let handle = tokio::spawn(run(video_id, profile, backend, signal, player_rx, progress_tx));

        Self {
            _handle: handle,
            stop: Some(stop),
            player,
            progress,
        }
    }

    pub fn progress(&self) -> WatchProgress {
        *self.progress.borrow()
    }

    pub fn player(&self) -> Player {
        *self.player.borrow()
    }

    pub fn set_player(&self, player: Player) {
        self.player.send_replace(player);
    }

    pub fn shutdown(mut self) {
        self.stop_timer();
    }

    fn stop_timer(&mut self) {
        if let Some(stop) = self.stop.take() {
            // the timer may already be gone with the runtime
            let _ = stop.send(());
        }
    }
}

impl Drop for WatchTask {
    fn drop(&mut self) {
        self.stop_timer();
    }
}

async fn run<B: Backend>(
    video_id: VideoId,
    profile: Profile,
    backend: Arc<B>,
    mut signal: oneshot::Receiver<()>,
    player: watch::Receiver<Player>,
    progress: watch::Sender<WatchProgress>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        select! {
            _ = &mut signal => {
                tracing::debug!(%video_id, "stopped watch timer");
                break;
            }

            _ = ticker.tick() => {
                let sample = *player.borrow();

                let mut reached = false;
                progress.send_modify(|progress| reached = progress.tick(sample));

                if reached {
                    tracing::info!(%video_id, watched = progress.borrow().watched_secs, "watch threshold reached");
                    record_watched(&profile, &backend, &video_id).await;
                }
            }
        }
    }
}
