use itertools::Itertools;

use crate::model::{Student, Video};
use crate::service::access::{UnlockSession, UnlockState};
use crate::service::catalog::Catalog;
use crate::service::embed::Source;
use crate::service::watch::Player;

pub const HELP: &str = "\
commands:
  list | search [term] | category <name> | categories | refresh
  open <video id> | login <student id> <password> | cancel | logout
  status | pause | play | external | material | retry | close
  help | exit";

pub const LOGIN_PROMPT: &str =
    "this video needs a student login: `login <student id> <password>`, or `cancel`";

pub const RETRY_HINT: &str = "type `retry` to try again or `close` to dismiss";

pub fn banner(message: &str) -> String {
    format!("! {message}\n  type `refresh` to try again")
}

pub fn catalog(catalog: &Catalog, student: Option<&Student>) -> String {
    let visible = catalog.visible();

    let mut lines = vec![format!(
        "{} of {} videos (category: {}, search: \"{}\")",
        visible.len(),
        catalog.videos().len(),
        catalog.category(),
        catalog.term()
    )];

    if let Some(error) = catalog.error() {
        lines.push(banner(&error.message()));
    }

    lines.extend(visible.into_iter().map(|video| video_line(video, student)));
    lines.join("\n")
}

fn video_line(video: &Video, student: Option<&Student>) -> String {
    let watched = student.is_some_and(|student| student.has_watched(&video.id));

    let mut line = format!(
        "  {} [{}] {} ({}, {} min){}",
        if watched { '✓' } else { ' ' },
        video.id,
        video.title,
        video.category.trim(),
        video.duration_minutes,
        if video.is_free { "" } else { " · login" },
    );

    if let Some(link) = video.material_link().filter(|_| video.is_free) {
        line.push_str(&format!("\n      material: {link}"));
    }

    line
}

pub fn student(student: Option<&Student>) -> String {
    let Some(student) = student else {
        return "not signed in (guest)".to_string();
    };

    let mut lines = vec![
        format!("signed in as {}", student.student_id),
        format!(
            "  usage {}/{} ({} left)",
            student.usage_count,
            student.max_usage,
            student.remaining_usage()
        ),
    ];

    if !student.expiry_date.is_empty() {
        lines.push(format!("  expires {}", student.expiry_date));
    }

    if !student.watched_history.is_empty() {
        lines.push(format!(
            "  watched {}",
            student.watched_history.iter().join(", ")
        ));
    }

    lines.join("\n")
}

pub fn session(session: Option<&UnlockSession>) -> String {
    let Some(session) = session else {
        return "player closed".to_string();
    };

    let video = session.video();
    let title = format!("[{}] {}", video.id, video.title);

    match session.state() {
        UnlockState::Locked => format!("{title}: locked"),
        UnlockState::Loading => format!("{title}: unlocking..."),
        UnlockState::Error(message) => format!("{title}: {message}"),
        UnlockState::Unlocked(playback) => {
            let mut lines = vec![match &playback.source {
                Source::Embed(url) => format!("{title}: playing embedded {url}"),
                Source::Native => format!("{title}: playing {}", playback.video_url),
            }];

            if let (Some(progress), Some(player)) = (session.progress(), session.player()) {
                let state = match player {
                    Player::Playing => "playing",
                    Player::Paused => "paused",
                };
                let recorded = if progress.recorded { ", recorded" } else { "" };

                lines.push(format!(
                    "  {state} {}s / {}s{recorded}",
                    progress.watched_secs, progress.threshold_secs
                ));
            }

            if let Some(link) = &playback.material_link {
                lines.push(format!("  material: {link}"));
            }

            lines.join("\n")
        }
    }
}
