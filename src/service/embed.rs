use once_cell::sync::Lazy;
use regex::Regex;

static YOUTUBE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*(youtu.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*")
        .expect("youtube pattern is valid")
});

static DRIVE_VIEW: Lazy<Regex> = Lazy::new(|| Regex::new(r"/view.*$").expect("view pattern is valid"));

static DRIVE_EDIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/edit.*$").expect("edit pattern is valid"));

const YOUTUBE_ID_LEN: usize = 11;

/// How a resolved video URL is played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Shown inside an embedded player at the given URL.
    Embed(String),
    /// Not embeddable; played directly from the raw URL.
    Native,
}

impl Source {
    pub fn embed_url(&self) -> Option<&str> {
        match self {
            Source::Embed(url) => Some(url),
            Source::Native => None,
        }
    }
}

/// Classify a raw video URL and, for known hosts, rewrite it into its embeddable form.
pub fn resolve(url: &str) -> Source {
    if url.contains("youtube.com") || url.contains("youtu.be") {
        let embed = youtube_id(url)
            .map(|id| format!("https://www.youtube.com/embed/{id}"))
            .unwrap_or_else(|| url.to_string());

        return Source::Embed(embed);
    }

    if url.contains("drive.google.com") {
        let preview = DRIVE_VIEW.replace(url, "/preview");
        let preview = DRIVE_EDIT.replace(&preview, "/preview");

        return Source::Embed(preview.into_owned());
    }

    Source::Native
}

/// The 11-character video id of a YouTube link, if one can be found.
pub fn youtube_id(url: &str) -> Option<&str> {
    let captures = YOUTUBE_ID.captures(url)?;
    let id = captures.get(2)?.as_str();

    (id.len() == YOUTUBE_ID_LEN).then_some(id)
}
