use super::*;

/// A catalog entry. Created by the backend and never mutated by the client.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Video {
    #[serde(rename = "VideoID")]
    pub id: VideoId,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Category", default)]
    pub category: String,
    #[serde(rename = "IsFree", with = "yes_no")]
    pub is_free: bool,
    /// Blank or unreadable sheet cells count as zero minutes.
    #[serde(rename = "DurationMin", default)]
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub duration_minutes: u32,
    #[new(default)]
    #[serde(rename = "MaterialLink", default, skip_serializing_if = "Option::is_none")]
    pub material_link: Option<String>,
}

impl Video {
    pub fn with_material_link(mut self, link: impl Into<String>) -> Self {
        self.material_link = Some(link.into());
        self
    }

    /// Whether opening this video needs a signed-in student.
    pub fn requires_login(&self) -> bool {
        !self.is_free
    }

    /// Catalog material link, ignoring blank cells.
    pub fn material_link(&self) -> Option<&str> {
        self.material_link.as_deref().filter(|link| !link.trim().is_empty())
    }
}

/// The backend flags free videos with the literal `"Yes"`; every other value is paid content.
mod yes_no {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Text(String),
        Bool(bool),
    }

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "Yes" } else { "No" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let flag = match Flag::deserialize(deserializer)? {
            Flag::Text(text) => text == "Yes",
            Flag::Bool(value) => value,
        };

        Ok(flag)
    }
}
