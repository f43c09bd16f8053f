use super::*;

/// The signed-in student, as returned by the backend on login and persisted locally.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Student {
    #[serde(rename = "StudentID")]
    pub student_id: StudentId,
    #[new(default)]
    #[serde(rename = "ExpiryDate", default)]
    pub expiry_date: String,
    #[new(default)]
    #[serde(rename = "WatchedHistory", default)]
    pub watched_history: Vec<VideoId>,
    #[new(default)]
    #[serde(rename = "LastUsageDate", default)]
    pub last_usage_date: String,
    #[serde(rename = "UsageCount", default)]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub usage_count: u32,
    #[serde(rename = "MaxUsage")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub max_usage: u32,
}

impl Student {
    /// Count one more unlock of paid content. The counter never exceeds `max_usage`.
    pub fn record_usage(&mut self) -> u32 {
        self.usage_count = self.usage_count.saturating_add(1).min(self.max_usage);
        self.usage_count
    }

    /// Append `video` to the watch history. Returns `false` when it was already there.
    pub fn record_watched(&mut self, video: &VideoId) -> bool {
        if self.has_watched(video) {
            return false;
        }

        self.watched_history.push(video.clone());
        true
    }

    pub fn has_watched(&self, video: &VideoId) -> bool {
        self.watched_history.contains(video)
    }

    pub fn remaining_usage(&self) -> u32 {
        self.max_usage.saturating_sub(self.usage_count)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn student(usage_count: u32, max_usage: u32) -> Student {
        Student::new(StudentId::new("S001"), usage_count, max_usage)
    }

    #[test]
    fn usage_is_clamped_to_the_ceiling() {
        let mut student = student(9, 10);

        assert_eq!(student.record_usage(), 10);
        assert_eq!(student.record_usage(), 10, "usage must not go past max_usage");
        assert_eq!(student.remaining_usage(), 0);
    }

    #[test]
    fn usage_above_the_ceiling_is_pulled_back() {
        let mut student = student(12, 10);

        assert_eq!(student.record_usage(), 10);
    }

    #[test]
    fn watch_history_has_no_duplicates() {
        let mut student = student(0, 10);
        let video = VideoId::new("v1");

        assert!(student.record_watched(&video));
        assert!(!student.record_watched(&video));
        assert_eq!(student.watched_history, vec![video.clone()]);
        assert!(student.has_watched(&video));
    }

    #[test]
    fn deserialize_login_payload() {
        let student: Student = serde_json::from_value(json!({
            "StudentID": "S001",
            "ExpiryDate": "2026-12-31",
            "WatchedHistory": ["v1", "v2"],
            "LastUsageDate": "2026-10-18",
            "UsageCount": "3",
            "MaxUsage": 10
        }))
        .unwrap();

        assert_eq!(student.student_id, StudentId::new("S001"));
        assert_eq!(student.usage_count, 3);
        assert_eq!(student.max_usage, 10);
        assert_eq!(student.watched_history.len(), 2);
    }

    #[test]
    fn persisted_form_round_trips() {
        let mut original = student(2, 5);
        original.record_watched(&VideoId::new("v9"));

        let text = serde_json::to_string(&original).unwrap();
        let restored: Student = serde_json::from_str(&text).unwrap();

        assert_eq!(restored, original);
    }
}
