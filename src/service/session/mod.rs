use std::sync::Arc;

use snafu::ResultExt;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::model::{Student, StudentId};

pub use store::*;

mod store;

/// Storage key of the signed-in student.
pub const STUDENT_KEY: &str = "ji_laoshi_student";

/// Persists the single student profile under [STUDENT_KEY].
#[derive(Debug, Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The previously saved student, if any. An unreadable record counts as absent.
    pub fn load(&self) -> Option<Student> {
        let text = match self.store.get(STUDENT_KEY) {
            Ok(text) => text?,
            Err(error) => {
                tracing::warn!(%error, "could not read the saved student");
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(student) => Some(student),
            Err(error) => {
                tracing::warn!(%error, "discarding an unreadable saved student");
                None
            }
        }
    }

    pub fn save(&self, student: &Student) -> Result<()> {
        let text = serde_json::to_string(student).context(EncodeSnafu { key: STUDENT_KEY })?;
        self.store.set(STUDENT_KEY, text)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(STUDENT_KEY)
    }
}

/// The application-wide signed-in student.
///
/// Clones share the same state. Every change goes through [Profile::update], [Profile::sign_in]
/// or [Profile::sign_out], each of which persists before releasing the lock, so concurrent
/// writers never interleave a read-modify-write. A failed write keeps the in-memory change.
#[derive(Debug, Clone)]
pub struct Profile {
    student: Arc<RwLock<Option<Student>>>,
    store: SessionStore,
}

impl Profile {
    /// Restore the profile from `store`.
    pub fn open(store: SessionStore) -> Self {
        let student = store.load();

        if let Some(student) = &student {
            tracing::info!(student.id = %student.student_id, "restored saved student");
        }

        Self {
            student: Arc::new(RwLock::new(student)),
            store,
        }
    }

    pub async fn student(&self) -> Option<Student> {
        self.student.read().await.clone()
    }

    pub async fn student_id(&self) -> Option<StudentId> {
        self.student
            .read()
            .await
            .as_ref()
            .map(|student| student.student_id.clone())
    }

    pub async fn is_signed_in(&self) -> bool {
        self.student.read().await.is_some()
    }

    #[instrument(skip_all, fields(student.id = %student.student_id))]
    pub async fn sign_in(&self, student: Student) -> Result<()> {
        let mut current = self.student.write().await;
        let student = current.insert(student);

        self.store.save(student)
    }

    #[instrument(skip_all)]
    pub async fn sign_out(&self) -> Result<()> {
        let mut current = self.student.write().await;

        if let Some(student) = current.take() {
            tracing::info!(student.id = %student.student_id, "signed out");
        }

        self.store.clear()
    }

    /// Apply `f` to the signed-in student and persist the result.
    ///
    /// Returns `Ok(None)` without touching storage when nobody is signed in.
    pub async fn update<R>(&self, f: impl FnOnce(&mut Student) -> R) -> Result<Option<R>> {
        match self.apply(f).await {
            Some((output, saved)) => saved.map(|()| Some(output)),
            None => Ok(None),
        }
    }

    /// Like [Profile::update], but hands back the output of `f` together with the outcome of the
    /// write, so a failed save does not hide what changed in memory.
    pub async fn apply<R>(&self, f: impl FnOnce(&mut Student) -> R) -> Option<(R, Result<()>)> {
        let mut current = self.student.write().await;
        let student = current.as_mut()?;

        let output = f(student);
        let saved = self.store.save(student);

        Some((output, saved))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::VideoId;
    use crate::service::testing::FailingStore;

    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryStore::new()))
    }

    fn student() -> Student {
        Student::new(StudentId::new("S001"), 9, 10)
    }

    #[test]
    fn load_without_record_is_absent() {
        assert_eq!(store().load(), None);
    }

    #[test]
    fn save_then_load() {
        let store = store();
        store.save(&student()).unwrap();

        assert_eq!(store.load(), Some(student()));

        store.clear().unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn garbage_record_is_absent() {
        let backing = Arc::new(MemoryStore::new());
        backing.set(STUDENT_KEY, "{ not a student".to_string()).unwrap();

        assert_eq!(SessionStore::new(backing).load(), None);
    }

    #[tokio::test]
    async fn update_persists_every_change() {
        let store = store();
        let profile = Profile::open(store.clone());
        profile.sign_in(student()).await.unwrap();

        let usage = profile.update(|student| student.record_usage()).await.unwrap();
        assert_eq!(usage, Some(10));

        let video = VideoId::new("v1");
        profile
            .update(|student| student.record_watched(&video))
            .await
            .unwrap();

        let saved = store.load().unwrap();
        assert_eq!(saved.usage_count, 10);
        assert_eq!(saved.watched_history, vec![video]);
    }

    #[tokio::test]
    async fn apply_keeps_the_output_when_the_save_fails() {
        let profile = Profile::open(SessionStore::new(Arc::new(FailingStore)));
        assert!(profile.sign_in(student()).await.is_err());

        let video = VideoId::new("v1");
        let (appended, saved) = profile
            .apply(|student| student.record_watched(&video))
            .await
            .unwrap();

        assert!(appended);
        assert!(saved.is_err());
        assert!(profile.student().await.unwrap().has_watched(&video));
    }

    #[tokio::test]
    async fn sign_in_over_corrupt_profile_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(&path, "{ \"ji_laoshi_student\": ").unwrap();

        let profile = Profile::open(SessionStore::new(Arc::new(FileStore::new(&path))));
        assert!(!profile.is_signed_in().await);

        profile.sign_in(student()).await.unwrap();

        let reopened = Profile::open(SessionStore::new(Arc::new(FileStore::new(&path))));
        assert_eq!(reopened.student().await, Some(student()));
    }

    #[tokio::test]
    async fn update_without_student_does_nothing() {
        let store = store();
        let profile = Profile::open(store.clone());

        let result = profile.update(|student| student.record_usage()).await.unwrap();

        assert_eq!(result, None);
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn profile_restores_and_signs_out() {
        let store = store();
        store.save(&student()).unwrap();

        let profile = Profile::open(store.clone());
        assert_eq!(profile.student_id().await, Some(StudentId::new("S001")));

        profile.sign_out().await.unwrap();
        assert!(!profile.is_signed_in().await);
        assert_eq!(store.load(), None);
    }
}
