//! Preference store: one sqlite row per user mapping a user id to the set
//! of subject ids they registered.
//!
//! The column is a comma-joined uuid string, so an existing
//! `user_preferences.db` keeps working. Every public operation runs on
//! the blocking pool and is a single transaction, so concurrent control
//! events from the same user cannot interleave partial updates.

use crate::error::StoreError;
use crate::types::{SubjectId, UserId};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOneOutcome {
    /// This was the user's first preference (a row was created).
    pub created: bool,
    /// The id was not already in the stored set.
    pub newly_added: bool,
}

#[derive(Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub async fn init_schema(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
CREATE TABLE IF NOT EXISTS user_preferences (
    user_id TEXT PRIMARY KEY,
    subject_uuids TEXT NOT NULL
)
"#,
                [],
            )?;
            Ok(())
        })
        .await
    }

    /// Stored subject ids for a user; `None` when no row exists.
    pub async fn get(&self, user_id: &UserId) -> Result<Option<BTreeSet<SubjectId>>, StoreError> {
        let user_id = user_id.clone();
        self.with_conn(move |conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT subject_uuids FROM user_preferences WHERE user_id = ?1",
                    params![user_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(raw.map(|raw| parse_ids(&raw)))
        })
        .await
    }

    /// Union a single id into the user's set, creating the row if absent.
    pub async fn add_one(
        &self,
        user_id: &UserId,
        subject_id: &SubjectId,
    ) -> Result<AddOneOutcome, StoreError> {
        let user_id = user_id.clone();
        let subject_id = subject_id.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let existing: Option<String> = tx
                .query_row(
                    "SELECT subject_uuids FROM user_preferences WHERE user_id = ?1",
                    params![user_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            let outcome = match existing {
                Some(raw) => {
                    let mut ids = parse_ids(&raw);
                    let newly_added = ids.insert(subject_id.clone());
                    if newly_added {
                        tx.execute(
                            "UPDATE user_preferences SET subject_uuids = ?1 WHERE user_id = ?2",
                            params![encode_ids(&ids), user_id.as_str()],
                        )?;
                    }
                    AddOneOutcome {
                        created: false,
                        newly_added,
                    }
                }
                None => {
                    tx.execute(
                        "INSERT INTO user_preferences (user_id, subject_uuids) VALUES (?1, ?2)",
                        params![user_id.as_str(), subject_id.as_str()],
                    )?;
                    AddOneOutcome {
                        created: true,
                        newly_added: true,
                    }
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
    }

    /// Union a batch of ids into the user's set. Idempotent: re-registering
    /// an already-registered id changes nothing for that id.
    pub async fn add_many(
        &self,
        user_id: &UserId,
        subject_ids: &BTreeSet<SubjectId>,
    ) -> Result<(), StoreError> {
        let user_id = user_id.clone();
        let subject_ids = subject_ids.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let existing: Option<String> = tx
                .query_row(
                    "SELECT subject_uuids FROM user_preferences WHERE user_id = ?1",
                    params![user_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                Some(raw) => {
                    let mut ids = parse_ids(&raw);
                    ids.extend(subject_ids);
                    tx.execute(
                        "UPDATE user_preferences SET subject_uuids = ?1 WHERE user_id = ?2",
                        params![encode_ids(&ids), user_id.as_str()],
                    )?;
                }
                None => {
                    tx.execute(
                        "INSERT INTO user_preferences (user_id, subject_uuids) VALUES (?1, ?2)",
                        params![user_id.as_str(), encode_ids(&subject_ids)],
                    )?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Delete the user's row. Absent rows are a no-op, not an error.
    pub async fn reset(&self, user_id: &UserId) -> Result<(), StoreError> {
        let user_id = user_id.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM user_preferences WHERE user_id = ?1",
                params![user_id.as_str()],
            )?;
            Ok(())
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = open_store(&path)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn open_store(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_millis(1000))?;
    Ok(conn)
}

fn parse_ids(raw: &str) -> BTreeSet<SubjectId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SubjectId::new)
        .collect()
}

fn encode_ids(ids: &BTreeSet<SubjectId>) -> String {
    ids.iter()
        .map(SubjectId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_store() -> PreferenceStore {
        let path = std::env::temp_dir().join(format!("klassbot-prefs-{}.db", Uuid::new_v4()));
        PreferenceStore::new(path)
    }

    fn ids(values: &[&str]) -> BTreeSet<SubjectId> {
        values.iter().map(|v| SubjectId::new(*v)).collect()
    }

    #[tokio::test]
    async fn add_one_creates_then_deduplicates() {
        let store = temp_store();
        store.init_schema().await.expect("schema");
        let user = UserId::new("u1");
        let subject = SubjectId::new("s1");

        let first = store.add_one(&user, &subject).await.expect("first add");
        assert!(first.created);
        assert!(first.newly_added);
        assert_eq!(store.get(&user).await.expect("get"), Some(ids(&["s1"])));

        let repeat = store.add_one(&user, &subject).await.expect("repeat add");
        assert!(!repeat.created);
        assert!(!repeat.newly_added);

        let other = store
            .add_one(&user, &SubjectId::new("s2"))
            .await
            .expect("second subject");
        assert!(!other.created);
        assert!(other.newly_added);
        assert_eq!(
            store.get(&user).await.expect("get"),
            Some(ids(&["s1", "s2"]))
        );
    }

    #[tokio::test]
    async fn add_many_unions_and_is_idempotent() {
        let store = temp_store();
        store.init_schema().await.expect("schema");
        let user = UserId::new("u1");

        store.add_many(&user, &ids(&["a", "b"])).await.expect("add");
        store.add_many(&user, &ids(&["b", "c"])).await.expect("add");
        assert_eq!(
            store.get(&user).await.expect("get"),
            Some(ids(&["a", "b", "c"]))
        );

        store.add_many(&user, &ids(&["b", "c"])).await.expect("add");
        assert_eq!(
            store.get(&user).await.expect("get"),
            Some(ids(&["a", "b", "c"]))
        );
    }

    #[tokio::test]
    async fn reset_is_a_noop_for_missing_users() {
        let store = temp_store();
        store.init_schema().await.expect("schema");
        let user = UserId::new("ghost");

        store.reset(&user).await.expect("reset missing user");
        assert_eq!(store.get(&user).await.expect("get"), None);

        store.add_many(&user, &ids(&["a"])).await.expect("add");
        store.reset(&user).await.expect("reset");
        assert_eq!(store.get(&user).await.expect("get"), None);
    }

    #[test]
    fn parse_drops_empty_fragments() {
        assert_eq!(parse_ids("a,,b, ,c"), ids(&["a", "b", "c"]));
        assert_eq!(parse_ids(""), BTreeSet::new());
        assert_eq!(encode_ids(&ids(&["b", "a"])), "a,b");
    }
}
