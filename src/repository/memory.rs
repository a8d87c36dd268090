// src/repository/memory.rs

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};

#[cfg(test)]
use std::sync::atomic::AtomicUsize;

use async_trait::async_trait;
use tokio::sync::{Mutex as KeyLock, OwnedMutexGuard};

use crate::{
    models::{
        attempt::{Attempt, NewAttempt},
        progress::{ProgressKey, ProgressRecord, ProgressScope},
        quiz::{Quiz, QuizFilter, QuizSummary},
    },
    repository::{Repository, StoreError, UnitOfWork},
};

#[derive(Default)]
struct Tables {
    quizzes: HashMap<i64, Quiz>,
    attempts: Vec<Attempt>,
    progress: HashMap<ProgressKey, ProgressRecord>,
}

struct Inner {
    tables: Mutex<Tables>,

    /// Only keys that are locked or being waited on have an entry.
    key_locks: Mutex<HashMap<ProgressKey, Arc<KeyLock<()>>>>,
    next_attempt_id: AtomicI64,
    lock_timeout: Duration,

    #[cfg(test)]
    failing_commits: AtomicUsize,
}

impl Inner {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory tables poisoned".to_string()))
    }

    fn key_lock(&self, key: &ProgressKey) -> Result<Arc<KeyLock<()>>, StoreError> {
        let mut locks = self
            .key_locks
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory lock table poisoned".to_string()))?;
        Ok(locks.entry(*key).or_default().clone())
    }

    /// Drops lock entries nobody holds or waits on. Clones are only handed
    /// out under the table mutex, so a count of one means the map is the
    /// last owner.
    fn prune_key_locks(&self, keys: &[ProgressKey]) {
        let Ok(mut locks) = self.key_locks.lock() else {
            return;
        };
        for key in keys {
            if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                locks.remove(key);
            }
        }
    }

    #[cfg(test)]
    fn take_commit_failure(&self) -> bool {
        self.failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    #[cfg(not(test))]
    fn take_commit_failure(&self) -> bool {
        false
    }
}

/// In-process repository.
///
/// Each progress key has its own async mutex, acquired with a timeout, which
/// plays the role of a row lock. Writes are staged in the unit of work and
/// applied in one step on commit while the key locks are still held.
#[derive(Clone)]
pub struct MemoryRepository {
    inner: Arc<Inner>,
}

impl MemoryRepository {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(Tables::default()),
                key_locks: Mutex::new(HashMap::new()),
                next_attempt_id: AtomicI64::new(1),
                lock_timeout,
                #[cfg(test)]
                failing_commits: AtomicUsize::new(0),
            }),
        }
    }

    /// Adds or replaces a quiz.
    pub fn insert_quiz(&self, quiz: Quiz) -> Result<(), StoreError> {
        self.inner.tables()?.quizzes.insert(quiz.id, quiz);
        Ok(())
    }

    /// Makes the next `count` commits fail as if storage went away.
    #[cfg(test)]
    pub(crate) fn fail_next_commits(&self, count: usize) {
        self.inner.failing_commits.store(count, Ordering::SeqCst);
    }

    #[cfg(test)]
    fn tracked_key_locks(&self) -> usize {
        self.inner.key_locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>, StoreError> {
        Ok(self.inner.tables()?.quizzes.get(&quiz_id).cloned())
    }

    async fn list_quizzes(&self, filter: &QuizFilter) -> Result<Vec<QuizSummary>, StoreError> {
        let tables = self.inner.tables()?;
        let mut quizzes: Vec<QuizSummary> = tables
            .quizzes
            .values()
            .filter(|q| filter.matches(q))
            .map(QuizSummary::from)
            .collect();
        quizzes.sort_by_key(|q| q.id);
        Ok(quizzes)
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        Ok(Box::new(MemoryUnitOfWork {
            inner: self.inner.clone(),
            held: HeldLocks {
                inner: self.inner.clone(),
                guards: HashMap::new(),
            },
            attempts: Vec::new(),
            progress: HashMap::new(),
        }))
    }

    async fn list_attempts(&self, user_id: i64) -> Result<Vec<Attempt>, StoreError> {
        let tables = self.inner.tables()?;
        let mut attempts: Vec<Attempt> = tables
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(attempts)
    }

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<Attempt>, StoreError> {
        let tables = self.inner.tables()?;
        Ok(tables.attempts.iter().find(|a| a.id == attempt_id).cloned())
    }

    async fn list_quiz_progress(&self, user_id: i64) -> Result<Vec<ProgressRecord>, StoreError> {
        let tables = self.inner.tables()?;
        let mut records: Vec<(i64, ProgressRecord)> = tables
            .progress
            .values()
            .filter_map(|r| match r.key.scope {
                ProgressScope::Quiz { quiz_id } if r.key.user_id == user_id => Some((quiz_id, r.clone())),
                _ => None,
            })
            .collect();
        records.sort_by_key(|(quiz_id, _)| *quiz_id);
        Ok(records.into_iter().map(|(_, r)| r).collect())
    }

    async fn find_progress(&self, key: &ProgressKey) -> Result<Option<ProgressRecord>, StoreError> {
        Ok(self.inner.tables()?.progress.get(key).cloned())
    }
}

/// Key locks owned by one unit of work. Released on commit or drop.
struct HeldLocks {
    inner: Arc<Inner>,
    guards: HashMap<ProgressKey, OwnedMutexGuard<()>>,
}

impl Drop for HeldLocks {
    fn drop(&mut self) {
        let keys: Vec<ProgressKey> = self.guards.keys().copied().collect();
        self.guards.clear();
        self.inner.prune_key_locks(&keys);
    }
}

pub struct MemoryUnitOfWork {
    inner: Arc<Inner>,
    held: HeldLocks,
    attempts: Vec<Attempt>,
    progress: HashMap<ProgressKey, ProgressRecord>,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_progress(&mut self, key: &ProgressKey) -> Result<Option<ProgressRecord>, StoreError> {
        if let Some(staged) = self.progress.get(key) {
            return Ok(Some(staged.clone()));
        }

        if !self.held.guards.contains_key(key) {
            let lock = self.inner.key_lock(key)?;
            let acquired = tokio::time::timeout(self.inner.lock_timeout, lock.lock_owned()).await;
            let Ok(guard) = acquired else {
                // Our clone is gone once the timed-out future is dropped.
                self.inner.prune_key_locks(&[*key]);
                return Err(StoreError::Contention(format!(
                    "timed out after {:?} waiting for progress lock",
                    self.inner.lock_timeout
                )));
            };
            self.held.guards.insert(*key, guard);
        }

        Ok(self.inner.tables()?.progress.get(key).cloned())
    }

    async fn insert_attempt(&mut self, attempt: &NewAttempt) -> Result<Attempt, StoreError> {
        let id = self.inner.next_attempt_id.fetch_add(1, Ordering::SeqCst);
        let attempt = attempt.clone().with_id(id);
        self.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn save_progress(&mut self, record: &ProgressRecord) -> Result<(), StoreError> {
        if !self.held.guards.contains_key(&record.key) {
            return Err(StoreError::Database(
                "progress record must be locked before it is written".to_string(),
            ));
        }
        self.progress.insert(record.key, record.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if self.inner.take_commit_failure() {
            return Err(StoreError::Unavailable("commit failed".to_string()));
        }

        let MemoryUnitOfWork {
            inner,
            held,
            attempts,
            progress,
        } = *self;

        {
            let mut tables = inner.tables()?;
            tables.attempts.extend(attempts);
            tables.progress.extend(progress);
        }

        drop(held);
        Ok(())
    }
}
