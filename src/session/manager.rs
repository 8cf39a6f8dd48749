//! Cache sessions
//!
//! A [`CacheContext`] is the explicit, process-wide cache state: the cache
//! directory, the action cache over its record store, and the exit hooks.
//! Each action gets a [`CacheSession`] from [`CacheContext::begin`], which
//! checks activation before anything touches the store.

use crate::cache::{ActionCache, CacheDecision, CacheRecord, Outcome};
use crate::config::Config;
use crate::descriptor::ActionDescriptor;
use crate::environment::CompatibilityPolicy;
use crate::error::{ProvcacheError, ProvcacheResult};
use crate::session::activation::CacheDir;
use crate::session::journal::SessionJournal;
use crate::session::state::{SessionExit, SessionReport};
use crate::store::{RecordStore, SqliteStore};
use chrono::Utc;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Callback run when a session ends, whatever the exit path
pub trait SessionHook: Send + Sync {
    fn on_exit(&self, report: &SessionReport);
}

impl<H: SessionHook + ?Sized> SessionHook for Arc<H> {
    fn on_exit(&self, report: &SessionReport) {
        (**self).on_exit(report)
    }
}

/// Process-wide cache state shared by all sessions of a pipeline run
pub struct CacheContext<S = SqliteStore> {
    dir: CacheDir,
    cache: ActionCache<S>,
    hooks: Vec<Box<dyn SessionHook>>,
}

impl CacheContext<SqliteStore> {
    /// Context for the pipeline rooted at `root`, configured from `config`
    pub fn from_config(root: &Path, config: &Config) -> Self {
        let dir = config.cache.cache_dir(root);
        let store = SqliteStore::new(dir.store_path())
            .with_busy_timeout(Duration::from_millis(config.cache.busy_timeout_ms));
        let cache = ActionCache::new(store, config.environment.snapshot()).with_policy(
            CompatibilityPolicy {
                strict: config.cache.strict,
            },
        );

        let context = Self::new(dir, cache);
        if config.general.journal {
            let journal = SessionJournal::new(context.dir.journal_path());
            context.with_hook(journal)
        } else {
            context
        }
    }
}

impl<S: RecordStore> CacheContext<S> {
    pub fn new(dir: CacheDir, cache: ActionCache<S>) -> Self {
        Self {
            dir,
            cache,
            hooks: Vec::new(),
        }
    }

    /// Register an exit hook
    pub fn with_hook(mut self, hook: impl SessionHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn dir(&self) -> &CacheDir {
        &self.dir
    }

    pub fn cache(&self) -> &ActionCache<S> {
        &self.cache
    }

    /// Open a session for one action
    ///
    /// Fails with `CacheNotActivated` before any store access if the cache
    /// directory is not activated.
    pub fn begin(&self, descriptor: ActionDescriptor) -> ProvcacheResult<CacheSession<'_, S>> {
        self.dir.require_activated()?;

        let session = CacheSession {
            context: self,
            id: Uuid::new_v4(),
            descriptor,
            started_at: Utc::now(),
            started: Instant::now(),
            identifier: None,
            outcome: None,
            finished: false,
        };
        debug!(
            "Session {} opened for action {}",
            session.id,
            session.descriptor.name()
        );
        Ok(session)
    }
}

impl<S> fmt::Debug for CacheContext<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheContext")
            .field("dir", &self.dir)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

/// Scoped unit of work around one action's cache check
///
/// Exit hooks run exactly once: when [`run`](Self::run) returns, or when the
/// session is dropped (including while a panicking action body unwinds).
pub struct CacheSession<'a, S> {
    context: &'a CacheContext<S>,
    id: Uuid,
    descriptor: ActionDescriptor,
    started_at: chrono::DateTime<Utc>,
    started: Instant,
    identifier: Option<String>,
    outcome: Option<Outcome>,
    finished: bool,
}

impl<S: RecordStore> CacheSession<'_, S> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn descriptor(&self) -> &ActionDescriptor {
        &self.descriptor
    }

    /// Check the cache, then hand the record and outcome to `body`
    ///
    /// `body` decides whether to compute based on the outcome. Cache errors
    /// are converted into the caller's error type after hooks have run.
    pub fn run<T, E, F>(mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&CacheRecord, Outcome) -> Result<T, E>,
        E: From<ProvcacheError> + fmt::Display,
    {
        let decision = self.check()?;

        match body(&decision.record, decision.outcome) {
            Ok(value) => {
                self.finalize(&decision);
                self.finish(SessionExit::Completed);
                Ok(value)
            }
            Err(e) => {
                self.finish(SessionExit::ActionFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Check the cache without an action body
    pub fn decide(mut self) -> ProvcacheResult<CacheDecision> {
        let decision = self.check()?;
        self.finalize(&decision);
        self.finish(SessionExit::Completed);
        Ok(decision)
    }

    fn check(&mut self) -> ProvcacheResult<CacheDecision> {
        match self.context.cache.check_or_record(&self.descriptor) {
            Ok(decision) => {
                self.identifier = Some(decision.record.identifier.clone());
                self.outcome = Some(decision.outcome);
                Ok(decision)
            }
            Err(e) => {
                self.finish(SessionExit::CacheFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// The record was persisted by the cache check; nothing left to write.
    fn finalize(&self, decision: &CacheDecision) {
        debug!(
            "Session {} finalized record {} ({})",
            self.id, decision.record.identifier, decision.outcome
        );
    }
}

impl<S> CacheSession<'_, S> {
    fn finish(&mut self, exit: SessionExit) {
        if self.finished {
            return;
        }
        self.finished = true;

        let report = SessionReport {
            session_id: self.id,
            execution_id: self.context.cache.execution_id(),
            action: self.descriptor.name().to_string(),
            identifier: self.identifier.clone(),
            outcome: self.outcome,
            exit,
            started_at: self.started_at,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        };

        if report.exit.is_success() {
            info!(
                "Session {} for action {} {} ({} ms)",
                report.session_id, report.action, report.exit, report.elapsed_ms
            );
        } else {
            warn!(
                "Session {} for action {} ended: {:?}",
                report.session_id, report.action, report.exit
            );
        }

        for hook in &self.context.hooks {
            hook.on_exit(&report);
        }
    }
}

impl<S> Drop for CacheSession<'_, S> {
    fn drop(&mut self) {
        if !self.finished {
            let exit = if std::thread::panicking() {
                SessionExit::Panicked
            } else {
                SessionExit::Abandoned
            };
            self.finish(exit);
        }
    }
}
