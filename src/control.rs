use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::volume::Volume;

/// Number of dequeued voxels between two progress reports.
pub const PROGRESS_INTERVAL: usize = 4096;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Default, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What a cancelled run returns.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CancelPolicy {
    /// Stop immediately and discard the working state: [`Outcome::Aborted`].
    #[default]
    Abort,
    /// Stop and build the output from the state reached so far: [`Outcome::Partial`].
    Finalize,
}

/// Result of a carving run that may be cancelled.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Complete(Volume<T>),
    /// Best-effort output of a run stopped by [`CancelPolicy::Finalize`].
    Partial(Volume<T>),
    Aborted,
}

impl<T> Outcome<T> {
    pub fn is_complete(&self) -> bool {
        matches!(self, Outcome::Complete(_))
    }

    /// The output volume, complete or partial.
    pub fn into_volume(self) -> Option<Volume<T>> {
        match self {
            Outcome::Complete(v) | Outcome::Partial(v) => Some(v),
            Outcome::Aborted => None,
        }
    }
}

/// Cancellation and progress hooks passed to the `*_with` entry points.
///
/// The progress callback receives `(visited, enqueued)`: voxels dequeued so far and
/// voxels ever pushed on the frontier.
#[derive(Default)]
pub struct Control<'a> {
    pub cancel: Option<&'a CancelToken>,
    pub policy: CancelPolicy,
    pub progress: Option<&'a mut dyn FnMut(usize, usize)>,
}

impl<'a> Control<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, token: &'a CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_policy(mut self, policy: CancelPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress(mut self, progress: &'a mut dyn FnMut(usize, usize)) -> Self {
        self.progress = Some(progress);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    pub(crate) fn report(&mut self, visited: usize, enqueued: usize) {
        if let Some(progress) = self.progress.as_deref_mut() {
            progress(visited, enqueued);
        }
    }

    /// Reports only on every [`PROGRESS_INTERVAL`]-th visited voxel.
    pub(crate) fn tick(&mut self, visited: usize, enqueued: usize) {
        if visited % PROGRESS_INTERVAL == 0 {
            self.report(visited, enqueued);
        }
    }

    /// Wraps the output of a run according to whether it finished and the cancel policy.
    pub(crate) fn resolve<T, F>(&self, finished: bool, finalize: F) -> Outcome<T>
    where
        F: FnOnce() -> Volume<T>,
    {
        if finished {
            Outcome::Complete(finalize())
        } else {
            match self.policy {
                CancelPolicy::Abort => Outcome::Aborted,
                CancelPolicy::Finalize => Outcome::Partial(finalize()),
            }
        }
    }
}

impl std::fmt::Debug for Control<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Control")
            .field("cancel", &self.cancel)
            .field("policy", &self.policy)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn control_without_token_never_cancels() {
        assert!(!Control::new().is_cancelled());
    }

    #[test]
    fn resolve_follows_policy() {
        let volume = || Volume::from_elem([1, 1, 1], 3_u8);

        let abort = Control::new();
        assert_eq!(abort.resolve(false, volume), Outcome::Aborted);
        assert!(abort.resolve(true, volume).is_complete());

        let finalize = Control::new().with_policy(CancelPolicy::Finalize);
        assert_eq!(finalize.resolve(false, volume), Outcome::Partial(volume()));
    }

    #[test]
    fn tick_reports_on_interval() {
        let mut calls = Vec::new();
        let mut record = |v: usize, e: usize| calls.push((v, e));
        let mut control = Control::new().with_progress(&mut record);
        for visited in 1..=2 * PROGRESS_INTERVAL {
            control.tick(visited, visited + 1);
        }
        drop(control);
        assert_eq!(
            calls,
            vec![
                (PROGRESS_INTERVAL, PROGRESS_INTERVAL + 1),
                (2 * PROGRESS_INTERVAL, 2 * PROGRESS_INTERVAL + 1)
            ]
        );
    }
}
