//! Tally test utilities.
//!
//! Provider fixtures for exercising the gathering engine: well-behaved
//! providers, providers that count their calls, and every flavor of
//! misbehaving provider the kernel has to survive.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tally_sdk::{API_VERSION, Evaluable, Fault};
use uuid::Uuid;

/// A provider that always returns the same value.
#[derive(Debug, Clone)]
pub struct StaticProvider<T> {
    value: T,
}

/// Create a provider that always returns `value`.
pub fn returns<T: Clone + Send + Sync + 'static>(value: T) -> Arc<StaticProvider<T>> {
    Arc::new(StaticProvider { value })
}

impl<T: Clone + Send + Sync> Evaluable<T> for StaticProvider<T> {
    fn evaluate(&self, _subject_id: Uuid, _subject_name: &str) -> Result<T, Fault> {
        Ok(self.value.clone())
    }
}

/// A provider that records how often it was evaluated and for whom.
#[derive(Debug)]
pub struct CountingProvider<T> {
    value: T,
    calls: AtomicUsize,
    subjects: Mutex<Vec<String>>,
}

/// Create a counting provider that returns `value`.
pub fn counting<T: Clone + Send + Sync + 'static>(value: T) -> Arc<CountingProvider<T>> {
    Arc::new(CountingProvider {
        value,
        calls: AtomicUsize::new(0),
        subjects: Mutex::new(Vec::new()),
    })
}

impl<T> CountingProvider<T> {
    /// Number of evaluations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Subject names seen, in call order.
    pub fn subjects(&self) -> Vec<String> {
        self.subjects.lock().clone()
    }
}

impl<T: Clone + Send + Sync> Evaluable<T> for CountingProvider<T> {
    fn evaluate(&self, _subject_id: Uuid, subject_name: &str) -> Result<T, Fault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.subjects.lock().push(subject_name.to_string());
        Ok(self.value.clone())
    }
}

/// A provider whose answer depends on the subject name.
pub struct PerSubjectProvider<T> {
    f: Box<dyn Fn(&str) -> T + Send + Sync>,
}

/// Create a provider computing its value from the subject name.
pub fn per_subject<T: 'static>(
    f: impl Fn(&str) -> T + Send + Sync + 'static,
) -> Arc<PerSubjectProvider<T>> {
    Arc::new(PerSubjectProvider { f: Box::new(f) })
}

impl<T> Evaluable<T> for PerSubjectProvider<T> {
    fn evaluate(&self, _subject_id: Uuid, subject_name: &str) -> Result<T, Fault> {
        Ok((self.f)(subject_name))
    }
}

/// The ways a [`FaultyProvider`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Misbehavior {
    /// Panics inside `evaluate`.
    Panics,
    /// Returns a `CallbackError`.
    Errors,
    /// Returns `NullResult`.
    ReturnsNothing,
    /// Reports an interface version the kernel does not speak.
    StaleInterface,
}

/// A provider that always misbehaves in one specific way.
#[derive(Debug)]
pub struct FaultyProvider {
    misbehavior: Misbehavior,
    calls: AtomicUsize,
}

/// Create a misbehaving provider.
pub fn faulty(misbehavior: Misbehavior) -> Arc<FaultyProvider> {
    Arc::new(FaultyProvider {
        misbehavior,
        calls: AtomicUsize::new(0),
    })
}

impl FaultyProvider {
    /// Number of times `evaluate` was entered.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<T> Evaluable<T> for FaultyProvider {
    fn evaluate(&self, _subject_id: Uuid, subject_name: &str) -> Result<T, Fault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.misbehavior {
            Misbehavior::Panics => panic!("provider exploded for {subject_name}"),
            Misbehavior::Errors => Err(Fault::error(format!("lookup failed for {subject_name}"))),
            Misbehavior::ReturnsNothing => Err(Fault::NullResult),
            // Reached only if the host skips the version check.
            Misbehavior::StaleInterface => Err(Fault::error("stale provider evaluated")),
        }
    }

    fn api_version(&self) -> u32 {
        match self.misbehavior {
            Misbehavior::StaleInterface => API_VERSION.wrapping_add(1),
            _ => API_VERSION,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn counting_provider_tracks_calls() {
        let provider = counting(true);
        provider.evaluate(Uuid::nil(), "alice").unwrap();
        provider.evaluate(Uuid::nil(), "bob").unwrap();
        assert_eq!(provider.calls(), 2);
        assert_eq!(provider.subjects(), vec!["alice", "bob"]);
    }

    #[test]
    fn counting_provider_records_subjects_across_threads() {
        let provider = counting(1_i64);
        std::thread::scope(|scope| {
            for n in 0..4 {
                let provider = &provider;
                scope.spawn(move || provider.evaluate(Uuid::nil(), &format!("p{n}")).unwrap());
            }
        });
        let mut seen = provider.subjects();
        seen.sort();
        assert_eq!(seen, vec!["p0", "p1", "p2", "p3"]);
        assert_eq!(provider.calls(), 4);
    }

    #[test]
    fn stale_provider_reports_foreign_version() {
        let provider = faulty(Misbehavior::StaleInterface);
        assert_ne!(Evaluable::<bool>::api_version(&*provider), API_VERSION);
    }
}
