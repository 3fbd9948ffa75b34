//! Environment capability and the launched-environment guard.

use crate::core::WorkerId;
use crate::error::EnvError;
use std::ops::{Deref, DerefMut};

/// A simulated or real environment driven by one worker.
pub trait Environment {
    /// Set the evaluation-mode flag. Read by the environment at launch.
    fn set_eval(&mut self, eval: bool);

    fn launch(&mut self) -> Result<(), EnvError>;

    fn shutdown(&mut self);
}

/// Constructs one environment per worker.
pub trait EnvFactory<E>: Send + Sync {
    fn create(&self, worker: &WorkerId) -> E;
}

impl<E, F> EnvFactory<E> for F
where
    F: Fn(&WorkerId) -> E + Send + Sync,
{
    fn create(&self, worker: &WorkerId) -> E {
        self(worker)
    }
}

/// A launched environment that is shut down when dropped.
///
/// Holding the environment through this guard means teardown runs on every
/// exit path of a worker: normal completion, kill, error or panic.
pub struct LaunchedEnv<E: Environment> {
    env: E,
    worker: WorkerId,
}

impl<E: Environment> LaunchedEnv<E> {
    /// Set the eval flag and launch `env`.
    pub fn launch(mut env: E, eval: bool, worker: WorkerId) -> Result<Self, EnvError> {
        log::info!("{worker}: Launching env.");
        env.set_eval(eval);
        env.launch()?;
        Ok(Self { env, worker })
    }
}

impl<E: Environment> Deref for LaunchedEnv<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.env
    }
}

impl<E: Environment> DerefMut for LaunchedEnv<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.env
    }
}

impl<E: Environment> Drop for LaunchedEnv<E> {
    fn drop(&mut self) {
        log::info!("{}: Shutting down env.", self.worker);
        self.env.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingEnv {
        eval: bool,
        fail_launch: bool,
        launches: Arc<AtomicUsize>,
        shutdowns: Arc<AtomicUsize>,
    }

    impl Environment for CountingEnv {
        fn set_eval(&mut self, eval: bool) {
            self.eval = eval;
        }

        fn launch(&mut self) -> Result<(), EnvError> {
            if self.fail_launch {
                return Err(EnvError::Launch("refused".into()));
            }
            self.launches.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn shutdown(&mut self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting_env(fail_launch: bool) -> (CountingEnv, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let launches = Arc::new(AtomicUsize::new(0));
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let env = CountingEnv {
            eval: false,
            fail_launch,
            launches: Arc::clone(&launches),
            shutdowns: Arc::clone(&shutdowns),
        };
        (env, launches, shutdowns)
    }

    #[test]
    fn test_guard_shuts_down_on_drop() {
        let (env, launches, shutdowns) = counting_env(false);
        {
            let guard = LaunchedEnv::launch(env, true, WorkerId::new("eval_env", 0)).unwrap();
            assert!(guard.eval);
            assert_eq!(launches.load(Ordering::SeqCst), 1);
            assert_eq!(shutdowns.load(Ordering::SeqCst), 0);
        }
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_shuts_down_on_panic() {
        let (env, _, shutdowns) = counting_env(false);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = LaunchedEnv::launch(env, false, WorkerId::new("train_env", 0)).unwrap();
            panic!("worker blew up");
        }));
        assert!(result.is_err());
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_launch_is_not_shut_down() {
        let (env, _, shutdowns) = counting_env(true);
        let result = LaunchedEnv::launch(env, false, WorkerId::new("train_env", 0));
        assert!(matches!(result, Err(EnvError::Launch(_))));
        assert_eq!(shutdowns.load(Ordering::SeqCst), 0);
    }
}
