//! Process supervision test world shared across BDD scenarios.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;

use crate::bootstrap::ConfigLoader;
use crate::event::ValidationEvent;
use crate::feed::{FeedFactory, RtrFeedFactory};
use crate::health::HealthReporter;
use crate::process::daemonizer::{DaemonizeError, Daemonizer};
use crate::process::launch::{LaunchPlan, ProcessControl, ServiceDeps, run_bridge_with};
use crate::process::shutdown::{ShutdownCause, ShutdownError, ShutdownSignal};
use crate::process::{LaunchError, LaunchMode};
use crate::tests::support::{
    FailingConfigLoader, FakeBird, FakeReply, HealthEvent, RecordingHealthReporter, ScriptedFeedFactory,
    TestConfigLoader,
};

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub type StepResult = Result<(), String>;

pub struct ProcessTestWorld {
    bird: FakeBird,
    loader: TestConfigLoader,
    reporter: Arc<RecordingHealthReporter>,
    feeds: ScriptedFeedFactory,
    daemonizer: TestDaemonizer,
    shutdown: TestShutdownSignal,
    handle: Option<thread::JoinHandle<Result<(), LaunchError>>>,
    result: Option<Result<(), LaunchError>>,
}

impl Default for ProcessTestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTestWorld {
    pub fn new() -> Self {
        let bird = FakeBird::start();
        let loader = TestConfigLoader::new(bird.socket_path());
        Self {
            bird,
            loader,
            reporter: Arc::new(RecordingHealthReporter::default()),
            feeds: ScriptedFeedFactory::default(),
            daemonizer: TestDaemonizer::default(),
            shutdown: TestShutdownSignal::new(),
            handle: None,
            result: None,
        }
    }

    pub fn loader_mut(&mut self) -> &mut TestConfigLoader {
        &mut self.loader
    }

    pub fn script_feed(&self, events: impl IntoIterator<Item = ValidationEvent>) {
        self.feeds.script(events);
    }

    pub fn make_daemon_unreachable(&self) {
        self.bird.stop_accepting();
    }

    /// The daemon disappears once it has read the next command.
    pub fn daemon_vanishes_after_next_command(&self) {
        self.bird.script([FakeReply::Vanish]);
    }

    /// Runs the bridge on a worker thread until shutdown is triggered.
    pub fn spawn(&mut self) -> StepResult {
        if self.handle.is_some() {
            return Err("bridge already running".to_owned());
        }
        let plan = self.plan(
            self.loader.clone(),
            self.shutdown.clone(),
            self.feeds.clone(),
        );
        self.handle = Some(thread::spawn(move || run_bridge_with(plan)));
        Ok(())
    }

    /// Runs the bridge to completion on the calling thread with shutdown
    /// already requested.
    pub fn run_to_completion(&mut self) {
        self.shutdown.trigger();
        let plan = self.plan(
            self.loader.clone(),
            self.shutdown.clone(),
            self.feeds.clone(),
        );
        self.result = Some(run_bridge_with(plan));
    }

    /// Starts another bridge sharing this world's configuration.
    pub fn run_second_instance(&self) -> Result<(), LaunchError> {
        let plan = self.plan(
            self.loader.clone(),
            TestShutdownSignal::triggered(),
            self.feeds.clone(),
        );
        run_bridge_with(plan)
    }

    pub fn run_with_rtr_feed(&mut self) {
        let plan = self.plan(
            self.loader.clone(),
            TestShutdownSignal::triggered(),
            RtrFeedFactory,
        );
        self.result = Some(run_bridge_with(plan));
    }

    pub fn run_with_invalid_config(&mut self) {
        let plan = self.plan(
            FailingConfigLoader,
            TestShutdownSignal::triggered(),
            self.feeds.clone(),
        );
        self.result = Some(run_bridge_with(plan));
    }

    fn plan<L, F>(
        &self,
        loader: L,
        shutdown: TestShutdownSignal,
        feeds: F,
    ) -> LaunchPlan<L, TestDaemonizer, TestShutdownSignal, F>
    where
        L: ConfigLoader,
        F: FeedFactory,
    {
        LaunchPlan {
            process: ProcessControl {
                daemonizer: self.daemonizer.clone(),
                shutdown,
            },
            services: ServiceDeps {
                loader,
                reporter: Arc::clone(&self.reporter) as Arc<dyn HealthReporter>,
                feeds,
            },
        }
    }

    pub fn wait_until_running(&self) -> StepResult {
        self.wait_for("bridge did not start its feed", || {
            self.reporter.saw(&HealthEvent::FeedStarted)
        })
    }

    pub fn wait_for_commands(&self, count: usize) -> StepResult {
        self.wait_for("routing daemon did not receive every update", || {
            self.bird.received().len() >= count
        })
    }

    fn wait_for(&self, failure: &str, mut ready: impl FnMut() -> bool) -> StepResult {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while Instant::now() < deadline {
            if ready() {
                return Ok(());
            }
            if self.handle.as_ref().is_some_and(thread::JoinHandle::is_finished) {
                return Err(format!("{failure}: bridge exited early"));
            }
            thread::sleep(POLL_INTERVAL);
        }
        Err(failure.to_owned())
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Waits for the bridge thread, failing if it outlives [`WAIT_TIMEOUT`].
    pub fn join(&mut self) -> StepResult {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| "bridge not running".to_owned())?;
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                return Err("bridge did not finish shutting down".to_owned());
            }
            thread::sleep(POLL_INTERVAL);
        }
        let result = handle
            .join()
            .map_err(|_| "bridge thread panicked".to_owned())?;
        self.result = Some(result);
        Ok(())
    }

    pub fn result(&self) -> Option<&Result<(), LaunchError>> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&LaunchError> {
        self.result.as_ref()?.as_ref().err()
    }

    pub fn received(&self) -> Vec<String> {
        self.bird.received()
    }

    pub fn events(&self) -> Vec<HealthEvent> {
        self.reporter.events()
    }

    pub fn daemonizer_calls(&self) -> usize {
        self.daemonizer.calls()
    }

    pub fn waited_in(&self) -> Option<LaunchMode> {
        self.shutdown.waited_in()
    }

    pub fn feeds_stopped(&self) -> usize {
        self.feeds.stopped()
    }

    pub fn pid_path(&self) -> Utf8PathBuf {
        self.loader.pid_path()
    }
}

#[derive(Clone, Default)]
pub struct TestDaemonizer {
    calls: Arc<AtomicUsize>,
}

impl TestDaemonizer {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Daemonizer for TestDaemonizer {
    fn daemonize(&self) -> Result<(), DaemonizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct ShutdownState {
    triggered: bool,
    mode: Option<LaunchMode>,
}

#[derive(Clone)]
pub struct TestShutdownSignal {
    inner: Arc<(Mutex<ShutdownState>, Condvar)>,
}

impl TestShutdownSignal {
    fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(ShutdownState::default()), Condvar::new())),
        }
    }

    fn triggered() -> Self {
        let signal = Self::new();
        signal.trigger();
        signal
    }

    fn trigger(&self) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().expect("shutdown mutex poisoned");
        state.triggered = true;
        cvar.notify_all();
    }

    fn waited_in(&self) -> Option<LaunchMode> {
        let (lock, _) = &*self.inner;
        lock.lock().expect("shutdown mutex poisoned").mode
    }
}

impl ShutdownSignal for TestShutdownSignal {
    fn install(&self) -> Result<(), ShutdownError> {
        Ok(())
    }

    fn wait(&self, mode: LaunchMode) -> Result<ShutdownCause, ShutdownError> {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().expect("shutdown mutex poisoned");
        state.mode = Some(mode);
        while !state.triggered {
            state = cvar
                .wait(state)
                .expect("shutdown mutex poisoned during wait");
        }
        Ok(ShutdownCause::ExitCommand)
    }
}
