use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::NaiveDateTime;
use log::{debug, error, info, warn};
use tokio::{runtime::Handle, task::JoinHandle, time::MissedTickBehavior};

use crate::{
    alarm::{AlarmRecord, EventKind, FiringEvent},
    config::{blocking, AlarmStore, CredentialSource, Credentials},
    gateway::TriggerGateway,
};

/// time between ticks
pub const TICK_INTERVAL: Duration = Duration::from_secs(60);

/// what one tick did, mostly for logging and tests
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub pre_alarms: usize,
    pub fired: usize,
    /// fires the gateway reported as failed (pre-alarms included)
    pub failed: usize,
    pub advanced: usize,
    pub skipped_no_credentials: bool,
}

impl TickReport {
    const fn skipped() -> Self {
        Self {
            pre_alarms: 0,
            fired: 0,
            failed: 0,
            advanced: 0,
            skipped_no_credentials: true,
        }
    }
}

pub struct Scheduler {
    store: AlarmStore,
    credentials: CredentialSource,
    gateway: Arc<dyn TriggerGateway>,
    interval: Duration,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        store: AlarmStore,
        credentials: CredentialSource,
        gateway: Arc<dyn TriggerGateway>,
    ) -> Self {
        Self {
            store,
            credentials,
            gateway,
            interval: TICK_INTERVAL,
        }
    }

    /// change the tick cadence
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Evaluate every alarm once against `now`.
    ///
    /// Errors are logged per alarm and never stop the other alarms from being
    /// checked. Without credentials nothing is fired.
    pub async fn tick(&self, now: NaiveDateTime) -> TickReport {
        let source = self.credentials.clone();
        let credentials = match blocking(move || source.load()).await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => {
                warn!("missing API key or shocker id, not firing alarms");
                return TickReport::skipped();
            }
            Err(e) => {
                error!("couldn't load credentials: {e}");
                return TickReport::skipped();
            }
        };
        let store = self.store.clone();
        let alarms = match blocking(move || store.list_all()).await {
            Ok(alarms) => alarms,
            Err(e) => {
                error!("couldn't load alarms: {e}");
                return TickReport::default();
            }
        };
        debug!("checking {} alarms at {now}", alarms.len());

        let mut report = TickReport::default();
        for (name, record) in &alarms {
            self.check_alarm(&credentials, name, record, now, &mut report)
                .await;
        }
        report
    }

    async fn check_alarm(
        &self,
        credentials: &Credentials,
        name: &str,
        record: &AlarmRecord,
        now: NaiveDateTime,
        report: &mut TickReport,
    ) {
        if record.pre_alarm_due(now) {
            info!("triggering vibration for alarm {name}");
            report.pre_alarms += 1;
            let event = FiringEvent::new(name, record, EventKind::PreAlarm, now);
            if !self.fire(credentials, &event).await {
                report.failed += 1;
            }
        }

        if record.main_due(now) {
            info!("triggering alarm {name}");
            report.fired += 1;
            let event = FiringEvent::new(name, record, EventKind::Main, now);
            if !self.fire(credentials, &event).await {
                report.failed += 1;
            }
            // advance even if the fire failed, there are no retries
            let store = self.store.clone();
            let (name_owned, fired) = (name.to_string(), record.clone());
            match blocking(move || store.advance(&name_owned, &fired)).await {
                Ok(Some(next)) => {
                    info!("updated alarm {name} to next day: {}", next.fire_at);
                    report.advanced += 1;
                }
                Ok(None) => warn!("alarm {name} was changed or removed while firing, leaving it"),
                Err(e) => error!("couldn't reschedule alarm {name}: {e}"),
            }
        }
    }

    async fn fire(&self, credentials: &Credentials, event: &FiringEvent<'_>) -> bool {
        match self.gateway.fire(credentials, event).await {
            Ok(()) => true,
            Err(e) => {
                error!("failed to send {} for {}: {e}", event.kind, event.name);
                false
            }
        }
    }

    async fn run(self: Arc<Self>) {
        info!("starting alarm update loop");
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let report = self.tick(chrono::Local::now().naive_local()).await;
            debug!("tick finished: {report:?}");
        }
    }
}

/// Owns the single scheduler task.
///
/// Cloned into everything that may need to (re)start the loop, all clones
/// share the same task slot.
#[derive(Clone)]
pub struct SchedulerHandle {
    scheduler: Arc<Scheduler>,
    runtime: Handle,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SchedulerHandle {
    #[must_use]
    pub fn new(scheduler: Scheduler, runtime: Handle) -> Self {
        Self {
            scheduler: Arc::new(scheduler),
            runtime,
            task: Arc::default(),
        }
    }

    /// Spawn the loop unless one is already running.
    /// Returns whether a new loop was started.
    pub fn ensure_started(&self) -> bool {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|task| !task.is_finished()) {
            info!("alarm thread is already running");
            return false;
        }
        *task = Some(self.runtime.spawn(Arc::clone(&self.scheduler).run()));
        info!("started alarm thread");
        true
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}
