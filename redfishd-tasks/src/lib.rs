//! Long-running operations as Redfish Tasks.
//!
//! A task is created around a completion callback and a signal match rule,
//! then started with a timeout. The out-of-band world drives it: a matching
//! bus signal wakes the callback, which either completes the task or keeps
//! listening (optionally pushing the deadline out); the timer expiring
//! cancels it. Whichever fires first wins; the loser finds the driver gone.
//!
//! Finished tasks stay in a bounded retention deque so clients can read
//! their outcome; eviction prefers the oldest terminal task and only takes
//! a running one when nothing terminal is left.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use http::header::{LOCATION, RETRY_AFTER};
use http::StatusCode;
use serde_json::{json, Value};
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use redfishd_core::request::Request;
use redfishd_core::response::Response;
use redfishd_events::EventService;

pub mod broker;
pub mod messages;

pub use broker::{BusSignal, MatchRule, SignalBroker};

/// Task lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    New,
    Starting,
    Running,
    Pending,
    Suspended,
    Interrupted,
    Stopping,
    Completed,
    Killed,
    Exception,
    Cancelled,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::New => "New",
            TaskState::Starting => "Starting",
            TaskState::Running => "Running",
            TaskState::Pending => "Pending",
            TaskState::Suspended => "Suspended",
            TaskState::Interrupted => "Interrupted",
            TaskState::Stopping => "Stopping",
            TaskState::Completed => "Completed",
            TaskState::Killed => "Killed",
            TaskState::Exception => "Exception",
            TaskState::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Cancelled | TaskState::Exception | TaskState::Killed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Ok,
    Warning,
    Critical,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Ok => "OK",
            TaskStatus::Warning => "Warning",
            TaskStatus::Critical => "Critical",
        }
    }
}

/// The timer fired before a completing signal arrived.
#[derive(Debug, Clone, Copy)]
pub struct TimedOut;

/// What the completion callback decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Terminal: cancel the timer, drop the match, emit the state event.
    Completed,
    /// Keep listening for further signals.
    Continue,
}

/// Completion callback: invoked with each matching signal (or the timeout)
/// and the task itself. The callback updates task state and status; the
/// engine handles the bookkeeping around it.
pub type TaskCallback =
    Box<dyn FnMut(Result<&BusSignal, TimedOut>, &Arc<Task>) -> Disposition + Send>;

/// Replay metadata captured from the request that spawned the task.
#[derive(Debug, Clone)]
pub struct Payload {
    pub target_uri: String,
    pub http_operation: String,
    pub http_headers: Vec<String>,
    pub json_body: Value,
}

impl Payload {
    pub fn from_request(req: &Request) -> Payload {
        const HEADER_WHITELIST: [&str; 7] = [
            "accept",
            "accept-encoding",
            "user-agent",
            "host",
            "connection",
            "content-length",
            "upgrade",
        ];
        let mut http_headers = Vec::new();
        for (name, value) in req.headers() {
            if !HEADER_WHITELIST.contains(&name.as_str()) {
                continue;
            }
            if let Ok(value) = value.to_str() {
                http_headers.push(format!("{name}: {value}"));
            }
        }
        Payload {
            target_uri: req.path().to_string(),
            http_operation: req.verb().as_str().to_string(),
            http_headers,
            json_body: req.json_body().unwrap_or(Value::Null),
        }
    }
}

struct TaskInner {
    state: TaskState,
    status: TaskStatus,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    percent_complete: u8,
    messages: Vec<Value>,
    payload: Option<Payload>,
    gave204: bool,
    started: bool,
    callback: Option<TaskCallback>,
    match_rule: MatchRule,
}

/// One long-running operation.
pub struct Task {
    pub index: u64,
    inner: Mutex<TaskInner>,
    deadline: watch::Sender<Instant>,
    abort: CancellationToken,
    events: Arc<EventService>,
}

impl Task {
    fn new(
        index: u64,
        callback: TaskCallback,
        match_rule: MatchRule,
        events: Arc<EventService>,
    ) -> Task {
        let (deadline, _) = watch::channel(Instant::now() + Duration::from_secs(365 * 24 * 3600));
        Task {
            index,
            inner: Mutex::new(TaskInner {
                state: TaskState::New,
                status: TaskStatus::Ok,
                start_time: Utc::now(),
                end_time: None,
                percent_complete: 0,
                messages: Vec::new(),
                payload: None,
                gave204: false,
                started: false,
                callback: Some(callback),
                match_rule,
            }),
            deadline,
            abort: CancellationToken::new(),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TaskInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn uri(&self) -> String {
        format!("/redfish/v1/TaskService/Tasks/{}", self.index)
    }

    pub fn monitor_uri(&self) -> String {
        format!("/redfish/v1/TaskService/TaskMonitors/{}", self.index)
    }

    pub fn state(&self) -> TaskState {
        self.lock().state
    }

    pub fn set_state(&self, state: TaskState) {
        self.lock().state = state;
    }

    pub fn status(&self) -> TaskStatus {
        self.lock().status
    }

    pub fn set_status(&self, status: TaskStatus) {
        self.lock().status = status;
    }

    pub fn percent_complete(&self) -> u8 {
        self.lock().percent_complete
    }

    pub fn set_percent_complete(&self, percent: u8) {
        self.lock().percent_complete = percent.min(100);
    }

    pub fn add_message(&self, message: Value) {
        self.lock().messages.push(message);
    }

    pub fn task_messages(&self) -> Vec<Value> {
        self.lock().messages.clone()
    }

    pub fn set_payload(&self, payload: Payload) {
        self.lock().payload = Some(payload);
    }

    pub fn payload(&self) -> Option<Payload> {
        self.lock().payload.clone()
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.lock().start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.lock().end_time
    }

    pub fn gave204(&self) -> bool {
        self.lock().gave204
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Stamp the end time; idempotent.
    pub fn finish(&self) {
        let mut inner = self.lock();
        if inner.end_time.is_none() {
            inner.end_time = Some(Utc::now());
        }
    }

    /// Push the timeout out from now. Meaningful only once started.
    pub fn extend_timer(&self, timeout: Duration) {
        let _ = self.deadline.send(Instant::now() + timeout);
    }

    /// First call answers 202 with the minimal task document, the monitor
    /// `Location` and `Retry-After`; once finished, the next call drains the
    /// monitor with a single 204.
    pub fn populate_response(&self, res: &mut Response, retry_after_seconds: u64) {
        let mut inner = self.lock();
        if inner.end_time.is_none() {
            res.set_status(StatusCode::ACCEPTED);
            res.json_value["@odata.id"] = json!(self.uri());
            res.json_value["@odata.type"] = json!("#Task.v1_4_3.Task");
            res.json_value["Id"] = json!(self.index.to_string());
            res.json_value["TaskState"] = json!(inner.state.as_str());
            res.json_value["TaskStatus"] = json!(inner.status.as_str());
            res.set_header(LOCATION, &self.monitor_uri());
            res.set_header(RETRY_AFTER, &retry_after_seconds.to_string());
        } else if !inner.gave204 {
            res.set_status(StatusCode::NO_CONTENT);
            inner.gave204 = true;
        }
    }

    /// Publish the event the current state maps to.
    ///
    /// Starting maps to `TaskResumed`, Running to `TaskStarted`, the paused
    /// family to `TaskPaused`, Stopping to `TaskAborted`, Completed to
    /// `TaskCompletedOK`, Killed to `TaskRemoved`, Exception to
    /// `TaskCompletedWarning`, Cancelled to `TaskCancelled`.
    pub fn send_task_event(&self) {
        let id = self.index.to_string();
        let message = match self.state() {
            TaskState::Starting => messages::task_resumed(&id),
            TaskState::Running => messages::task_started(&id),
            TaskState::Suspended | TaskState::Interrupted | TaskState::Pending => {
                messages::task_paused(&id)
            }
            TaskState::Stopping => messages::task_aborted(&id),
            TaskState::Completed => messages::task_completed_ok(&id),
            TaskState::Killed => messages::task_removed(&id),
            TaskState::Exception => messages::task_completed_warning(&id),
            TaskState::Cancelled => messages::task_cancelled(&id),
            TaskState::New => {
                debug!(index = self.index, "no event to send for task state");
                return;
            }
        };
        self.events.send_event(message, &self.uri(), "Task");
    }

    fn cancel_driver(&self) {
        self.abort.cancel();
    }
}

struct TaskList {
    tasks: VecDeque<Arc<Task>>,
    next_index: u64,
}

/// The task engine: retention deque, signal broker, defaults.
pub struct TaskService {
    list: Mutex<TaskList>,
    events: Arc<EventService>,
    broker: SignalBroker,
    max_tasks: usize,
    default_timeout: Duration,
    retry_after: u64,
}

impl TaskService {
    pub fn new(
        events: Arc<EventService>,
        broker: SignalBroker,
        max_tasks: usize,
        default_timeout: Duration,
        retry_after: u64,
    ) -> TaskService {
        TaskService {
            list: Mutex::new(TaskList {
                tasks: VecDeque::new(),
                next_index: 0,
            }),
            events,
            broker,
            max_tasks,
            default_timeout,
            retry_after,
        }
    }

    fn list(&self) -> MutexGuard<'_, TaskList> {
        self.list.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Allocate a task with the next index. At capacity, the oldest
    /// terminal task is evicted; only when every retained task is still
    /// active does the oldest of them go.
    pub fn create_task(&self, callback: TaskCallback, match_rule: MatchRule) -> Arc<Task> {
        let mut list = self.list();
        if list.tasks.len() >= self.max_tasks {
            let victim = list
                .tasks
                .iter()
                .position(|t| t.is_terminal())
                .unwrap_or(0);
            if let Some(evicted) = list.tasks.remove(victim) {
                debug!(index = evicted.index, "evicting task from retention");
                evicted.cancel_driver();
            }
        }
        let index = list.next_index;
        list.next_index += 1;
        let task = Arc::new(Task::new(
            index,
            callback,
            match_rule,
            self.events.clone(),
        ));
        list.tasks.push_back(task.clone());
        task
    }

    /// Start the task with the service's default timeout.
    pub fn start(&self, task: &Arc<Task>) {
        self.start_with_timeout(task, self.default_timeout);
    }

    /// Arm the timer and subscribe to the broker. Idempotent: a second call
    /// is a no-op.
    pub fn start_with_timeout(&self, task: &Arc<Task>, timeout: Duration) {
        let (callback, rule) = {
            let mut inner = task.lock();
            if inner.started {
                return;
            }
            inner.started = true;
            inner.state = TaskState::Running;
            inner
                .messages
                .push(messages::task_started(&task.index.to_string()));
            (inner.callback.take(), inner.match_rule.clone())
        };
        let _ = task.deadline.send(Instant::now() + timeout);
        task.send_task_event();
        let Some(callback) = callback else {
            warn!(index = task.index, "task has no callback to drive");
            return;
        };
        let signals = self.broker.subscribe();
        tokio::spawn(drive(task.clone(), signals, rule, callback));
    }

    pub fn get(&self, index: u64) -> Option<Arc<Task>> {
        self.list().tasks.iter().find(|t| t.index == index).cloned()
    }

    /// A consistent snapshot of the retention deque, oldest first.
    pub fn snapshot(&self) -> Vec<Arc<Task>> {
        self.list().tasks.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.list().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list().tasks.is_empty()
    }

    pub fn broker(&self) -> SignalBroker {
        self.broker.clone()
    }

    pub fn retry_after(&self) -> u64 {
        self.retry_after
    }
}

fn expire(task: &Arc<Task>, callback: &mut TaskCallback) {
    {
        let mut inner = task.lock();
        inner.state = TaskState::Cancelled;
        inner.status = TaskStatus::Warning;
        inner
            .messages
            .push(messages::task_aborted(&task.index.to_string()));
        if inner.end_time.is_none() {
            inner.end_time = Some(Utc::now());
        }
    }
    task.events.send_event(
        messages::task_aborted(&task.index.to_string()),
        &task.uri(),
        "Task",
    );
    let _ = callback(Err(TimedOut), task);
}

async fn wait_for_deadline(deadline_rx: &mut watch::Receiver<Instant>) {
    loop {
        let deadline = *deadline_rx.borrow_and_update();
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                if *deadline_rx.borrow() == deadline {
                    return;
                }
            }
            _ = deadline_rx.changed() => {}
        }
    }
}

async fn drive(
    task: Arc<Task>,
    mut signals: broadcast::Receiver<BusSignal>,
    rule: MatchRule,
    mut callback: TaskCallback,
) {
    let mut deadline_rx = task.deadline.subscribe();
    let abort = task.abort.clone();
    loop {
        let deadline = *deadline_rx.borrow_and_update();
        tokio::select! {
            _ = abort.cancelled() => return,
            _ = deadline_rx.changed() => continue,
            signal = signals.recv() => match signal {
                Ok(signal) if rule.matches(&signal) => {
                    if callback(Ok(&signal), &task) == Disposition::Completed {
                        task.finish();
                        task.send_task_event();
                        return;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(index = task.index, missed, "task driver lagged behind the broker");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    // The broker is gone; only the timer can end the task.
                    tokio::select! {
                        _ = abort.cancelled() => return,
                        _ = wait_for_deadline(&mut deadline_rx) => {
                            expire(&task, &mut callback);
                            return;
                        }
                    }
                }
            },
            _ = tokio::time::sleep_until(deadline) => {
                // The deadline may have been extended since we read it.
                if *deadline_rx.borrow() != deadline {
                    continue;
                }
                expire(&task, &mut callback);
                return;
            }
        }
    }
}
