//! TaskEvent registry message builders.

use serde_json::Value;

use redfishd_registries::{log_entry, task_event};

fn entry(key: &str, args: &[&str]) -> Value {
    log_entry(&task_event::REGISTRY, key, args).unwrap_or_default()
}

pub fn task_started(task_id: &str) -> Value {
    entry("TaskStarted", &[task_id])
}

pub fn task_completed_ok(task_id: &str) -> Value {
    entry("TaskCompletedOK", &[task_id])
}

pub fn task_completed_warning(task_id: &str) -> Value {
    entry("TaskCompletedWarning", &[task_id])
}

pub fn task_aborted(task_id: &str) -> Value {
    entry("TaskAborted", &[task_id])
}

pub fn task_cancelled(task_id: &str) -> Value {
    entry("TaskCancelled", &[task_id])
}

pub fn task_removed(task_id: &str) -> Value {
    entry("TaskRemoved", &[task_id])
}

pub fn task_paused(task_id: &str) -> Value {
    entry("TaskPaused", &[task_id])
}

pub fn task_resumed(task_id: &str) -> Value {
    entry("TaskResumed", &[task_id])
}

pub fn task_progress_changed(task_id: &str, percent: u64) -> Value {
    entry("TaskProgressChanged", &[task_id, &percent.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use redfishd_registries::find_message;

    #[test]
    fn builders_resolve_and_fill() {
        let msg = task_started("7");
        assert_eq!(msg["Message"], "The task with Id '7' has started.");
        assert!(find_message(msg["MessageId"].as_str().unwrap()).is_some());

        let msg = task_progress_changed("7", 50);
        assert_eq!(
            msg["Message"],
            "The task with Id '7' has changed to progress 50 percent complete."
        );
    }
}
