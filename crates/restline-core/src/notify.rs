//! Run outcome notifications: message formatting and the delivery boundary

use chrono::{DateTime, Utc};

/// Where a run happened, for the notification body
#[derive(Debug, Clone, Default)]
pub struct RunOrigin {
    pub environment: String,
    pub workflow_id: String,
    pub task_id: Option<String>,
    pub ui_link: String,
}

/// A formatted subject + Markdown body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub message: String,
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl Notification {
    pub fn success(origin: &RunOrigin, at: DateTime<Utc>) -> Self {
        let subject = format!("✔️Success Alert! for \"{}\"", origin.workflow_id);
        let message = format!(
            "**{subject}**\n\n\
             **Environment:** {env}\n\n\
             **Execution Time:** {ts} UTC\n\n\
             **Workflow Details:**\n\n\
             \x20 - Workflow ID: **{wf}**\n\n\
             **More Info:** [Operator UI]({link})",
            env = origin.environment,
            ts = at.format(TIMESTAMP_FORMAT),
            wf = origin.workflow_id,
            link = origin.ui_link,
        );
        Self { subject, message }
    }

    pub fn failure(origin: &RunOrigin, error: &str, at: DateTime<Utc>) -> Self {
        let subject = format!("❌Failure Alert! for \"{}\"", origin.workflow_id);
        let task = origin.task_id.as_deref().unwrap_or("-");
        let message = format!(
            "**{subject}**\n\n\
             **Environment:** {env}\n\n\
             **Error message:** {error}\n\n\
             **Execution Time:** {ts} UTC\n\n\
             **Workflow Details:**\n\n\
             \x20 - Workflow ID: **{wf}**\n\n\
             \x20 - Task ID: **{task}**\n\n\
             **Error Logs:** [Operator UI]({link})",
            env = origin.environment,
            ts = at.format(TIMESTAMP_FORMAT),
            wf = origin.workflow_id,
            link = origin.ui_link,
        );
        Self { subject, message }
    }
}

/// Delivery boundary for notifications (topic publishing lives elsewhere)
pub trait NotificationSink {
    fn publish(&self, notification: &Notification) -> std::io::Result<()>;
}

/// Publishes by logging; the default when no external notifier is wired in
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn publish(&self, notification: &Notification) -> std::io::Result<()> {
        log::info!("notification: {}", notification.subject);
        for line in notification.message.lines().filter(|l| !l.is_empty()) {
            log::info!("  {line}");
        }
        Ok(())
    }
}
