pub mod extract;
pub mod refresh;

use anyhow::Result;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use restline_core::{LogNotifier, Notification, NotificationSink, RunOrigin};

use crate::config::NotifyConfig;

/// Print a key-value summary table on stderr
pub fn print_summary(title: &str, rows: &[(&str, String)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(title).fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}

/// Publish a success or failure alert for a finished command.
///
/// Delivery problems are logged and never change the command's result.
pub fn notify_outcome(config: &NotifyConfig, workflow_id: &str, task_id: &str, result: &Result<()>) {
    if !config.enabled {
        return;
    }
    let origin = RunOrigin {
        environment: config.environment.clone(),
        workflow_id: workflow_id.to_string(),
        task_id: Some(task_id.to_string()),
        ui_link: config.ui_link.clone(),
    };
    let now = chrono::Utc::now();
    let notification = match result {
        Ok(()) => Notification::success(&origin, now),
        Err(e) => Notification::failure(&origin, &format!("{e:#}"), now),
    };
    if let Err(e) = LogNotifier.publish(&notification) {
        log::warn!("Failed to publish notification: {e}");
    }
}
