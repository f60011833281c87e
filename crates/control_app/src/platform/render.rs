use control_core::{AppViewModel, ConnectionState, LogEntry, LogKind, PreconditionViolation};

/// Turns successive view snapshots into terminal lines, printing each change once.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    printed_logs: usize,
    connection: Option<ConnectionState>,
    rejection: Option<PreconditionViolation>,
    poll_failures: u32,
}

impl TerminalRenderer {
    pub fn render(&mut self, view: &AppViewModel) -> Vec<String> {
        let mut lines = Vec::new();

        if self.connection != Some(view.connection) {
            self.connection = Some(view.connection);
            lines.push(connection_line(view.connection));
        }

        if view.last_rejection != self.rejection {
            if let Some(violation) = &view.last_rejection {
                lines.push(format!("Not submitted: {violation}"));
            }
            self.rejection = view.last_rejection.clone();
        }

        // A new run starts from an empty log.
        if view.logs.len() < self.printed_logs {
            self.printed_logs = 0;
        }
        lines.extend(view.logs[self.printed_logs..].iter().map(log_line));
        self.printed_logs = view.logs.len();

        if view.poll_failures > self.poll_failures {
            lines.push(format!(
                "Status check failed, retrying ({} in a row)",
                view.poll_failures
            ));
        }
        self.poll_failures = view.poll_failures;

        lines
    }
}

fn connection_line(connection: ConnectionState) -> String {
    match (connection.connected, connection.driver_initialized) {
        (false, _) => "Backend: disconnected".to_string(),
        (true, true) => "Backend: connected, driver ready".to_string(),
        (true, false) => "Backend: connected, driver not initialized".to_string(),
    }
}

fn log_line(entry: &LogEntry) -> String {
    let tag = match entry.kind {
        LogKind::Info => "INFO",
        LogKind::Success => "OK",
        LogKind::Error => "ERROR",
    };
    format!(
        "[{}] {:<5} {}",
        entry.timestamp.format("%H:%M:%S"),
        tag,
        entry.message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use pretty_assertions::assert_eq;

    fn at(secs: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(10, 0, secs).unwrap()
    }

    fn connected() -> ConnectionState {
        ConnectionState {
            connected: true,
            driver_initialized: true,
        }
    }

    #[test]
    fn prints_only_new_log_entries() {
        let mut renderer = TerminalRenderer::default();
        let mut view = AppViewModel {
            connection: connected(),
            logs: vec![LogEntry::info("Search task started...", at(1))],
            ..AppViewModel::default()
        };
        assert_eq!(
            renderer.render(&view),
            vec![
                "Backend: connected, driver ready".to_string(),
                "[10:00:01] INFO  Search task started...".to_string(),
            ]
        );

        view.logs.push(LogEntry::success("Task completed successfully!", at(5)));
        assert_eq!(
            renderer.render(&view),
            vec!["[10:00:05] OK    Task completed successfully!".to_string()]
        );
        assert!(renderer.render(&view).is_empty());
    }

    #[test]
    fn cleared_log_starts_over() {
        let mut renderer = TerminalRenderer::default();
        let view = AppViewModel {
            logs: vec![
                LogEntry::info("one", at(1)),
                LogEntry::info("two", at(2)),
            ],
            ..AppViewModel::default()
        };
        renderer.render(&view);

        let fresh = AppViewModel {
            logs: vec![LogEntry::error("Error: boom", at(3))],
            ..AppViewModel::default()
        };
        assert_eq!(
            renderer.render(&fresh),
            vec!["[10:00:03] ERROR Error: boom".to_string()]
        );
    }

    #[test]
    fn reports_rejection_and_disconnect() {
        let mut renderer = TerminalRenderer::default();
        let view = AppViewModel {
            last_rejection: Some(PreconditionViolation::EmptyKeyword),
            ..AppViewModel::default()
        };
        let lines = renderer.render(&view);
        assert_eq!(lines[0], "Backend: disconnected");
        assert_eq!(
            lines[1],
            format!("Not submitted: {}", PreconditionViolation::EmptyKeyword)
        );
    }
}
