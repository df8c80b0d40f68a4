//! 通知シンク
//!
//! 重要度とメッセージを受け取るだけの出力先。表示方法（トースト・端末出力）は実装側が決める。

use crate::config::Config;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl Severity {
    fn icon(&self) -> &'static str {
        match self {
            Severity::Success => "✔",
            Severity::Info => "ℹ",
            Severity::Warning => "⚠",
            Severity::Error => "✖",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Success => "success",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(name)
    }
}

/// 自動で消えるまでの時間（成功・情報 / 警告・エラー）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToastDurations {
    pub success: Duration,
    pub error: Duration,
}

impl Default for ToastDurations {
    fn default() -> Self {
        Self {
            success: Duration::from_millis(3000),
            error: Duration::from_millis(5000),
        }
    }
}

impl ToastDurations {
    pub fn from_config(config: &Config) -> Self {
        Self {
            success: Duration::from_millis(config.toast_success_ms),
            error: Duration::from_millis(config.toast_error_ms),
        }
    }

    pub fn for_severity(&self, severity: Severity) -> Duration {
        match severity {
            Severity::Success | Severity::Info => self.success,
            Severity::Warning | Severity::Error => self.error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    pub dismiss_after: Duration,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);

    fn success(&self, message: &str) {
        self.notify(Severity::Success, message);
    }

    fn info(&self, message: &str) {
        self.notify(Severity::Info, message);
    }

    fn error(&self, message: &str) {
        self.notify(Severity::Error, message);
    }
}

/// 端末に出力する通知
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier {
    durations: ToastDurations,
}

impl ConsoleNotifier {
    pub fn new(durations: ToastDurations) -> Self {
        Self { durations }
    }

    pub fn build(&self, severity: Severity, message: &str) -> Notification {
        Notification {
            severity,
            message: message.to_string(),
            dismiss_after: self.durations.for_severity(severity),
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        let notification = self.build(severity, message);
        tracing::debug!(
            severity = %notification.severity,
            dismiss_ms = notification.dismiss_after.as_millis() as u64,
            "notification"
        );
        eprintln!("{} {}", severity.icon(), notification.message);
    }
}
