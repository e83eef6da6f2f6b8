//! User-visible status messages.

use serde::Serialize;

/// Severity of a notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Progress information.
    Info,
    /// An action finished well.
    Success,
    /// Something the user should look at.
    Warning,
    /// An action failed.
    Error,
}

/// A message shown to the user, in the order it was produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Message text.
    pub text: String,
}

/// Ordered notices produced by one user action.
///
/// Every notice is logged at the matching level as it is recorded.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Notices(Vec<Notice>);

impl Notices {
    /// Empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Record an info notice.
    pub fn info(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Info, text.into());
    }

    /// Record a success notice.
    pub fn success(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Success, text.into());
    }

    /// Record a warning notice.
    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Warning, text.into());
    }

    /// Record an error notice.
    pub fn error(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Error, text.into());
    }

    fn push(&mut self, level: NoticeLevel, text: String) {
        match level {
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!("{text}"),
            NoticeLevel::Warning => tracing::warn!("{text}"),
            NoticeLevel::Error => tracing::error!("{text}"),
        }
        self.0.push(Notice { level, text });
    }

    /// Recorded notices.
    #[must_use]
    pub fn as_slice(&self) -> &[Notice] {
        &self.0
    }

    /// Whether any error was recorded.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.0.iter().any(|n| n.level == NoticeLevel::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notices_keep_order() {
        let mut notices = Notices::new();
        notices.info("one");
        notices.error("two");
        notices.success("three");

        let levels: Vec<NoticeLevel> = notices.as_slice().iter().map(|n| n.level).collect();
        assert_eq!(
            levels,
            vec![NoticeLevel::Info, NoticeLevel::Error, NoticeLevel::Success]
        );
        assert!(notices.has_error());
    }

    #[test]
    fn test_serializes_as_list() {
        let mut notices = Notices::new();
        notices.warning("careful");
        let json = serde_json::to_value(&notices).unwrap_or_default();
        assert_eq!(json[0]["level"], "warning");
        assert_eq!(json[0]["text"], "careful");
    }
}
