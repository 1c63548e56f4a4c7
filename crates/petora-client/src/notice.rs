/// A transient, user-facing notification (a toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: Option<String>,
    pub level: NoticeLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

impl Notice {
    pub fn info(title: impl Into<String>) -> Self {
        Self { title: title.into(), description: None, level: NoticeLevel::Info }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self { title: title.into(), description: None, level: NoticeLevel::Error }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
