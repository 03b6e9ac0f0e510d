use std::{collections::VecDeque, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub body: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            f.write_str(&self.title)
        } else {
            write!(f, "{}: {}", self.title, self.body)
        }
    }
}

/// Messages for the user, oldest first. Presentation is up to the front end.
#[derive(Debug, Default)]
pub struct Notifications(VecDeque<Notification>);

impl Notifications {
    pub fn push(&mut self, level: Level, title: impl Into<String>, body: impl Into<String>) {
        let notification = Notification {
            level,
            title: title.into(),
            body: body.into(),
        };
        match level {
            Level::Info => log::debug!("Notify {notification}"),
            Level::Warning | Level::Error => log::info!("Notify {notification}"),
        }
        self.0.push_back(notification);
    }

    pub fn info(&mut self, title: impl Into<String>, body: impl Into<String>) {
        self.push(Level::Info, title, body);
    }

    pub fn warn(&mut self, title: impl Into<String>, body: impl Into<String>) {
        self.push(Level::Warning, title, body);
    }

    pub fn error(&mut self, title: impl Into<String>, body: impl Into<String>) {
        self.push(Level::Error, title, body);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Notification> + '_ {
        self.0.drain(..)
    }

    pub fn last(&self) -> Option<&Notification> {
        self.0.back()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
