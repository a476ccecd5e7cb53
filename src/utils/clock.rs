use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Represents an entity responsible for providing the current moment across
/// the application. This can allow it to be used for testing.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Sync + Send + 'static {
    fn now(&self) -> DateTime<Tz>;
}

/// Wall clock pinned to the household timezone from the config.
pub struct DefaultClock {
    timezone: Tz,
}

impl DefaultClock {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }
}

impl Clock for DefaultClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone)
    }
}
