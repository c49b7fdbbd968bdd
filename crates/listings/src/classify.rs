//! Table-driven classification of marketplace HTTP responses.
//!
//! Each marketplace declares a static list of rules. A rule matches on an
//! inclusive status range and, optionally, on one of the marketplace error
//! codes found in the response body. Rules are tried in order; the first
//! match decides the class.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Success,
    RateLimited,
    AuthRejected,
    /// Failure worth retrying (outage, timeout, transient server error).
    Retryable,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRange {
    pub min: u16,
    pub max: u16,
}

impl StatusRange {
    pub const SUCCESS: Self = Self::between(200, 299);
    pub const CLIENT_ERROR: Self = Self::between(400, 499);
    pub const SERVER_ERROR: Self = Self::between(500, 599);

    pub const fn exactly(status: u16) -> Self {
        Self::between(status, status)
    }

    pub const fn between(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, status: u16) -> bool {
        (self.min..=self.max).contains(&status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationRule {
    pub status: StatusRange,
    pub error_code: Option<&'static str>,
    pub class: ResponseClass,
}

impl ClassificationRule {
    pub const fn status(status: StatusRange, class: ResponseClass) -> Self {
        Self {
            status,
            error_code: None,
            class,
        }
    }

    pub const fn code(status: StatusRange, error_code: &'static str, class: ResponseClass) -> Self {
        Self {
            status,
            error_code: Some(error_code),
            class,
        }
    }

    fn matches<S: AsRef<str>>(&self, status: u16, error_codes: &[S]) -> bool {
        self.status.contains(status)
            && self
                .error_code
                .is_none_or(|wanted| error_codes.iter().any(|c| c.as_ref() == wanted))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClassificationTable {
    rules: &'static [ClassificationRule],
    fallback: ResponseClass,
}

impl ClassificationTable {
    pub const fn new(rules: &'static [ClassificationRule], fallback: ResponseClass) -> Self {
        Self { rules, fallback }
    }

    pub fn classify<S: AsRef<str>>(&self, status: u16, error_codes: &[S]) -> ResponseClass {
        self.rules
            .iter()
            .find(|rule| rule.matches(status, error_codes))
            .map_or(self.fallback, |rule| rule.class)
    }
}
