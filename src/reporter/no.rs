use crate::reporter::Reporter;

/// A [`Reporter`] that ignores every notification.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoReporter;

impl Reporter for NoReporter {}
