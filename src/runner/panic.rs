use std::{
    any::Any,
    borrow::Cow,
    panic::{self, AssertUnwindSafe, PanicHookInfo, catch_unwind},
};

use crate::{body::BodyResult, outcome::Failure};

/// Unwinds out of a body or hook when it asks to be skipped.
///
/// Raised with [`panic::resume_unwind`], so the panic hook never sees it.
#[derive(Debug)]
pub(crate) struct SkipSignal(pub Cow<'static, str>);

/// How a body or hook ended when it did not simply succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Interrupt {
    Failed(Failure),
    Skipped(Cow<'static, str>),
}

/// Convert a panic payload into a string.
///
/// This matches the common payload types produced by `panic!` (`&'static str` and `String`).
/// Other payload types are formatted as a generic placeholder.
pub(crate) fn payload_as_string(err: Box<dyn Any + Send + 'static>) -> String {
    err.downcast::<&'static str>()
        .map(|s| s.to_string())
        .or_else(|err| err.downcast::<String>().map(|s| *s))
        .unwrap_or_else(|_| String::from("Box<dyn Any>"))
}

/// Run a body or hook, turning errors, panics and skips into an [`Interrupt`].
pub(crate) fn invoke(f: impl FnOnce() -> BodyResult) -> Result<(), Interrupt> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(BodyResult(Ok(()))) => Ok(()),
        Ok(BodyResult(Err(message))) => Err(Interrupt::Failed(Failure::Error(message))),
        Err(payload) => match payload.downcast::<SkipSignal>() {
            Ok(skip) => Err(Interrupt::Skipped(skip.0)),
            Err(payload) => Err(Interrupt::Failed(Failure::Panicked(payload_as_string(
                payload,
            )))),
        },
    }
}

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Replaces the panic hook for the duration of a run.
///
/// Panics inside bodies are expected and end up in the case results, so the
/// default hook printing them to stderr would only be noise. They are logged
/// at debug level instead. The previous hook is restored on drop.
pub(crate) struct QuietPanicGuard(Option<PanicHook>);

impl QuietPanicGuard {
    pub fn install() -> Self {
        let old_hook = panic::take_hook();

        panic::set_hook(Box::new(|info| {
            let payload = info
                .payload()
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
                .unwrap_or("Box<dyn Any>");
            match info.location() {
                Some(location) => log::debug!(target: "kispec", "panicked at {location}: {payload}"),
                None => log::debug!(target: "kispec", "panicked: {payload}"),
            }
        }));

        Self(Some(old_hook))
    }
}

impl Drop for QuietPanicGuard {
    fn drop(&mut self) {
        if let Some(old_hook) = self.0.take() {
            panic::set_hook(old_hook);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_panics_and_skips() {
        let _guard = QuietPanicGuard::install();

        assert_eq!(invoke(|| BodyResult::from(())), Ok(()));
        assert_eq!(
            invoke(|| BodyResult::from(Err::<(), _>("nope"))),
            Err(Interrupt::Failed(Failure::Error("nope".into())))
        );
        assert_eq!(
            invoke(|| panic!("boom {}", 1)),
            Err(Interrupt::Failed(Failure::Panicked("boom 1".into())))
        );
        assert_eq!(
            invoke(|| panic!("static boom")),
            Err(Interrupt::Failed(Failure::Panicked("static boom".into())))
        );
        assert_eq!(
            invoke(|| panic::resume_unwind(Box::new(SkipSignal("later".into())))),
            Err(Interrupt::Skipped("later".into()))
        );
    }
}
