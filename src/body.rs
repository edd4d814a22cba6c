use std::fmt::Display;

use crate::runner::Context;

/// What a case body or hook returns.
///
/// Bodies may return `()` or any `Result<(), E>` with a displayable error.
/// An `Err` fails the case just like a panic does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyResult(pub Result<(), String>);

impl From<()> for BodyResult {
    fn from(_: ()) -> Self {
        Self(Ok(()))
    }
}

impl<E: Display> From<Result<(), E>> for BodyResult {
    fn from(value: Result<(), E>) -> Self {
        Self(value.map_err(|err| err.to_string()))
    }
}

pub type CaseFn = Box<dyn Fn(&mut Context<'_>) -> BodyResult>;

pub(crate) fn case_fn<F, T>(body: F) -> CaseFn
where
    F: Fn(&mut Context<'_>) -> T + 'static,
    T: Into<BodyResult>,
{
    Box::new(move |ctx| body(ctx).into())
}
