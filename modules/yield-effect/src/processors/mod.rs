//! Built-in processors for `PUT`, `CALL`, `FORK` and `JOIN`.

mod call;
mod fork;
mod join;
mod put;

pub use call::CallProcessor;
pub use fork::ForkProcessor;
pub use join::JoinProcessor;
pub use put::PutProcessor;

use crate::effect::{Effect, EffectKind};
use crate::error::EffectError;

/// A built-in processor registered under a kind it does not understand.
fn mismatched(expected: EffectKind, effect: &Effect) -> EffectError {
    EffectError::failure(format!(
        "{expected} processor cannot handle a `{}` effect",
        effect.kind()
    ))
}
