mod helpers;
mod money;

pub mod op;
mod secret;

pub use helpers::parse_boolean_flag;
pub use money::{Reais, ReaisConversionError, BRL_CURRENCY_CODE, BRL_CURRENCY_CODE_LOWER};
pub use secret::Secret;
