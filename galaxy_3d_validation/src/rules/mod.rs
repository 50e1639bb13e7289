/// Rule model, rule families and the catalog

pub mod catalog;
pub mod rule;

mod buffer_rules;
mod command_rules;
mod conditional_rules;
mod copy_rules;
mod descriptor_rules;
mod draw_rules;
mod support;
mod transfer_rules;
mod view_rules;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::RuleCatalog;
pub use command_rules::MULTIPLE_THREADS_WRITE;
pub use rule::{Check, CheckFn, Env, Finding, Operand, Operands, Rule};
pub use transfer_rules::MAX_UPDATE_DATA_SIZE;
