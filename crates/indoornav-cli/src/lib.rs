//! indoornav CLI library.
//!
//! Output rendering, terminal styling and argument parsing helpers used by
//! the `indoornav-cli` binary.

pub mod output;
pub mod readings;
pub mod terminal;

#[cfg(test)]
pub(crate) mod test_helpers;
