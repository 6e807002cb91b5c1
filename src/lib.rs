//! Workspace tooling package. It has no code of its own and exists so
//! `rusty-hook` can install the pre-commit checks configured in Cargo.toml.
