//! Plugins shipped with the engine.

/// Helper-backed plugin: every role delegates to a helper script.
pub mod script;

/// Direct-completion plugin used for exercising the stack without any
/// distribution tooling installed.
pub mod test;
