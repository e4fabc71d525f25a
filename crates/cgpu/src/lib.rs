//! cgpu library target - exposes the command handlers for tests.

pub mod commands;
