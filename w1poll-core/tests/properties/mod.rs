//! Property-based tests grouped by module

mod format_tests;
mod parser_tests;
mod reconciler_tests;
mod scheduler_tests;
