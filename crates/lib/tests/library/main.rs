mod common;

mod lifecycle_tests;
mod lock_tests;
mod workflow_tests;
