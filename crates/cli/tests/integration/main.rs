
mod apply_tests;
mod doctor_tests;
mod snapshot_tests;
