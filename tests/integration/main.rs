//! End-to-end tests: the full router over in-memory stores and a manual clock.

mod helpers;

mod admin_test;
mod auth_test;
mod rbac_test;
mod session_test;
