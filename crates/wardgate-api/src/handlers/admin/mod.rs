//! Admin console handlers. The interceptor has already checked the
//! permission each route is registered with.

pub mod activity;
pub mod alerts;
pub mod audit;
pub mod users;
