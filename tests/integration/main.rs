//! Integration test modules.

mod sensor_mock;
mod session_actor_test;
mod session_store_test;
