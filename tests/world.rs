/*!
 * Process group tests entry point
 */

#[path = "world/remote_reference_test.rs"]
mod remote_reference_test;

#[path = "world/loopback_test.rs"]
mod loopback_test;
