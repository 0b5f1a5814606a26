//! Environment-driven run profiles for property and stress suites.
//!
//! CI raises case counts and operation volumes through environment variables
//! while local runs keep the defaults chosen by each suite.

mod env_override;
pub mod property_test_profile;
pub mod stress_profile;
