//! Integration tests for netmark-router
//!
//! This module contains integration tests for verifying the behavior of
//! the policy routing control plane in realistic scenarios.
//!
//! # Test Organization
//!
//! - `fwmark_lifecycle`: Interface attach/detach sequences and hook setup
//! - `route_editing`: Secondary-table routes, from rules, local routes
//! - `uid_and_exemption`: Uid range bindings and host exemptions
//! - `mark_queries`: Mark lookups answered without data-plane changes
//!
//! # Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test --test integration_tests
//!
//! # Run specific test module
//! cargo test --test integration_tests fwmark
//! ```
//!
//! # Test Requirements
//!
//! All tests drive the control plane through a recording executor and a
//! static registry; none of them touch the host's routing state.

pub mod fwmark_lifecycle;
pub mod mark_queries;
pub mod route_editing;
pub mod uid_and_exemption;
