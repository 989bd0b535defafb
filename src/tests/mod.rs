//! Cross-module scenario tests.
//!
//! Leaf modules carry their own unit tests; the tests here exercise whole
//! scheduling scenarios by driving the tick handler directly against a
//! host-platform kernel.
