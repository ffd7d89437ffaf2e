//! Shared utilities: hashing and filesystem helpers.

pub mod fs;
pub mod hash;

#[cfg(test)]
pub mod testutil;
