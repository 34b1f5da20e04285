pub mod actor;
pub mod event;
pub mod exception;
pub mod instance;
pub mod membership;
pub mod rule;
pub mod volunteer;
pub mod volunteer_group;

#[cfg(test)]
mod builder_tests;
