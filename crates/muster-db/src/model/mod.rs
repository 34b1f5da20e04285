pub mod event;
pub mod exception;
pub mod instance;
pub mod membership;
pub mod organization;
pub mod recurrence_rule;
pub mod user;
pub mod volunteer;
pub mod volunteer_group;
