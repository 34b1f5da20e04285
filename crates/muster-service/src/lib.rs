//! Service layer: authentication, scope resolution, event and series
//! creation, instance materialization and the volunteer mutations, all
//! expressed against the database crate.

pub mod auth;
pub mod error;
pub mod event;
pub mod generation;
pub mod instance;
pub mod overlay;
pub mod scope;
pub mod volunteer;
pub mod volunteer_group;
