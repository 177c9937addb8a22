#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

pub mod alarm;
/// turning the add/edit form into alarms
pub mod alarm_edit;
/// alarms and api credentials on disk
pub mod config;
pub mod error;
/// sends fired alarms to the OpenShock api
pub mod gateway;
pub mod pages;
/// the alarm loop, re-reads everything from disk every tick
pub mod scheduler;
/// desktop window pointing at the web ui
pub mod shell;
pub mod web;

pub use alarm::{AlarmRecord, EventKind, FiringEvent};
pub use config::{AlarmStore, ConfigDir, CredentialSource, Credentials};
pub use error::{ConfigError, GatewayError, ValidationError};
pub use gateway::{OpenShockGateway, TriggerGateway};
pub use scheduler::{Scheduler, SchedulerHandle, TickReport};
