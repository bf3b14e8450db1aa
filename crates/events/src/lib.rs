//! Notification rendering and delivery for alert context payloads.
//!
//! A [`NotificationRegistry`] holds one [`NotificationSender`] per enabled
//! channel and a [`TemplateRenderer`] shared by all of them.

pub mod config;
pub mod delivery;
pub mod registry;
pub mod render;

pub use config::ChannelsConfig;
pub use delivery::{DeliveryError, NotificationSender};
pub use registry::{NotificationRegistry, RegistryError};
pub use render::{HandlebarsRenderer, TemplateError, TemplateRenderer};
