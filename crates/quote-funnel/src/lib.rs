//! Project calculator funnel for the portfolio site, plus the mail relay that
//! carries captured leads and contact-form messages to the inbox.

pub mod config;
pub mod error;
pub mod funnel;
pub mod relay;
pub mod telemetry;
