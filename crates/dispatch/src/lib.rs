//! C3 Channel Resolver + C5 Fan-out Dispatcher: turns a subscription's
//! selectors into concrete delivery endpoints and drives the notifier
//! registry against them with per-target error isolation.

mod dispatcher;
mod fallback;
mod resolver;

pub use dispatcher::{
    CreateIntegrationInput, DeliveryStatus, Dispatcher, EventReport, SubscriberDetail, SubscriptionReport,
    TestOutcome,
};
pub use fallback::{FallbackConfig, SmtpProfile};
pub use resolver::{fallback_endpoint, resolve, resolve_from, Endpoint};
