//! Client side of the location agent: session lookup, the query request
//! lifecycle, and the HTTP call to the agent service.

pub mod config;
pub mod controller;
pub mod endpoint;
pub mod session;

pub use config::{load_settings, Settings, SettingsError};
pub use controller::{
    ControllerEvent, ControllerState, QueryController, SkipReason, SubmissionStatus,
    SubmitOutcome,
};
pub use endpoint::{AgentEndpoint, HttpAgentEndpoint};
pub use session::{SessionHandle, SessionProvider};
