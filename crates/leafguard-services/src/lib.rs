//! LeafGuard services
//!
//! The diagnosis workflow on top of the lower crates: per-session state machine, result
//! presentation, history with graceful degradation, and user notifications.

pub mod history;
pub mod notify;
pub mod presenter;
pub mod session;
pub mod state;

pub use history::HistoryService;
pub use notify::{ChannelNotifier, Notifier, TracingNotifier};
pub use presenter::{ConfidenceBand, ReportBody, ReportView, ResultPresenter, TreatmentView};
pub use session::{DiagnosisSession, SessionState, SubmissionHandle, SubmissionOutcome};
pub use state::{initialize_state, AppState};
