// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    ConversationSummary, Interaction, InteractionOutcome, InteractionState, Message, Notification,
    NotificationKind, Page, Report, Signal,
};
pub use requests::{ConversationQuery, ReportRequest, SendMessageRequest};
pub use responses::{
    AckResponse, ErrorResponse, HealthResponse, InteractionResponse, ReportResponse, UserListResponse,
};
