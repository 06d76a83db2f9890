pub mod interceptor;

pub use interceptor::{ApprovalPrompt, SafetyInterceptor};
