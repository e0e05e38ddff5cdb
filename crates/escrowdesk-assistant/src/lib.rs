//! EscrowDesk Assistant - booking chat for the lock-payment flow
//!
//! Two interchangeable assistants sit behind [`BookingAssistant`]:
//!
//! - [`DeterministicAssistant`]: keyword heuristics, no network (default)
//! - [`OpenAIAssistant`]: OpenAI chat completions with a booking prompt
//!
//! [`AssistantRouter`] picks one from `USE_AI` and turns any failure into
//! the greeting, so a chat request never errors.

pub mod heuristics;
pub mod providers;
pub mod router;
pub mod types;

pub use providers::*;
pub use router::*;
pub use types::*;
