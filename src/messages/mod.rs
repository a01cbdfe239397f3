pub mod storage;
pub mod types;

pub use storage::{Conversation, InterviewHistory};
pub use types::{Message, Sender};
