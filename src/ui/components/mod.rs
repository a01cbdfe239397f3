//! UI components for the interview assistant

mod history_sidebar;
mod input_bar;
mod message_list;

pub use history_sidebar::HistorySidebar;
pub use input_bar::InputBar;
pub use message_list::MessageList;
