pub mod conversation_detail;
pub mod conversation_list;
pub mod pinned_panel;

pub use conversation_detail::{ConversationDetail, Phase, SubmitOutcome};
pub use conversation_list::{ConversationList, ConversationRow, RefreshSignal};
pub use pinned_panel::PinnedPanel;
