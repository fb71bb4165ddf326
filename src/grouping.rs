//! Day grouping and sender-header clustering for an ordered message list.

use chrono::{NaiveDate, TimeZone};

use crate::models::{CurrentUser, Message};

/// Gap after which the same sender gets a fresh header.
pub const SENDER_CLUSTER_WINDOW_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedMessage<'a> {
    pub message: &'a Message,
    /// Name/avatar header above this message
    pub show_sender: bool,
    /// Authored by the current user (right-aligned, never headed)
    pub is_own: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup<'a> {
    pub day: NaiveDate,
    pub messages: Vec<GroupedMessage<'a>>,
}

/// Header rule for `message` given the previous message of the same day
/// group. Own messages never get a header.
pub fn shows_sender_header(
    previous: Option<&Message>,
    message: &Message,
    current_user: &CurrentUser,
) -> bool {
    if current_user.is(&message.sender) {
        return false;
    }

    match previous {
        None => true,
        Some(prev) => {
            prev.sender.id != message.sender.id
                || (message.created_at - prev.created_at).num_milliseconds()
                    > SENDER_CLUSTER_WINDOW_MS
        }
    }
}

/// Splits `messages` into calendar days in `tz`, keeping input order.
/// The input is expected oldest-first and is not re-sorted.
pub fn group_by_day<'a, Tz, I>(messages: I, current_user: &CurrentUser, tz: &Tz) -> Vec<DayGroup<'a>>
where
    Tz: TimeZone,
    I: IntoIterator<Item = &'a Message>,
{
    let mut groups: Vec<DayGroup<'a>> = Vec::new();
    let mut previous: Option<&'a Message> = None;

    for message in messages {
        let day = message.created_at.with_timezone(tz).date_naive();

        if groups.last().map(|g| g.day) != Some(day) {
            groups.push(DayGroup {
                day,
                messages: Vec::new(),
            });
            previous = None;
        }

        let show_sender = shows_sender_header(previous, message, current_user);
        if let Some(group) = groups.last_mut() {
            group.messages.push(GroupedMessage {
                message,
                show_sender,
                is_own: current_user.is(&message.sender),
            });
        }
        previous = Some(message);
    }

    groups
}
