//! Command-line driver over the client library.
//!
//! Separates argument handling and output formatting from `main`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, TimeZone};

use crate::composer::Composer;
use crate::config::Config;
use crate::controllers::{ConversationDetail, ConversationList, Phase, SubmitOutcome};
use crate::error::{AppError, AppResult};
use crate::grouping::DayGroup;
use crate::models::{ConversationId, FileUpload, Message, OrganizationId, PinnedMessage};
use crate::services::{HttpMessagingApi, MessagingApi};

const USAGE: &str = "usage: messaging-client <command>

commands:
  conversations                              list conversations
  messages <conversation_id> [--all]         show the timeline (--all loads every page)
  send <conversation_id> <text...> [--file <path>]...
  pinned <conversation_id>                   show pinned messages
  users <organization_id>                    list organization members";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Conversations,
    Messages {
        conversation_id: ConversationId,
        all: bool,
    },
    Send {
        conversation_id: ConversationId,
        text: String,
        files: Vec<PathBuf>,
    },
    Pinned {
        conversation_id: ConversationId,
    },
    Users {
        organization_id: OrganizationId,
    },
    Help,
}

fn parse_id(value: Option<&String>, what: &str) -> AppResult<i64> {
    value
        .ok_or_else(|| AppError::Config(format!("missing {what}\n\n{USAGE}")))?
        .parse()
        .map_err(|_| AppError::Config(format!("{what} must be an integer")))
}

pub fn parse_args(args: &[String]) -> AppResult<Command> {
    let mut iter = args.iter();

    match iter.next().map(String::as_str) {
        None | Some("help") | Some("--help") | Some("-h") => Ok(Command::Help),
        Some("conversations") => Ok(Command::Conversations),
        Some("messages") => {
            let conversation_id = parse_id(iter.next(), "conversation_id")?;
            let all = iter.any(|a| a == "--all");
            Ok(Command::Messages {
                conversation_id,
                all,
            })
        }
        Some("send") => {
            let conversation_id = parse_id(iter.next(), "conversation_id")?;
            let mut words = Vec::new();
            let mut files = Vec::new();
            while let Some(arg) = iter.next() {
                if arg == "--file" {
                    let path = iter
                        .next()
                        .ok_or_else(|| AppError::Config("--file needs a path".into()))?;
                    files.push(PathBuf::from(path));
                } else {
                    words.push(arg.as_str());
                }
            }
            Ok(Command::Send {
                conversation_id,
                text: words.join(" "),
                files,
            })
        }
        Some("pinned") => Ok(Command::Pinned {
            conversation_id: parse_id(iter.next(), "conversation_id")?,
        }),
        Some("users") => Ok(Command::Users {
            organization_id: parse_id(iter.next(), "organization_id")?,
        }),
        Some(other) => Err(AppError::Config(format!("unknown command {other}\n\n{USAGE}"))),
    }
}

pub fn usage() -> &'static str {
    USAGE
}

pub async fn run(command: Command, config: &Config) -> AppResult<()> {
    if command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    let api: Arc<dyn MessagingApi> = Arc::new(HttpMessagingApi::from_config(config)?);
    let current_user = config.current_user();
    let mut list = ConversationList::new(Arc::clone(&api), current_user.clone());
    let mut detail = ConversationDetail::new(Arc::clone(&api), current_user)
        .with_list_refresh(list.refresh_signal())
        .with_typing_expiry(config.typing_expiry);

    match command {
        Command::Help => {}
        Command::Conversations => {
            list.refresh().await;
            if list.is_empty_state() {
                println!("No conversations yet");
            }
            for row in list.rows() {
                let marker = if row.unread {
                    format!(" ({} unread)", row.unread_count)
                } else {
                    String::new()
                };
                println!("#{} {}{}", row.id, row.title, marker);
                if let Some(preview) = row.preview {
                    println!("    {}", preview.lines().next().unwrap_or_default());
                }
            }
        }
        Command::Messages {
            conversation_id,
            all,
        } => {
            open_or_report(&mut detail, conversation_id).await?;
            if all {
                while detail.load_more().await? {}
            }
            let groups = detail.grouped(&Local);
            print!("{}", render_groups(&groups, &Local));
            if detail.can_load_more() {
                println!("(older messages available: pass --all)");
            }
        }
        Command::Send {
            conversation_id,
            text,
            files,
        } => {
            open_or_report(&mut detail, conversation_id).await?;
            let mut composer = Composer::new();
            composer.set_text(text);
            for path in files {
                let bytes = tokio::fs::read(&path).await.map_err(|e| {
                    AppError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "attachment".to_string());
                composer.attach(FileUpload::new(name, bytes));
            }

            match detail.submit(&mut composer).await? {
                SubmitOutcome::Blocked => println!("Nothing to send"),
                SubmitOutcome::Sent(id) => println!("Sent message #{id}"),
            }
        }
        Command::Pinned { conversation_id } => {
            open_or_report(&mut detail, conversation_id).await?;
            if detail.pinned().is_empty() {
                println!("No pinned messages");
            }
            for pinned in detail.pinned().items() {
                println!("{}", render_pinned(pinned, &Local));
            }
        }
        Command::Users { organization_id } => {
            for member in list.organization_users(organization_id).await? {
                match member.email {
                    Some(email) => println!("#{} {} <{}>", member.user.id, member.user.display_name(), email),
                    None => println!("#{} {}", member.user.id, member.user.display_name()),
                }
            }
        }
    }

    // Let mark-read requests land before the process exits.
    detail.settle().await;
    list.refresh_if_requested().await;
    if !list.conversations().is_empty() {
        println!("{} conversation(s) with unread messages", list.unread_conversations());
    }
    Ok(())
}

async fn open_or_report(detail: &mut ConversationDetail, id: ConversationId) -> AppResult<()> {
    detail.open(id).await?;
    if detail.phase() == Phase::NotFound {
        return Err(AppError::NotFound);
    }
    Ok(())
}

fn reactions_summary(message: &Message) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for reaction in &message.reactions {
        *counts.entry(reaction.reaction.as_str()).or_default() += 1;
    }
    if counts.is_empty() {
        return None;
    }
    Some(
        counts
            .into_iter()
            .map(|(symbol, n)| format!("{symbol} {n}"))
            .collect::<Vec<_>>()
            .join("  "),
    )
}

/// Plain-text rendering of a grouped timeline.
pub fn render_groups<Tz: TimeZone>(groups: &[DayGroup<'_>], tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();

    for group in groups {
        out.push_str(&format!("=== {} ===\n", group.day.format("%a, %-d %b %Y")));
        for item in &group.messages {
            let message = item.message;
            if item.show_sender {
                out.push_str(&format!(
                    "{}  {}\n",
                    message.sender.display_name(),
                    message.created_at.with_timezone(tz).format("%H:%M")
                ));
            }

            let prefix = if item.is_own { "  > " } else { "  " };
            let pinned = if message.pinned() { " [pinned]" } else { "" };
            let edited = if message.edited_at.is_some() { " (edited)" } else { "" };
            for (i, line) in message.content.lines().enumerate() {
                if i == 0 {
                    out.push_str(&format!("{prefix}{line}{edited}{pinned}\n"));
                } else {
                    out.push_str(&format!("{prefix}{line}\n"));
                }
            }
            if message.content.is_empty() && !pinned.is_empty() {
                out.push_str(&format!("{prefix}{pinned}\n"));
            }
            for attachment in &message.attachments {
                out.push_str(&format!("{prefix}  [file] {}\n", attachment.file_name));
            }
            if let Some(summary) = reactions_summary(message) {
                out.push_str(&format!("{prefix}  {summary}\n"));
            }
        }
    }

    out
}

fn render_pinned<Tz: TimeZone>(pinned: &PinnedMessage, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "#{} {}: {}  (pinned by {} on {})",
        pinned.message.id,
        pinned.message.sender.display_name(),
        pinned.message.content.lines().next().unwrap_or_default(),
        pinned.pinned_by.display_name(),
        pinned.pinned_at.with_timezone(tz).format("%Y-%m-%d %H:%M")
    )
}
