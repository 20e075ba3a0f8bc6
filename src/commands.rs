//! One-shot CLI commands (print to stdout).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::api::{ChatBackend, HttpBackend};
use crate::config::Config;
use crate::messaging::attachments::{self, AttachmentKind, SelectedFile};
use crate::messaging::{composer, deliver, sync, Messenger};
use crate::models::{Conversation, ConversationId, Message, Role};

/// Backend plus a messenger with the directory loaded.
async fn connect() -> Result<(Arc<HttpBackend>, Messenger<HttpBackend>)> {
    let config = Config::load()?;
    let operator = config.operator()?.clone();
    let backend = HttpBackend::from_config(&config)?;
    let mut messenger = Messenger::new(Arc::clone(&backend), operator, config.timing.clone());
    messenger
        .load_directory_now()
        .await
        .context("Failed to load conversations")?;
    Ok((backend, messenger))
}

fn lookup(messenger: &Messenger<HttpBackend>, arg: &str) -> Result<Conversation> {
    messenger
        .lookup(&ConversationId::parse(arg))
        .with_context(|| format!("Unknown conversation '{}'. See `staff-chat conversations`.", arg))
}

pub fn configure(
    server: Option<String>,
    token: Option<String>,
    id: Option<String>,
    name: Option<String>,
    role: Option<String>,
) -> Result<()> {
    let role = role.map(|r| r.parse::<Role>()).transpose()?;
    let mut config = Config::load()?;
    config.update(server, token, id, name, role);
    config.save()?;
    println!("Configuration saved to {}", Config::config_path()?.display());
    Ok(())
}

pub fn status() -> Result<()> {
    let config = Config::load()?;
    println!("Config:   {}", Config::config_path()?.display());
    println!(
        "Server:   {}",
        config.server_url.as_deref().unwrap_or("(not set)")
    );
    match config.api_token.as_deref() {
        Some(t) if !t.is_empty() => println!("Token:    present ({} chars)", t.len()),
        _ => println!("Token:    none"),
    }
    match config.operator.as_ref() {
        Some(op) => println!("Operator: {} (id {}, {})", op.name, op.id, op.role.as_str()),
        None => println!("Operator: (not set)"),
    }
    println!(
        "Timing:   sync every {}ms, read receipts every {}ms",
        config.timing.poll_interval_ms, config.timing.read_interval_ms
    );
    Ok(())
}

pub async fn list_conversations(unread: bool, search: Option<String>, groups: bool) -> Result<()> {
    let (_, mut messenger) = connect().await?;
    messenger.set_unread_only(unread);
    if let Some(term) = search {
        messenger.set_search_now(term);
    }

    let list = if groups {
        messenger.group_conversations()
    } else {
        messenger.combined_conversations()
    };

    println!("\n{}:", if groups { "Groups" } else { "Conversations" });
    println!("{:-<60}", "");

    if list.is_empty() {
        println!("  (no conversations found)");
        return Ok(());
    }

    for conv in list {
        print_conversation(conv);
    }
    Ok(())
}

fn print_conversation(conv: &Conversation) {
    let badge = if conv.unread_count > 0 {
        format!("  ({} unread)", conv.unread_count)
    } else {
        String::new()
    };
    let kind = if conv.is_group() { "group" } else { "private" };
    println!("{} [{}]{}", conv.display_name, kind, badge);
    println!("  ID: {}", conv.id);
    match &conv.last_message {
        Some(last) => {
            if let Some(ref time) = last.timestamp {
                println!("  Last: {}", time);
            }
            if let Some(ref preview) = last.content {
                if !preview.trim().is_empty() {
                    let sender = last.sender_name.as_deref().unwrap_or("?");
                    println!("  [{}]: {}", sender, preview.trim());
                }
            }
        }
        None if conv.id.is_virtual() => println!("  (no messages yet)"),
        None => {}
    }
    println!();
}

pub async fn read_messages(conversation: &str, limit: usize) -> Result<()> {
    let (backend, messenger) = connect().await?;
    let conv = lookup(&messenger, conversation)?;

    let Some(id) = conv.id.persisted() else {
        println!("(no messages yet with {})", conv.display_name);
        return Ok(());
    };
    let messages = sync::dedup_by_id(backend.list_messages(id).await?);

    if messages.is_empty() {
        println!("(no messages)");
        return Ok(());
    }

    let skip = messages.len().saturating_sub(limit);
    for msg in &messages[skip..] {
        print_message(msg);
    }
    Ok(())
}

fn print_message(msg: &Message) {
    println!("[{}] {} ({}): {}", msg.timestamp, msg.sender_name, msg.id, msg.text());
    for (i, att) in msg.attachments.iter().enumerate() {
        println!(
            "    #{} {} [{}, {}]",
            i,
            att.name,
            AttachmentKind::of(&att.media_type).label(),
            attachments::human_size(att.size)
        );
    }
}

pub async fn send_message(to: &str, attach: Vec<PathBuf>, message: Option<String>) -> Result<()> {
    let (backend, messenger) = connect().await?;
    let conv = lookup(&messenger, to)?;

    let files = attach
        .iter()
        .map(|p| SelectedFile::from_path(p))
        .collect::<Result<Vec<_>>>()?;
    let selected = files.len();
    let accepted = attachments::accept(files);
    if let Some(err) = accepted.oversized.first() {
        bail!("{}", err);
    }
    if accepted.files.len() < selected {
        eprintln!(
            "Skipped {} attachment(s) of an unsupported type",
            selected - accepted.files.len()
        );
    }

    let text = message.unwrap_or_default();
    let Some(outgoing) = composer::build_outgoing(&text, &accepted.files) else {
        bail!("Nothing to send: give a message or at least one attachment");
    };

    deliver(backend.as_ref(), messenger.operator(), &conv, &outgoing).await?;
    println!("Message sent to {}.", conv.display_name);
    Ok(())
}

pub async fn download(
    conversation: &str,
    message_id: &str,
    index: Option<usize>,
    out: Option<PathBuf>,
) -> Result<()> {
    let (backend, messenger) = connect().await?;
    let conv = lookup(&messenger, conversation)?;
    let id = conv
        .id
        .persisted()
        .context("Conversation has no messages yet")?;

    let messages = backend.list_messages(id).await?;
    let msg = messages
        .iter()
        .find(|m| m.id.as_str() == message_id)
        .with_context(|| format!("Message {} not found in {}", message_id, conv.display_name))?;
    if msg.attachments.is_empty() {
        bail!("Message {} has no attachments", message_id);
    }

    let dir = out.unwrap_or_else(Config::download_dir);
    let selected: Vec<_> = match index {
        Some(i) => vec![msg
            .attachments
            .get(i)
            .with_context(|| format!("Message has {} attachment(s)", msg.attachments.len()))?],
        None => msg.attachments.iter().collect(),
    };
    for att in selected {
        let path = attachments::save(att, &dir)?;
        println!("Saved {}", path.display());
    }
    Ok(())
}

pub async fn list_groups() -> Result<()> {
    let (_, messenger) = connect().await?;
    let groups = messenger.directory().groups();

    println!("\nGroups:");
    println!("{:-<60}", "");
    if groups.is_empty() {
        println!("  (no groups found)");
        return Ok(());
    }
    for group in groups {
        println!("{}", group.name);
        println!("  ID: {}", group.id);
        println!("  Members: {}", group.member_ids.len());
    }
    Ok(())
}

pub async fn create_group(name: &str, members: Vec<String>) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Group name cannot be empty");
    }
    let (backend, messenger) = connect().await?;
    let group = backend
        .create_group(name.trim(), &messenger.operator().id, &members)
        .await
        .context("Failed to create group")?;
    println!("Created group {} (ID: {})", group.name, group.id);
    Ok(())
}

pub async fn list_employees() -> Result<()> {
    let (_, messenger) = connect().await?;
    let roster = messenger.directory().roster();

    println!("\nEmployees:");
    println!("{:-<60}", "");
    if roster.is_empty() {
        println!("  (no employees found)");
        return Ok(());
    }
    for e in roster {
        println!("{:<30} {}", e.display_name(), e.id);
    }
    Ok(())
}
