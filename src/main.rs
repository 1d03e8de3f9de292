use std::panic;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use room_sync::config::Config;
use room_sync::editor::LineSelection;
use room_sync::models::{
    count_online, count_typing, generate_room_code, normalize_room_code, parse_line_range,
    sorted_for_display,
};
use room_sync::reconcile::RoomView;
use room_sync::services::{LinkStatus, RoomSession, SessionHandle};
use room_sync::ws::WsConnector;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "room-sync", version, about = "Join a collaborative editing room from the terminal")]
struct Args {
    /// Room code to join. A new room is created when omitted.
    room: Option<String>,

    /// Realtime endpoint, overrides WS_URL
    #[arg(long)]
    ws_url: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Logs go to stderr, stdout belongs to the console
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "room_sync=debug,info".into()))
        .init();

    let args = Args::parse();

    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    let room_code = match args.room.as_deref().map(normalize_room_code) {
        Some(Ok(code)) => code,
        Some(Err(e)) => {
            error!("{}", e);
            std::process::exit(2);
        }
        None => {
            let code = generate_room_code();
            info!("Created room {}", code);
            code
        }
    };
    let ws_url = args.ws_url.unwrap_or_else(|| config.ws_url.clone());

    let room = RoomSession::start(room_code.clone(), ws_url, config.timings(), Arc::new(WsConnector));

    println!("[room-sync] room {}", room_code);
    println!("[room-sync] type /help for commands");

    run_console(&room.handle).await;

    room.leave().await;
    info!("Goodbye");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Append(String),
    Comment { at: LineSelection, text: String },
    Uncomment(String),
    Typing(Option<u32>),
    Idle,
    Show,
    Comments,
    Users,
    Media,
    Status,
    Help,
    Quit,
    Invalid(String),
}

fn parse_command(input: &str) -> Option<Command> {
    let input = input.trim_end_matches(['\r', '\n']);
    if input.trim().is_empty() {
        return None;
    }
    if !input.starts_with('/') {
        return Some(Command::Append(input.to_string()));
    }

    let (name, rest) = input.split_once(' ').unwrap_or((input, ""));
    let rest = rest.trim();
    let command = match name {
        "/comment" => {
            let (at, text) = rest.split_once(' ').unwrap_or((rest, ""));
            match parse_anchor(at) {
                Some(at) if !text.trim().is_empty() => Command::Comment {
                    at,
                    text: text.trim().to_string(),
                },
                _ => Command::Invalid("usage: /comment <line|start-end> <text>".to_string()),
            }
        }
        "/uncomment" if !rest.is_empty() => Command::Uncomment(rest.to_string()),
        "/uncomment" => Command::Invalid("usage: /uncomment <id>".to_string()),
        "/typing" if rest.is_empty() => Command::Typing(None),
        "/typing" => match rest.parse() {
            Ok(line) => Command::Typing(Some(line)),
            Err(_) => Command::Invalid("usage: /typing [line]".to_string()),
        },
        "/idle" => Command::Idle,
        "/show" => Command::Show,
        "/comments" => Command::Comments,
        "/users" => Command::Users,
        "/media" => Command::Media,
        "/status" => Command::Status,
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        other => Command::Invalid(format!("unknown command {}, try /help", other)),
    };
    Some(command)
}

fn parse_anchor(text: &str) -> Option<LineSelection> {
    if text.contains('-') {
        let (start, end) = parse_line_range(text)?;
        return Some(LineSelection::new(start, end));
    }
    let line = text.parse().ok()?;
    Some(LineSelection::new(line, line))
}

fn appended(current: &str, line: &str) -> String {
    if current.is_empty() {
        line.to_string()
    } else {
        format!("{}\n{}", current, line)
    }
}

async fn run_console(handle: &SessionHandle) {
    let mut view = handle.view();
    let mut stdin_lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            changed = view.link.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = *view.link.borrow_and_update();
                print_link(&status);
            }
            changed = view.document.changed() => {
                if changed.is_err() {
                    break;
                }
                let lines = view.document.borrow_and_update().content.lines().count();
                println!("[doc] updated, {} lines", lines);
            }
            changed = view.comments.changed() => {
                if changed.is_err() {
                    break;
                }
                let count = view.comments.borrow_and_update().len();
                println!("[comments] {} in room", count);
            }
            changed = view.participants.changed() => {
                if changed.is_err() {
                    break;
                }
                let now = Utc::now();
                let participants = view.participants.borrow_and_update();
                println!(
                    "[users] {} online, {} typing",
                    count_online(&participants, now),
                    count_typing(&participants)
                );
            }
            input = stdin_lines.next_line() => {
                let input = match input {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) => {
                        println!("[room-sync] stdin error: {}", err);
                        break;
                    }
                };

                let Some(command) = parse_command(&input) else {
                    continue;
                };
                if command == Command::Quit {
                    break;
                }
                if let Err(e) = run_command(handle, &view, command) {
                    println!("[room-sync] {}", e);
                    break;
                }
            }
        }
    }
}

fn run_command(handle: &SessionHandle, view: &RoomView, command: Command) -> Result<(), room_sync::SyncError> {
    match command {
        Command::Append(line) => {
            let content = appended(&view.document.borrow().content, &line);
            handle.send_edit(content)?;
        }
        Command::Comment { at, text } => {
            let (line, range) = at.anchor();
            handle.add_comment(text, Some(line), range)?;
        }
        Command::Uncomment(id) => handle.delete_comment(id)?,
        Command::Typing(line) => handle.report_activity(true, line)?,
        Command::Idle => handle.report_activity(false, None)?,
        Command::Show => {
            for (idx, line) in view.document.borrow().content.lines().enumerate() {
                println!("{:>4} | {}", idx + 1, line);
            }
        }
        Command::Comments => {
            let comments = view.comments.borrow();
            for comment in sorted_for_display(&comments) {
                let anchor = match (&comment.line_range, comment.line_number) {
                    (Some(range), _) => format!("L{}", range),
                    (None, Some(line)) => format!("L{}", line),
                    (None, None) => "general".to_string(),
                };
                println!("{} [{}] {}: {}", comment.id, anchor, comment.author, comment.content);
            }
        }
        Command::Users => {
            let now = Utc::now();
            for p in view.participants.borrow().iter() {
                let typing = if p.is_typing { " (typing)" } else { "" };
                println!(
                    "{} {:?} last seen {}{}",
                    p.display_name,
                    p.status_at(now),
                    p.format_last_seen(now),
                    typing
                );
            }
        }
        Command::Media => {
            for file in view.media.borrow().iter() {
                println!(
                    "{} {} ({}, {} bytes) by {}",
                    file.id, file.name, file.mime_type, file.size_bytes, file.uploaded_by
                );
            }
        }
        Command::Status => {
            print_link(&view.link.borrow());
            match view.identity.borrow().as_ref() {
                Some(me) => println!("[room-sync] {} in room {} as {}", me.id, handle.room_code(), me.display_name),
                None => println!("[room-sync] room {}, not joined yet", handle.room_code()),
            }
        }
        Command::Help => print_help(),
        Command::Invalid(message) => println!("[room-sync] {}", message),
        Command::Quit => {}
    }
    Ok(())
}

fn print_link(status: &LinkStatus) {
    if status.connection_lost {
        println!("[link] connection lost, {:?}{}", status.state, if status.reconnecting { ", retrying" } else { "" });
    } else {
        println!("[link] {:?}", status.state);
    }
}

fn print_help() {
    println!("Commands:");
    println!("  <text>                          append a line to the document");
    println!("  /comment <line|start-end> <text> comment on lines");
    println!("  /uncomment <id>                 delete a comment");
    println!("  /typing [line]                  announce typing");
    println!("  /idle                           stop typing");
    println!("  /show                           print the document");
    println!("  /comments /users /media         list room state");
    println!("  /status                         connection status");
    println!("  /quit                           leave the room");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_append() {
        assert_eq!(parse_command("hello"), Some(Command::Append("hello".into())));
        assert_eq!(parse_command("   "), None);
        assert_eq!(appended("", "a"), "a");
        assert_eq!(appended("a", "b"), "a\nb");
    }

    #[test]
    fn comment_command_parses_anchor() {
        assert_eq!(
            parse_command("/comment 5 nice"),
            Some(Command::Comment { at: LineSelection::new(5, 5), text: "nice".into() })
        );
        assert_eq!(
            parse_command("/comment 3-7 needs work"),
            Some(Command::Comment { at: LineSelection::new(3, 7), text: "needs work".into() })
        );
        assert!(matches!(parse_command("/comment x nice"), Some(Command::Invalid(_))));
        assert!(matches!(parse_command("/comment 5"), Some(Command::Invalid(_))));
    }

    #[test]
    fn activity_commands() {
        assert_eq!(parse_command("/typing"), Some(Command::Typing(None)));
        assert_eq!(parse_command("/typing 12"), Some(Command::Typing(Some(12))));
        assert_eq!(parse_command("/idle"), Some(Command::Idle));
        assert!(matches!(parse_command("/nope"), Some(Command::Invalid(_))));
    }
}
