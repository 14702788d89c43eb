//! Prefix-command detection: identify bot commands in inbound messages.
//!
//! The heavy lifting (gateway, event delivery) belongs to serenity; this
//! only splits `<prefix><verb> <rest>` and maps the fixed verb set.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Ping,
    Play(String),
    QueueList,
    Skip,
    Pause,
    Resume,
    Leave,
    Clear,
}

/// Detect a command at the start of a message. Returns `None` for normal
/// chatter, unknown verbs, and a `play` with nothing to play.
pub fn detect_command(content: &str, prefix: char) -> Option<BotCommand> {
    let trimmed = content.trim();
    let rest = trimmed.strip_prefix(prefix)?;

    let (verb, args) = rest
        .split_once(char::is_whitespace)
        .map(|(v, a)| (v, a.trim()))
        .unwrap_or((rest, ""));

    match verb {
        "ping" => Some(BotCommand::Ping),
        "play" if !args.is_empty() => Some(BotCommand::Play(args.to_string())),
        "queue_list" => Some(BotCommand::QueueList),
        "skip" => Some(BotCommand::Skip),
        "pause" => Some(BotCommand::Pause),
        "resume" => Some(BotCommand::Resume),
        "leave" => Some(BotCommand::Leave),
        "clear" => Some(BotCommand::Clear),
        _ => None,
    }
}

/// Render the queue_list reply: up to `limit` upcoming titles.
pub fn format_queue(upcoming: &[String], limit: usize) -> String {
    if upcoming.is_empty() {
        return "🎵 The queue is empty!".to_string();
    }
    let lines: Vec<String> = upcoming
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, title)| format!("{}. {}", i + 1, title))
        .collect();
    format!(
        "🎶 **Track queue (showing up to {limit}):**\n{}",
        lines.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_verbs() {
        assert_eq!(detect_command("*ping", '*'), Some(BotCommand::Ping));
        assert_eq!(detect_command("*skip", '*'), Some(BotCommand::Skip));
        assert_eq!(detect_command("*queue_list", '*'), Some(BotCommand::QueueList));
        assert_eq!(detect_command("*clear", '*'), Some(BotCommand::Clear));
    }

    #[test]
    fn play_captures_the_rest_of_the_line() {
        assert_eq!(
            detect_command("*play never gonna give you up", '*'),
            Some(BotCommand::Play("never gonna give you up".to_string()))
        );
    }

    #[test]
    fn play_without_args_is_ignored() {
        assert_eq!(detect_command("*play", '*'), None);
        assert_eq!(detect_command("*play   ", '*'), None);
    }

    #[test]
    fn normal_chatter_is_ignored() {
        assert_eq!(detect_command("hello there", '*'), None);
        assert_eq!(detect_command("*unknown", '*'), None);
        assert_eq!(detect_command("", '*'), None);
    }

    #[test]
    fn respects_the_configured_prefix() {
        assert_eq!(detect_command("!ping", '!'), Some(BotCommand::Ping));
        assert_eq!(detect_command("*ping", '!'), None);
    }

    #[test]
    fn formats_queue_with_cap() {
        let titles: Vec<String> = (1..=7).map(|i| format!("song {i}")).collect();
        let out = format_queue(&titles, 5);
        assert!(out.contains("1. song 1"));
        assert!(out.contains("5. song 5"));
        assert!(!out.contains("song 6"));
    }

    #[test]
    fn formats_empty_queue() {
        assert_eq!(format_queue(&[], 5), "🎵 The queue is empty!");
    }
}
