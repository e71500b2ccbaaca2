//! Heuristic parsing of mentor-REPL input lines. Slash commands map to
//! actions through a small declarative registry; anything else is a chat
//! turn for the mentor.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::prompts::TemplateKind;

#[derive(Clone, Copy, Debug)]
struct CommandSpec {
    command: &'static str,
    action: &'static str,
}

const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "clear",
        action: "clear",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/think <problem>",
    "/solve [kind] <problem>",
    "/analyze <image-path or description>",
    "/mode <critical_thinking|solution>",
    "/export [path]",
    "/clear",
    "/help",
    "/quit",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub message: Option<String>,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            message: None,
            command_args: BTreeMap::new(),
        }
    }
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    let Some(slash_tail) = raw_trimmed.strip_prefix('/') else {
        let mut intent = Intent::new("chat", text);
        intent.message = Some(raw_trimmed.to_string());
        return intent;
    };

    let command_len = slash_tail
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .count();
    if command_len == 0 {
        let mut intent = Intent::new("chat", text);
        intent.message = Some(raw_trimmed.to_string());
        return intent;
    }

    let command = slash_tail[..command_len].to_ascii_lowercase();
    let arg = slash_tail[command_len..].trim();

    match command.as_str() {
        "think" => {
            let mut intent = Intent::new("think", text);
            intent
                .command_args
                .insert("problem".to_string(), Value::String(arg.to_string()));
            intent
        }
        "solve" => {
            let (kind, problem) = split_solve_args(arg);
            let mut intent = Intent::new("solve", text);
            intent.command_args.insert(
                "kind".to_string(),
                kind.map(|value| Value::String(value.as_str().to_string()))
                    .unwrap_or(Value::Null),
            );
            intent
                .command_args
                .insert("problem".to_string(), Value::String(problem));
            intent
        }
        "analyze" => {
            let mut intent = Intent::new("analyze", text);
            match single_image_path(arg) {
                Some(path) => {
                    intent
                        .command_args
                        .insert("source".to_string(), Value::String("image".to_string()));
                    intent
                        .command_args
                        .insert("path".to_string(), Value::String(path));
                }
                None => {
                    intent
                        .command_args
                        .insert("source".to_string(), Value::String("text".to_string()));
                    intent
                        .command_args
                        .insert("text".to_string(), Value::String(arg.to_string()));
                }
            }
            intent
        }
        "mode" => {
            let mut intent = Intent::new("mode", text);
            intent
                .command_args
                .insert("mode".to_string(), Value::String(arg.to_string()));
            intent
        }
        "export" => {
            let mut intent = Intent::new("export", text);
            let path = split_path_args(arg).into_iter().next();
            intent.command_args.insert(
                "path".to_string(),
                path.map(Value::String).unwrap_or(Value::Null),
            );
            intent
        }
        _ => {
            if let Some(spec) = NO_ARG_COMMANDS
                .iter()
                .find(|spec| spec.command == command)
            {
                return Intent::new(spec.action, text);
            }
            let mut intent = Intent::new("unknown", text);
            intent
                .command_args
                .insert("command".to_string(), Value::String(command));
            intent
                .command_args
                .insert("arg".to_string(), Value::String(arg.to_string()));
            intent
        }
    }
}

// A leading template-kind token selects the framework; the rest is the
// problem statement.
fn split_solve_args(arg: &str) -> (Option<TemplateKind>, String) {
    let trimmed = arg.trim();
    if trimmed.is_empty() {
        return (None, String::new());
    }
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or_default();
    if let Some(kind) = TemplateKind::parse(head) {
        return (
            Some(kind),
            parts.next().unwrap_or_default().trim().to_string(),
        );
    }
    (None, trimmed.to_string())
}

fn split_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

// One shell-quoted token with an image extension reads as a path; anything
// else is treated as a text description.
fn single_image_path(arg: &str) -> Option<String> {
    let parts = split_path_args(arg);
    let candidate = match parts.len() {
        0 => return None,
        1 => parts[0].clone(),
        _ => parts.join(" "),
    };
    let lower = candidate.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")))
        .then_some(candidate)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_intent;

    #[test]
    fn plain_text_is_a_chat_turn() {
        let intent = parse_intent("  what should I ask next?  ");
        assert_eq!(intent.action, "chat");
        assert_eq!(intent.message.as_deref(), Some("what should I ask next?"));
    }

    #[test]
    fn empty_input_is_noop() {
        assert_eq!(parse_intent("   ").action, "noop");
    }

    #[test]
    fn think_keeps_raw_problem() {
        let intent = parse_intent("/think why does Main St flood?");
        assert_eq!(intent.action, "think");
        assert_eq!(
            intent.command_args["problem"],
            json!("why does Main St flood?")
        );
    }

    #[test]
    fn solve_with_explicit_kind() {
        let intent = parse_intent("/solve budget fix the drains");
        assert_eq!(intent.action, "solve");
        assert_eq!(intent.command_args["kind"], json!("budget"));
        assert_eq!(intent.command_args["problem"], json!("fix the drains"));
    }

    #[test]
    fn solve_without_kind_is_auto() {
        let intent = parse_intent("/solve fix the drains");
        assert_eq!(intent.command_args["kind"], json!(null));
        assert_eq!(intent.command_args["problem"], json!("fix the drains"));
    }

    #[test]
    fn analyze_detects_quoted_image_path() {
        let intent = parse_intent("/analyze \"/tmp/street corner.jpg\"");
        assert_eq!(intent.command_args["source"], json!("image"));
        assert_eq!(intent.command_args["path"], json!("/tmp/street corner.jpg"));
    }

    #[test]
    fn analyze_falls_back_to_text() {
        let intent = parse_intent("/analyze trash piling up near the school");
        assert_eq!(intent.command_args["source"], json!("text"));
        assert_eq!(
            intent.command_args["text"],
            json!("trash piling up near the school")
        );
    }

    #[test]
    fn export_path_is_optional() {
        assert_eq!(
            parse_intent("/export").command_args["path"],
            json!(null)
        );
        assert_eq!(
            parse_intent("/export \"/tmp/my report.txt\"").command_args["path"],
            json!("/tmp/my report.txt")
        );
    }

    #[test]
    fn quit_aliases_collapse() {
        assert_eq!(parse_intent("/quit").action, "quit");
        assert_eq!(parse_intent("/exit").action, "quit");
    }

    #[test]
    fn unknown_command_is_reported() {
        let intent = parse_intent("/abracadabra foo");
        assert_eq!(intent.action, "unknown");
        assert_eq!(intent.command_args["command"], json!("abracadabra"));
        assert_eq!(intent.command_args["arg"], json!("foo"));
    }
}
