use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, COMMAND_ALIASES, NO_ARG_COMMANDS, RAW_ARG_COMMANDS, SINGLE_PATH_COMMANDS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            command_args: BTreeMap::new(),
        }
    }

    fn with_arg(mut self, key: &str, value: String) -> Self {
        self.command_args
            .insert(key.to_string(), Value::String(value));
        self
    }

    pub fn arg(&self, key: &str) -> Option<&str> {
        self.command_args.get(key).and_then(Value::as_str)
    }
}

fn find_spec<'a>(command: &str, specs: &'a [CommandSpec]) -> Option<&'a CommandSpec> {
    specs.iter().find(|spec| spec.command == command)
}

fn resolve_alias(command: &str) -> &str {
    COMMAND_ALIASES
        .iter()
        .find(|(alias, _)| *alias == command)
        .map(|(_, target)| *target)
        .unwrap_or(command)
}

fn parse_path_args(arg: &str) -> Vec<String> {
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

fn parse_single_path_arg(arg: &str) -> String {
    let parts = parse_path_args(arg);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

/// Parses one line of the interactive session. Slash commands map to
/// actions; any other non-empty text replaces the prompt.
pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let lowered = slash_tail[..command_len].to_ascii_lowercase();
            let command = resolve_alias(&lowered);
            let arg = slash_tail[command_len..].trim();

            if let Some(spec) = find_spec(command, RAW_ARG_COMMANDS) {
                return Intent::new(spec.action, text).with_arg(spec.arg_key, arg.to_string());
            }

            if let Some(spec) = find_spec(command, SINGLE_PATH_COMMANDS) {
                let path = parse_single_path_arg(arg);
                if spec.action == "set_reference" && path.eq_ignore_ascii_case("none") {
                    return Intent::new("remove_reference", text);
                }
                return Intent::new(spec.action, text).with_arg(spec.arg_key, path);
            }

            if NO_ARG_COMMANDS.iter().any(|value| *value == command) {
                return Intent::new(command, text);
            }

            return Intent::new("unknown", text)
                .with_arg("command", lowered.clone())
                .with_arg("arg", arg.to_string());
        }
    }

    Intent::new("set_prompt", text).with_arg("text", raw_trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_intent;

    #[test]
    fn blank_lines_are_noop() {
        assert_eq!(parse_intent("   ").action, "noop");
    }

    #[test]
    fn bare_text_sets_prompt() {
        let intent = parse_intent("  on a marble countertop  ");
        assert_eq!(intent.action, "set_prompt");
        assert_eq!(intent.arg("text"), Some("on a marble countertop"));
    }

    #[test]
    fn path_commands_accept_quoted_paths() {
        let product = parse_intent("/product \"/tmp/my bottle.png\"");
        assert_eq!(product.action, "set_product");
        assert_eq!(product.command_args["path"], json!("/tmp/my bottle.png"));

        let reference = parse_intent("/ref scene.jpg");
        assert_eq!(reference.action, "set_reference");
        assert_eq!(reference.arg("path"), Some("scene.jpg"));
    }

    #[test]
    fn reference_none_removes_reference() {
        assert_eq!(parse_intent("/reference none").action, "remove_reference");
    }

    #[test]
    fn raw_arg_commands_keep_full_text() {
        let lighting = parse_intent("/lighting Golden Hour");
        assert_eq!(lighting.action, "set_lighting");
        assert_eq!(lighting.arg("value"), Some("Golden Hour"));

        let magic = parse_intent("/magic Dark & Moody");
        assert_eq!(magic.action, "magic_prompt");
        assert_eq!(magic.arg("mood"), Some("Dark & Moody"));

        let aspect = parse_intent("/aspect_ratio 16:9");
        assert_eq!(aspect.action, "set_aspect_ratio");
        assert_eq!(aspect.arg("value"), Some("16:9"));
    }

    #[test]
    fn no_arg_commands_and_aliases() {
        assert_eq!(parse_intent("/gen").action, "generate");
        assert_eq!(parse_intent("/GENERATE").action, "generate");
        assert_eq!(parse_intent("/describe").action, "describe");
        assert_eq!(parse_intent("/exit").action, "quit");
    }

    #[test]
    fn parse_unknown_command() {
        let intent = parse_intent("/blend foo bar");
        assert_eq!(intent.action, "unknown");
        assert_eq!(intent.command_args["command"], json!("blend"));
        assert_eq!(intent.command_args["arg"], json!("foo bar"));
    }
}
