#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
    pub arg_key: &'static str,
}

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "prompt",
        action: "set_prompt",
        arg_key: "text",
    },
    CommandSpec {
        command: "aspect",
        action: "set_aspect_ratio",
        arg_key: "value",
    },
    CommandSpec {
        command: "lighting",
        action: "set_lighting",
        arg_key: "value",
    },
    CommandSpec {
        command: "camera",
        action: "set_camera",
        arg_key: "value",
    },
    CommandSpec {
        command: "magic",
        action: "magic_prompt",
        arg_key: "mood",
    },
    CommandSpec {
        command: "select",
        action: "select_history",
        arg_key: "id",
    },
    CommandSpec {
        command: "delete",
        action: "delete_history",
        arg_key: "id",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "product",
        action: "set_product",
        arg_key: "path",
    },
    CommandSpec {
        command: "reference",
        action: "set_reference",
        arg_key: "path",
    },
    CommandSpec {
        command: "save",
        action: "save_image",
        arg_key: "path",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[&str] = &[
    "generate", "describe", "suggest", "history", "clear", "reset", "status", "options",
    "help", "quit",
];

pub(crate) const COMMAND_ALIASES: &[(&str, &str)] = &[
    ("gen", "generate"),
    ("ref", "reference"),
    ("aspect_ratio", "aspect"),
    ("exit", "quit"),
];

pub const SESSION_HELP_COMMANDS: &[&str] = &[
    "/product <path>",
    "/reference <path|none>",
    "/prompt <text>",
    "/aspect <ratio>",
    "/lighting <style>",
    "/camera <perspective>",
    "/generate",
    "/describe",
    "/magic <mood>",
    "/suggest",
    "/history",
    "/select <id>",
    "/delete <id>",
    "/clear",
    "/save <path>",
    "/reset",
    "/status",
    "/options",
    "/help",
    "/quit",
];
