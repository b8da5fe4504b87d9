//! Slash command definitions registered with the platform.

use serde_json::{Value, json};

pub const COMMAND_START: &str = "start";
pub const COMMAND_REGISTER: &str = "register";
pub const COMMAND_SUBJECTS: &str = "subjects";

const COMMAND_TYPE_CHAT_INPUT: u8 = 1;

/// The full command set, in the shape the bulk-overwrite endpoint takes.
pub fn command_definitions() -> Value {
    json!([
        {
            "name": COMMAND_START,
            "description": "Start using the bot",
            "type": COMMAND_TYPE_CHAT_INPUT,
        },
        {
            "name": COMMAND_REGISTER,
            "description": "Register subjects",
            "type": COMMAND_TYPE_CHAT_INPUT,
        },
        {
            "name": COMMAND_SUBJECTS,
            "description": "View resources for registered subjects",
            "type": COMMAND_TYPE_CHAT_INPUT,
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_cover_the_three_commands() {
        let defs = command_definitions();
        let names: Vec<&str> = defs
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec![COMMAND_START, COMMAND_REGISTER, COMMAND_SUBJECTS]);
    }
}
