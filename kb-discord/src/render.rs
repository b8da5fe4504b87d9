//! Mapping from core render values to Discord component/embed JSON.

use kb_core::{ControlId, MenuAction, PageView, Resource, SelectionMode};
use serde_json::{Value, json};

pub const SUBJECT_SELECT_ID: &str = "subject_select";

pub const NO_RESOURCES_TEXT: &str = "No resources available for this subject yet.";

pub const EMBED_COLOR_RED: u32 = 0xED4245;

const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_BUTTON: u8 = 2;
const COMPONENT_SELECT: u8 = 3;

const BUTTON_PRIMARY: u8 = 1;
const BUTTON_SUCCESS: u8 = 3;
const BUTTON_DANGER: u8 = 4;

/// Component rows for one page of a paginated surface: the select menu on
/// top, then a row of whichever navigation controls apply. Register
/// surfaces always carry Done.
pub fn page_components(view: &PageView) -> Value {
    let disabled = !view.controls_enabled;
    let mut rows = Vec::new();

    if !view.options.is_empty() {
        let options: Vec<Value> = view
            .options
            .iter()
            .map(|s| json!({ "label": s.name, "value": s.id.as_str() }))
            .collect();
        let placeholder = match view.mode {
            SelectionMode::View => "Select a subject...",
            SelectionMode::Register => "Select subjects to register...",
        };
        rows.push(json!({
            "type": COMPONENT_ACTION_ROW,
            "components": [{
                "type": COMPONENT_SELECT,
                "custom_id": SUBJECT_SELECT_ID,
                "placeholder": placeholder,
                "min_values": 1,
                "max_values": view.max_values(),
                "disabled": disabled,
                "options": options,
            }]
        }));
    }

    let mut buttons = Vec::new();
    if view.has_previous {
        buttons.push(button("Previous", ControlId::Previous, BUTTON_PRIMARY, disabled));
    }
    if view.has_next {
        buttons.push(button("Next", ControlId::Next, BUTTON_PRIMARY, disabled));
    }
    if view.mode == SelectionMode::Register {
        buttons.push(button("Done", ControlId::Done, BUTTON_SUCCESS, disabled));
    }
    if !buttons.is_empty() {
        rows.push(json!({ "type": COMPONENT_ACTION_ROW, "components": buttons }));
    }

    Value::Array(rows)
}

fn button(label: &str, control: ControlId, style: u8, disabled: bool) -> Value {
    json!({
        "type": COMPONENT_BUTTON,
        "label": label,
        "style": style,
        "custom_id": control.as_str(),
        "disabled": disabled,
    })
}

/// The welcome menu: one row of stateless action buttons.
pub fn main_menu_components(actions: &[MenuAction]) -> Value {
    let buttons: Vec<Value> = actions
        .iter()
        .map(|action| {
            let style = match action {
                MenuAction::RegisterSubjects => BUTTON_PRIMARY,
                MenuAction::ViewSubjects => BUTTON_SUCCESS,
                MenuAction::ResetPreferences => BUTTON_DANGER,
            };
            json!({
                "type": COMPONENT_BUTTON,
                "label": action.label(),
                "style": style,
                "custom_id": action.custom_id(),
                "disabled": false,
            })
        })
        .collect();
    json!([{ "type": COMPONENT_ACTION_ROW, "components": buttons }])
}

/// Embed listing a subject's resources, one field per resource; empty
/// lists get a description line instead.
pub fn resources_embed(subject_name: &str, resources: &[Resource]) -> Value {
    let mut embed = json!({
        "title": format!("Resources for {subject_name}"),
        "color": EMBED_COLOR_RED,
    });

    if resources.is_empty() {
        embed["description"] = Value::String(NO_RESOURCES_TEXT.to_string());
    } else {
        let fields: Vec<Value> = resources
            .iter()
            .map(|r| {
                json!({
                    "name": r.title,
                    "value": format!("[Link]({}) - Posted by {}", r.content_url, r.posted_by),
                    "inline": false,
                })
            })
            .collect();
        embed["fields"] = Value::Array(fields);
    }

    embed
}

#[cfg(test)]
mod tests {
    use super::*;
    use kb_core::{SelectionState, Subject, SubjectId, UserId};

    fn subjects(n: usize) -> Vec<Subject> {
        (0..n)
            .map(|i| Subject {
                id: SubjectId::new(format!("uuid-{i}")),
                name: format!("Subject {i}"),
            })
            .collect()
    }

    fn view(n: usize, mode: SelectionMode) -> PageView {
        SelectionState::new(subjects(n), mode, UserId::new("u1")).page_view()
    }

    fn button_ids(rows: &Value) -> Vec<String> {
        rows.as_array()
            .unwrap()
            .iter()
            .flat_map(|row| row["components"].as_array().unwrap())
            .filter(|c| c["type"] == 2)
            .map(|c| c["custom_id"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn first_page_of_thirty_shows_next_but_not_previous() {
        let rows = page_components(&view(30, SelectionMode::View));
        let select = &rows[0]["components"][0];
        assert_eq!(select["options"].as_array().unwrap().len(), 25);
        assert_eq!(select["max_values"], 1);
        assert_eq!(button_ids(&rows), vec!["next"]);
    }

    #[test]
    fn register_surfaces_always_carry_done() {
        let rows = page_components(&view(30, SelectionMode::Register));
        assert_eq!(button_ids(&rows), vec!["next", "done"]);

        let rows = page_components(&view(10, SelectionMode::Register));
        assert_eq!(button_ids(&rows), vec!["done"]);
        let select = &rows[0]["components"][0];
        assert_eq!(select["max_values"], 10);
    }

    #[test]
    fn disabled_views_disable_every_component() {
        let mut state = SelectionState::new(subjects(30), SelectionMode::Register, "u1".into());
        state.disable();
        let rows = page_components(&state.page_view());
        for row in rows.as_array().unwrap() {
            for component in row["components"].as_array().unwrap() {
                assert_eq!(component["disabled"], true);
            }
        }
    }

    #[test]
    fn empty_resource_list_renders_the_placeholder_description() {
        let embed = resources_embed("Math", &[]);
        assert_eq!(embed["title"], "Resources for Math");
        assert_eq!(embed["description"], NO_RESOURCES_TEXT);
        assert!(embed.get("fields").is_none());
    }

    #[test]
    fn resources_render_as_link_fields() {
        let embed = resources_embed(
            "Math",
            &[Resource {
                title: "Notes".into(),
                content_url: "https://example.com/n".into(),
                posted_by: "alice".into(),
            }],
        );
        let fields = embed["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0]["name"], "Notes");
        assert_eq!(
            fields[0]["value"],
            "[Link](https://example.com/n) - Posted by alice"
        );
    }

    #[test]
    fn main_menu_renders_three_styled_buttons() {
        let rows = main_menu_components(&MenuAction::ALL);
        let buttons = rows[0]["components"].as_array().unwrap();
        assert_eq!(buttons.len(), 3);
        assert_eq!(buttons[0]["custom_id"], "menu_register");
        assert_eq!(buttons[2]["style"], 4);
    }
}
