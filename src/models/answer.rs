use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;

pub const WHITEBOARD_WIDGET: &str = "defineWhiteboard";
pub const DEFAULT_ANSWER: &str = "No response available.";

/// What the model is asked to produce for `/ask`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredAnswer {
    #[serde(default)]
    pub widgets: Vec<JsonValue>,
    #[serde(default = "default_answer")]
    pub answer: String,
}

fn default_answer() -> String {
    DEFAULT_ANSWER.to_string()
}

impl StructuredAnswer {
    pub fn from_value(value: JsonValue) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Index of the whiteboard widget. Models put it first or second, so
    /// only those two positions are looked at.
    pub fn whiteboard_index(&self) -> Option<usize> {
        self.widgets
            .iter()
            .take(2)
            .position(|w| w.get("type").and_then(JsonValue::as_str) == Some(WHITEBOARD_WIDGET))
    }

    /// Non-empty `parameters.content` of the whiteboard widget, if any.
    pub fn whiteboard_content(&self) -> Option<&str> {
        let widget = &self.widgets[self.whiteboard_index()?];
        widget
            .get("parameters")
            .and_then(|p| p.get("content"))
            .and_then(JsonValue::as_str)
            .filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answer(widgets: JsonValue) -> StructuredAnswer {
        StructuredAnswer::from_value(json!({ "widgets": widgets, "answer": "42" })).unwrap()
    }

    #[test]
    fn whiteboard_at_first_position() {
        let a = answer(
            json!([
            {"type": "defineWhiteboard", "parameters": {"content": "C"}},
            {"type": "defineGraph", "parameters": {"content": "x"}}
        ])
        );
        assert_eq!(a.whiteboard_index(), Some(0));
        assert_eq!(a.whiteboard_content(), Some("C"));
    }

    #[test]
    fn whiteboard_at_second_position() {
        let a = answer(
            json!([
            {"type": "other"},
            {"type": "defineWhiteboard", "parameters": {"content": "C"}}
        ])
        );
        assert_eq!(a.whiteboard_index(), Some(1));
        assert_eq!(a.whiteboard_content(), Some("C"));
    }

    #[test]
    fn whiteboard_past_second_position_is_ignored() {
        let a = answer(
            json!([
            {"type": "other"},
            {"type": "other"},
            {"type": "defineWhiteboard", "parameters": {"content": "C"}}
        ])
        );
        assert_eq!(a.whiteboard_index(), None);
        assert_eq!(a.whiteboard_content(), None);
    }

    #[test]
    fn empty_whiteboard_content_is_none() {
        let a = answer(json!([{"type": "defineWhiteboard", "parameters": {"content": ""}}]));
        assert_eq!(a.whiteboard_index(), Some(0));
        assert_eq!(a.whiteboard_content(), None);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let a = StructuredAnswer::from_value(json!({})).unwrap();
        assert!(a.widgets.is_empty());
        assert_eq!(a.answer, DEFAULT_ANSWER);
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(StructuredAnswer::from_value(json!([1, 2])).is_err());
    }
}
