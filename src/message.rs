use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message in a conversation, containing a role, text content, and any
/// tool calls the model requested.
///
/// Messages are the unit stored in `merge-messages` state fields and the
/// data that built-in edge conditions inspect: `has-tool-calls` is true iff
/// the most recent assistant message carries at least one [`ToolCall`].
///
/// # Examples
///
/// ```
/// use weftrun::message::{Message, ToolCall};
///
/// let user_msg = Message::user("What's the weather like?");
/// let assistant_msg = Message::assistant("It's sunny today!");
///
/// let call = ToolCall::new("call_1", "get_weather", serde_json::json!({"city": "Oslo"}));
/// let tool_request = Message::assistant("checking...").with_tool_calls(vec![call]);
/// assert!(tool_request.has_tool_calls());
/// ```
///
/// # Serialization
///
/// Messages round-trip through JSON; `tool_calls` is omitted when empty:
///
/// ```
/// use weftrun::message::Message;
///
/// let msg = Message::user("test");
/// let json = serde_json::to_string(&msg).unwrap();
/// let parsed: Message = serde_json::from_str(&json).unwrap();
/// assert_eq!(msg, parsed);
/// assert!(!json.contains("tool_calls"));
/// ```
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender (e.g., "user", "assistant", "tool").
    ///
    /// Use the constants on [`Message`] for standardized values.
    pub role: String,
    /// The text content of the message.
    pub content: String,
    /// Tool invocations requested by this message, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

/// A single tool invocation requested by a model response.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier correlating the request with its result message.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON arguments for the invocation.
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    #[must_use]
    pub fn new(id: &str, name: &str, arguments: Value) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }
    }
}

impl Message {
    /// User input message role.
    pub const USER: &'static str = "user";
    /// AI assistant response message role.
    pub const ASSISTANT: &'static str = "assistant";
    /// System prompt or instruction message role.
    pub const SYSTEM: &'static str = "system";
    /// Tool result message role.
    pub const TOOL: &'static str = "tool";

    /// Creates a new message with the specified role and content.
    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
            tool_calls: Vec::new(),
        }
    }

    /// Creates a user message with the specified content.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    /// Creates an assistant message with the specified content.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    /// Creates a system message with the specified content.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    /// Creates a tool-result message with the specified content.
    #[must_use]
    pub fn tool(content: &str) -> Self {
        Self::new(Self::TOOL, content)
    }

    /// Attaches tool calls to this message.
    #[must_use]
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// Returns true if this message has the specified role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    /// Returns true if this message requests at least one tool invocation.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Serialize into the JSON shape stored in state fields.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("role".to_string(), Value::String(self.role.clone()));
        obj.insert("content".to_string(), Value::String(self.content.clone()));
        if !self.tool_calls.is_empty() {
            let calls = self
                .tool_calls
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "id": c.id,
                        "name": c.name,
                        "arguments": c.arguments,
                    })
                })
                .collect();
            obj.insert("tool_calls".to_string(), Value::Array(calls));
        }
        Value::Object(obj)
    }

    /// Deserialize from the JSON shape stored in state fields.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// Verifies that a Message can be constructed and its fields are set correctly.
    fn test_message_construction() {
        let msg = Message::new("user", "hello");
        assert_eq!(msg.role, "user");
        assert_eq!(msg.content, "hello");
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    /// Tests convenience constructors for common message types.
    fn test_convenience_constructors() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, Message::USER);

        let assistant_msg = Message::assistant("Hi there!");
        assert_eq!(assistant_msg.role, Message::ASSISTANT);

        let system_msg = Message::system("You are helpful");
        assert_eq!(system_msg.role, Message::SYSTEM);

        let tool_msg = Message::tool("Result: 42");
        assert_eq!(tool_msg.role, Message::TOOL);
    }

    #[test]
    /// Tests role checking methods.
    fn test_role_checking() {
        let user_msg = Message::user("Hello");
        assert!(user_msg.has_role(Message::USER));
        assert!(!user_msg.has_role(Message::ASSISTANT));
    }

    #[test]
    fn test_tool_calls_detection() {
        let plain = Message::assistant("done");
        assert!(!plain.has_tool_calls());

        let with_calls = Message::assistant("working").with_tool_calls(vec![ToolCall::new(
            "c1",
            "search",
            serde_json::json!({"q": "rust"}),
        )]);
        assert!(with_calls.has_tool_calls());
        assert_eq!(with_calls.tool_calls[0].name, "search");
    }

    #[test]
    /// Tests value round-trip through the state-field JSON shape.
    fn test_value_round_trip() {
        let original = Message::assistant("checking").with_tool_calls(vec![ToolCall::new(
            "c1",
            "lookup",
            serde_json::json!({"key": "v"}),
        )]);
        let value = original.to_value();
        let parsed = Message::from_value(&value).expect("round trip");
        assert_eq!(original, parsed);

        // Plain messages omit the tool_calls key entirely.
        let plain_value = Message::user("hi").to_value();
        assert!(plain_value.get("tool_calls").is_none());
    }

    #[test]
    fn test_serialization() {
        let original = Message::user("Test message");
        let json = serde_json::to_string(&original).expect("serialization failed");
        let deserialized: Message = serde_json::from_str(&json).expect("deserialization failed");
        assert_eq!(original, deserialized);
    }
}
