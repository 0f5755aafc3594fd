use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Instruction payload prepended to every conversation sent upstream.
pub const SYSTEM_PROMPT: &str = "\
You are the Purely Homecare Assistant.
Audience: families in Hamilton, North Lanarkshire, South Lanarkshire.
Be warm, clear, concise (short paragraphs + bullets). No medical/legal advice.

Facts to use:
- Areas: Hamilton, North Lanarkshire, South Lanarkshire
- Care types: personal care, medication support, dementia, companionship, respite, overnights, live-in
- Visit lengths: 30/45/60+ mins
- Hours: 7am-10pm, on-call options
- Registration: Care Inspectorate for Scotland
- Pricing stance: Written quote after assessment; no hidden fees.

STYLE & BOUNDARIES:
- Explain steps (enquire -> assessment -> plan & quote -> start -> 1-week review).
- Outline SDS Options 1-4 (high level; councils vary).
- Never output email addresses or URLs. Do NOT add contact calls-to-action.
- End with a gentle, non-contact next step (e.g., \"Would you like a quick 3-step plan?\").
";

/// Inbound widget request. Lenient on purpose: an absent or malformed body
/// is normalized to an empty conversation by the handler.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<IncomingMessage>,
}

/// One caller-supplied message, before coercion. Role and content are kept
/// loose here; `normalize` pins them down.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<Value>,
}

impl IncomingMessage {
    /// Any role other than "assistant" becomes "user"; content passes
    /// through only when it is a JSON string.
    pub fn normalize(self) -> OutboundMessage {
        let role = match self.role.as_deref() {
            Some("assistant") => Role::Assistant,
            _ => Role::User,
        };
        let content = match self.content {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };
        OutboundMessage { role, content }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Serialize)]
pub struct OutboundMessage {
    pub role: Role,
    pub content: String,
}

/// Outbound sequence: the fixed system instruction, then the caller's
/// messages in order.
pub fn build_outbound_messages(incoming: Vec<IncomingMessage>) -> Vec<OutboundMessage> {
    let mut messages = Vec::with_capacity(incoming.len() + 1);
    messages.push(OutboundMessage {
        role: Role::System,
        content: SYSTEM_PROMPT.to_string(),
    });
    messages.extend(incoming.into_iter().map(IncomingMessage::normalize));
    messages
}

#[derive(Debug, Serialize)]
pub struct UpstreamRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<OutboundMessage>,
    pub temperature: f32,
    pub stream: bool,
}

/// One parsed upstream event line. Only the delta path is read; everything
/// else in the chunk is ignored.
#[derive(Debug, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}
