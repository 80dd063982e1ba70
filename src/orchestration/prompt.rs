//! Provider-agnostic prompt construction
//!
//! A [`Prompt`] is built once per request from a system instruction, the
//! flattened chat history and the new user message. Provider clients decide
//! how to lay it out on the wire.

use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Upper bound on the rendered prompt, in characters
pub const MAX_PROMPT_CHARS: usize = 200_000;

const CRISIS_SECTION: &str = "\
Before anything else, check every destination mentioned for crises reported in \
the past week: natural disasters, floods, attacks, political unrest or health \
emergencies. Open with a section headed \"⚠️ CRISIS ALERT ⚠️\". If a crisis exists, \
describe its nature, start date and current status, affected areas, severity, \
safety recommendations and impact on airports, hotels and transport, explain why \
travel is not advised, suggest alternatives and stop there. Otherwise state \
\"No current crisis situations reported in this area\" and continue.";

const REGULAR_GUIDANCE: &str = "\
Then answer the traveller's question in well-organised, scannable sections where \
relevant: destination overview (history, best season, customs, language, current \
festivals), accommodation (budget to luxury, neighbourhoods, booking tips), \
transportation (getting there, getting around, passes, accessibility), activities \
and attractions, dining and cuisine (local dishes, price ranges, street-food safety, \
etiquette, dietary needs) and practical tips (budget, currency, safety, packing, \
visas). For crises also cover root causes and any expected resolution timeline.";

const CUSTOMIZE_GUIDANCE: &str = "\
Then help the traveller refine their plan with a detailed, well-organised answer \
covering, where relevant: destination overview, accommodation options, \
transportation details, activities and attractions, and practical travel tips \
(budget, safety, packing, visas, local food).";

/// Which system instruction a request uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// Direct chatbot use
    Regular,
    /// Requests coming from the plan-customization page
    Customize,
}

impl PromptMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptMode::Regular => "regular",
            PromptMode::Customize => "customize",
        }
    }

    pub fn system_instruction(&self) -> String {
        let guidance = match self {
            PromptMode::Regular => REGULAR_GUIDANCE,
            PromptMode::Customize => CUSTOMIZE_GUIDANCE,
        };
        format!(
            "You are Yatra Sevak, a helpful travel assistant. Give comprehensive, \
            detailed travel information focused on flights, hotels, destinations and \
            travel tips.\n\n{}\n\n{}",
            CRISIS_SECTION, guidance
        )
    }
}

/// Author of a chat turn
///
/// The frontend labels assistant turns `"ai"`; `"assistant"` and `"bot"` are
/// accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Sender {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai", alias = "assistant", alias = "bot")]
    Assistant,
}

impl Sender {
    fn label(&self) -> &'static str {
        match self {
            Sender::User => "User",
            Sender::Assistant => "Assistant",
        }
    }
}

/// One prior message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatTurn {
    pub sender: Sender,
    pub text: String,
}

impl ChatTurn {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    system: String,
    transcript: String,
    user_message: String,
}

impl Prompt {
    /// Build the prompt for one request
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the rendered prompt would exceed
    /// [`MAX_PROMPT_CHARS`]. This is the only fatal orchestration failure.
    pub fn build(mode: PromptMode, history: &[ChatTurn], message: &str) -> AppResult<Self> {
        let transcript = history
            .iter()
            .map(|turn| format!("{}: {}", turn.sender.label(), turn.text.trim()))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = Self {
            system: mode.system_instruction(),
            transcript,
            user_message: message.trim().to_string(),
        };

        let chars = prompt.char_count();
        if chars > MAX_PROMPT_CHARS {
            return Err(AppError::Validation(format!(
                "conversation too long: prompt would be {} characters (max {})",
                chars, MAX_PROMPT_CHARS
            )));
        }

        Ok(prompt)
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    /// Flattened history, one `User: ...` / `Assistant: ...` line per turn
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    /// Transcript followed by the new message as a final `User:` line
    pub fn user_content(&self) -> String {
        if self.transcript.is_empty() {
            format!("User: {}", self.user_message)
        } else {
            format!("{}\nUser: {}", self.transcript, self.user_message)
        }
    }

    /// System instruction and user content as one free-text prompt
    pub fn render(&self) -> String {
        format!("{}\n\n{}", self.system, self.user_content())
    }

    pub fn char_count(&self) -> usize {
        self.render().chars().count()
    }
}
