//! Interactive prompt detection
//!
//! The deployment scripts occasionally stop and wait for input on stdin,
//! announcing it with one of a small fixed set of prompt lines. This module
//! classifies raw output lines against that set and tracks the single
//! pending prompt a client should be showing.

use serde::Serialize;

/// Prompt classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptKind {
    /// Binary confirmation defaulting to yes, e.g. "Proceed? [Y/n]"
    ConfirmYes,
    /// Binary confirmation defaulting to no, e.g. "Continue anyway? [y/N]"
    ConfirmNo,
    /// Requires typing a literal keyword, e.g. "Type CONFIRM to proceed"
    DangerConfirm,
    /// Freeform value request, e.g. "Enter the parameter count in billions"
    TextInput,
}

/// A detected prompt awaiting an answer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPrompt {
    #[serde(rename = "type")]
    pub kind: PromptKind,
    pub message: String,
    pub raw_line: String,
}

struct Signature {
    needle: &'static str,
    kind: PromptKind,
    message: &'static str,
}

// Ordered: first match wins. Needles are lowercase with collapsed whitespace,
// matching the normalization applied to incoming lines.
const SIGNATURES: &[Signature] = &[
    Signature {
        needle: "continue anyway? [y/n]",
        kind: PromptKind::ConfirmNo,
        message: "Estimated RAM usage is high. Continue anyway?",
    },
    Signature {
        needle: "proceed? [y/n]",
        kind: PromptKind::ConfirmYes,
        message: "The model fits in available memory. Proceed?",
    },
    Signature {
        needle: "type confirm to proceed",
        kind: PromptKind::DangerConfirm,
        message: "This model may exhaust system memory. Type CONFIRM to proceed.",
    },
    Signature {
        needle: "enter the parameter count",
        kind: PromptKind::TextInput,
        message: "Model size could not be inferred. Enter the parameter count in billions.",
    },
];

/// Strip ANSI CSI escape sequences (colors, styles) from a line.
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' && chars.peek() == Some(&'[') {
            chars.next();
            // Consume parameter bytes up to and including the final byte
            for n in chars.by_ref() {
                if n.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}

fn normalize(line: &str) -> String {
    strip_ansi(line)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Classify a raw output line, returning a prompt descriptor on match.
///
/// Matching is case-insensitive and tolerant of embedded escape sequences
/// and variable internal whitespace. `raw_line` preserves the input exactly.
pub fn detect_prompt(line: &str) -> Option<PendingPrompt> {
    let normalized = normalize(line);
    for signature in SIGNATURES {
        if normalized.contains(signature.needle) {
            return Some(PendingPrompt {
                kind: signature.kind,
                message: signature.message.to_string(),
                raw_line: line.to_string(),
            });
        }
    }
    None
}

/// A user's response to a pending prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAnswer {
    /// The affirmative choice on a binary confirmation
    Confirm,
    /// The negative choice on a binary confirmation
    Deny,
    /// Typed text (danger keyword or freeform value)
    Text(String),
    /// The cancel path of the dialog
    Cancel,
}

/// Tracks the single pending prompt for one deployment's output stream.
///
/// A newly detected prompt replaces any unanswered one: last prompt wins,
/// there is no queue.
#[derive(Debug, Default)]
pub struct PromptTracker {
    pending: Option<PendingPrompt>,
}

impl PromptTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one streamed line; returns the pending prompt if this line
    /// (or an earlier unanswered one) requires input.
    pub fn observe(&mut self, line: &str) -> Option<&PendingPrompt> {
        if let Some(prompt) = detect_prompt(line) {
            self.pending = Some(prompt);
        }
        self.pending.as_ref()
    }

    pub fn pending(&self) -> Option<&PendingPrompt> {
        self.pending.as_ref()
    }

    /// Resolve the pending prompt, returning the text to relay to the
    /// process's stdin, or `None` when nothing should be sent.
    pub fn answer(&mut self, answer: PromptAnswer) -> Option<String> {
        let prompt = self.pending.take()?;
        match (prompt.kind, answer) {
            (PromptKind::ConfirmYes | PromptKind::ConfirmNo, PromptAnswer::Confirm) => {
                Some("y".to_string())
            }
            (PromptKind::ConfirmYes | PromptKind::ConfirmNo, _) => Some("n".to_string()),
            (PromptKind::DangerConfirm, PromptAnswer::Text(text)) => Some(text),
            (PromptKind::DangerConfirm, _) => Some("cancel".to_string()),
            (PromptKind::TextInput, PromptAnswer::Text(text)) => Some(text),
            (PromptKind::TextInput, _) => None,
        }
    }

    /// Drop the pending prompt without answering.
    pub fn dismiss(&mut self) {
        self.pending = None;
    }
}
