//! Output formatting for CLI commands.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, SapaArgs};
use crate::engine::{Reply, ReplyOutcome};
use crate::error::Result;

/// Result of classifying one message.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyResult {
    pub input: String,
    pub normalized: String,
    #[serde(flatten)]
    pub reply: Reply,
}

/// Result of normalizing one message.
#[derive(Debug, Serialize, Deserialize)]
pub struct NormalizeResult {
    pub input: String,
    pub normalized: String,
}

/// Result of fitting artifacts.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainResult {
    pub samples: usize,
    pub intents: Vec<String>,
    pub classifier: String,
    pub adapter: String,
    pub label_encoder: String,
    pub duration_ms: u64,
}

/// A sample the engine got wrong.
#[derive(Debug, Serialize, Deserialize)]
pub struct Misclassification {
    pub text: String,
    pub expected: String,
    pub predicted: String,
}

/// Result of an evaluation run.
#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub samples: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub outcomes: BTreeMap<ReplyOutcome, usize>,
    pub errors: Vec<Misclassification>,
    pub duration_ms: u64,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &SapaArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &SapaArgs) -> Result<()> {
    if args.verbosity() > 0 && !message.is_empty() {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;
    for line in human_lines(&value, 0) {
        println!("{line}");
    }
    Ok(())
}

/// Render a JSON value as indented `key: value` lines.
fn human_lines(value: &serde_json::Value, indent: usize) -> Vec<String> {
    let pad = "  ".repeat(indent);
    let mut lines = Vec::new();
    match value {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                match value {
                    serde_json::Value::Object(inner) if inner.is_empty() => {
                        lines.push(format!("{pad}{key}: -"));
                    }
                    serde_json::Value::Array(items) if items.is_empty() => {
                        lines.push(format!("{pad}{key}: -"));
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        lines.push(format!("{pad}{key}:"));
                        lines.extend(human_lines(value, indent + 1));
                    }
                    _ => lines.push(format!("{pad}{key}: {}", format_value(value))),
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                match item {
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        lines.push(format!("{pad}-"));
                        lines.extend(human_lines(item, indent + 1));
                    }
                    _ => lines.push(format!("{pad}- {}", format_value(item))),
                }
            }
        }
        _ => lines.push(format!("{pad}{}", format_value(value))),
    }
    lines
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &SapaArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Format a scalar JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.4}"),
            _ => n.to_string(),
        },
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => "-".to_string(),
        _ => value.to_string(),
    }
}

/// One chat reply line.
pub fn format_reply(reply: &Reply, verbosity: u8) -> String {
    if verbosity > 1 {
        let confidence = reply
            .confidence
            .map(|c| format!("{c:.3}"))
            .unwrap_or_else(|| "-".to_string());
        format!(
            "bot: {}  [{} {} {:?}]",
            reply.response, reply.intent, confidence, reply.outcome
        )
    } else {
        format!("bot: {}", reply.response)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_human_lines() {
        let value = json!({
            "intent": "greeting",
            "confidence": 0.5,
            "samples": 3,
            "errors": [],
            "outcomes": { "resolved": 2 }
        });
        let lines = human_lines(&value, 0);
        assert!(lines.contains(&"intent: greeting".to_string()));
        assert!(lines.contains(&"confidence: 0.5000".to_string()));
        assert!(lines.contains(&"samples: 3".to_string()));
        assert!(lines.contains(&"errors: -".to_string()));
        assert!(lines.contains(&"  resolved: 2".to_string()));
    }

    #[test]
    fn test_format_reply() {
        let reply = Reply {
            intent: "greeting".to_string(),
            response: "Hello! How can I help?".to_string(),
            confidence: Some(0.75),
            outcome: ReplyOutcome::Resolved,
        };
        assert_eq!(format_reply(&reply, 1), "bot: Hello! How can I help?");
        assert_eq!(
            format_reply(&reply, 2),
            "bot: Hello! How can I help?  [greeting 0.750 Resolved]"
        );
    }

    #[test]
    fn test_classify_result_is_flat() {
        let result = ClassifyResult {
            input: "Hi!".to_string(),
            normalized: "hi".to_string(),
            reply: Reply {
                intent: "greeting".to_string(),
                response: "Hello".to_string(),
                confidence: None,
                outcome: ReplyOutcome::Resolved,
            },
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["intent"], "greeting");
        assert_eq!(value["outcome"], "resolved");
    }
}
