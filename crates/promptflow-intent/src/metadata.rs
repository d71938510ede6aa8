//! Metadata derived from a prompt and its synthesized graph: display name,
//! description, setup time estimate and setup instructions.
//!
//! All functions here are pure and operate on characters, not bytes, so
//! truncation never splits a multi-byte character.

use promptflow_catalog::ServiceDefinition;

use crate::workflow::WorkflowNode;

const NAME_WORDS: usize = 5;
const NAME_MAX_CHARS: usize = 50;
const DESCRIPTION_MAX_CHARS: usize = 100;
const ELLIPSIS: &str = "...";

const BASE_SETUP_MINUTES: usize = 5;
const MINUTES_PER_NODE: usize = 2;
const MINUTES_PER_SERVICE: usize = 3;

/// Cut `text` to at most `max_chars` characters, replacing the tail with an
/// ellipsis when it is too long.
fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// First five words of the prompt, each capitalized, at most 50 characters.
pub fn workflow_name(prompt: &str) -> String {
    let name = prompt
        .split_whitespace()
        .take(NAME_WORDS)
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");
    truncate_with_ellipsis(&name, NAME_MAX_CHARS)
}

/// The prompt cut to 100 characters, followed by the detected services.
pub fn workflow_description(prompt: &str, services: &[&ServiceDefinition]) -> String {
    let base = truncate_with_ellipsis(prompt, DESCRIPTION_MAX_CHARS);
    if services.is_empty() {
        return base;
    }
    let names = services
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!("{base} (Uses: {names})")
}

/// Estimated minutes to get the workflow running.
pub fn setup_minutes(node_count: usize, service_count: usize) -> usize {
    BASE_SETUP_MINUTES + MINUTES_PER_NODE * node_count + MINUTES_PER_SERVICE * service_count
}

/// Render minutes as `"N minutes"` below an hour, `"Hh Mm"` otherwise.
pub fn format_setup_time(minutes: usize) -> String {
    if minutes < 60 {
        format!("{minutes} minutes")
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

/// Human estimate for a graph of `node_count` nodes using `service_count`
/// services.
pub fn estimated_setup_time(node_count: usize, service_count: usize) -> String {
    format_setup_time(setup_minutes(node_count, service_count))
}

/// Ordered, sequentially numbered setup steps.
///
/// Import and open come first, then one credential step per auth-requiring
/// service, then one step per node category present (webhook, email,
/// schedule), then test and activate.
pub fn setup_instructions(nodes: &[WorkflowNode], services: &[&ServiceDefinition]) -> Vec<String> {
    let mut steps: Vec<String> = vec![
        "Import this workflow JSON into your n8n instance".into(),
        "Open the workflow in n8n editor".into(),
    ];

    steps.extend(
        services
            .iter()
            .filter(|s| s.auth_required)
            .map(|s| format!("Configure {} credentials in n8n settings", s.name)),
    );

    let has_type = |needle: &str| {
        nodes
            .iter()
            .any(|n| n.node_type.to_lowercase().contains(needle))
    };
    if has_type("webhook") {
        steps.push("Configure webhook URL in your external service".into());
    }
    if has_type("email") {
        steps.push("Set up SMTP credentials for email sending".into());
    }
    if has_type("schedule") {
        steps.push("Adjust schedule timing as needed".into());
    }

    steps.push("Test the workflow with sample data".into());
    steps.push("Activate the workflow when ready".into());

    steps
        .into_iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {step}", i + 1))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
