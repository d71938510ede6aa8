//! Example prompts offered to new users.

use serde::Serialize;

/// A ready-made automation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExamplePrompt {
    pub title: &'static str,
    pub prompt: &'static str,
    pub category: &'static str,
}

const EXAMPLES: &[ExamplePrompt] = &[
    ExamplePrompt {
        title: "Contact form alerts",
        prompt: "Send me an email when someone submits my contact form",
        category: "Email",
    },
    ExamplePrompt {
        title: "Signup notifications",
        prompt: "Notify my team in Slack every time we get a new signup",
        category: "Communication",
    },
    ExamplePrompt {
        title: "Morning report",
        prompt: "Run a daily report at 9am and fetch the latest sales data",
        category: "Data",
    },
    ExamplePrompt {
        title: "Issue to card",
        prompt: "Create a Trello card whenever a GitHub issue is opened",
        category: "Development",
    },
    ExamplePrompt {
        title: "Customer sync",
        prompt: "Add new Stripe customers to HubSpot as contacts",
        category: "CRM",
    },
    ExamplePrompt {
        title: "Lead capture",
        prompt: "Save Typeform responses to Google Sheets for lead tracking",
        category: "Survey",
    },
    ExamplePrompt {
        title: "Order fulfilment",
        prompt: "When a Shopify order is placed, create an invoice in QuickBooks",
        category: "E-commerce",
    },
    ExamplePrompt {
        title: "Content digest",
        prompt: "Summarize new RSS articles with OpenAI and post them to Discord",
        category: "AI",
    },
];

/// The built-in example prompts.
pub fn example_prompts() -> &'static [ExamplePrompt] {
    EXAMPLES
}
