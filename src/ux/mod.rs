use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::cli::BrowserEngine;
use crate::wire::{AggregateResult, ChannelKind, Role, Turn};

/// Loader text while a request is dispatching.
pub fn loading_label(channel: ChannelKind, engine: BrowserEngine) -> String {
    match channel {
        ChannelKind::TestData => "Generating Test Data".to_string(),
        ChannelKind::CodeGen => match engine {
            BrowserEngine::Playwright => "Generating Playwright Code".to_string(),
            BrowserEngine::Selenium => "Generating Selenium Code".to_string(),
        },
    }
}

pub fn spinner(label: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("spinner template"),
    );
    pb.set_message(label.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn render_transcript(turns: &[Turn]) {
    println!();
    for turn in turns {
        match turn.role {
            Role::System => {
                println!("{}  {}", "[system]".yellow().bold(), turn.content);
            }
            Role::User => {
                println!("{}    {}", "[user]".cyan().bold(), turn.content);
            }
            Role::Assistant => {
                println!("{}", "[assistant]".green().bold());
                println!("{}", turn.content);
                if let Some(meta) = &turn.metadata {
                    println!(
                        "{}",
                        format!(
                            "(input tokens: {}, output tokens: {})",
                            meta.input_tokens, meta.output_tokens
                        )
                        .dimmed()
                    );
                }
            }
        }
    }
    println!();
}

pub fn print_usage_dashboard(agg: &AggregateResult) {
    println!(
        "{}",
        "┏━━━━━━━━━━━━━━━━━━━━━━━━ Usage ━━━━━━━━━━━━━━━━━━━━━━━━━┓".bold()
    );
    println!(
        "  {}: {}   {}: {}   {}: {}   {}: {}",
        "Calls".bold(), agg.calls,
        "Input".cyan().bold(), agg.input_tokens,
        "Output".green().bold(), agg.output_tokens,
        "Total".bold(), agg.total_tokens()
    );
    println!(
        "{}",
        "┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛".bold()
    );
}
