use anyhow::Context;
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

mod capture;
mod cli;
mod config;
mod errors;
mod log;
mod orchestrator;
mod prompt;
mod provider;
mod selector;
mod session;
mod ux;
mod wire;

use capture::CapturedContent;
use wire::ChannelKind;

fn read_fragment(args: &cli::Args) -> anyhow::Result<CapturedContent> {
    let raw = match &args.dom_file {
        Some(path) => fs_err::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading DOM fragment from stdin")?;
            buf
        }
    };
    match args.dom_format {
        cli::DomFormat::Html => Ok(CapturedContent::Html(raw)),
        cli::DomFormat::Json => {
            let node = serde_json::from_str(&raw).context("parsing DOM fragment as a JSON node tree")?;
            Ok(CapturedContent::Node(node))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    let settings_path = args
        .config
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(|| config::SettingsStore::settings_path(&args.root));
    let settings = config::SettingsStore::load(&settings_path)?;
    settings.update(|s| {
        if let Some(provider) = args.provider {
            s.selected_provider = provider;
        }
        if let Some(model) = &args.model {
            s.selected_model = model.clone();
        }
        s.timeout_secs = args.timeout_secs;
    });

    if args.debug {
        println!("debug: flag enabled");
        println!(
            "debug: default generator type: {}",
            settings.snapshot().default_generator_type.display_name()
        );
        log::print_planned_paths(Path::new(&args.root));
    }

    let channel = if args.test_data { ChannelKind::TestData } else { ChannelKind::CodeGen };
    let orch = Arc::new(orchestrator::Orchestrator::new(
        channel,
        settings.clone(),
        Arc::new(provider::HttpProviderSource),
        Arc::new(capture::NoopSelectionPort),
        args.debug,
    ));

    // The file/stdin read stands in for the inspection collaborator: the
    // fragment is pushed through the inbound capture channel, not handed to
    // the orchestrator directly.
    let fragment = read_fragment(&args)?;
    let (capture_tx, capture_rx) = mpsc::channel(1);
    let feed = orch.capture().attach(capture_rx);
    capture_tx
        .send(fragment)
        .await
        .context("delivering captured content")?;
    drop(capture_tx);
    feed.await.context("capture feed task")?;

    let params = orchestrator::RequestParams {
        language: args.language,
        engine: args.engine,
        modes: args.modes.clone(),
        record_count: (args.records > 0).then_some(args.records),
        user_instruction: args.instruction.clone().unwrap_or_default(),
        page_url: args.page_url.clone(),
    };

    let spin = (!args.debug).then(|| ux::spinner(&ux::loading_label(channel, args.engine)));
    let published = orch.generate(params).await?;
    if let Some(s) = spin {
        s.finish_and_clear();
    }

    ux::render_transcript(&orch.transcript().turns());

    if let Some(published) = &published {
        let saved = log::save_stage(
            Path::new(&args.root),
            published,
            args.save_request,
            args.save_response,
        )?;
        if args.debug {
            log::print_saved_paths(&saved);
        }
        ux::print_usage_dashboard(&published.aggregate);
    }

    Ok(())
}
