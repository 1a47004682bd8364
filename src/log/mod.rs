use fs_err as fs;
use serde::Serialize;
use serde_json::to_string_pretty;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::orchestrator::Published;
use crate::wire::AggregateResult;

pub struct SavedPaths {
    pub dir: PathBuf,
    pub request: Option<PathBuf>,
    pub response: Option<PathBuf>,
    pub artifact: Option<PathBuf>,
}

fn tx_dir(root: &Path, tx: Uuid) -> PathBuf {
    root.join(".testgen").join("tx").join(tx.to_string())
}

#[derive(Serialize)]
struct ResponseRecord<'a> {
    keys: Vec<&'static str>,
    aggregate: &'a AggregateResult,
}

/// Persist one published request under its transaction directory: the
/// request as sent, the aggregated response with usage, and the raw artifact
/// text for direct copy-out.
pub fn save_stage(
    root: &Path,
    published: &Published,
    save_request: bool,
    save_response: bool,
) -> anyhow::Result<SavedPaths> {
    let dir = tx_dir(root, published.request.tx.id);
    fs::create_dir_all(&dir)?;

    let mut request_path = None;
    let mut response_path = None;
    let mut artifact_path = None;

    if save_request {
        let p = dir.join("generate.request.json");
        fs::write(&p, to_string_pretty(&published.request)?)?;
        request_path = Some(p);
    }

    if save_response {
        let record = ResponseRecord {
            keys: published.keys.iter().map(|k| k.as_str()).collect(),
            aggregate: &published.aggregate,
        };
        let p = dir.join("generate.response.json");
        fs::write(&p, to_string_pretty(&record)?)?;
        response_path = Some(p);

        if !published.aggregate.is_empty() {
            let p = dir.join("artifact.md");
            fs::write(&p, &published.aggregate.text)?;
            artifact_path = Some(p);
        }
    }

    Ok(SavedPaths { dir, request: request_path, response: response_path, artifact: artifact_path })
}

pub fn print_planned_paths(root: &Path) {
    let dir = root.join(".testgen").join("tx");
    println!("debug: transaction artifacts directory: {}", dir.display());
    std::io::stdout().flush().ok();
}

pub fn print_saved_paths(saved: &SavedPaths) {
    println!("debug: artifacts directory: {}", saved.dir.display());
    if let Some(p) = &saved.request {
        println!("debug: request saved at: {}", p.display());
    } else {
        println!("debug: request not saved (flag off)");
    }
    if let Some(p) = &saved.response {
        println!("debug: response saved at: {}", p.display());
    } else {
        println!("debug: response not saved (flag off)");
    }
    if let Some(p) = &saved.artifact {
        println!("debug: artifact saved at: {}", p.display());
    }
    std::io::stdout().flush().ok();
}
