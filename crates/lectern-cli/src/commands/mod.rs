use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lectern_core::bundles::{self, EventBundle, PaperBundle};
use lectern_core::models::RecordKind;
use lectern_core::rank::ScoredHit;
use lectern_core::{Archive, ArchiveConfig, ContentRenderer};
use serde_json::json;
use walkdir::WalkDir;

use crate::cli::{Cli, Commands, SearchKindArg};

const SNIPPET_CHARS: usize = 240;

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Search(args) => {
            let archive = open_archive(cli.data.as_deref(), None)?;
            let hits = match args.kind {
                SearchKindArg::All => archive.search(&args.query),
                SearchKindArg::Talks => archive.search_talks(&args.query),
                SearchKindArg::Papers => archive.search_papers(&args.query),
            };
            let rows: Vec<serde_json::Value> = hits
                .iter()
                .take(args.limit)
                .map(|hit| hit_row(&archive, hit))
                .collect();
            print_json(&rows)
        }
        Commands::Suggest(args) => {
            let mut archive = open_archive(cli.data.as_deref(), None)?;
            print_json(&archive.suggestions(&args.query))
        }
        Commands::Render(args) => {
            let archive = open_archive(cli.data.as_deref(), args.base_url.as_deref())?;
            let html = archive.render_record(&args.id)?;
            println!("{html}");
            Ok(())
        }
        Commands::RenderFile(args) => {
            let raw = fs::read_to_string(&args.path)
                .with_context(|| format!("failed to read {}", args.path.display()))?;
            let config = archive_config(args.base_url.as_deref())?;
            let renderer = ContentRenderer::new(config.render);
            println!("{}", renderer.render(&raw, args.format.into()));
            Ok(())
        }
        Commands::Stats => {
            let archive = open_archive(cli.data.as_deref(), None)?;
            print_json(&archive.stats())
        }
    }
}

fn open_archive(data: Option<&Path>, base_url: Option<&str>) -> Result<Archive> {
    let Some(data) = data else {
        anyhow::bail!("--data <DIR> is required for this command");
    };
    let config = archive_config(base_url)?;
    let mut archive = Archive::new(config);
    load_data_dir(&mut archive, data);
    Ok(archive)
}

fn archive_config(base_url: Option<&str>) -> Result<ArchiveConfig> {
    let mut config = ArchiveConfig::from_env().context("invalid configuration")?;
    if let Some(raw) = base_url {
        config = config.with_base_url(raw).context("invalid --base-url")?;
    }
    Ok(config)
}

fn hit_row(archive: &Archive, hit: &ScoredHit) -> serde_json::Value {
    let snippet = match hit.kind {
        RecordKind::Talk => archive
            .talk(hit.id.as_ref())
            .map(|talk| talk.abstract_snippet(SNIPPET_CHARS)),
        RecordKind::Paper => archive
            .paper(hit.id.as_ref())
            .map(|paper| paper.abstract_snippet(SNIPPET_CHARS)),
    }
    .filter(|snippet| !snippet.is_empty());
    json!({
        "id": hit.id.as_ref(),
        "kind": hit.kind,
        "title": hit.title.as_ref(),
        "collection": hit.collection_key.as_ref(),
        "score": hit.score,
        "snippet": snippet,
    })
}

/// Loads whichever bundle layout the data directory offers: `events/` and
/// `papers/` subdirectories (manifest-driven when `index.json` exists,
/// discovered by walking otherwise), or a flat directory of bundle files.
/// Unreadable files are skipped with a warning so one bad bundle cannot
/// take down the whole load.
fn load_data_dir(archive: &mut Archive, data: &Path) {
    let events_dir = data.join("events");
    let papers_dir = data.join("papers");
    if !events_dir.is_dir() && !papers_dir.is_dir() {
        load_flat_dir(archive, data);
        return;
    }
    if events_dir.is_dir() {
        load_event_dir(archive, &events_dir);
    }
    if papers_dir.is_dir() {
        load_paper_dir(archive, &papers_dir);
    }
}

fn load_event_dir(archive: &mut Archive, dir: &Path) {
    let mut files: Vec<PathBuf> = Vec::new();
    match read_manifest(dir, bundles::parse_event_manifest) {
        Some(manifest) => {
            archive.set_event_data_version(manifest.data_version);
            files.extend(manifest.event_files.iter().map(|name| dir.join(name)));
        }
        None => files = discover_json(dir),
    }
    let parsed = files
        .iter()
        .filter_map(|path| read_bundle(path, bundles::parse_event_bundle))
        .collect();
    let report = archive.load_events(parsed);
    if report.dropped > 0 {
        tracing::warn!(
            dropped = report.dropped,
            first_error = ?report.first_error,
            "event records dropped during load"
        );
    }
}

fn load_paper_dir(archive: &mut Archive, dir: &Path) {
    let mut files: Vec<PathBuf> = Vec::new();
    match read_manifest(dir, bundles::parse_paper_manifest) {
        Some(manifest) => {
            archive.set_paper_data_version(manifest.data_version);
            files.extend(manifest.paper_files.iter().map(|name| dir.join(name)));
        }
        None => files = discover_json(dir),
    }
    let parsed = files
        .iter()
        .filter_map(|path| read_bundle(path, bundles::parse_paper_bundle))
        .collect();
    let report = archive.load_papers(parsed);
    if report.dropped > 0 {
        tracing::warn!(
            dropped = report.dropped,
            first_error = ?report.first_error,
            "paper records dropped during load"
        );
    }
}

/// A flat directory mixes event and paper bundles; the top-level JSON keys
/// tell them apart.
fn load_flat_dir(archive: &mut Archive, dir: &Path) {
    if !dir.is_dir() {
        tracing::warn!(path = %dir.display(), "data directory does not exist");
        return;
    }
    let mut events: Vec<EventBundle> = Vec::new();
    let mut papers: Vec<PaperBundle> = Vec::new();
    for path in discover_json(dir) {
        let Some(raw) = read_file(&path) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) else {
            tracing::warn!(path = %path.display(), "skipping unparseable file");
            continue;
        };
        if value.get("talks").is_some() {
            if let Some(bundle) = read_bundle(&path, bundles::parse_event_bundle) {
                events.push(bundle);
            }
        } else if value.get("papers").is_some() {
            if let Some(bundle) = read_bundle(&path, bundles::parse_paper_bundle) {
                papers.push(bundle);
            }
        } else {
            tracing::debug!(path = %path.display(), "not a bundle file");
        }
    }
    let mut report = archive.load_events(events);
    report.absorb(&archive.load_papers(papers));
    if report.dropped > 0 {
        tracing::warn!(
            dropped = report.dropped,
            first_error = ?report.first_error,
            "records dropped during load"
        );
    }
}

fn read_manifest<T>(dir: &Path, parse: impl Fn(&str) -> lectern_core::Result<T>) -> Option<T> {
    let raw = fs::read_to_string(dir.join("index.json")).ok()?;
    match parse(&raw) {
        Ok(manifest) => Some(manifest),
        Err(err) => {
            tracing::warn!(
                path = %dir.display(),
                %err,
                "unreadable manifest, walking directory instead",
            );
            None
        }
    }
}

fn read_bundle<T>(path: &Path, parse: impl Fn(&str) -> lectern_core::Result<T>) -> Option<T> {
    let raw = read_file(path)?;
    match parse(&raw) {
        Ok(bundle) => Some(bundle),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "skipping unparseable bundle");
            None
        }
    }
}

fn read_file(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(raw) => Some(raw),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "skipping unreadable file");
            None
        }
    }
}

fn discover_json(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter(|path| path.file_name().is_none_or(|name| name != "index.json"))
        .collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
