use std::{path::PathBuf, process::ExitCode};

use tracing_subscriber::EnvFilter;

use mizu::launch_io::parse_launch_jar_arg;
use mizu::settings_io::load_startup_settings;
use mizu::startup_diagnostics::log_startup_diagnostics;
use mizu::{classify, ArchiveNode, ArchiveSession, ContentKind, NestedState, NodeKind, Selection};

const USAGE: &str =
    "usage: mizu <archive.jar|file://...> [--filter QUERY] [--show path/in/Archive.class] [--timeout SECS]";

#[derive(Debug, Default)]
struct CliArgs {
    archive: Option<PathBuf>,
    filter: Option<String>,
    show: Option<String>,
    timeout_secs: Option<u64>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--filter" => parsed.filter = Some(next_value(&mut args, "--filter")?),
            "--show" => parsed.show = Some(next_value(&mut args, "--show")?),
            "--timeout" => {
                let raw = next_value(&mut args, "--timeout")?;
                let secs = raw
                    .parse::<u64>()
                    .map_err(|_| format!("invalid --timeout value: {raw}"))?;
                parsed.timeout_secs = Some(secs);
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            flag if flag.starts_with("--") => return Err(format!("unknown option: {flag}")),
            _ if parsed.archive.is_none() => {
                parsed.archive =
                    Some(parse_launch_jar_arg(&arg).unwrap_or_else(|| PathBuf::from(arg.trim())));
            }
            _ => return Err(format!("unexpected argument: {arg}")),
        }
    }
    Ok(parsed)
}

/// `RUST_LOG` wins when it parses; otherwise the level from the settings.
fn log_filter(env_directives: Option<&str>, fallback: tracing::Level) -> EnvFilter {
    env_directives
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::default().add_directive(fallback.into()))
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("{flag} needs a value"))
}

fn render_tree(node: &ArchiveNode, depth: usize, out: &mut String) {
    let marker = match &node.kind {
        NodeKind::Directory => "/",
        NodeKind::File => "",
        NodeKind::NestedArchive(NestedState::Unresolved) => " [jar]",
        NodeKind::NestedArchive(NestedState::Expanded { .. }) => " [jar, expanded]",
    };
    out.push_str(&"  ".repeat(depth));
    out.push_str(&node.name);
    out.push_str(marker);
    out.push('\n');
    for child in &node.children {
        render_tree(child, depth + 1, out);
    }
}

fn print_tree(node: &ArchiveNode) {
    let mut out = String::new();
    render_tree(node, 0, &mut out);
    print!("{out}");
}

async fn show_entry(session: &mut ArchiveSession, entry: &str) -> ExitCode {
    let segments = entry
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<&str>>();

    let selection = if classify(entry) == ContentKind::Bytecode {
        match session.spawn_decompile(&segments).join().await {
            Ok(Ok(source)) => Selection::Decompiled(source),
            Ok(Err(error)) => Selection::Message(format!("// {error}")),
            Err(error) => Selection::Message(format!("// {error}")),
        }
    } else {
        session.select_entry(&segments)
    };

    match selection {
        Selection::Directory { name, child_count } => {
            println!("{name}/ ({child_count} children)");
        }
        Selection::Content(payload) => println!("{}", payload.display_text()),
        Selection::Decompiled(source) => print!("{}", source.text),
        Selection::Expanded(children) => {
            for child in &children {
                print_tree(child);
            }
        }
        Selection::Message(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut settings = load_startup_settings();
    let level = if settings.debug_logging_enabled() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(env_directives.as_deref(), level))
        .with_writer(std::io::stderr)
        .init();
    if settings.debug_logging_enabled() {
        log_startup_diagnostics(&settings);
    }

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };
    let Some(archive) = args.archive else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    if let Some(secs) = args.timeout_secs {
        settings.decompiler.timeout_secs = secs;
    }
    let retention = settings.workspace.retention();

    let mut session = match ArchiveSession::open_archive(&archive, settings) {
        Ok(session) => session,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };
    let swept = session.workspaces().sweep_stale_sessions(retention);
    if swept > 0 {
        tracing::info!(swept, "removed stale workspace sessions");
    }

    if let Some(entry) = args.show.as_deref() {
        return show_entry(&mut session, entry).await;
    }
    match args.filter.as_deref() {
        Some(query) => match session.filter_tree(query) {
            Some(filtered) => print_tree(&filtered),
            None => {
                eprintln!("no entries match {query:?}");
                return ExitCode::FAILURE;
            }
        },
        None => print_tree(session.root()),
    }
    ExitCode::SUCCESS
}
