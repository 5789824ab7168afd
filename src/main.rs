use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use memolink::config::Settings;
use memolink::references::{find_references, group_by_path};
use memolink::sort::{sort_paths, SortPathsType};
use memolink::vault::{FileIndex, FsMTime};

#[derive(Parser, Debug)]
#[command(version, about = "Index a folder of linked markdown notes")]
struct Args {
    /// Workspace root
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index the workspace and list dangling refs per file
    Scan,
    /// Print the file a ref points at
    Resolve { reference: String },
    /// List the places that link to any of the given refs
    Refs {
        #[arg(required = true)]
        references: Vec<String>,
        /// Ordering of the files; defaults to the configured one
        #[arg(long, value_enum)]
        sort: Option<SortPathsType>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let root = args
        .root
        .canonicalize()
        .with_context(|| format!("Can't open workspace root {}", args.root.display()))?;

    let settings = Settings::new(&root)?;
    let default_sort = settings.sort_paths;
    let mut index = FileIndex::open(&root, settings)?;
    index.rebuild_all().await?;

    match args.command {
        Command::Scan => {
            let by_path = index.cache().dangling_refs_by_path();
            if args.json {
                println!("{}", serde_json::to_string_pretty(by_path)?);
            } else {
                for (path, refs) in by_path {
                    println!("{}", path.display());
                    for reference in refs {
                        println!("  [[{reference}]]");
                    }
                }
            }
        }
        Command::Resolve { reference } => {
            if let Some(found) = index.open_reference(&reference) {
                println!("{}", found.path.display());
            }
        }
        Command::Refs { references, sort } => {
            let refs = references.iter().map(String::as_str).collect::<Vec<_>>();
            let found = find_references(index.cache(), &refs, &[], index.content()).await?;
            let grouped = group_by_path(found);
            let order = sort_paths(sort.unwrap_or(default_sort), &grouped, &FsMTime).await?;

            if args.json {
                let ordered = order
                    .iter()
                    .filter_map(|path| grouped.get(path))
                    .collect::<Vec<_>>();
                println!("{}", serde_json::to_string_pretty(&ordered)?);
            } else {
                for path in order {
                    println!("{path}");
                    for found in grouped.get(&path).into_iter().flatten() {
                        println!("  {}: {}", found.line + 1, found.match_text);
                    }
                }
            }
        }
    }

    index.clear();

    Ok(())
}
