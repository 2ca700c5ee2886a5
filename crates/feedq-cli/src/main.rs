//! feedq CLI: query paginated JSON feeds from the command line.

use std::io::{self, Write};

use clap::{Parser, Subcommand, ValueEnum};
use feedq_core::prelude::{ChunkRequest, Document, FeedConfig, Record};
use feedq_exec::{FeedClient, QueryBuilder};
use feedq_io::Source;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "feedq")]
#[command(about = "Lazy queries over paginated spreadsheet-backed JSON feeds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream records from a feed
    Query {
        /// Feed path, relative to the base URL, or an absolute URL
        #[arg(short, long)]
        path: String,

        #[command(flatten)]
        conn: ConnArgs,

        /// Sheet of a multi-sheet document
        #[arg(long)]
        sheet: Option<String>,

        /// Chunk width for paginated fetches (overrides config)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Filter expression, e.g. "section == news" (repeatable, applied in order)
        #[arg(long = "where", value_name = "EXPR")]
        filters: Vec<String>,

        /// Rename a field before filtering (repeatable)
        #[arg(long, value_name = "OLD=NEW")]
        rename: Vec<String>,

        /// Skip this many matching records
        #[arg(long, default_value_t = 0)]
        slice: usize,

        /// Emit at most this many records
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, value_enum, default_value_t = Format::Jsonl)]
        format: Format,
    },

    /// List the sheets of a multi-sheet document
    Sheets {
        #[arg(short, long)]
        path: String,

        #[command(flatten)]
        conn: ConnArgs,
    },
}

#[derive(clap::Args)]
struct ConnArgs {
    /// Origin for relative paths (overrides FEEDQ_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// HTTP timeout in milliseconds (overrides FEEDQ_TIMEOUT_MS)
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// One JSON object per line
    Jsonl,
    /// A single pretty-printed JSON array
    Json,
}

/// Query options after CLI parsing, independent of clap.
#[derive(Debug, Default)]
struct QueryArgs {
    sheet: Option<String>,
    chunk_size: Option<usize>,
    filters: Vec<String>,
    renames: Vec<String>,
    slice: usize,
    limit: Option<usize>,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Query {
            path,
            conn,
            sheet,
            chunk_size,
            filters,
            rename,
            slice,
            limit,
            format,
        } => {
            let args = QueryArgs {
                sheet,
                chunk_size,
                filters,
                renames: rename,
                slice,
                limit,
            };
            run_query(&path, &conn, &args, format).await
        }
        Commands::Sheets { path, conn } => list_sheets(&path, &conn).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn apply_conn_args(cfg: &mut FeedConfig, conn: &ConnArgs) {
    if let Some(url) = &conn.base_url {
        cfg.base_url = Some(url.clone());
    }
    if let Some(ms) = conn.timeout_ms {
        cfg.timeout_ms = ms;
    }
}

fn client_for(conn: &ConnArgs) -> CliResult<FeedClient> {
    let mut cfg = FeedConfig::from_env();
    apply_conn_args(&mut cfg, conn);
    Ok(FeedClient::http(cfg)?)
}

fn parse_rename(pair: &str) -> CliResult<(String, String)> {
    match pair.split_once('=') {
        Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => {
            Ok((from.trim().to_string(), to.trim().to_string()))
        }
        _ => Err(format!("invalid rename '{pair}', expected OLD=NEW").into()),
    }
}

fn build_query(client: &FeedClient, path: &str, args: &QueryArgs) -> CliResult<QueryBuilder> {
    let mut query = client.open(path)?;
    if let Some(sheet) = &args.sheet {
        query = query.sheet(sheet.clone())?;
    }
    if let Some(size) = args.chunk_size {
        query = query.chunks(size)?;
    }
    // Renames first so filters can refer to the new names.
    for pair in &args.renames {
        let (from, to) = parse_rename(pair)?;
        query = query.rename(from, to);
    }
    for expr in &args.filters {
        query = query.filter_expr(expr)?;
    }
    query = query.slice(args.slice);
    if let Some(n) = args.limit {
        query = query.limit(n);
    }
    Ok(query)
}

fn write_records<W: Write>(out: &mut W, records: &[Record], format: Format) -> CliResult<()> {
    match format {
        Format::Jsonl => {
            for record in records {
                serde_json::to_writer(&mut *out, record)?;
                writeln!(out)?;
            }
        }
        Format::Json => {
            serde_json::to_writer_pretty(&mut *out, records)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

async fn run_query(path: &str, conn: &ConnArgs, args: &QueryArgs, format: Format) -> CliResult<()> {
    let client = client_for(conn)?;
    let mut query = build_query(&client, path, args)?;
    let records = query.all().await?;
    let stats = query.stats();
    info!(
        path,
        records = records.len(),
        chunks = stats.chunks_fetched,
        "query complete"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_records(&mut out, &records, format)?;
    out.flush()?;
    Ok(())
}

async fn sheet_names(client: &FeedClient, path: &str) -> CliResult<Vec<String>> {
    let request = ChunkRequest::new(path, 0, 1, None);
    let body = client.source().fetch(&request).await?;
    let doc = Document::parse(body, &request)?;
    Ok(doc.names().to_vec())
}

async fn list_sheets(path: &str, conn: &ConnArgs) -> CliResult<()> {
    let client = client_for(conn)?;
    let names = sheet_names(&client, path).await?;
    if names.is_empty() {
        println!("(single-sheet document)");
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}
