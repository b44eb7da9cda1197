use std::ffi::OsString;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rmcp::{ServiceExt, transport::stdio};
use tokio::process::Child;
use ugui_kb_rs::client::{DEFAULT_BASE_URL, HttpClient, KbClient, LocalClient};
use ugui_kb_rs::index::Catalog;
use ugui_kb_rs::server::{self, SharedKb, tools::KnowledgeTools};
use ugui_kb_rs::{DocumentIndex, DocumentStore, FsStore, KnowledgeBase, MemoryStore, pack};

#[cfg(feature = "trace")]
use tracing_subscriber::EnvFilter;

const DEFAULT_API_PORT: u16 = 5000;
const DEFAULT_RPC_PORT: u16 = 8000;
const DEFAULT_WEB_PORT: u16 = 8080;

#[derive(Parser)]
#[clap(name = "ugui-kb", version, about = "UGUI knowledge base servers and client")]
struct Cli {
    #[clap(flatten)]
    index: IndexArgs,
    #[clap(subcommand)]
    command: Command,
}

/// Where the knowledge base lives and how its index is built
#[derive(Args, Clone)]
struct IndexArgs {
    /// Knowledge base root directory (holds Docs/, WebViewer/ and Assets/)
    #[clap(long, env = "UGUI_KB_ROOT", default_value = ".", global = true)]
    root: PathBuf,
    /// Archive written by `pack`; its documents are served from memory
    #[clap(long, env = "UGUI_KB_BUNDLE", global = true)]
    bundle: Option<PathBuf>,
    /// JSON catalog listing categories, documents and visualizations
    #[clap(long, env = "UGUI_KB_CATALOG", global = true)]
    catalog: Option<PathBuf>,
    /// Markdown index document whose table rows link to the documents (ignored with --catalog)
    #[clap(long, global = true)]
    index_doc: Option<PathBuf>,
    /// Discover documents as <docs-dir>/<category>/*.md instead of using a fixed table
    #[clap(long, global = true)]
    scan: bool,
    /// Documents directory used by --scan, relative to the root
    #[clap(long, default_value = "Docs", global = true)]
    docs_dir: PathBuf,
    /// Load every document into memory at startup
    #[clap(long, global = true)]
    preload: bool,
}

impl IndexArgs {
    /// Flags reproducing this configuration in a child process
    fn forwarded_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--root".into(), self.root.clone().into()];
        if let Some(bundle) = &self.bundle {
            args.extend(["--bundle".into(), bundle.clone().into()]);
        }
        if let Some(catalog) = &self.catalog {
            args.extend(["--catalog".into(), catalog.clone().into()]);
        }
        if let Some(index_doc) = &self.index_doc {
            args.extend(["--index-doc".into(), index_doc.clone().into()]);
        }
        if self.scan {
            args.push("--scan".into());
        }
        args.extend(["--docs-dir".into(), self.docs_dir.clone().into()]);
        if self.preload {
            args.push("--preload".into());
        }
        args
    }
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on
    #[clap(long, default_value = "0.0.0.0")]
    host: IpAddr,
    /// Port to listen on
    #[clap(long)]
    port: Option<u16>,
}

impl ServeArgs {
    fn addr(&self, default_port: u16) -> SocketAddr {
        SocketAddr::new(self.host, self.port.unwrap_or(default_port))
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Read the knowledge base in-process
    Local,
    /// Query a running API server
    Server,
}

#[derive(Args)]
struct ClientArgs {
    #[clap(long, value_enum, default_value_t = Mode::Local)]
    mode: Mode,
    /// API server address used in server mode
    #[clap(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

#[derive(Subcommand)]
enum Command {
    /// Run the REST API server
    Api(ServeArgs),
    /// Run the tool-call RPC server
    Rpc(ServeArgs),
    /// Run the MCP tool server over stdio
    Mcp {
        /// Require this key in every tool call
        #[clap(long, env = "UGUI_KB_API_KEY")]
        api_key: Option<String>,
        /// Log file (stdout carries the protocol)
        #[clap(long, default_value = "server.log")]
        log_file: PathBuf,
    },
    /// Serve the root directory as static files for the visualization pages
    Web(ServeArgs),
    /// Start the API server and the web viewer as child processes
    Start {
        #[clap(long, default_value_t = DEFAULT_API_PORT)]
        api_port: u16,
        #[clap(long, default_value_t = DEFAULT_WEB_PORT)]
        web_port: u16,
    },
    /// Package the knowledge base into a zip archive
    Pack {
        #[clap(long, short, default_value = "ugui_kb_pack.zip")]
        output: PathBuf,
    },
    #[clap(flatten)]
    Client(ClientCommand),
}

#[derive(Subcommand)]
enum ClientCommand {
    /// List all document categories
    Categories(ClientArgs),
    /// List the documents of a category
    Documents {
        category: String,
        #[clap(flatten)]
        client: ClientArgs,
    },
    /// Show a document
    Document {
        category: String,
        doc_id: String,
        #[clap(flatten)]
        client: ClientArgs,
    },
    /// Search documents for a keyword
    Search {
        keyword: String,
        #[clap(flatten)]
        client: ClientArgs,
    },
    /// List all visualization pages
    Visualizations(ClientArgs),
    /// Show where a visualization page can be opened
    Visualize {
        diagram_id: String,
        #[clap(flatten)]
        client: ClientArgs,
    },
    /// Show a C# code example
    Example {
        example_id: String,
        #[clap(flatten)]
        client: ClientArgs,
    },
}

#[cfg(feature = "trace")]
fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ugui_kb=debug,ugui_kb_rs=debug,tower_http=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => builder
            .with_writer(std::sync::Mutex::new(std::fs::File::create(path)?))
            .with_ansi(false)
            .init(),
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

#[cfg(not(feature = "trace"))]
fn init_tracing(_log_file: Option<&Path>) -> Result<()> {
    Ok(())
}

fn load_index(args: &IndexArgs) -> Result<DocumentIndex> {
    if !args.root.is_dir() {
        anyhow::bail!("knowledge base root does not exist: {}", args.root.display());
    }

    let index = if let Some(path) = &args.bundle {
        load_bundle(path)?.into_index()
    } else if let Some(path) = &args.catalog {
        let catalog = Catalog::load(path)
            .with_context(|| format!("failed to load catalog {}", path.display()))?;
        DocumentIndex::from_catalog(&args.root, &catalog)
    } else if let Some(path) = &args.index_doc {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read index document {}", path.display()))?;
        DocumentIndex::parse_index_document(&args.root, &text)
    } else if args.scan {
        DocumentIndex::scan(&args.root, args.root.join(&args.docs_dir))?
    } else {
        DocumentIndex::builtin(&args.root)
    };

    tracing::info!(
        "Loaded index with {} documents in {} categories from {:?}",
        index.all().len(),
        index.categories().len(),
        args.root
    );
    Ok(index)
}

fn load_bundle(path: &Path) -> Result<MemoryStore> {
    pack::load_bundle(path).with_context(|| format!("failed to load bundle {}", path.display()))
}

fn open_knowledge_base(args: &IndexArgs) -> Result<SharedKb> {
    if let Some(path) = &args.bundle {
        let store: Box<dyn DocumentStore> = Box::new(load_bundle(path)?);
        return Ok(Arc::new(KnowledgeBase::new(store)));
    }

    let index = load_index(args)?;
    let store: Box<dyn DocumentStore> = if args.preload {
        Box::new(MemoryStore::preload(index))
    } else {
        Box::new(FsStore::new(index))
    };
    Ok(Arc::new(KnowledgeBase::new(store)))
}

fn connect(client: &ClientArgs, index: &IndexArgs) -> Result<Box<dyn KbClient>> {
    Ok(match client.mode {
        Mode::Local => Box::new(LocalClient::new(open_knowledge_base(index)?)),
        Mode::Server => Box::new(HttpClient::new(&client.base_url)?),
    })
}

fn spawn_server(exe: &Path, args: &IndexArgs, command: &str, port: u16) -> Result<Child> {
    let child = tokio::process::Command::new(exe)
        .args(args.forwarded_args())
        .arg(command)
        .arg("--port")
        .arg(port.to_string())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to start the {command} server"))?;
    tracing::info!("Started {} server (pid {:?}) on port {}", command, child.id(), port);
    Ok(child)
}

async fn start(args: &IndexArgs, api_port: u16, web_port: u16) -> Result<()> {
    let index = load_index(args)?;
    let exe = std::env::current_exe()?;

    let mut api = spawn_server(&exe, args, "api", api_port)?;
    let mut web = spawn_server(&exe, args, "web", web_port)?;

    println!("API server:        http://localhost:{api_port}");
    println!("Web viewer server: http://localhost:{web_port}");
    for (name, url) in server::web::viewer_urls(&index, SocketAddr::from(([127, 0, 0, 1], web_port))) {
        println!("  {name}: {url}");
    }
    println!("Press Ctrl+C to stop");

    supervise(&mut api, &mut web, server::shutdown_signal()).await
}

/// Wait for `shutdown` or for either server to exit, then stop whatever is
/// still running. A server exiting on its own is an error.
async fn supervise(api: &mut Child, web: &mut Child, shutdown: impl Future<Output = ()>) -> Result<()> {
    let exited = tokio::select! {
        _ = shutdown => None,
        status = api.wait() => Some(("api", status)),
        status = web.wait() => Some(("web", status)),
    };

    for child in [api, web] {
        if !matches!(child.try_wait(), Ok(None)) {
            continue;
        }
        if let Err(e) = child.kill().await {
            tracing::warn!("Failed to stop child process: {}", e);
        }
    }

    match exited {
        None => Ok(()),
        Some((command, Ok(status))) => anyhow::bail!("the {command} server exited early ({status})"),
        Some((command, Err(e))) => Err(e).with_context(|| format!("failed to wait for the {command} server")),
    }
}

async fn run_client(command: ClientCommand, index: &IndexArgs) -> Result<()> {
    match command {
        ClientCommand::Categories(client) => {
            let overview = connect(&client, index)?.index().await?;
            for category in &overview.categories {
                let count = overview.documents.get(category).map_or(0, |docs| docs.len());
                println!("{category:<20} {count} documents");
            }
        }
        ClientCommand::Documents { category, client } => {
            let overview = connect(&client, index)?.index().await?;
            let docs = overview
                .documents
                .get(&category)
                .with_context(|| format!("category not found: {category}"))?;
            for (id, path) in docs {
                println!("{id:<28} {path}");
            }
        }
        ClientCommand::Document { category, doc_id, client } => {
            let doc = connect(&client, index)?.document(&category, &doc_id).await?;
            println!("== {}/{} ==\n", doc.category, doc.id);
            println!("{}", doc.content);
        }
        ClientCommand::Search { keyword, client } => {
            let response = connect(&client, index)?.search(&keyword).await?;
            println!("Results for '{}': {} matching documents", response.keyword, response.count);
            for (i, result) in response.results.iter().enumerate() {
                println!("\n{}. {}", i + 1, result.title);
                println!("   category: {}", result.category);
                println!("   id:       {}", result.id);
                println!("   path:     {}", result.path);
                for m in &result.matches {
                    println!("   --- line {} ---", m.line);
                    for line in m.context.lines() {
                        println!("   | {line}");
                    }
                }
            }
        }
        ClientCommand::Visualizations(client) => {
            let overview = connect(&client, index)?.index().await?;
            for id in &overview.visualizations {
                println!("{id}");
            }
        }
        ClientCommand::Visualize { diagram_id, client } => {
            let location = connect(&client, index)?.visualization(&diagram_id).await?;
            println!("{location}");
        }
        ClientCommand::Example { example_id, client } => {
            let example = connect(&client, index)?.example(&example_id).await?;
            println!("== {} ==\n", example.id);
            println!("{}", example.content);
        }
    }
    Ok(())
}

/// You can inspect the MCP server using the Model Context Protocol Inspector.
/// npx @modelcontextprotocol/inspector cargo run -- mcp

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Command::Mcp { log_file, .. } => Some(log_file.clone()),
        _ => None,
    };
    init_tracing(log_file.as_deref())?;

    match cli.command {
        Command::Api(args) => {
            let kb = open_knowledge_base(&cli.index)?;
            server::http::serve(kb, args.addr(DEFAULT_API_PORT)).await?;
        }
        Command::Rpc(args) => {
            let kb = open_knowledge_base(&cli.index)?;
            server::rpc::serve(kb, args.addr(DEFAULT_RPC_PORT)).await?;
        }
        Command::Mcp { api_key, .. } => {
            tracing::info!("Starting MCP server");
            let kb = open_knowledge_base(&cli.index)?;
            let service = KnowledgeTools::new(kb, api_key)
                .serve(stdio()).await.inspect_err(|e| {
                    tracing::error!("serving error: {:?}", e);
                })?;

            service.waiting().await?;
        }
        Command::Web(args) => {
            let index = load_index(&cli.index)?;
            server::web::serve(cli.index.root.clone(), &index, args.addr(DEFAULT_WEB_PORT)).await?;
        }
        Command::Start { api_port, web_port } => {
            start(&cli.index, api_port, web_port).await?;
        }
        Command::Pack { output } => {
            let index = load_index(&cli.index)?;
            let summary = pack::pack(&index, &output)?;
            println!(
                "Packed {} documents and {} visualizations into {} ({} skipped)",
                summary.documents,
                summary.visualizations,
                output.display(),
                summary.skipped
            );
        }
        Command::Client(command) => run_client(command, &cli.index).await?,
    }

    Ok(())
}
