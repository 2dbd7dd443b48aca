//! Purpose: `redd` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Every item is emitted as one JSON line on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::io::{self, IsTerminal};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum, error::ErrorKind as ClapErrorKind};
use redd::api::{
    Client, DEFAULT_BASE_URL, Error, ErrorKind, HttpTransport, LazyEntity, ListItem, Listing,
    Model, OAUTH_BASE_URL, Params, Sort, Stream, StreamOptions, to_exit_code,
};
use serde_json::{Map, Value, json};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "redd",
    version,
    about = "Lazy reddit object model: fetch things, page listings, follow streams",
    after_help = r#"EXAMPLES
  $ redd about rust
  $ redd listing rust --sort top --time week --limit 25 --pages 2
  $ redd stream rust --comments --max 10
  $ RUST_LOG=redd=debug redd user spez"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(long, help = "API origin (default: www, or oauth when --token is set)")]
    base_url: Option<String>,
    #[arg(long, help = "Pre-obtained OAuth bearer token")]
    token: Option<String>,
    #[arg(long, help = "User-Agent header sent with every request")]
    user_agent: Option<String>,
    #[arg(long, default_value_t = 30, help = "Request timeout in seconds")]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a subreddit's about data
    About { subreddit: String },
    /// Print a user's about data
    User { name: String },
    /// Print the items of a subreddit listing, one per line
    Listing {
        subreddit: String,
        #[arg(long, value_enum, default_value = "hot")]
        sort: SortArg,
        #[arg(long, help = "Items per page")]
        limit: Option<u32>,
        #[arg(long, default_value_t = 1, help = "Pages to follow")]
        pages: usize,
        #[arg(long, help = "Time window for top/controversial (hour, day, week, ...)")]
        time: Option<String>,
    },
    /// Follow new posts (or comments) as they appear
    Stream {
        subreddit: String,
        #[arg(long, help = "Follow comments instead of posts")]
        comments: bool,
        #[arg(long, help = "Stop after this many items")]
        max: Option<usize>,
        #[arg(long, default_value_t = 100, help = "Items requested per poll")]
        limit: usize,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SortArg {
    Hot,
    New,
    Top,
    Controversial,
    Comments,
    Rising,
    Gilded,
}

impl From<SortArg> for Sort {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Hot => Sort::Hot,
            SortArg::New => Sort::New,
            SortArg::Top => Sort::Top,
            SortArg::Controversial => Sort::Controversial,
            SortArg::Comments => Sort::Comments,
            SortArg::Rising => Sort::Rising,
            SortArg::Gilded => Sort::Gilded,
        }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(code) => code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<i32, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(code);
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage).with_message(clap_error_summary(&err)));
            }
        },
    };

    init_tracing();
    let client = build_client(&cli)?;
    match cli.command {
        Command::About { subreddit } => {
            let subreddit = client.subreddit(&subreddit);
            emit_resolved(subreddit.entity())?;
        }
        Command::User { name } => {
            let user = client.user(&name);
            emit_resolved(user.entity())?;
        }
        Command::Listing {
            subreddit,
            sort,
            limit,
            pages,
            time,
        } => {
            let mut params = Params::new();
            if let Some(limit) = limit {
                params.insert("limit".to_string(), limit.to_string());
            }
            if let Some(time) = time {
                params.insert("time".to_string(), time);
            }
            let listing: Listing<LazyEntity> =
                client.subreddit(&subreddit).listing(sort.into(), params)?;
            for page in listing.pages().take(pages) {
                for item in page? {
                    emit_json(ListItem::to_json(&item));
                }
            }
        }
        Command::Stream {
            subreddit,
            comments,
            max,
            limit,
        } => {
            let subreddit = client.subreddit(&subreddit);
            let options = StreamOptions::new().with_limit(limit);
            if comments {
                follow(subreddit.comment_stream(options)?, max)?;
            } else {
                follow(subreddit.post_stream(options)?, max)?;
            }
        }
    }
    Ok(0)
}

fn build_client(cli: &Cli) -> Result<Client, Error> {
    let base_url = match (&cli.base_url, &cli.token) {
        (Some(base_url), _) => base_url.clone(),
        (None, Some(_)) => OAUTH_BASE_URL.to_string(),
        (None, None) => DEFAULT_BASE_URL.to_string(),
    };
    // The www origin only serves JSON under `.json` paths; the oauth origin never does.
    let mut transport = HttpTransport::new(base_url)?
        .with_json_suffix(cli.token.is_none())
        .with_timeout(Duration::from_secs(cli.timeout));
    if let Some(token) = &cli.token {
        transport = transport.with_token(token.clone());
    }
    if let Some(user_agent) = &cli.user_agent {
        transport = transport.with_user_agent(user_agent.clone());
    }
    Ok(Client::new(transport))
}

fn emit_resolved(entity: &LazyEntity) -> Result<(), Error> {
    entity.resolve()?;
    emit_json(ListItem::to_json(entity));
    Ok(())
}

/// Print stream items until `max` is reached; transient failures are logged and retried.
fn follow<T: ListItem>(stream: Stream<T>, max: Option<usize>) -> Result<(), Error> {
    if max == Some(0) {
        return Ok(());
    }
    let mut emitted = 0;
    for item in stream {
        match item {
            Ok(item) => {
                emit_json(item.to_json());
                emitted += 1;
                if max.is_some_and(|max| emitted >= max) {
                    break;
                }
            }
            Err(err) if is_transient(err.kind()) => {
                warn!(error = %err, "stream poll failed");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::Io | ErrorKind::Server | ErrorKind::RateLimited
    )
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_json(value: Value) {
    let json = serde_json::to_string(&value)
        .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("error: {err}");
        for cause in error_causes(err) {
            eprintln!("  caused by: {cause}");
        }
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error",
        ErrorKind::Usage => "usage error",
        ErrorKind::UnknownAttribute => "unknown attribute",
        ErrorKind::NoMorePages => "no more pages",
        ErrorKind::Reentrant => "attribute read during its own fetch",
        ErrorKind::NotFound => "not found",
        ErrorKind::Permission => "permission denied",
        ErrorKind::RateLimited => "rate limited",
        ErrorKind::Server => "server error",
        ErrorKind::Io => "i/o error",
        ErrorKind::Decode => "unexpected response shape",
    }
    .to_string()
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(entity) = err.entity() {
        inner.insert("entity".to_string(), json!(entity));
    }
    if let Some(field) = err.field() {
        inner.insert("field".to_string(), json!(field));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path));
    }
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }
    json!({ "error": Value::Object(inner) })
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
