use clap::{Parser, Subcommand};
use coursebook::cli::{self as prog_cli, Command, OutputMode, Session};
use coursebook::config::{self, AppConfig, Settings};
use coursebook::course::{Course, TagValidation};
use coursebook::playground::CourseQuery;
use coursebook::{ConnectOptions, Database, logger};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "coursebook", version, about = "Course catalogue on an embedded document store", long_about = None)]
struct Cli {
    /// Path to a config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Connection string, e.g. mongodb://localhost/playground
    #[arg(long, global = true)]
    uri: Option<String>,
    /// Parent directory of on-disk stores
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "error|warn|info|debug|trace")]
    log_level: Option<String>,
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true, value_parser = ["json", "plain", "human"], default_value = "json")]
    output: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Create a course")]
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        author: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        published: bool,
        #[arg(long)]
        price: Option<f64>,
    },
    #[command(about = "List one page of courses, sorted by name")]
    List {
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        published: Option<bool>,
        #[arg(long, help = "Match author OR published instead of both")]
        any: bool,
        #[arg(long, help = "Extra JSON filter, e.g. '{\"price\": {\"$gte\": 10}}'")]
        filter: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
        #[arg(long, default_value = "name")]
        sort: String,
        #[arg(long, default_value = "name tags")]
        select: String,
    },
    #[command(about = "Find courses with a JSON filter")]
    Find {
        #[arg(default_value = "")]
        filter: String,
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        select: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        skip: Option<usize>,
    },
    #[command(about = "Count courses matching a JSON filter")]
    Count {
        #[arg(default_value = "")]
        filter: String,
    },
    #[command(about = "Update a course by id with a JSON object of fields")]
    Update {
        id: String,
        set: String,
        #[arg(long, help = "Update in place and return the new document")]
        direct: bool,
    },
    #[command(about = "Remove a course by id")]
    Remove { id: String },
    #[command(about = "Insert generated courses")]
    Seed {
        #[arg(default_value_t = 10)]
        count: usize,
    },
    #[command(about = "Rewrite the write-ahead log to the live state")]
    Compact,
    #[command(about = "Print store and build information")]
    Info,
}

fn to_command(cmd: Commands, settings: &Settings) -> Result<Command, Box<dyn std::error::Error>> {
    Ok(match cmd {
        Commands::Create { name, category, author, tags, published, price } => {
            let mut course = Course::new(name, category).tags(tags);
            course.author = author;
            course.is_published = published;
            course.price = price;
            Command::Create { course }
        }
        Commands::List { author, published, any, filter, page, page_size, sort, select } => {
            let filter = filter.as_deref().map(prog_cli::json_arg).transpose()?;
            let query = CourseQuery {
                author,
                is_published: published,
                any_of: any,
                filter,
                page_number: page,
                page_size: page_size.filter(|n| *n > 0).unwrap_or(settings.page_size),
                sort,
                select,
            };
            Command::List { query }
        }
        Commands::Find { filter, sort, select, limit, skip } => {
            Command::Find { filter_json: filter, sort, select, limit, skip }
        }
        Commands::Count { filter } => Command::Count { filter_json: filter },
        Commands::Update { id, set, direct } => Command::Update { id, set_json: set, direct },
        Commands::Remove { id } => Command::Remove { id },
        Commands::Seed { count } => Command::Seed { count },
        Commands::Compact => Command::Compact,
        Commands::Info => Command::Info,
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let overrides = AppConfig {
        uri: cli.uri.clone(),
        data_dir: cli.data_dir.clone(),
        log_dir: cli.log_dir.clone(),
        log_level: cli.log_level.clone(),
        ..AppConfig::default()
    };
    let settings = match config::load(overrides, cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) =
        logger::configure_logging(Some(&settings.log_dir), Some(&settings.log_level), None)
    {
        eprintln!("warning: {e}");
    }

    let db = Database::connect(&settings.uri, &ConnectOptions::in_dir(&settings.data_dir));
    let tags = match settings.tag_validator_delay_ms {
        0 => TagValidation::Sync,
        ms => TagValidation::Async { delay: Duration::from_millis(ms) },
    };
    let session = Session::new(db, tags);
    let mode = match cli.output.as_str() {
        "plain" => OutputMode::Plain,
        "human" => OutputMode::Human,
        _ => OutputMode::Json,
    };

    let result = match to_command(cli.command, &settings) {
        Ok(cmd) => {
            let mut buf = Vec::new();
            let r = prog_cli::run_with_format(&session, cmd, mode, &mut buf).await;
            print!("{}", String::from_utf8_lossy(&buf));
            r.map_err(Into::into)
        }
        Err(e) => Err(e),
    };
    if session.db.is_connected()
        && let Err(e) = session.db.flush()
    {
        log::warn!("flush: {e}");
    }
    if let Err(e) = result {
        log::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
