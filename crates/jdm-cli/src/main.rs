use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use jdm_core::normalize::normalize_items;
use jdm_core::{CommitOutcome, EncodeOptions, Key, PathExpression, SessionOptions, ShapeRegistry};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "jdm",
    about = "Create, edit and read JSON documents with staged, all-or-nothing edits",
    version
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
    #[command(flatten)]
    opts: GlobalOpts,
}

#[derive(ClapArgs, Debug)]
struct GlobalOpts {
    /// Log staged operations and commits to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    /// Spaces per indent level when writing (0 = compact)
    #[arg(long, global = true, default_value_t = 4)]
    indent: usize,
    /// Keep numeric-looking strings as strings when writing
    #[arg(long, global = true, default_value_t = false)]
    no_numeric_check: bool,
    /// Zip the previous content next to the document before overwriting it
    #[arg(long, global = true, default_value_t = false)]
    backup: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create a new document from key=value pairs (or list items with --list)
    Create(CreateArgs),
    /// Print a document, or the value at a bracket path
    Get(GetArgs),
    /// Replace existing properties (key=value, value as raw JSON)
    Set(SetArgs),
    /// Add a new property with --key, or push onto a list document
    Append(AppendArgs),
    /// Remove keys or bracket paths, e.g. order[items][0]
    Remove(RemoveArgs),
    /// Project a document onto a shape from a shape table file
    Project(ProjectArgs),
}

#[derive(ClapArgs, Debug)]
struct CreateArgs {
    /// Document to create (.json is appended if missing)
    path: PathBuf,
    /// key=value pairs, value as raw JSON (e.g. name="Ann" age=30)
    entries: Vec<String>,
    /// Treat each entry as a raw JSON list item instead
    #[arg(long, default_value_t = false)]
    list: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Pretty,
    Json,
    Array,
    Object,
}

#[derive(ClapArgs, Debug)]
struct GetArgs {
    /// Document to read
    path: PathBuf,
    /// Bracket path, e.g. order[id]
    #[arg(long)]
    at: Option<String>,
    #[arg(long, value_enum, default_value_t = Format::Pretty)]
    format: Format,
}

#[derive(ClapArgs, Debug)]
struct SetArgs {
    /// Document to edit
    path: PathBuf,
    /// key=value pairs, value as raw JSON
    #[arg(required = true)]
    entries: Vec<String>,
}

#[derive(ClapArgs, Debug)]
struct AppendArgs {
    /// Document to edit
    path: PathBuf,
    /// New property name; without it the value is pushed onto a list document
    #[arg(long)]
    key: Option<String>,
    /// Value as raw JSON
    #[arg(long)]
    value: String,
}

#[derive(ClapArgs, Debug)]
struct RemoveArgs {
    /// Document to edit
    path: PathBuf,
    /// Keys or bracket paths to remove
    #[arg(required = true)]
    keys: Vec<String>,
}

#[derive(ClapArgs, Debug)]
struct ProjectArgs {
    /// Document to read
    path: PathBuf,
    /// Shape table, e.g. {"User": [{"name": "order", "nested": "Order"}], ...}
    #[arg(long, value_name = "JSON")]
    shapes: PathBuf,
    /// Shape to project onto
    #[arg(long)]
    shape: String,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.opts.verbose);
    let options = SessionOptions {
        encode: EncodeOptions {
            indent: cli.opts.indent,
            numeric_check: !cli.opts.no_numeric_check,
            ..Default::default()
        },
        backup_on_commit: cli.opts.backup,
    };
    match cli.cmd {
        Cmd::Create(a) => cmd_create(a, options),
        Cmd::Get(a) => cmd_get(a),
        Cmd::Set(a) => cmd_set(a, options),
        Cmd::Append(a) => cmd_append(a, options),
        Cmd::Remove(a) => cmd_remove(a, options),
        Cmd::Project(a) => cmd_project(a),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(code: i32, msg: impl std::fmt::Display) -> ! {
    eprintln!("error: {}", msg);
    std::process::exit(code);
}

fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw)
        .unwrap_or_else(|e| fail(3, format!("invalid JSON value {:?}: {}", raw, e)))
}

fn parse_entry(raw: &str) -> (&str, serde_json::Value) {
    match raw.split_once('=') {
        Some((k, v)) if !k.is_empty() => (k, parse_value(v)),
        _ => fail(3, format!("expected key=value, got {:?}", raw)),
    }
}

fn commit_or_exit(outcome: jdm_core::Result<CommitOutcome>) {
    match outcome {
        Ok(CommitOutcome::Written { path, bytes }) => {
            eprintln!("wrote {} ({} bytes)", path.display(), bytes)
        }
        Ok(_) => eprintln!("nothing to change"),
        Err(e) => fail(5, e),
    }
}

fn cmd_create(args: CreateArgs, options: SessionOptions) {
    if args.entries.is_empty() {
        fail(3, "nothing to create");
    }
    // All input is parsed before the file is touched.
    if args.list {
        let items = normalize_items(args.entries.iter().map(|raw| parse_value(raw)))
            .unwrap_or_else(|e| fail(3, e));
        let mut doc =
            jdm_core::adapter::make_with(&args.path, options).unwrap_or_else(|e| fail(2, e));
        match doc.parse_from(items) {
            Ok(CommitOutcome::Failed { error }) => fail(5, error),
            outcome => commit_or_exit(outcome),
        }
        return;
    }
    let entries: Vec<_> = args.entries.iter().map(|raw| parse_entry(raw)).collect();
    let mut doc = jdm_core::adapter::make_with(&args.path, options).unwrap_or_else(|e| fail(2, e));
    for (key, value) in entries {
        if let Err(e) = doc.add_property(key, value) {
            fail(4, e);
        }
    }
    commit_or_exit(doc.try_commit());
}

fn cmd_get(args: GetArgs) {
    let read = jdm_core::adapter::read(&args.path).unwrap_or_else(|e| fail(2, e));
    if let Some(at) = &args.at {
        match PathExpression::parse(at).lookup(read.to_value()) {
            Some(v) => println!("{}", serde_json::to_string_pretty(v).unwrap_or_default()),
            None => fail(3, format!("not found: {}", at)),
        }
        return;
    }
    match args.format {
        Format::Pretty => println!(
            "{}",
            serde_json::to_string_pretty(read.to_value()).unwrap_or_default()
        ),
        Format::Json => println!("{}", read.to_json().unwrap_or_else(|e| fail(4, e))),
        Format::Array => {
            for (key, value) in read.to_array().unwrap_or_else(|e| fail(4, e)) {
                let key = match key {
                    Key::Index(i) => i.to_string(),
                    Key::Name(n) => n,
                };
                println!("{}\t{}", key, value);
            }
        }
        Format::Object => {
            let obj = read.to_object().unwrap_or_else(|e| fail(4, e));
            println!("{}", serde_json::Value::Object(obj));
        }
    }
}

fn cmd_set(args: SetArgs, options: SessionOptions) {
    let mut doc = jdm_core::adapter::alter_with(&args.path, options).unwrap_or_else(|e| fail(2, e));
    for raw in &args.entries {
        let (key, value) = parse_entry(raw);
        if let Err(e) = doc.set_property(key, value) {
            fail(4, e);
        }
    }
    commit_or_exit(doc.try_commit());
}

fn cmd_append(args: AppendArgs, options: SessionOptions) {
    let mut doc = jdm_core::adapter::alter_with(&args.path, options).unwrap_or_else(|e| fail(2, e));
    let value = parse_value(&args.value);
    let res = match &args.key {
        Some(key) => doc.append_property(key, value).map(drop),
        None => doc.append(value).map(drop),
    };
    if let Err(e) = res {
        fail(4, e);
    }
    commit_or_exit(doc.try_commit());
}

fn cmd_remove(args: RemoveArgs, options: SessionOptions) {
    let mut doc = jdm_core::adapter::alter_with(&args.path, options).unwrap_or_else(|e| fail(2, e));
    for key in &args.keys {
        if let Err(e) = doc.remove_property(key) {
            fail(4, e);
        }
    }
    commit_or_exit(doc.try_commit());
}

fn cmd_project(args: ProjectArgs) {
    let table = std::fs::read_to_string(&args.shapes).unwrap_or_else(|e| fail(2, e));
    let registry: ShapeRegistry = serde_json::from_str(&table).unwrap_or_else(|e| fail(3, e));
    let read = jdm_core::adapter::read(&args.path).unwrap_or_else(|e| fail(2, e));
    let projected = read.project_as(&registry, &args.shape).unwrap_or_else(|e| fail(4, e));
    println!(
        "{}",
        serde_json::to_string_pretty(&projected.to_value()).unwrap_or_default()
    );
}
