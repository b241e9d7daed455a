mod config;
mod contact;
mod controller;
mod filter;
mod logging;
mod search;
mod seed;
mod store;
mod tree;
mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use config::Config;
use contact::{ContactDraft, ContactRecord, FieldId};
use controller::{Action, ViewController, ViewPayload};
use filter::SearchFilter;
use logging::LogTarget;
use store::ContactStore;

#[derive(Parser, Debug)]
#[command(name = "addrbook", about = "Terminal address book")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// TOML file of [[contact]] tables to load instead of the built-in set
    #[arg(long, global = true, value_name = "PATH")]
    contacts: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every contact
    List(ListArgs),
    /// Run a search and print the matching contacts
    Search(SearchArgs),
    /// Print the field keys accepted by --field
    Fields,
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Field to match against (see `addrbook fields`)
    #[arg(long, value_parser = parse_field)]
    field: Option<FieldId>,

    #[arg(long, default_value_t = false)]
    match_case: bool,

    /// Match only at the start of the field value
    #[arg(long, default_value_t = false)]
    prefix: bool,

    #[arg(long, default_value_t = false)]
    json: bool,

    #[arg(value_name = "TERM")]
    term: String,
}

fn parse_field(raw: &str) -> Result<FieldId, String> {
    FieldId::from_key(raw).ok_or_else(|| {
        let keys: Vec<&str> = FieldId::ALL.iter().map(|f| f.key()).collect();
        format!("unknown field `{}`, expected one of: {}", raw, keys.join(", "))
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let target = if cli.command.is_some() {
        LogTarget::Stderr
    } else {
        LogTarget::FileOnly
    };
    logging::init(target)?;

    let config = config::load(cli.config.as_deref())?;

    if let Some(path) = &config.config_path {
        debug!(path = %path.display(), "loaded configuration");
    }

    let store = ContactStore::with_records(load_contacts(&cli, &config)?);

    match cli.command {
        Some(Command::List(args)) => handle_list(&store, args),
        Some(Command::Search(args)) => handle_search(store, args, &config),
        Some(Command::Fields) => {
            for field in FieldId::ALL {
                println!("{}\t{}", field.key(), field.label());
            }
            Ok(())
        }
        None => {
            let controller = ViewController::new(store);
            let mut app = ui::app::App::new(controller, &config);
            app.run()
        }
    }
}

fn load_contacts(cli: &Cli, config: &Config) -> Result<Vec<ContactDraft>> {
    match cli.contacts.as_ref().or(config.contacts.as_ref()) {
        Some(path) => {
            let drafts = seed::load_file(path)
                .with_context(|| format!("failed to load contacts from {}", path.display()))?;
            debug!(count = drafts.len(), path = %path.display(), "loaded contacts");
            Ok(drafts)
        }
        None => Ok(seed::default_contacts()),
    }
}

fn handle_list(store: &ContactStore, args: ListArgs) -> Result<()> {
    print_records(store.records().iter(), args.json)
}

fn handle_search(store: ContactStore, args: SearchArgs, config: &Config) -> Result<()> {
    let Some(term) = search::normalize_query(&args.term) else {
        anyhow::bail!("search term must not be empty");
    };
    let filter = SearchFilter::new(args.field.unwrap_or(config.default_search_field), term)
        .match_case(args.match_case)
        .only_prefix(args.prefix);

    let mut controller = ViewController::new(store);
    let notification = controller.dispatch(Action::SubmitSearch(filter));

    // Keep stdout pure JSON.
    if let Some(notification) = &notification {
        if args.json {
            eprintln!("{}", notification.message);
        } else {
            println!("{}", notification.message);
        }
    }

    match controller.current_view() {
        ViewPayload::List { records, .. } => print_records(records.into_iter(), args.json),
        ViewPayload::SearchEntry => Ok(()),
    }
}

fn print_records<'a, I>(records: I, json: bool) -> Result<()>
where
    I: Iterator<Item = &'a ContactRecord>,
{
    if json {
        let records: Vec<&ContactRecord> = records.collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    // id<TAB>name<TAB>email<TAB>phone<TAB>city
    for record in records {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            record.id,
            record.display_name(),
            record.fields.email,
            record.fields.phone,
            record.fields.city
        );
    }
    Ok(())
}
