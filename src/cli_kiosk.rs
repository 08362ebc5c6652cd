use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli_style;

use cli_style::{get_styles, print_error, print_success, TableBuilder};
use loyalty_kiosk::config::{AppConfig, CliConfig, FileConfig, STORE_KEY_ENV, STORE_URL_ENV};
use loyalty_kiosk::ledger::Notice;
use loyalty_kiosk::{KioskSession, PointLedger, PostgrestPointStore};

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the points store.
    #[clap(long, env = STORE_URL_ENV)]
    pub store_url: Option<String>,

    /// Access key of the points store.
    #[clap(long, env = STORE_KEY_ENV, hide_env_values = true)]
    pub store_key: Option<String>,

    /// Points spent by one redemption.
    #[clap(long)]
    pub redemption_cost: Option<u32>,

    /// Points granted by `submit`.
    #[clap(long)]
    pub accrual_amount: Option<u32>,
}

#[derive(Parser)]
#[command(styles=get_styles(),name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Types a phone number into the kiosk.
    Phone { number: String },

    /// Shows the balance of the typed phone number.
    Check,

    /// Adds the standard amount of points to the typed phone number.
    Submit,

    /// Adds the given amount of points to the typed phone number.
    Add { amount: u32 },

    /// Spends points on one reward for the typed phone number.
    Redeem,

    /// Lists every redemption, newest first.
    History,

    /// Forgets the typed phone number and the shown balance.
    Clear,

    /// Shows the typed phone number and the last shown balance.
    Status,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

fn print_notice(notice: &Notice) {
    if notice.is_error() {
        print_error(&notice.message);
    } else {
        print_success(&notice.message);
    }
}

fn print_history(session: &mut KioskSession, runtime: &tokio::runtime::Runtime) {
    let Some(history) = runtime.block_on(session.history()) else {
        if let Some(notice) = session.notice() {
            print_notice(notice);
        }
        return;
    };

    if let Some(notice) = session.notice() {
        print_notice(notice);
    }
    if history.is_empty() {
        return;
    }

    let mut table = TableBuilder::new(vec!["When", "Phone", "Used", "Balance now"]);
    for entry in history {
        table.add_row(vec![
            entry
                .record
                .created_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            entry.record.phone_number,
            entry.record.points_used.to_string(),
            entry
                .current_points
                .map_or_else(|| "-".to_string(), |p| p.to_string()),
        ]);
    }
    table.print();
}

fn execute_command(
    line: String,
    session: &mut KioskSession,
    runtime: &tokio::runtime::Runtime,
) -> CommandExecutionResult {
    if line.trim().is_empty() {
        return CommandExecutionResult::Ok;
    }

    let Some(args) = shlex::split(&line) else {
        return CommandExecutionResult::Error(format!("Could not parse {:?}", line));
    };

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    match cli {
        Ok(cli) => match cli.command {
            InnerCommand::Phone { number } => {
                session.set_phone_input(&number);
                cli_style::print_status(session.phone_input(), session.current_points());
            }
            InnerCommand::Check => print_notice(runtime.block_on(session.check_points())),
            InnerCommand::Submit => print_notice(runtime.block_on(session.submit())),
            InnerCommand::Add { amount } => {
                print_notice(runtime.block_on(session.add_points(amount)))
            }
            InnerCommand::Redeem => print_notice(runtime.block_on(session.redeem())),
            InnerCommand::History => print_history(session, runtime),
            InnerCommand::Clear => print_notice(session.clear()),
            InnerCommand::Status => {
                cli_style::print_status(session.phone_input(), session.current_points())
            }
            InnerCommand::Exit => return CommandExecutionResult::Exit,
        },
        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
        }
    }
    CommandExecutionResult::Ok
}

#[derive(rustyline_derive::Hinter)]
struct KioskHelper {
    commands_names: Vec<String>,
}

impl KioskHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        KioskHelper { commands_names }
    }
}

impl Completer for KioskHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::new()));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .cloned()
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for KioskHelper {}
impl Validator for KioskHelper {}
impl Helper for KioskHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let cli_config = CliConfig {
        store_url: cli_args.store_url.clone(),
        store_key: cli_args.store_key.clone(),
        redemption_cost: cli_args.redemption_cost,
        accrual_amount: cli_args.accrual_amount,
        ..Default::default()
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    let store = PostgrestPointStore::new(&config.store)
        .context("Failed to create points store client")?;
    let ledger = Arc::new(PointLedger::new(Arc::new(store), config.ledger));
    let mut session = KioskSession::new(ledger);
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    cli_style::print_banner(&config.store.url);

    let editor_config = Config::builder()
        .completion_type(CompletionType::List)
        .build();
    let mut rl = Editor::<KioskHelper, FileHistory>::with_config(editor_config)?;
    rl.set_helper(Some(KioskHelper::new()));

    let prompt = cli_style::get_prompt();
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &mut session, &runtime) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => break,
                    CommandExecutionResult::Error(err) => print_error(&err),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                print_error(&format!("{:?}", e));
                break;
            }
        }
    }

    cli_style::print_goodbye();
    Ok(())
}
