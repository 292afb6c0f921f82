use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use remex_core::parse_reader;
use remex_domain::{ObjectId, VerifyKey};

pub const REMEX_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\n{subcommands}\n\nGlobal options:\n{options}\n";

pub const REMEX_BEFORE_HELP: &str = concat!(
    "remex ",
    env!("CARGO_PKG_VERSION"),
    ": remote actions against a permissioned object store\n",
);

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    disable_help_subcommand = true,
    before_help = REMEX_BEFORE_HELP,
    help_template = REMEX_HELP_TEMPLATE
)]
pub struct RemexCli {
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(
        long,
        value_name = "DIR",
        help = "Object store directory (overrides REMEX_STORE_PATH)",
        global = true
    )]
    pub store: Option<PathBuf>,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    /// Convert actions between JSON and wire bytes.
    #[command(subcommand)]
    Action(ActionCommand),
    /// Put and inspect stored objects.
    #[command(subcommand)]
    Object(ObjectCommand),
    /// Execute an encoded action against the store.
    Exec(ExecArgs),
}

#[derive(Subcommand, Debug)]
pub enum ActionCommand {
    /// Encode a JSON action into wire bytes.
    Encode(EncodeArgs),
    /// Print the JSON form of an encoded action.
    Decode(DecodeArgs),
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[arg(value_name = "JSON")]
    pub input: PathBuf,
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    #[arg(value_name = "FILE")]
    pub input: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ObjectCommand {
    /// Store a primitive value.
    Put(PutArgs),
    /// Show a stored object.
    Get(GetArgs),
}

#[derive(Args, Debug)]
pub struct PutArgs {
    #[arg(
        long,
        help = "JSON scalar or tagged primitive, e.g. '\"text\"' or '{\"type\":\"bytes\",\"value\":[1]}'"
    )]
    pub value: String,
    #[arg(long, help = "Store under this id instead of a fresh one")]
    pub id: Option<ObjectId>,
    #[arg(
        long = "reader",
        value_name = "KEY=ID",
        value_parser = parse_reader,
        help = "Grant read access to a hex verify key, with provenance"
    )]
    pub readers: Vec<(VerifyKey, ObjectId)>,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[arg(value_name = "ID")]
    pub id: ObjectId,
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    #[arg(value_name = "FILE")]
    pub input: PathBuf,
    #[arg(long, value_name = "HEX", help = "Verify key of the requesting client")]
    pub requester: VerifyKey,
}
