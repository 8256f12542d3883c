//! Command-line driver over the playground API.
//!
//! Every command prints the JSON response envelope and exits non-zero when
//! `ok` is false.

use clap::{Parser, Subcommand, ValueEnum};
use loreweave_api::{api, ApiConfig, ApiContext, ApiResponse};
use loreweave_core::Actor;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "loreweave")]
#[command(about = "Loreweave playground tree CLI")]
struct Cli {
    /// Database file; defaults to LOREWEAVE_DB_PATH or a temp-dir file.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Acting user id.
    #[arg(long = "as", global = true, default_value = "local")]
    user: String,
    #[arg(long, global = true, default_value_t = false)]
    admin: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Ping,
    Version,
    /// Print an owner's tree with toolbox links per setting.
    Tree {
        #[arg(long)]
        owner: Option<String>,
    },
    Search {
        query: String,
        #[arg(long)]
        owner: Option<String>,
    },
    Show {
        id: String,
    },
    Create {
        #[arg(long = "type", value_enum)]
        kind: KindArg,
        #[arg(long)]
        name: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Apply a JSON patch, e.g. '{"is_published": true}'.
    Update {
        id: String,
        patch: String,
    },
    Delete {
        id: String,
    },
    Move {
        id: String,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        index: Option<i64>,
    },
    Links {
        id: String,
    },
    /// Replace a setting's links, e.g. '{"race": ["elf"]}'.
    SetLinks {
        id: String,
        links: String,
    },
    Toolbox {
        category: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Cosmos,
    World,
    Era,
    Setting,
    Folder,
    Page,
}

impl KindArg {
    fn as_str(self) -> &'static str {
        match self {
            Self::Cosmos => "cosmos",
            Self::World => "world",
            Self::Era => "era",
            Self::Setting => "setting",
            Self::Folder => "folder",
            Self::Page => "page",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = ApiConfig::from_env();
    if let Err(err) = config.init_logging() {
        eprintln!("logging disabled: {err}");
    }

    match &cli.command {
        Commands::Ping => {
            println!("{}", loreweave_api::ping());
            return ExitCode::SUCCESS;
        }
        Commands::Version => {
            println!("{}", loreweave_api::core_version());
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    let db_path = cli.db.clone().unwrap_or(config.db_path);
    let ctx = match ApiContext::open(&db_path) {
        Ok(ctx) => ctx,
        Err(err) => {
            return emit(&ApiResponse::<()>::failure(err));
        }
    };
    let actor = if cli.admin {
        Actor::admin(cli.user.clone())
    } else {
        Actor::user(cli.user.clone())
    };

    run_command(&ctx, &actor, cli.command)
}

fn run_command(ctx: &ApiContext, actor: &Actor, command: Commands) -> ExitCode {
    let owner_or_self = |owner: Option<String>| owner.unwrap_or_else(|| actor.user_id.clone());
    match command {
        Commands::Ping | Commands::Version => ExitCode::SUCCESS,
        Commands::Tree { owner } => emit(&api::list_tree(ctx, actor, &owner_or_self(owner))),
        Commands::Search { query, owner } => emit(&api::search_tree(
            ctx,
            actor,
            &owner_or_self(owner),
            &query,
        )),
        Commands::Show { id } => emit(&api::get_node(ctx, actor, &id)),
        Commands::Create { kind, name, parent } => {
            let payload = serde_json::json!({
                "parent_id": parent,
                "type": kind.as_str(),
                "name": name,
            });
            emit(&api::create_node(ctx, actor, &payload))
        }
        Commands::Update { id, patch } => match parse_json_arg(&patch) {
            Ok(patch) => emit(&api::update_node(ctx, actor, &id, &patch)),
            Err(response) => emit(&response),
        },
        Commands::Delete { id } => emit(&api::delete_node(ctx, actor, &id)),
        Commands::Move { id, parent, index } => emit(&api::move_node(
            ctx,
            actor,
            &id,
            parent.as_deref(),
            index,
        )),
        Commands::Links { id } => emit(&api::get_toolbox_links(ctx, actor, &id)),
        Commands::SetLinks { id, links } => match parse_json_arg(&links) {
            Ok(links) => emit(&api::set_toolbox_links(ctx, actor, &id, &links)),
            Err(response) => emit(&response),
        },
        Commands::Toolbox { category } => emit(&api::list_toolbox(ctx, actor, &category)),
    }
}

fn parse_json_arg(raw: &str) -> Result<Value, ApiResponse<()>> {
    serde_json::from_str(raw).map_err(|err| {
        ApiResponse::failure(loreweave_api::ApiError::validation(format!(
            "argument is not valid JSON: {err}"
        )))
    })
}

fn emit<T: Serialize>(response: &ApiResponse<T>) -> ExitCode {
    match serde_json::to_string_pretty(response) {
        Ok(text) => println!("{text}"),
        Err(err) => {
            eprintln!("failed to encode response: {err}");
            return ExitCode::FAILURE;
        }
    }
    if response.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
