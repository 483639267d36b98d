mod catalog;
mod chat;

use anyhow::Result;
use console::style;
use std::path::PathBuf;

use catalog_agent::core::catalog::CatalogStore;
use catalog_agent::core::config::{AppConfig, CliOverrides};
use catalog_agent::core::terminal::{self, GuideSection, print_error, print_warn};
use catalog_agent::logging;

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Chat")
        .command("chat", "Start the interactive assistant (default)")
        .command("ask --prompt <text>", "Ask a single question and exit")
        .command("examples", "List the example questions")
        .print();

    GuideSection::new("Catalog")
        .command("seed [--force]", "Create tech_products and load the demo catalog")
        .command("tables", "List the tables in the store")
        .command("describe <table>", "Show a table's columns")
        .command("query <sql>", "Run one SQL statement directly")
        .print();

    GuideSection::new("Options")
        .command("--config <path>", "Read settings from a TOML file")
        .command("--db <path>", "Catalog database (default: my_database.db)")
        .command("--provider <id>", "google or openai")
        .command("--model <id>", "Model to use")
        .blank()
        .hint("catalog-agent seed", "")
        .hint("catalog-agent ask -p \"What gaming mice do you have?\"", "")
        .print();

    println!(
        "\n {} {} [options] <command>\n",
        style("Usage:").bold(),
        style("catalog-agent").green()
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Chat,
    Ask { prompt: String },
    Seed { force: bool },
    Tables,
    Describe { table: String },
    Query { sql: String },
    Examples,
    Help,
}

/// Pull the global options out of `args`, wherever they appear, and return
/// the remaining words in order.
pub(crate) fn parse_global_flags(args: &[String]) -> (CliOverrides, Vec<String>) {
    let mut overrides = CliOverrides::default();
    let mut rest = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let value = args.get(i + 1).cloned();
        match (args[i].as_str(), value) {
            ("--config", Some(v)) => {
                overrides.config_path = Some(PathBuf::from(v));
                i += 2;
            }
            ("--db", Some(v)) => {
                overrides.db_path = Some(PathBuf::from(v));
                i += 2;
            }
            ("--model", Some(v)) => {
                overrides.model = Some(v);
                i += 2;
            }
            ("--provider", Some(v)) => {
                overrides.provider = Some(v);
                i += 2;
            }
            _ => {
                rest.push(args[i].clone());
                i += 1;
            }
        }
    }
    (overrides, rest)
}

pub(crate) fn parse_ask_prompt(args: &[String], start: usize) -> String {
    let mut prompt = String::new();
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--prompt" | "-p" => {
                if i + 1 < args.len() {
                    prompt = args[i + 1].clone();
                    i += 2;
                } else {
                    i += 1;
                }
            }
            other if prompt.is_empty() && !other.starts_with('-') => {
                prompt = args[start..].join(" ");
                break;
            }
            _ => i += 1,
        }
    }
    prompt
}

pub(crate) fn parse_command(args: &[String]) -> std::result::Result<Command, String> {
    let Some(cmd) = args.first() else {
        return Ok(Command::Chat);
    };
    match cmd.as_str() {
        "chat" => Ok(Command::Chat),
        "ask" => {
            let prompt = parse_ask_prompt(args, 1);
            if prompt.trim().is_empty() {
                Err("--prompt is required for ask.".to_string())
            } else {
                Ok(Command::Ask { prompt })
            }
        }
        "seed" => Ok(Command::Seed {
            force: args[1..].iter().any(|a| a == "--force" || a == "-f"),
        }),
        "tables" => Ok(Command::Tables),
        "describe" => args
            .get(1)
            .map(|t| Command::Describe { table: t.clone() })
            .ok_or_else(|| "describe needs a table name.".to_string()),
        "query" => {
            let sql = args[1..].join(" ");
            if sql.trim().is_empty() {
                Err("query needs an SQL statement.".to_string())
            } else {
                Ok(Command::Query { sql })
            }
        }
        "examples" => Ok(Command::Examples),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(format!("Unknown command '{}'.", other)),
    }
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (overrides, rest) = parse_global_flags(&args);

    let command = match parse_command(&rest) {
        Ok(Command::Help) => {
            print_help();
            return Ok(());
        }
        Ok(command) => command,
        Err(msg) => {
            print_error(&format!("Error: {}", msg));
            print_help();
            return Ok(());
        }
    };

    let config = AppConfig::load(&overrides)?;

    // The REPL owns the terminal; its logs only go to the file.
    let mirror_stderr = command != Command::Chat;
    let log_dir = config.resolved_log_dir();
    if let Err(e) = logging::init_logging(log_dir.as_deref(), mirror_stderr) {
        print_warn(&format!("File logging disabled: {:#}", e));
        logging::init_logging(None, mirror_stderr)?;
    }

    if command == Command::Examples {
        chat::print_examples();
        return Ok(());
    }

    let store = CatalogStore::open(&config.db_path);
    for notice in store.notices().drain() {
        terminal::print_notice(&notice);
    }

    match command {
        Command::Chat => chat::run_chat(&config, &store).await,
        Command::Ask { prompt } => chat::run_ask(&config, &store, &prompt).await,
        Command::Seed { force } => catalog::run_seed(&store, force),
        Command::Tables => catalog::run_tables(&store),
        Command::Describe { table } => catalog::run_describe(&store, &table),
        Command::Query { sql } => catalog::run_query(&store, &sql),
        Command::Examples | Command::Help => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_command_means_chat() {
        assert_eq!(parse_command(&[]), Ok(Command::Chat));
    }

    #[test]
    fn global_flags_are_extracted_anywhere() {
        let (overrides, rest) =
            parse_global_flags(&args(&["--db", "shop.db", "tables", "--model", "gemini-x"]));
        assert_eq!(overrides.db_path, Some(PathBuf::from("shop.db")));
        assert_eq!(overrides.model.as_deref(), Some("gemini-x"));
        assert_eq!(rest, args(&["tables"]));
    }

    #[test]
    fn dangling_flag_is_left_as_a_word() {
        let (overrides, rest) = parse_global_flags(&args(&["chat", "--db"]));
        assert!(overrides.db_path.is_none());
        assert_eq!(rest, args(&["chat", "--db"]));
    }

    #[test]
    fn ask_requires_prompt() {
        assert_eq!(
            parse_command(&args(&["ask", "--prompt", "cheapest mouse?"])),
            Ok(Command::Ask {
                prompt: "cheapest mouse?".to_string()
            })
        );
        assert_eq!(
            parse_command(&args(&["ask", "-p", "hi"])),
            Ok(Command::Ask {
                prompt: "hi".to_string()
            })
        );
        assert!(parse_command(&args(&["ask"])).is_err());
    }

    #[test]
    fn ask_accepts_bare_words() {
        assert_eq!(
            parse_command(&args(&["ask", "show", "me", "notebooks"])),
            Ok(Command::Ask {
                prompt: "show me notebooks".to_string()
            })
        );
    }

    #[test]
    fn seed_force_flag() {
        assert_eq!(
            parse_command(&args(&["seed"])),
            Ok(Command::Seed { force: false })
        );
        assert_eq!(
            parse_command(&args(&["seed", "--force"])),
            Ok(Command::Seed { force: true })
        );
    }

    #[test]
    fn query_joins_remaining_words() {
        assert_eq!(
            parse_command(&args(&["query", "SELECT", "*", "FROM", "tech_products"])),
            Ok(Command::Query {
                sql: "SELECT * FROM tech_products".to_string()
            })
        );
        assert!(parse_command(&args(&["query"])).is_err());
    }

    #[test]
    fn describe_needs_table() {
        assert_eq!(
            parse_command(&args(&["describe", "tech_products"])),
            Ok(Command::Describe {
                table: "tech_products".to_string()
            })
        );
        assert!(parse_command(&args(&["describe"])).is_err());
    }

    #[test]
    fn unknown_command_is_reported() {
        assert_eq!(
            parse_command(&args(&["gateway"])),
            Err("Unknown command 'gateway'.".to_string())
        );
    }
}
