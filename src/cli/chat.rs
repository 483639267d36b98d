use anyhow::Result;
use console::style;
use inquire::{InquireError, Text};

use catalog_agent::core::brain::AgentSession;
use catalog_agent::core::catalog::CatalogStore;
use catalog_agent::core::config::AppConfig;
use catalog_agent::core::llm::LlmManager;
use catalog_agent::core::questions::{self, EXAMPLE_CATEGORIES};
use catalog_agent::core::terminal::{self, GuideSection, print_info, print_warn};
use catalog_agent::core::tools::ToolRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReplCommand {
    Ask(String),
    Reset,
    History,
    Examples,
    Example(usize),
    Help,
    Quit,
    Empty,
    Invalid(String),
}

pub(crate) fn parse_repl_line(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    let Some(cmd) = line.strip_prefix('/') else {
        return ReplCommand::Ask(line.to_string());
    };

    let mut parts = cmd.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).unwrap_or_default();
    match name {
        "reset" | "clear" => ReplCommand::Reset,
        "history" => ReplCommand::History,
        "examples" => ReplCommand::Examples,
        "help" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        "ask" => match arg.parse::<usize>() {
            Ok(n) if questions::by_number(n).is_some() => ReplCommand::Example(n),
            _ => ReplCommand::Invalid(format!(
                "Usage: /ask <n> where n is between 1 and {}",
                questions::count()
            )),
        },
        other => ReplCommand::Invalid(format!("Unknown command '/{}'. Try /help.", other)),
    }
}

pub(crate) fn print_examples() {
    let mut n = 0;
    for category in EXAMPLE_CATEGORIES {
        let mut section = GuideSection::new(category.title);
        for q in category.questions {
            n += 1;
            section = section.numbered(n, q);
        }
        section.print();
    }
    println!();
}

fn print_repl_help() {
    GuideSection::new("Chat commands")
        .command("/examples", "Show example questions")
        .command("/ask <n>", "Ask example question number n")
        .command("/history", "Show the conversation so far")
        .command("/reset", "Clear the chat and start over")
        .command("/help", "Show this help")
        .command("/quit", "Leave the assistant")
        .print();
    println!();
}

fn build_session<'a>(config: &AppConfig, store: &'a CatalogStore) -> Result<AgentSession<'a>> {
    let llm = LlmManager::from_config(config)?;
    Ok(AgentSession::new(llm, ToolRegistry::new(store)).with_max_tool_rounds(config.max_tool_rounds))
}

async fn answer(session: &mut AgentSession<'_>, store: &CatalogStore, question: &str) {
    println!("{}", style("Thinking...").dim());
    session.submit(question).await;
    if let Some(turn) = session.turns().last() {
        terminal::print_turn(turn);
    }
    for notice in store.notices().drain() {
        terminal::print_notice(&notice);
    }
}

pub(crate) async fn run_chat(config: &AppConfig, store: &CatalogStore) -> Result<()> {
    let mut session = build_session(config, store)?;

    terminal::print_banner();
    let (provider, model) = session.llm().get_active_info();
    GuideSection::new("Session")
        .status("Model", &format!("{} ({})", model, provider))
        .status("Database", &config.db_path.display().to_string())
        .blank()
        .info("Ask me anything about the computer store! Type /help for commands.")
        .print();
    println!();

    loop {
        let line = match Text::new("You:").prompt() {
            Ok(line) => line,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };

        match parse_repl_line(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Ask(question) => answer(&mut session, store, &question).await,
            ReplCommand::Example(n) => {
                if let Some(question) = questions::by_number(n) {
                    println!("{} {}", style("Asking:").bold(), question);
                    answer(&mut session, store, question).await;
                }
            }
            ReplCommand::Reset => {
                session.reset();
                print_info("Chat cleared.");
            }
            ReplCommand::History => {
                if session.turns().is_empty() {
                    print_info("No messages yet.");
                }
                for turn in session.turns().turns() {
                    terminal::print_turn(turn);
                }
                println!();
            }
            ReplCommand::Examples => print_examples(),
            ReplCommand::Help => print_repl_help(),
            ReplCommand::Quit => break,
            ReplCommand::Invalid(msg) => print_warn(&msg),
        }
    }

    terminal::print_goodbye();
    Ok(())
}

pub(crate) async fn run_ask(config: &AppConfig, store: &CatalogStore, prompt: &str) -> Result<()> {
    let mut session = build_session(config, store)?;
    let reply = session.submit(prompt).await;
    for notice in store.notices().drain() {
        terminal::print_notice(&notice);
    }
    println!("{}", reply);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_question() {
        assert_eq!(
            parse_repl_line("  What gaming mice do you have?  "),
            ReplCommand::Ask("What gaming mice do you have?".to_string())
        );
        assert_eq!(parse_repl_line("   "), ReplCommand::Empty);
    }

    #[test]
    fn slash_commands() {
        assert_eq!(parse_repl_line("/reset"), ReplCommand::Reset);
        assert_eq!(parse_repl_line("/clear"), ReplCommand::Reset);
        assert_eq!(parse_repl_line("/history"), ReplCommand::History);
        assert_eq!(parse_repl_line("/examples"), ReplCommand::Examples);
        assert_eq!(parse_repl_line("/quit"), ReplCommand::Quit);
        assert_eq!(parse_repl_line("/exit"), ReplCommand::Quit);
    }

    #[test]
    fn ask_by_number() {
        assert_eq!(parse_repl_line("/ask 3"), ReplCommand::Example(3));
        assert!(matches!(parse_repl_line("/ask 0"), ReplCommand::Invalid(_)));
        assert!(matches!(parse_repl_line("/ask 99"), ReplCommand::Invalid(_)));
        assert!(matches!(parse_repl_line("/ask three"), ReplCommand::Invalid(_)));
    }

    #[test]
    fn unknown_slash_command() {
        assert_eq!(
            parse_repl_line("/drop"),
            ReplCommand::Invalid("Unknown command '/drop'. Try /help.".to_string())
        );
    }
}
