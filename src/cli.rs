use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::assistant::Answer;
use crate::commands::{execute, Command, CommandContext, CommandOutput, Session};
use crate::container::bootstrap::Services;
use crate::container::Container;
use crate::errors::Result;
use crate::rag::ingest::IndexState;

const PROMPT: &str = "\nYour question: ";

/// What a single input line produced.
#[derive(Debug)]
pub enum Reply {
    Exit,
    Skip,
    Command(CommandOutput),
    Answer(Answer),
}

/// Runs a parsed command or sends a question to the assistant. Command
/// failures become an error reply; anything else is returned as `Err`.
pub async fn respond(
    services: &Services,
    ctx: &CommandContext,
    session: &mut Session,
    command: Command,
) -> Result<Reply> {
    match command {
        Command::Exit => Ok(Reply::Exit),
        Command::Empty => Ok(Reply::Skip),
        Command::Question(question) => {
            let answer = services
                .assistant
                .ask_with_sources(&question, session.file_context())
                .await?;
            Ok(Reply::Answer(answer))
        }
        command => match execute(&command, ctx, session) {
            Ok(Some(output)) => Ok(Reply::Command(output)),
            Ok(None) => Ok(Reply::Skip),
            Err(e) if e.is_command_error() => Ok(Reply::Command(CommandOutput::error(&e))),
            Err(e) => Err(e),
        },
    }
}

async fn startup(services: &Services) -> Result<()> {
    let output = &services.output;
    output.print_title();
    output.print_config_summary(&services.config);
    output.print_project_status(&services.project);

    if !services.config.paths.docs_path.exists() {
        output.print_docs_missing(&services.config.paths.docs_path);
    }

    match services.assistant.prepare().await? {
        IndexState::Loaded(count) => println!("Loaded {} documents", count),
        IndexState::Created(0) => {
            println!("⚠ No documents found! The assistant will have limited capabilities.")
        }
        IndexState::Created(count) => {
            println!("✓ Vector database created successfully! ({} chunks)", count)
        }
    }
    Ok(())
}

/// Interactive chat loop on stdin. Ends on an exit command or end of input.
pub async fn run_chat(container: &Container) -> Result<()> {
    let services = Services::resolve(container)?;
    startup(&services).await?;

    let ctx = services.command_context();
    let mut session = Session::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    services.output.print_welcome();

    loop {
        print!("{}", PROMPT);
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            services.output.print_goodbye();
            break;
        };

        let command = match services.parser.parse(&line) {
            Ok(command) => command,
            Err(e) => {
                services.output.print_command_output(&CommandOutput::error(&e));
                continue;
            }
        };

        if let Command::Question(question) = &command {
            services.output.print_thinking(question);
        }

        match respond(&services, &ctx, &mut session, command).await {
            Ok(Reply::Exit) => {
                services.output.print_goodbye();
                break;
            }
            Ok(Reply::Skip) => {}
            Ok(Reply::Command(output)) => services.output.print_command_output(&output),
            Ok(Reply::Answer(answer)) => {
                services.output.print_answer(&answer, session.file_context())
            }
            Err(e) => {
                tracing::error!("Request failed: {}", e);
                services.output.print_error(&e);
            }
        }
    }

    Ok(())
}
