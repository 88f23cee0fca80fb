mod cli;
mod repl;

use std::io::Write;

use cli::{CliError, CliOptions};
use repl::{Advisor, Step, last_message, open_session, render_items};
use shared::config::{DispatcherConfig, load_env_files};
use shared::dispatch::{Dispatcher, RelayClient};
use shared::session::{FileSessionStore, SessionStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let options = match CliOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(CliError::HelpRequested) => {
            print_usage();
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    load_env_files();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "advisor=warn,shared=warn".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    let dispatcher = match build_dispatcher(&options) {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            error!("failed to configure dispatcher: {err}");
            std::process::exit(1);
        }
    };

    let store = FileSessionStore::new(&options.session_path);
    if options.reset {
        if let Err(err) = store.clear() {
            error!("failed to clear session: {err}");
            std::process::exit(1);
        }
    }

    let session = match open_session(&store, options.answer_updates()) {
        Ok(session) => session,
        Err(err) => {
            error!(path = %store.path().display(), "failed to save session: {err}");
            std::process::exit(1);
        }
    };

    if dispatcher.is_offline() {
        println!("(offline mode: answers come from built-in guidance)\n");
    }
    println!("{}\n", last_message(&session));
    if session.messages.len() <= 1 && !options.has_assessment_overrides() {
        println!("Tip: type /goals for quick-start ideas, or /stage, /industry, /challenge and /plan to tailor advice.\n");
    }
    if !session.action_items.is_empty() {
        println!("{}\n", render_items(&session));
    }

    let mut advisor = Advisor::new(dispatcher, store, session);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        if let Err(err) = std::io::stdout().flush() {
            debug!("failed to flush prompt: {err}");
        }

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                error!("failed to read input: {err}");
                std::process::exit(1);
            }
        };

        match advisor.handle_line(&line).await {
            Ok(Step::Quit) => break,
            Ok(Step::Print(output)) if output.is_empty() => {}
            Ok(Step::Print(output)) => println!("\n{output}\n"),
            Err(err) => eprintln!("\nerror: {err}\n"),
        }
    }
}

fn build_dispatcher(options: &CliOptions) -> Result<Dispatcher, String> {
    if options.offline {
        return Ok(Dispatcher::offline());
    }

    let mut config = DispatcherConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(relay_url) = &options.relay_url {
        config.relay_url = relay_url.clone();
    }
    info!(relay_url = %config.relay_url, "using relay");

    RelayClient::new(&config)
        .map(Dispatcher::new)
        .map_err(|err| err.to_string())
}

fn print_usage() {
    eprintln!(
        "Usage: advisor [--relay-url URL | --offline] [--session PATH] [--reset]\n\
         \x20              [--stage STAGE] [--industry TEXT] [--challenge TEXT]\n\
         \x20              [--has-plan yes|no]\n\
         \n\
         Options:\n\
         - --relay-url URL   Relay base url (default: RELAY_URL or http://localhost:3001)\n\
         - --offline         Never contact a relay; answer from built-in guidance\n\
         - --session PATH    Session file (default: .advisor-session.json)\n\
         - --reset           Discard the saved session before starting\n\
         - --stage STAGE     idea, startup, established, growth or transition\n\
         - --industry TEXT   Your industry\n\
         - --challenge TEXT  Your main challenge\n\
         - --has-plan yes|no Whether you already have a business plan\n\
         - --help            Show this help text\n\
         \n\
         Commands:\n\
         - /items, /done <n>     Review and tick off action items\n\
         - /goals, /goal <id>    List quick-start goals or ask about one\n\
         - /stage, /industry, /challenge, /plan <value>  Update your profile\n\
         - /reset, /quit"
    );
}
