mod agent;
mod app;
mod ledger;
mod tpp;
mod ui;
mod view;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tracing_subscriber::EnvFilter;

use agent::{AgentId, GatewayConfig, InvocationGateway, InvocationResult};
use app::{App, InputMode, Screen};
use tpp::{TppComponent, TppRequest};

/// SocratIQ - pharmaceutical intelligence agents in your terminal
#[derive(Debug, Parser)]
#[command(name = "socratiq", version, about)]
struct Cli {
    /// Directory holding config.json and logs
    #[arg(long, global = true, default_value = ".socratiq")]
    config_dir: PathBuf,

    /// Override the gateway base URL from config.json
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Launch the interactive UI (default)
    Tui,
    /// Ask a single specialist agent
    Ask {
        /// vera, finn, nora or clia
        agent: AgentId,
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Ask Sophie, the orchestrator
    Sophie {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Generate a Target Product Profile
    Tpp {
        #[arg(long)]
        drug: String,
        /// Therapeutic area
        #[arg(long)]
        area: Option<String>,
        /// Leave out a component (product, clinical, regulatory, financial, market, ip)
        #[arg(long, value_parser = parse_component)]
        skip: Vec<TppComponent>,
        /// Save the result as JSON
        #[arg(long)]
        export: bool,
    },
    /// List the available agents
    Agents,
}

fn parse_component(s: &str) -> Result<TppComponent, String> {
    TppComponent::from_key(s).ok_or_else(|| {
        let keys: Vec<&str> = TppComponent::ALL.iter().map(|c| c.key()).collect();
        format!("unknown component '{}' (expected one of: {})", s, keys.join(", "))
    })
}

/// Logs go to a file while the TUI owns the terminal, stderr otherwise
fn init_logging(config_dir: &Path, to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if to_file {
        let log_dir = config_dir.join("logs");
        fs::create_dir_all(&log_dir).context("Failed to create logs dir")?;
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("socratiq.log"))
            .context("Failed to open log file")?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

fn load_config(cli: &Cli) -> GatewayConfig {
    let mut config = GatewayConfig::load(&cli.config_dir).unwrap_or_else(|e| {
        tracing::warn!("Falling back to default config: {:#}", e);
        GatewayConfig::default()
    });
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    config
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Command::Tui));
    init_logging(&cli.config_dir, interactive)?;

    let config = load_config(&cli);
    let gateway = InvocationGateway::http(config.base_url.clone(), config.timeout())?;
    tracing::info!(base_url = %config.base_url, "Starting socratiq");

    match cli.command {
        None | Some(Command::Tui) => {
            run_tui(App::new(&config, gateway)).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Agents) => {
            let catalog = config.catalog();
            for agent in catalog.agents().chain([catalog.orchestrator()]) {
                println!("{} {:<7} {} ({})", agent.icon, agent.name, agent.full_name, agent.function);
                println!("          {}", agent.description);
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Ask { agent, query }) => {
            let query = query_text(&query)?;
            let catalog = config.catalog();
            let descriptor = catalog.agent(agent);
            let result = gateway.invoke(descriptor, &query).await;
            println!("{}", view::to_plain(&view::agent_panel(&result, descriptor)));
            Ok(exit_code(&result))
        }
        Some(Command::Sophie { query }) => {
            let query = query_text(&query)?;
            let catalog = config.catalog();
            let result = gateway.invoke(catalog.orchestrator(), &query).await;
            println!("{}", view::to_plain(&view::orchestrator_panel(&result, &catalog)));
            Ok(exit_code(&result))
        }
        Some(Command::Tpp { drug, area, skip, export }) => {
            let request = TppRequest::new(drug, area).without(&skip);
            let prompt = request.prompt()?;
            let catalog = config.catalog();
            let result = gateway.invoke(catalog.orchestrator(), &prompt).await;

            println!("Target Product Profile: {}\n", request.drug_name.trim());
            println!("{}", view::to_plain(&view::orchestrator_panel(&result, &catalog)));
            if export {
                if let Some(payload) = result.payload() {
                    let path = tpp::export(payload, request.drug_name.trim(), &config.export_dir())?;
                    println!("\n📥 Saved {}", path.display());
                }
            }
            Ok(exit_code(&result))
        }
    }
}

/// Joined question words. Blank questions are rejected before any call goes out.
fn query_text(words: &[String]) -> Result<String> {
    let query = words.join(" ");
    let query = query.trim();
    if query.is_empty() {
        bail!("Query must not be empty");
    }
    Ok(query.to_string())
}

fn exit_code(result: &InvocationResult) -> ExitCode {
    if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run_tui(mut app: App) -> Result<()> {
    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let outcome = event_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    tracing::info!(
        session = %app.session.id,
        agents_used = app.session.ledger.agents_with_history().len(),
        "Session ended"
    );
    outcome
}

async fn event_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        // Pick up finished calls (non-blocking)
        app.process_events();
        app.tick = app.tick.wrapping_add(1);

        terminal.draw(|frame| ui::ui(frame, app))?;

        if !event::poll(std::time::Duration::from_millis(100))? {
            tokio::task::yield_now().await;
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if app.is_quit_key(&key) {
            break;
        }

        match app.input_mode {
            InputMode::Waiting => {}
            InputMode::EditQuery | InputMode::EditDrug | InputMode::EditArea => match key.code {
                KeyCode::Enter => app.confirm_input(),
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Backspace => app.handle_backspace(),
                KeyCode::Char(c) => app.handle_input(c),
                _ => {}
            },
            InputMode::Normal => match (app.screen, key.code) {
                (_, KeyCode::Tab) => app.next_screen(),
                (_, KeyCode::Char(c @ '1'..='4')) => {
                    let index = c as usize - '1' as usize;
                    app.switch_screen(Screen::ALL[index]);
                }
                (_, KeyCode::Char('J')) | (_, KeyCode::PageDown) => app.scroll_result(5),
                (_, KeyCode::Char('K')) | (_, KeyCode::PageUp) => app.scroll_result(-5),
                (_, KeyCode::Char('x')) => app.export_session(),

                (Screen::Home | Screen::AgentChat, KeyCode::Char('i') | KeyCode::Enter) => {
                    app.start_editing()
                }
                (Screen::Home | Screen::AgentChat, KeyCode::Char('c')) => app.clear(),
                (Screen::AgentChat, KeyCode::Char('h') | KeyCode::Left) => app.select_prev_agent(),
                (Screen::AgentChat, KeyCode::Char('l') | KeyCode::Right) => app.select_next_agent(),

                (Screen::Tpp, KeyCode::Char('d')) => app.start_editing(),
                (Screen::Tpp, KeyCode::Char('a')) => app.edit_area(),
                (Screen::Tpp, KeyCode::Char('k') | KeyCode::Up) => app.component_up(),
                (Screen::Tpp, KeyCode::Char('j') | KeyCode::Down) => app.component_down(),
                (Screen::Tpp, KeyCode::Char(' ')) => app.toggle_component(),
                (Screen::Tpp, KeyCode::Char('g') | KeyCode::Enter) => app.generate_tpp(),
                (Screen::Tpp, KeyCode::Char('e')) => app.export_tpp(),

                (Screen::History, KeyCode::Char('t')) => app.toggle_history_tab(),
                (Screen::History, KeyCode::Char('k') | KeyCode::Up) => app.history_up(),
                (Screen::History, KeyCode::Char('j') | KeyCode::Down) => app.history_down(),
                _ => {}
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_ask() {
        let cli = Cli::try_parse_from(["socratiq", "ask", "Nora", "patent", "cliff?"]).unwrap();
        match cli.command {
            Some(Command::Ask { agent, query }) => {
                assert_eq!(agent, AgentId::Nora);
                assert_eq!(query.join(" "), "patent cliff?");
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.config_dir, PathBuf::from(".socratiq"));
    }

    #[test]
    fn test_cli_rejects_unknown_agent() {
        assert!(Cli::try_parse_from(["socratiq", "ask", "sophie", "hi"]).is_err());
    }

    #[test]
    fn test_cli_parses_tpp() {
        let cli = Cli::try_parse_from([
            "socratiq", "--base-url", "http://x", "tpp", "--drug", "Nivolumab", "--skip", "ip",
            "--skip", "market", "--export",
        ])
        .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://x"));
        match cli.command {
            Some(Command::Tpp { drug, area, skip, export }) => {
                assert_eq!(drug, "Nivolumab");
                assert!(area.is_none());
                assert_eq!(skip, vec![TppComponent::IpLandscape, TppComponent::MarketAssessment]);
                assert!(export);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_blank_questions_are_rejected() {
        let cli = Cli::try_parse_from(["socratiq", "ask", "vera", "   "]).unwrap();
        let Some(Command::Ask { query, .. }) = cli.command else {
            panic!("expected ask");
        };
        assert!(query_text(&query).is_err());

        let cli = Cli::try_parse_from(["socratiq", "sophie", "", " "]).unwrap();
        let Some(Command::Sophie { query }) = cli.command else {
            panic!("expected sophie");
        };
        let err = query_text(&query).unwrap_err();
        assert_eq!(err.to_string(), "Query must not be empty");
    }

    #[test]
    fn test_query_words_are_joined() {
        let words = vec!["  patent".to_string(), "cliff?".to_string()];
        assert_eq!(query_text(&words).unwrap(), "patent cliff?");
    }

    #[test]
    fn test_cli_defaults_to_tui() {
        let cli = Cli::try_parse_from(["socratiq"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_base_url_override() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "socratiq",
            "--config-dir",
            dir.path().to_str().unwrap(),
            "--base-url",
            "https://override.example.com",
            "agents",
        ])
        .unwrap();
        let config = load_config(&cli);
        assert_eq!(config.base_url, "https://override.example.com");
    }
}
