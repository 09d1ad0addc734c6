use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::TryRecvError};

use station_api::console::HELP;
use station_api::{init_logging, AgentCatalog, Command, Config, StationClient};
use station_persist::{ConversationId, FileBackend, HistoryStore};
use station_session::{ChatSession, SessionEvent, StreamError};
use station_stream::SseTransport;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config.logging);

    let backend = FileBackend::open(&config.storage.dir)
        .with_context(|| format!("Failed to open history at {}", config.storage.dir.display()))?;
    let store = HistoryStore::new(Arc::new(backend));

    let config = config.with_environment_override(store.environment_override());
    let profile = config.profile()?;
    tracing::info!(environment = %config.environment, base_url = %profile.base_url, "Starting station console");

    let client = StationClient::from_profile(profile).context("Failed to create API client")?;
    let agent_id = resolve_agent(&config, &client).await?;
    tracing::info!(agent_id = %agent_id, "Using chat agent");

    let transport = SseTransport::new(config.transport_config()?).context("Failed to create stream transport")?;
    let mut session = ChatSession::new(config.session_config(agent_id), Arc::new(transport), store);
    let mut events = session.subscribe();

    session.bootstrap();
    render_pending(&mut events);
    if let Some(conversation) = session.current_conversation() {
        for message in &conversation.messages {
            print_message(message.is_assistant, &message.content);
        }
    }
    println!("Type a message, or /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(usage) => {
                println!("{}", usage);
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => println!("{}", HELP),
            Command::New => {
                session.create_conversation();
            }
            Command::List => {
                let current = session.current_id().cloned();
                for entry in session.list_conversations() {
                    let marker = if Some(&entry.id) == current.as_ref() { "*" } else { " " };
                    println!(
                        "{} {}  {}  ({} messages)",
                        marker,
                        entry.id,
                        entry.conversation.name,
                        entry.conversation.messages.len()
                    );
                }
            }
            Command::Load(id) => match session.load_conversation(&ConversationId::from(id)) {
                Some(conversation) => {
                    println!("== {} ==", conversation.name);
                    for message in &conversation.messages {
                        print_message(message.is_assistant, &message.content);
                    }
                }
                None => println!("No such conversation"),
            },
            Command::Rename { id, name } => {
                if !session.rename_conversation(&ConversationId::from(id), &name) {
                    println!("Rename failed");
                }
            }
            Command::Delete(id) => {
                if !session.delete_conversation(&ConversationId::from(id)) {
                    println!("No such conversation");
                }
            }
            Command::Clear => {
                session.clear_all();
            }
            Command::Agents => match client.list_agents(&config.chat.channel).await {
                Ok(agents) => {
                    for agent in agents {
                        println!("{}  {}", agent.id, agent.agent_name);
                    }
                }
                Err(e) => println!("Failed to list agents: {}", e),
            },
            Command::Rags => match client.list_rag_orders().await {
                Ok(orders) => {
                    for order in orders {
                        println!("{}  {}", order.id, order.rag_name);
                    }
                }
                Err(e) => println!("Failed to list knowledge bases: {}", e),
            },
            Command::Rag(rag_id) => session.set_rag(rag_id),
            Command::Env(name) => {
                if config.environments.contains_key(&name) {
                    session.store().set_environment_override(&name);
                    println!("Environment '{}' will be used from the next start", name);
                } else {
                    println!("Unknown environment '{}'", name);
                }
            }
            Command::Message(text) => {
                if session.submit_message(&text).is_some() {
                    render_pending(&mut events);
                    drive_turn(&mut session, &mut events).await;
                }
            }
        }

        render_pending(&mut events);
    }

    session.cancel();
    Ok(())
}

/// The configured agent, or the first one the backend offers for the chat channel.
async fn resolve_agent(config: &Config, catalog: &dyn AgentCatalog) -> Result<String> {
    if let Some(agent_id) = config.chat.agent_id.as_ref().filter(|id| !id.is_empty()) {
        return Ok(agent_id.clone());
    }

    let agents = catalog
        .list_agents(&config.chat.channel)
        .await
        .context("Failed to list chat agents")?;

    agents
        .into_iter()
        .next()
        .map(|agent| agent.id)
        .with_context(|| format!("No agent available on channel '{}'", config.chat.channel))
}

/// Pump the in-flight turn, rendering as it goes. Ctrl-C cancels the turn.
async fn drive_turn(session: &mut ChatSession, events: &mut broadcast::Receiver<SessionEvent>) {
    enum Step {
        Event(Option<station_session::TransportEvent>),
        Interrupted,
    }

    while session.is_streaming() {
        let step = tokio::select! {
            event = session.next_event() => Step::Event(event),
            _ = tokio::signal::ctrl_c() => Step::Interrupted,
        };

        match step {
            Step::Event(Some(event)) => session.dispatch(event),
            Step::Event(None) => session.on_error(StreamError::Connection(
                "Stream ended without a terminal event".to_string(),
            )),
            Step::Interrupted => {
                session.cancel();
                println!("\n[cancelled]");
            }
        }

        render_pending(events);
    }
}

fn render_pending(events: &mut broadcast::Receiver<SessionEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => render(&event),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Console fell behind session events");
            }
            Err(_) => break,
        }
    }
}

fn render(event: &SessionEvent) {
    match event {
        SessionEvent::ConversationCreated { id } => println!("-- new conversation {} --", id),
        SessionEvent::ConversationLoaded { id } => println!("-- conversation {} --", id),
        SessionEvent::ConversationRenamed { name, .. } => println!("-- renamed to \"{}\" --", name),
        SessionEvent::ConversationDeleted { id } => println!("-- deleted {} --", id),
        SessionEvent::HistoryCleared { removed } => println!("-- cleared {} conversations --", removed),
        SessionEvent::StreamStarted { .. } => print!("assistant> "),
        SessionEvent::PartialText { chunk, .. } => print!("{}", chunk),
        SessionEvent::TurnCompleted { .. } => println!(),
        SessionEvent::TurnFailed { failure, .. } => println!("\n[{}]", failure.notice),
        SessionEvent::MessageAppended { .. } => {}
    }
    let _ = std::io::stdout().flush();
}

fn print_message(is_assistant: bool, content: &str) {
    let who = if is_assistant { "assistant" } else { "you" };
    println!("{}> {}", who, content);
}
