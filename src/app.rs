use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crate::agent::{AgentCatalog, AgentDescriptor, AgentId, GatewayConfig, InvocationGateway, InvocationResult};
use crate::ledger::{LedgerEntry, Scope, Session};
use crate::tpp::{self, TppComponent, TppRequest};

/// Top-level screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Ask Sophie
    Home,
    AgentChat,
    Tpp,
    History,
}

impl Screen {
    pub const ALL: [Screen; 4] = [Self::Home, Self::AgentChat, Self::Tpp, Self::History];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Home => "🏠 Home",
            Self::AgentChat => "💬 Agent Chat",
            Self::Tpp => "🎯 Generate TPP",
            Self::History => "📊 History",
        }
    }

    fn next(&self) -> Self {
        match self {
            Self::Home => Self::AgentChat,
            Self::AgentChat => Self::Tpp,
            Self::Tpp => Self::History,
            Self::History => Self::Home,
        }
    }
}

/// Input mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing a question (Home / Agent Chat)
    EditQuery,
    /// Typing the drug name (TPP)
    EditDrug,
    /// Typing the therapeutic area (TPP)
    EditArea,
    /// A call is in flight, input is ignored
    Waiting,
}

/// History tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryTab {
    AgentChats,
    Reports,
}

/// A call that has been sent and what to record when it returns
#[derive(Debug, Clone)]
pub struct PendingCall {
    pub origin: Screen,
    pub scope: Scope,
    pub descriptor: AgentDescriptor,
    pub query: String,
    /// (drug name, therapeutic area) for TPP requests
    pub tpp: Option<(String, Option<String>)>,
}

/// Events from spawned gateway calls
#[derive(Debug)]
pub enum GatewayEvent {
    Completed {
        call: PendingCall,
        result: InvocationResult,
    },
}

/// Most recent result, shown on the screen that asked for it
#[derive(Debug, Clone)]
pub struct LastResult {
    pub origin: Screen,
    pub descriptor: AgentDescriptor,
    pub result: InvocationResult,
    pub drug_name: Option<String>,
}

/// Application state
pub struct App {
    /// Interaction history of this session
    pub session: Session,
    pub catalog: AgentCatalog,
    gateway: InvocationGateway,
    export_dir: PathBuf,
    pub screen: Screen,
    pub input_mode: InputMode,
    /// Question being typed
    pub query_buffer: String,
    pub drug_buffer: String,
    pub area_buffer: String,
    pub selected_agent: AgentId,
    /// Selected TPP components, indexed like `TppComponent::ALL`
    pub tpp_selection: [bool; 6],
    pub tpp_cursor: usize,
    pub last: Option<LastResult>,
    pub history_tab: HistoryTab,
    pub history_index: usize,
    /// Scroll offset of the result panel
    pub scroll: u16,
    pub status_message: Option<String>,
    /// Frame counter for the waiting spinner
    pub tick: usize,
    event_tx: mpsc::Sender<GatewayEvent>,
    event_rx: mpsc::Receiver<GatewayEvent>,
}

impl App {
    pub fn new(config: &GatewayConfig, gateway: InvocationGateway) -> Self {
        let (event_tx, event_rx) = mpsc::channel(8);
        Self {
            session: Session::new(),
            catalog: config.catalog(),
            gateway,
            export_dir: config.export_dir(),
            screen: Screen::Home,
            input_mode: InputMode::Normal,
            query_buffer: String::new(),
            drug_buffer: String::new(),
            area_buffer: String::new(),
            selected_agent: AgentId::Vera,
            tpp_selection: [true; 6],
            tpp_cursor: 0,
            last: None,
            history_tab: HistoryTab::AgentChats,
            history_index: 0,
            scroll: 0,
            status_message: None,
            tick: 0,
            event_tx,
            event_rx,
        }
    }

    /// Ctrl+C quits from any mode. `q` quits unless text is being typed,
    /// including while a call is in flight; the pending call ends with the session.
    pub fn is_quit_key(&self, key: &KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        key.code == KeyCode::Char('q')
            && matches!(self.input_mode, InputMode::Normal | InputMode::Waiting)
    }

    pub fn switch_screen(&mut self, screen: Screen) {
        self.screen = screen;
        self.scroll = 0;
        self.history_index = 0;
        self.status_message = None;
    }

    pub fn next_screen(&mut self) {
        self.switch_screen(self.screen.next());
    }

    /// Start typing into the field that belongs to the current screen
    pub fn start_editing(&mut self) {
        self.input_mode = match self.screen {
            Screen::Home | Screen::AgentChat => InputMode::EditQuery,
            Screen::Tpp => InputMode::EditDrug,
            Screen::History => return,
        };
        self.status_message = Some("Type, Enter to submit, ESC to stop editing".into());
    }

    pub fn edit_area(&mut self) {
        if self.screen == Screen::Tpp {
            self.input_mode = InputMode::EditArea;
            self.status_message = Some("Therapeutic area (optional), Enter to confirm".into());
        }
    }

    fn active_buffer(&mut self) -> Option<&mut String> {
        match self.input_mode {
            InputMode::EditQuery => Some(&mut self.query_buffer),
            InputMode::EditDrug => Some(&mut self.drug_buffer),
            InputMode::EditArea => Some(&mut self.area_buffer),
            InputMode::Normal | InputMode::Waiting => None,
        }
    }

    /// Handle input
    pub fn handle_input(&mut self, c: char) {
        if let Some(buffer) = self.active_buffer() {
            buffer.push(c);
        }
    }

    /// Handle backspace
    pub fn handle_backspace(&mut self) {
        if let Some(buffer) = self.active_buffer() {
            buffer.pop();
        }
    }

    /// Confirm input
    pub fn confirm_input(&mut self) {
        match self.input_mode {
            InputMode::EditQuery => self.submit_query(),
            InputMode::EditDrug => {
                self.input_mode = InputMode::EditArea;
                self.status_message = Some("Therapeutic area (optional), Enter to confirm".into());
            }
            InputMode::EditArea => {
                self.input_mode = InputMode::Normal;
                self.status_message = Some("Press [g] to generate the TPP".into());
            }
            InputMode::Normal | InputMode::Waiting => {}
        }
    }

    /// Stop editing, keep the text
    pub fn cancel_input(&mut self) {
        if self.input_mode != InputMode::Waiting {
            self.input_mode = InputMode::Normal;
            self.status_message = None;
        }
    }

    /// Clear the question and the displayed result
    pub fn clear(&mut self) {
        self.query_buffer.clear();
        if self.last.as_ref().is_some_and(|l| l.origin == self.screen) {
            self.last = None;
        }
        self.scroll = 0;
        self.status_message = None;
    }

    pub fn select_next_agent(&mut self) {
        let next = (self.selected_agent.index() + 1) % AgentId::ALL.len();
        self.selected_agent = AgentId::ALL[next];
    }

    pub fn select_prev_agent(&mut self) {
        let len = AgentId::ALL.len();
        let prev = (self.selected_agent.index() + len - 1) % len;
        self.selected_agent = AgentId::ALL[prev];
    }

    pub fn component_up(&mut self) {
        self.tpp_cursor = self.tpp_cursor.saturating_sub(1);
    }

    pub fn component_down(&mut self) {
        if self.tpp_cursor < TppComponent::ALL.len() - 1 {
            self.tpp_cursor += 1;
        }
    }

    pub fn toggle_component(&mut self) {
        self.tpp_selection[self.tpp_cursor] = !self.tpp_selection[self.tpp_cursor];
    }

    pub fn scroll_result(&mut self, delta: i32) {
        self.scroll = if delta < 0 {
            self.scroll.saturating_sub(delta.unsigned_abs() as u16)
        } else {
            self.scroll.saturating_add(delta as u16)
        };
    }

    /// Send the typed question to Sophie (Home) or the selected agent
    pub fn submit_query(&mut self) {
        let query = self.query_buffer.trim().to_string();
        if query.is_empty() {
            self.status_message = Some("Enter a question first".into());
            return;
        }

        let (descriptor, scope) = match self.screen {
            Screen::Home => (self.catalog.orchestrator().clone(), Scope::Orchestrator),
            Screen::AgentChat => (
                self.catalog.agent(self.selected_agent).clone(),
                Scope::Agent(self.selected_agent),
            ),
            Screen::Tpp | Screen::History => return,
        };

        self.dispatch(PendingCall {
            origin: self.screen,
            scope,
            descriptor,
            query,
            tpp: None,
        });
    }

    /// Build the TPP prompt from the form and send it to Sophie
    pub fn generate_tpp(&mut self) {
        let area = Some(self.area_buffer.trim().to_string()).filter(|a| !a.is_empty());
        let request = TppRequest::new(self.drug_buffer.trim(), area.clone())
            .with_selection(&self.tpp_selection);

        match request.prompt() {
            Ok(prompt) => self.dispatch(PendingCall {
                origin: Screen::Tpp,
                scope: Scope::Orchestrator,
                descriptor: self.catalog.orchestrator().clone(),
                query: prompt,
                tpp: Some((request.drug_name, area)),
            }),
            Err(e) => self.status_message = Some(format!("❌ {}", e)),
        }
    }

    /// Start the call in the background; input stays blocked until it returns
    fn dispatch(&mut self, call: PendingCall) {
        self.input_mode = InputMode::Waiting;
        self.status_message = Some(if call.descriptor.is_orchestrator() {
            "Sophie is orchestrating multiple agents for comprehensive analysis...".into()
        } else {
            format!("Consulting {}...", call.descriptor.full_name)
        });

        let gateway = self.gateway.clone();
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = gateway.invoke(&call.descriptor, &call.query).await;
            if event_tx.send(GatewayEvent::Completed { call, result }).await.is_err() {
                tracing::warn!("Result dropped: app is gone");
            }
        });
    }

    /// Process gateway events (non-blocking)
    pub fn process_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: GatewayEvent) {
        match event {
            GatewayEvent::Completed { call, result } => self.record(call, result),
        }
    }

    /// Append the result to the ledger and show it
    fn record(&mut self, call: PendingCall, result: InvocationResult) {
        let mut entry = LedgerEntry::new(call.query, result.clone());
        let drug_name = call.tpp.as_ref().map(|(drug, _)| drug.clone());
        if let Some((drug, area)) = call.tpp {
            entry = entry.with_tpp(drug, area.as_deref());
        }
        self.session.ledger.append(call.scope, entry);

        self.status_message = Some(match result.error() {
            None => format!("✅ {} responded", call.descriptor.name),
            Some(e) => format!("❌ {}: {}", call.descriptor.name, e),
        });
        self.last = Some(LastResult {
            origin: call.origin,
            descriptor: call.descriptor,
            result,
            drug_name,
        });
        self.scroll = 0;
        self.input_mode = InputMode::Normal;
    }

    /// Result to show on the current screen
    pub fn visible_result(&self) -> Option<&LastResult> {
        self.last.as_ref().filter(|l| l.origin == self.screen)
    }

    /// Export the last TPP as JSON
    pub fn export_tpp(&mut self) {
        let Some(last) = self.last.as_ref().filter(|l| l.origin == Screen::Tpp) else {
            self.status_message = Some("Generate a TPP first".into());
            return;
        };
        let (Some(payload), Some(drug)) = (last.result.payload(), last.drug_name.as_deref()) else {
            self.status_message = Some("Nothing to export: the last TPP failed".into());
            return;
        };

        self.status_message = Some(match tpp::export(payload, drug, &self.export_dir) {
            Ok(path) => format!("📥 Saved {}", path.display()),
            Err(e) => format!("❌ Export failed: {:#}", e),
        });
    }

    /// Export the whole session history as JSON
    pub fn export_session(&mut self) {
        if self.session.ledger.is_empty() {
            self.status_message = Some("Nothing to export yet".into());
            return;
        }
        self.status_message = Some(match self.session.export(&self.export_dir) {
            Ok(path) => format!("📥 Saved {}", path.display()),
            Err(e) => format!("❌ Export failed: {:#}", e),
        });
    }

    pub fn toggle_history_tab(&mut self) {
        self.history_tab = match self.history_tab {
            HistoryTab::AgentChats => HistoryTab::Reports,
            HistoryTab::Reports => HistoryTab::AgentChats,
        };
        self.history_index = 0;
        self.scroll = 0;
    }

    /// History rows for the current tab, most recent first
    pub fn history_rows(&self) -> Vec<(Scope, &LedgerEntry)> {
        let ledger = &self.session.ledger;
        match self.history_tab {
            HistoryTab::AgentChats => ledger
                .agents_with_history()
                .into_iter()
                .flat_map(move |id| {
                    let scope = Scope::Agent(id);
                    ledger.all(scope).iter().rev().map(move |e| (scope, e))
                })
                .collect(),
            HistoryTab::Reports => ledger
                .all(Scope::Orchestrator)
                .iter()
                .rev()
                .map(|e| (Scope::Orchestrator, e))
                .collect(),
        }
    }

    pub fn history_up(&mut self) {
        if self.history_index > 0 {
            self.history_index -= 1;
            self.scroll = 0;
        }
    }

    pub fn history_down(&mut self) {
        let count = self.history_rows().len();
        if count > 0 && self.history_index < count - 1 {
            self.history_index += 1;
            self.scroll = 0;
        }
    }

    /// Descriptor for a ledger scope
    pub fn descriptor_for(&self, scope: Scope) -> &AgentDescriptor {
        match scope {
            Scope::Agent(id) => self.catalog.agent(id),
            Scope::Orchestrator => self.catalog.orchestrator(),
        }
    }
}
