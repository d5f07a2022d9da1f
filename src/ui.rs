use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs, Wrap},
};

use crate::agent::{AgentId, Target};
use crate::app::{App, HistoryTab, InputMode, Screen};
use crate::ledger::Scope;
use crate::tpp::TppComponent;
use crate::view;

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

fn agent_color(target: Target) -> Color {
    match target {
        Target::Agent(AgentId::Vera) => Color::Blue,
        Target::Agent(AgentId::Finn) => Color::LightMagenta,
        Target::Agent(AgentId::Nora) => Color::Cyan,
        Target::Agent(AgentId::Clia) => Color::Green,
        Target::Orchestrator => Color::Magenta,
    }
}

fn bordered(title: impl Into<String>, color: Color) -> Block<'static> {
    Block::default()
        .title(title.into())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

pub fn ui(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Screen tabs
            Constraint::Min(0),    // Body
            Constraint::Length(3), // Footer
        ])
        .split(area);

    // Header
    let header = Paragraph::new(" 🧬 SocratIQ Intelligence Platform - Pharmaceutical Intelligence Powered by Multi-Agent AI")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, main_layout[0]);

    // Tabs
    let selected = Screen::ALL.iter().position(|s| *s == app.screen).unwrap_or(0);
    let titles: Vec<String> = Screen::ALL
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}] {}", i + 1, s.title()))
        .collect();
    let tabs = Tabs::new(titles)
        .select(selected)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(tabs, main_layout[1]);

    match app.screen {
        Screen::Home => draw_home(frame, app, main_layout[2]),
        Screen::AgentChat => draw_agent_chat(frame, app, main_layout[2]),
        Screen::Tpp => draw_tpp(frame, app, main_layout[2]),
        Screen::History => draw_history(frame, app, main_layout[2]),
    }

    // Footer
    let footer_text = match app.input_mode {
        InputMode::Waiting => format!(
            " {} {}  [q]uit ",
            SPINNER[app.tick % SPINNER.len()],
            app.status_message.as_deref().unwrap_or("Waiting...")
        ),
        _ => app
            .status_message
            .clone()
            .unwrap_or_else(|| footer_help(app.screen).to_string()),
    };
    let footer = Paragraph::new(footer_text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, main_layout[3]);
}

fn footer_help(screen: Screen) -> &'static str {
    match screen {
        Screen::Home => " [i]ask Sophie [c]lear [J/K]scroll [Tab]next [x]export session [q]uit ",
        Screen::AgentChat => " [h/l]agent [i]ask [c]lear [J/K]scroll [Tab]next [q]uit ",
        Screen::Tpp => " [d]rug [a]rea [j/k]move [space]toggle [g]enerate [e]xport [q]uit ",
        Screen::History => " [t]ab [j/k]select [J/K]scroll [x]export session [q]uit ",
    }
}

/// Split body into a left column and a result panel
fn split_body(area: Rect) -> (Rect, Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(38), Constraint::Percentage(62)])
        .split(area);
    (columns[0], columns[1])
}

fn draw_input(frame: &mut Frame, title: &str, text: &str, active: bool, area: Rect) {
    let color = if active { Color::Yellow } else { Color::DarkGray };
    let shown = if active { format!("{}▏", text) } else { text.to_string() };
    let input = Paragraph::new(shown)
        .style(Style::default().fg(if active { Color::Yellow } else { Color::White }))
        .wrap(Wrap { trim: false })
        .block(bordered(title.to_string(), color));
    frame.render_widget(input, area);
}

fn draw_result(frame: &mut Frame, app: &App, title: String, area: Rect) {
    let lines = match app.visible_result() {
        Some(last) if last.descriptor.is_orchestrator() => {
            view::orchestrator_panel(&last.result, &app.catalog)
        }
        Some(last) => view::agent_panel(&last.result, &last.descriptor),
        None => vec![Line::styled(
            "No response yet.",
            Style::default().fg(Color::DarkGray),
        )],
    };
    let color = app
        .visible_result()
        .map_or(Color::DarkGray, |l| agent_color(l.descriptor.target));
    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0))
        .block(bordered(title, color));
    frame.render_widget(panel, area);
}

fn draw_home(frame: &mut Frame, app: &App, area: Rect) {
    let (left, right) = split_body(area);
    let sophie = app.catalog.orchestrator();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Length(6), Constraint::Min(0)])
        .split(left);

    let card = Paragraph::new(sophie.description.as_str())
        .wrap(Wrap { trim: true })
        .block(bordered(
            format!(" {} Ask Sophie - {} ", sophie.icon, sophie.full_name),
            agent_color(sophie.target),
        ));
    frame.render_widget(card, rows[0]);

    draw_input(
        frame,
        " Ask Sophie Anything ",
        &app.query_buffer,
        app.input_mode == InputMode::EditQuery,
        rows[1],
    );

    let team: Vec<ListItem> = app
        .catalog
        .agents()
        .flat_map(|agent| {
            [
                ListItem::new(format!(" {} {}", agent.icon, agent.full_name)).style(
                    Style::default()
                        .fg(agent_color(agent.target))
                        .add_modifier(Modifier::BOLD),
                ),
                ListItem::new(format!("   {}", agent.description))
                    .style(Style::default().fg(Color::Gray)),
            ]
        })
        .collect();
    let team_list = List::new(team).block(bordered(" Specialized Agent Team ", Color::DarkGray));
    frame.render_widget(team_list, rows[2]);

    draw_result(frame, app, format!(" {} Sophie ", sophie.icon), right);
}

fn draw_agent_chat(frame: &mut Frame, app: &App, area: Rect) {
    let (left, right) = split_body(area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Length(6),
            Constraint::Min(0),
        ])
        .split(left);

    let items: Vec<ListItem> = app
        .catalog
        .agents()
        .map(|agent| {
            let style = if agent.target == Target::Agent(app.selected_agent) {
                Style::default().bg(agent_color(agent.target)).fg(Color::Black)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} {}", agent.icon, agent.name)).style(style)
        })
        .collect();
    let selector = List::new(items).block(bordered(" Select Agent [h/l] ", Color::Cyan));
    frame.render_widget(selector, rows[0]);

    let selected = app.catalog.agent(app.selected_agent);
    let about = Paragraph::new(vec![
        Line::styled(
            selected.full_name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Line::raw(selected.description.clone()),
    ])
    .wrap(Wrap { trim: true })
    .block(bordered("", agent_color(selected.target)));
    frame.render_widget(about, rows[1]);

    draw_input(
        frame,
        " Your Question ",
        &app.query_buffer,
        app.input_mode == InputMode::EditQuery,
        rows[2],
    );

    let recent: Vec<ListItem> = app
        .session
        .ledger
        .recent(Scope::Agent(app.selected_agent), 3)
        .into_iter()
        .map(|entry| {
            ListItem::new(vec![
                Line::raw(format!(" 📝 {}", entry.preview(60))),
                Line::styled(
                    format!("    {}", entry.timestamp.to_rfc3339()),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        })
        .collect();
    let recent_list = List::new(recent).block(bordered(" Recent Queries ", Color::DarkGray));
    frame.render_widget(recent_list, rows[3]);

    draw_result(
        frame,
        app,
        format!(" {} {} ", selected.icon, selected.full_name),
        right,
    );
}

fn draw_tpp(frame: &mut Frame, app: &App, area: Rect) {
    let (left, right) = split_body(area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(8),
            Constraint::Min(0),
        ])
        .split(left);

    draw_input(
        frame,
        " Drug Name [d] ",
        &app.drug_buffer,
        app.input_mode == InputMode::EditDrug,
        rows[0],
    );
    draw_input(
        frame,
        " Therapeutic Area (Optional) [a] ",
        &app.area_buffer,
        app.input_mode == InputMode::EditArea,
        rows[1],
    );

    let components: Vec<ListItem> = TppComponent::ALL
        .iter()
        .enumerate()
        .map(|(i, component)| {
            let mark = if app.tpp_selection[i] { "[x]" } else { "[ ]" };
            let style = if i == app.tpp_cursor && app.input_mode == InputMode::Normal {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} {}", mark, component.label())).style(style)
        })
        .collect();
    let list = List::new(components).block(bordered(" TPP Components to Include ", Color::Cyan));
    frame.render_widget(list, rows[2]);

    let hint = Paragraph::new(vec![
        Line::raw("[g] 🧠 Generate TPP with Sophie"),
        Line::raw("[e] 📥 Download TPP as JSON"),
    ])
    .style(Style::default().fg(Color::Gray))
    .block(bordered("", Color::DarkGray));
    frame.render_widget(hint, rows[3]);

    let title = match app.visible_result().and_then(|l| l.drug_name.as_deref()) {
        Some(drug) => format!(" Target Product Profile: {} ", drug),
        None => " Target Product Profile ".to_string(),
    };
    draw_result(frame, app, title, right);
}

fn draw_history(frame: &mut Frame, app: &App, area: Rect) {
    let (left, right) = split_body(area);
    let rows = app.history_rows();

    let tab_title = match app.history_tab {
        HistoryTab::AgentChats => " 💬 Agent Chats | TPP Reports [t] ",
        HistoryTab::Reports => " Agent Chats | 🎯 TPP Reports [t] ",
    };

    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .map(|(i, (scope, entry))| {
            let descriptor = app.descriptor_for(*scope);
            let style = if i == app.history_index {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else {
                Style::default()
            };
            ListItem::new(format!(
                " {} {}. {} ({})",
                descriptor.icon,
                i + 1,
                entry.title(80),
                entry.date()
            ))
            .style(style)
        })
        .collect();

    let list = if items.is_empty() {
        let hint = match app.history_tab {
            HistoryTab::AgentChats => "No chat history yet. Start a conversation in Agent Chat!",
            HistoryTab::Reports => "No TPP history yet. Generate your first TPP!",
        };
        List::new(vec![ListItem::new(hint).style(Style::default().fg(Color::DarkGray))])
    } else {
        List::new(items)
    };
    frame.render_widget(list.block(bordered(tab_title, Color::Cyan)), left);

    let Some((scope, entry)) = rows.get(app.history_index) else {
        frame.render_widget(Paragraph::new("").block(bordered(" Detail ", Color::DarkGray)), right);
        return;
    };
    let descriptor = app.descriptor_for(*scope);
    let mut lines = view::entry_header(entry);
    lines.extend(match scope {
        Scope::Orchestrator => view::orchestrator_panel(&entry.result, &app.catalog),
        Scope::Agent(_) => view::agent_panel(&entry.result, descriptor),
    });
    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0))
        .block(bordered(
            format!(" {} {} ", descriptor.icon, descriptor.full_name),
            agent_color(descriptor.target),
        ));
    frame.render_widget(detail, right);
}
