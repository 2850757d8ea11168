use chrono::Utc;
use tui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use super::state::AppState;
use super::{App, CONTAINER_SORT_FIELDS, NODE_SORT_FIELDS};
use crate::counts::CountEntry;
use crate::fleet::{display_version, AgentVersion, ContainerItem, ContainerState, NodeHead};
use crate::listing::{ListView, SortDirection};

pub fn draw<B>(rect: &mut Frame<B>, app: &App)
where
    B: Backend,
{
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .split(rect.size());

    match app.state() {
        AppState::Nodes => draw_nodes(rect, chunks[0], app),
        AppState::Containers { node_name, .. } => draw_containers(rect, chunks[0], app, node_name),
    }
    draw_pager(rect, chunks[1], app.view());
    draw_status(rect, chunks[2], app);

    let search = app.view().filter.search_term();
    if app.searching() || !search.is_empty() {
        draw_search(rect, chunks[3], search, app.searching());
    } else {
        draw_help(rect, chunks[3], format!("{}", app.actions()).as_str());
    }
}

/// Header cells, with an arrow next to the column the list is sorted by.
fn header<'a>(titles: &[&'a str], sortable: &[&str], view: &ListView) -> Row<'a> {
    let state = view.filter.state();
    let cells = titles.iter().enumerate().map(|(i, title)| {
        let arrow = match (sortable.get(i), state.sort_key) {
            (Some(field), Some(key)) if *field == key => match state.direction {
                SortDirection::Asc => " ▲",
                SortDirection::Desc => " ▼",
            },
            _ => "",
        };
        Cell::from(format!("{}{}", title, arrow)).style(Style::default().fg(Color::LightCyan))
    });
    Row::new(cells).height(1).bottom_margin(1)
}

fn draw_nodes<B>(frame: &mut Frame<B>, chunk: Rect, app: &App)
where
    B: Backend,
{
    if !app.is_loaded() {
        draw_placeholder(frame, chunk, "Loading nodes...");
        return;
    }
    let header = header(
        &["NAME", "ENVIRONMENT", "VERSION", "ADDRESSES", "ONLINE", "CONTAINERS"],
        &NODE_SORT_FIELDS,
        app.view(),
    );
    let rows = app
        .visible_nodes()
        .into_iter()
        .map(|node| node_row(node, app.node_count(node.id)));

    let t = Table::new(rows)
        .header(header)
        .block(Block::default().borders(Borders::TOP).title("Nodes"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .widths(&[
            Constraint::Percentage(18), // NAME
            Constraint::Percentage(12), // ENVIRONMENT
            Constraint::Percentage(18), // VERSION
            Constraint::Percentage(18), // ADDRESSES
            Constraint::Length(6),      // ONLINE
            Constraint::Percentage(24), // CONTAINERS
        ])
        .column_spacing(2);

    let mut table_state = TableState::default();
    table_state.select(app.selected_index());
    frame.render_stateful_widget(t, chunk, &mut table_state);
}

fn node_row(node: &NodeHead, count: Option<CountEntry>) -> Row<'static> {
    let addresses = AgentVersion::parse(&node.agent_version)
        .map(|agent| agent.addresses.summary())
        .unwrap_or_else(|| "-".to_string());
    let online = if node.online {
        Span::styled("yes", Style::default().fg(Color::Green))
    } else {
        Span::styled("no", Style::default().fg(Color::Red))
    };
    Row::new(vec![
        Cell::from(node.name.clone()),
        Cell::from(node.environment.clone()),
        Cell::from(display_version(node)),
        Cell::from(addresses),
        Cell::from(online),
        Cell::from(count_label(count)),
    ])
}

fn count_label(count: Option<CountEntry>) -> Spans<'static> {
    match count {
        None => Spans::from("-"),
        Some(CountEntry::Loading) => Spans::from("…"),
        Some(CountEntry::Ready {
            running, stopped, ..
        }) => Spans::from(vec![
            Span::styled(format!("{} running", running), Style::default().fg(Color::Green)),
            Span::raw(" / "),
            Span::raw(format!("{} stopped", stopped)),
        ]),
        Some(CountEntry::Failed { reason, .. }) => Spans::from(vec![
            Span::styled(reason.to_string(), Style::default().fg(Color::Red)),
            Span::styled(" (r to retry)", Style::default().fg(Color::DarkGray)),
        ]),
    }
}

fn draw_containers<B>(frame: &mut Frame<B>, chunk: Rect, app: &App, node_name: &str)
where
    B: Backend,
{
    if !app.is_loaded() {
        draw_placeholder(frame, chunk, "Loading containers...");
        return;
    }
    let header = header(
        &["", "NAME", "IMAGE", "STATE", "STATUS", "IMAGE UPDATE"],
        // first column is the status marker
        &["", CONTAINER_SORT_FIELDS[0], CONTAINER_SORT_FIELDS[1], CONTAINER_SORT_FIELDS[2]],
        app.view(),
    );
    let rows = app.visible_containers().into_iter().map(container_row);

    let t = Table::new(rows)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .title(format!("Containers on {}", node_name)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .widths(&[
            Constraint::Length(1),      // Status
            Constraint::Percentage(25), // NAME
            Constraint::Percentage(30), // IMAGE
            Constraint::Length(10),     // STATE
            Constraint::Percentage(20), // STATUS
            Constraint::Length(12),     // IMAGE UPDATE
        ])
        .column_spacing(2);

    let mut table_state = TableState::default();
    table_state.select(app.selected_index());
    frame.render_stateful_widget(t, chunk, &mut table_state);
}

fn container_row(c: &ContainerItem) -> Row<'static> {
    let marker = match c.container_state() {
        ContainerState::Created => Color::Gray,
        ContainerState::Running => Color::Green,
        ContainerState::Paused => Color::Yellow,
        ContainerState::Exited => Color::Red,
        ContainerState::Restarting => Color::LightGreen,
        ContainerState::Removing => Color::LightRed,
        ContainerState::Dead => Color::Black,
        ContainerState::Unknown => Color::DarkGray,
    };
    let stale = match c.stale.as_str() {
        "no" => Span::styled("up-to-date", Style::default().fg(Color::Green)),
        "yes" => Span::styled("available", Style::default().fg(Color::Red)),
        "processing" => Span::styled("pending", Style::default().fg(Color::Yellow)),
        "error" => Span::styled("unknown", Style::default().fg(Color::DarkGray)),
        _ => Span::raw("-"),
    };
    Row::new(vec![
        Cell::from(Span::styled(" ", Style::default().bg(marker))),
        Cell::from(c.name.trim_start_matches('/').to_string()),
        Cell::from(c.image.clone()),
        Cell::from(c.state.clone()),
        Cell::from(c.status.clone()),
        Cell::from(stale),
    ])
}

fn draw_pager<B>(frame: &mut Frame<B>, chunk: Rect, view: &ListView)
where
    B: Backend,
{
    let pager = &view.pager;
    let (first, last) = pager.visible_range();
    let mut spans = vec![Span::raw(format!(
        "{}-{} of {}  ",
        first,
        last,
        pager.total_items()
    ))];
    for page in pager.page_buttons() {
        let style = if page == pager.current_page() {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        spans.push(Span::styled(format!(" {} ", page), style));
    }
    spans.push(Span::styled(
        format!("  {} per page", pager.page_size()),
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Paragraph::new(Spans::from(spans)), chunk);
}

fn draw_status<B>(frame: &mut Frame<B>, chunk: Rect, app: &App)
where
    B: Backend,
{
    let mut spans = vec![Span::styled(
        app.refresh_status(Utc::now()),
        Style::default().fg(Color::DarkGray),
    )];
    if let Some(status) = app.status() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(status.to_string(), Style::default().fg(Color::Red)));
    }
    frame.render_widget(Paragraph::new(Spans::from(spans)), chunk);
}

fn draw_placeholder<B>(frame: &mut Frame<B>, chunk: Rect, text: &str)
where
    B: Backend,
{
    let p = Paragraph::new(vec![Spans::from(Span::raw(text.to_string()))])
        .style(Style::default().fg(Color::LightCyan))
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::White))
                .border_type(BorderType::Plain),
        );
    frame.render_widget(p, chunk);
}

fn draw_help<B>(frame: &mut Frame<B>, chunk: Rect, help_txt: &str)
where
    B: Backend,
{
    let p = Paragraph::new(vec![Spans::from(Span::raw(help_txt.to_string()))])
        .style(Style::default().fg(Color::LightCyan))
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .style(Style::default().fg(Color::White))
                .title("Help")
                .border_type(BorderType::Plain),
        );
    frame.render_widget(p, chunk);
}

fn draw_search<B>(frame: &mut Frame<B>, chunk: Rect, search: &str, editing: bool)
where
    B: Backend,
{
    let title = if editing {
        "Search (Enter to keep, Esc to clear)"
    } else {
        "Search"
    };
    let p = Paragraph::new(vec![Spans::from(Span::raw(search.to_string()))])
        .style(Style::default().fg(Color::LightCyan))
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .title(title)
                .style(Style::default().fg(Color::White).bg(Color::Black))
                .border_type(BorderType::Plain),
        );
    frame.render_widget(p, chunk);
}
