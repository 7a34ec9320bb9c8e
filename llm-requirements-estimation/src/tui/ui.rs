use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Frame,
};
use requirements_estimation::memory::base_memory_gb;
use requirements_estimation::{DataType, ModelSummary};

use super::app::{App, Tab, ITEMS_PER_PAGE};
use crate::utils::{format_context_length, format_thousands, format_timestamp, per_user, truncate_model_id};

const ACCENT: Color = Color::Rgb(0x87, 0x4B, 0xFD);
const HIGHLIGHT: Color = Color::Rgb(0x74, 0xB2, 0xFF);
const MUTED: Color = Color::Rgb(0x62, 0x62, 0x62);

pub fn render(app: &App, frame: &mut Frame) {
    let search_height = if app.search_mode { 3 } else { 0 };
    let error_height = u16::from(app.error.is_some());
    let controls_height = if app.model.is_some() { 4 } else { 2 };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(error_height),
            Constraint::Length(search_height),
            Constraint::Min(0),
            Constraint::Length(controls_height),
        ])
        .split(frame.area());

    let title = Paragraph::new(" HuggingFace GPU Memory Calculator ").style(
        Style::default()
            .fg(Color::White)
            .bg(Color::Rgb(0x7B, 0x2F, 0xBE))
            .add_modifier(Modifier::BOLD),
    );
    frame.render_widget(title, layout[0]);

    if let Some(error) = &app.error {
        let error = Paragraph::new(format!("Error: {error}")).style(Style::default().fg(Color::Red));
        frame.render_widget(error, layout[1]);
    }

    if app.search_mode {
        let input = Paragraph::new(format!("{}_", app.search_input))
            .block(Block::default().title("Search models").borders(Borders::ALL).border_style(accent()));
        frame.render_widget(input, layout[2]);
    }

    if app.loading {
        frame.render_widget(Paragraph::new(format!("{} Loading...", app.spinner())), layout[3]);
    } else {
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(layout[3]);
        render_model_list(app, frame, body[0]);
        render_details(app, frame, body[1]);
    }

    frame.render_widget(controls(app), layout[4]);

    if app.show_help {
        render_help(frame);
    }
}

fn accent() -> Style {
    Style::default().fg(ACCENT)
}

fn value(text: String) -> Span<'static> {
    Span::styled(text, Style::default().fg(HIGHLIGHT))
}

fn render_model_list(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title("Available Models")
        .borders(Borders::ALL)
        .border_style(accent());

    if app.model_ids.is_empty() {
        frame.render_widget(Paragraph::new("No models found").block(block), area);
        return;
    }

    let width = usize::from(area.width.saturating_sub(4));
    let start = (app.cursor / ITEMS_PER_PAGE) * ITEMS_PER_PAGE;
    let end = (start + ITEMS_PER_PAGE).min(app.model_ids.len());

    let mut lines: Vec<Line> = app.model_ids[start..end]
        .iter()
        .enumerate()
        .map(|(offset, model_id)| {
            let model_id = truncate_model_id(model_id, width);
            if start + offset == app.cursor {
                Line::from(vec![
                    Span::raw("> "),
                    Span::styled(model_id, Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)),
                ])
            } else {
                Line::from(format!("  {model_id}"))
            }
        })
        .collect();

    let total_pages = app.model_ids.len().div_ceil(ITEMS_PER_PAGE);
    lines.push(Line::from("─".repeat(width + 2)).style(Style::default().fg(MUTED)));
    lines.push(Line::from(format!(
        "Page {} of {} ({} models)",
        start / ITEMS_PER_PAGE + 1,
        total_pages,
        app.model_ids.len()
    )));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_details(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default().borders(Borders::ALL).border_style(accent());
    let Some(model) = &app.model else {
        frame.render_widget(Paragraph::new("Select a model to view details").block(block), area);
        return;
    };

    let inner = block.inner(area);
    frame.render_widget(block, area);
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    let tabs = Tabs::new(Tab::TITLES)
        .select(app.active_tab.index())
        .highlight_style(Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, sections[0]);

    let lines = match app.active_tab {
        Tab::Memory => memory_lines(app, model),
        Tab::Details => detail_lines(model),
    };
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), sections[1]);
}

fn memory_lines(app: &App, model: &ModelSummary) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(format!("Model: {}", model.model_id)),
        Line::from(""),
        Line::from("Configuration:"),
        Line::from(vec![Span::raw("- Users: "), value(app.users.to_string())]),
        Line::from(vec![
            Span::raw("- Context Length: "),
            value(format_context_length(app.context_length)),
        ]),
    ];
    if app.is_calculating() {
        lines.push(Line::from(format!("{} calculating KV cache...", app.spinner())).style(Style::default().fg(MUTED)));
    }

    for dtype in DataType::ALL {
        let base = base_memory_gb(model.parameters_b, dtype);
        lines.push(Line::from(""));
        lines.push(Line::from(format!("{dtype}:")));
        lines.push(Line::from(vec![Span::raw("  Base: "), value(format!("{base:.2} GB"))]));

        match app.kv_cache(dtype) {
            Some(kv) => {
                lines.push(Line::from(vec![
                    Span::raw("  KV Cache: "),
                    value(format!("{:.2} GB", kv.gigabytes)),
                    Span::styled(format!(" ({})", kv.method.label()), Style::default().fg(MUTED)),
                ]));
                lines.push(Line::from(vec![
                    Span::raw("  Total: "),
                    value(format!("{:.2} GB", base + kv.gigabytes)),
                ]));
                lines.push(Line::from(vec![
                    Span::raw("  Per User: "),
                    value(format!("{:.2} GB", per_user(kv.gigabytes, app.users))),
                ]));
            }
            None => {
                let pending = Span::styled("…", Style::default().fg(MUTED));
                lines.push(Line::from(vec![Span::raw("  KV Cache: "), pending.clone()]));
                lines.push(Line::from(vec![Span::raw("  Total: "), pending.clone()]));
                lines.push(Line::from(vec![Span::raw("  Per User: "), pending]));
            }
        }
    }
    lines
}

fn detail_lines(model: &ModelSummary) -> Vec<Line<'static>> {
    vec![
        Line::from(format!("Model ID: {}", model.model_id)),
        Line::from(format!("Author: {}", model.author)),
        Line::from(vec![Span::raw("Parameters: "), value(format!("{:.2}B", model.parameters_b))]),
        Line::from(""),
        Line::from("Usage Statistics:"),
        Line::from(vec![Span::raw("Downloads: "), value(format_thousands(model.downloads))]),
        Line::from(vec![Span::raw("Likes: "), value(format_thousands(model.likes))]),
        Line::from(""),
        Line::from(format!("Last Updated: {}", format_timestamp(&model.fetched_at))),
    ]
}

fn preset_line(label: &str, presets: &[u32], current: u32, format: impl Fn(u32) -> String) -> Line<'static> {
    let mut spans = vec![Span::raw(label.to_string())];
    for (i, &preset) in presets.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" |"));
        }
        spans.push(Span::raw(" "));
        if preset == current {
            spans.push(Span::styled(format(preset), Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)));
        } else {
            spans.push(Span::raw(format(preset)));
        }
    }
    Line::from(spans)
}

fn controls(app: &App) -> Paragraph<'static> {
    let mut lines = vec![
        Line::from("Navigation:"),
        Line::from("↑/↓ or j/k: Navigate • Enter: Select • /: Search • Tab: Switch view • ?: Help • q: Quit")
            .style(Style::default().fg(MUTED)),
    ];
    if app.model.is_some() {
        let settings = app.settings();
        lines.push(preset_line("Users (+/-):", &settings.user_counts, app.users, |n| n.to_string()));
        lines.push(preset_line(
            "Context (c):",
            &settings.context_lengths,
            app.context_length,
            format_context_length,
        ));
    }
    Paragraph::new(lines)
}

const HELP: [(&str, &[(&str, &str)]); 3] = [
    (
        "Navigation",
        &[
            ("↑/↓, j/k", "Navigate through models"),
            ("PgUp/PgDn", "Jump 10 items"),
            ("Home/End", "Jump to top/bottom"),
            ("Enter", "Select model"),
            ("/", "Search models"),
            ("Esc", "Exit search"),
            ("Tab", "Switch view"),
            ("q", "Quit application"),
        ],
    ),
    (
        "Configuration",
        &[("+/-", "Adjust user count"), ("c", "Cycle context length")],
    ),
    ("Display", &[("?", "Toggle help")]),
];

fn render_help(frame: &mut Frame) {
    let mut lines = Vec::new();
    for (category, items) in HELP {
        lines.push(Line::from(format!("{category}:")).style(Style::default().add_modifier(Modifier::BOLD)));
        for (key, desc) in items {
            lines.push(Line::from(vec![
                Span::styled(format!("  {key:<12}"), Style::default().fg(HIGHLIGHT)),
                Span::raw(format!(": {desc}")),
            ]));
        }
        lines.push(Line::from(""));
    }
    lines.push(Line::from("Press ? to close help").style(Style::default().fg(MUTED)));

    let area = centered(frame.area(), 60, 20);
    let help = Paragraph::new(lines).block(
        Block::default()
            .title("Keyboard Shortcuts")
            .borders(Borders::ALL)
            .border_style(accent()),
    );
    frame.render_widget(Clear, area);
    frame.render_widget(help, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
