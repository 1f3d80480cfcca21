use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::Marker,
    text::{Line, Span, Text},
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Points},
        Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap,
    },
    Frame,
};
use riot_core::summarizer::{fleet_stats, herd_stats};
use riot_core::{Animal, AnimalStatus, ChatRole, Snapshot};

use crate::app::{App, FocusPane, InputMode, MobileView, Screen, SettingsField, Tab};

/// Ensure the selected item in a list is visible by adjusting the ListState offset.
fn ensure_selected_visible(state: &mut ListState, visible_height: usize) {
    let visible_height = visible_height.max(1);

    if let Some(selected) = state.selected() {
        // Offset range where selected stays on screen
        let min_offset = selected.saturating_sub(visible_height - 1);
        let max_offset = selected;

        let new_offset = state.offset().clamp(min_offset, max_offset);
        if new_offset != state.offset() {
            *state.offset_mut() = new_offset;
        }
    }
}

/// Parse a line of assistant text: `**bold**` spans and `- ` list items
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();

    let trimmed = text.trim_start();
    let body = match trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
        Some(rest) => {
            spans.push(Span::styled("  • ", Style::default().fg(Color::Yellow)));
            rest
        }
        None => text,
    };

    let mut chars = body.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn status_color(status: AnimalStatus) -> Color {
    match status {
        AnimalStatus::Healthy => Color::Green,
        AnimalStatus::Warning => Color::Yellow,
        AnimalStatus::Danger => Color::Red,
    }
}

fn mask(secret: &str) -> String {
    "•".repeat(secret.chars().count().min(40))
}

/// Longitude and latitude ranges covering every herd area and animal, padded
fn map_bounds(snapshot: &Snapshot) -> Option<([f64; 2], [f64; 2])> {
    let points = snapshot
        .herds
        .iter()
        .flat_map(|h| h.polygon.iter().chain(std::iter::once(&h.location)))
        .chain(snapshot.animals.iter().map(|a| &a.location));

    let mut bounds: Option<(f64, f64, f64, f64)> = None;
    for p in points {
        bounds = Some(match bounds {
            None => (p.lng, p.lng, p.lat, p.lat),
            Some((min_x, max_x, min_y, max_y)) => {
                (min_x.min(p.lng), max_x.max(p.lng), min_y.min(p.lat), max_y.max(p.lat))
            }
        });
    }

    let (min_x, max_x, min_y, max_y) = bounds?;
    let pad_x = ((max_x - min_x) * 0.1).max(0.001);
    let pad_y = ((max_y - min_y) * 0.1).max(0.001);
    Some((
        [min_x - pad_x, max_x + pad_x],
        [min_y - pad_y, max_y + pad_y],
    ))
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    if app.screen == Screen::Login {
        render_login(app, frame, area);
        return;
    }

    app.on_resize(area.width);
    let show_nav = app.compact && app.tab == Tab::Monitoring;

    // Main layout: header, body, bottom nav (compact only), footer
    let [header_area, body_area, nav_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(if show_nav { 1 } else { 0 }),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.tab {
        Tab::Monitoring if app.compact => render_compact(app, frame, body_area),
        Tab::Monitoring => render_monitoring(app, frame, body_area),
        Tab::Settings => render_settings(app, frame, body_area),
    }

    if show_nav {
        render_bottom_nav(app, frame, nav_area);
    }
    render_footer(app, frame, footer_area);
}

fn render_login(app: &App, frame: &mut Frame, area: Rect) {
    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = 10.min(area.height);

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green))
        .title(" R-IoT ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let [title_area, _, label_area, input_area, error_area, _, hint_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(inner);

    frame.render_widget(
        Paragraph::new("Monitoramento inteligente de rebanhos").style(Style::default().fg(Color::Green).bold()),
        title_area,
    );
    frame.render_widget(Paragraph::new("Senha:"), label_area);
    frame.render_widget(
        Paragraph::new("*".repeat(app.password_input.chars().count())).style(Style::default().fg(Color::Cyan)),
        input_area,
    );

    if let Some(error) = &app.login_error {
        frame.render_widget(
            Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
            error_area,
        );
    }

    frame.render_widget(
        Paragraph::new("Enter: entrar  Esc: sair").style(Style::default().fg(Color::DarkGray)),
        hint_area,
    );

    let cursor_x = (app.password_input.chars().count() as u16).min(input_area.width.saturating_sub(1));
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let tab_style = |tab: Tab| {
        if app.tab == tab {
            Style::default().fg(Color::Black).bg(Color::Green).bold()
        } else {
            Style::default().fg(Color::White)
        }
    };

    let feed_status = if app.feed.loading {
        Span::styled(" Carregando dados...", Style::default().fg(Color::Yellow))
    } else if let Some(err) = &app.feed.error {
        Span::styled(format!(" Falha na atualização: {}", err), Style::default().fg(Color::Red).bold())
    } else if let Some(ts) = app.feed.last_updated {
        Span::styled(
            format!(" Atualizado {} UTC", ts.format("%H:%M:%S")),
            Style::default().fg(Color::Gray),
        )
    } else {
        Span::raw("")
    };

    let title = Line::from(vec![
        Span::styled(" R-IoT ", Style::default().fg(Color::Green).bold()),
        Span::raw(" "),
        Span::styled(" 1 Monitoramento ", tab_style(Tab::Monitoring)),
        Span::raw(" "),
        Span::styled(" 2 Configurações ", tab_style(Tab::Settings)),
        feed_status,
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.tab {
        Tab::Monitoring => " PAINEL ",
        Tab::Settings => " CONFIG ",
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints: Vec<(&str, &str)> = match (app.tab, app.input_mode) {
        (Tab::Monitoring, InputMode::Normal) => {
            let mut hints = vec![("j/k", "navegar"), ("Enter", "selecionar"), ("Esc", "voltar"), ("i", "perguntar")];
            if app.compact {
                hints.push(("p/m/c", "vista"));
            } else {
                hints.push(("Tab", "foco"));
            }
            hints.extend([("^L", "sair"), ("q", "fechar")]);
            hints
        }
        (Tab::Monitoring, InputMode::Editing) => vec![("Enter", "enviar"), ("Esc", "cancelar")],
        (Tab::Settings, InputMode::Normal) => vec![
            ("j/k", "campo"),
            ("Enter", "editar"),
            ("h/l", "ajustar"),
            ("v", "mostrar chave"),
            ("^L", "sair"),
        ],
        (Tab::Settings, InputMode::Editing) => vec![("Enter", "carregar"), ("Esc", "cancelar")],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
        spans.push(Span::raw(" "));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_bottom_nav(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = Vec::new();
    for view in MobileView::all() {
        let style = if app.mobile_view == view {
            Style::default().fg(Color::Black).bg(Color::Green).bold()
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} ", view.label()), style));
        spans.push(Span::raw("  "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)).alignment(Alignment::Center), area);
}

fn list_height(app: &App, max: usize) -> u16 {
    (app.snapshot().animals.len().clamp(1, max) + 2) as u16
}

fn render_monitoring(app: &mut App, frame: &mut Frame, area: Rect) {
    let [left_area, right_area] = Layout::horizontal([
        Constraint::Percentage(45),
        Constraint::Percentage(55),
    ])
    .areas(area);

    let [panel_area, chat_area] = Layout::vertical([
        Constraint::Percentage(45),
        Constraint::Percentage(55),
    ])
    .areas(left_area);

    let [stats_area, map_area, list_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(6),
        Constraint::Length(list_height(app, 8)),
    ])
    .areas(right_area);

    render_panel(app, frame, panel_area);
    render_chat(app, frame, chat_area);
    render_stats(app, frame, stats_area);
    render_map(app, frame, map_area);
    render_animal_list(app, frame, list_area);
}

fn render_compact(app: &mut App, frame: &mut Frame, area: Rect) {
    match app.mobile_view {
        MobileView::Panel => {
            let [stats_area, panel_area, list_area] = Layout::vertical([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(list_height(app, 6)),
            ])
            .areas(area);
            render_stats(app, frame, stats_area);
            render_panel(app, frame, panel_area);
            render_animal_list(app, frame, list_area);
        }
        MobileView::Map => {
            let [map_area, list_area] = Layout::vertical([
                Constraint::Min(0),
                Constraint::Length(list_height(app, 5)),
            ])
            .areas(area);
            render_map(app, frame, map_area);
            render_animal_list(app, frame, list_area);
        }
        MobileView::Chat => render_chat(app, frame, area),
    }
}

fn render_stats(app: &App, frame: &mut Frame, area: Rect) {
    let stats = fleet_stats(&app.snapshot().animals);

    let mut spans = vec![Span::styled(
        format!(" Total: {} ", stats.total),
        Style::default().bold(),
    )];
    for status in AnimalStatus::all() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled("● ", Style::default().fg(status_color(status))));
        spans.push(Span::raw(format!("{}: {}", status.label(), stats.counts.get(status))));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Rebanho ");

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

/// Herd overview, or the selected animal's detail card
fn render_panel(app: &App, frame: &mut Frame, area: Rect) {
    match app.selected_animal() {
        Some(animal) => render_animal_detail(app, animal, frame, area),
        None => render_herds(app, frame, area),
    }
}

fn render_herds(app: &App, frame: &mut Frame, area: Rect) {
    let snapshot = app.snapshot();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Rebanhos ");

    if snapshot.herds.is_empty() {
        let text = if app.feed.loading { "Carregando..." } else { "Nenhum rebanho cadastrado." };
        frame.render_widget(
            Paragraph::new(text).style(Style::default().fg(Color::DarkGray)).block(block),
            area,
        );
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    for herd in &snapshot.herds {
        let stats = herd_stats(herd, &snapshot.animals);

        lines.push(Line::from(vec![
            Span::styled(herd.short_name().to_string(), Style::default().fg(Color::Cyan).bold()),
            Span::styled(format!("  {}", herd.region), Style::default().fg(Color::DarkGray)),
        ]));

        let mut counts = vec![Span::raw(format!("  {} animais ", stats.total))];
        for status in AnimalStatus::all() {
            counts.push(Span::styled(" ● ", Style::default().fg(status_color(status))));
            counts.push(Span::raw(stats.counts.get(status).to_string()));
        }
        lines.push(Line::from(counts));

        if !stats.out_of_area.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("  Fora da área: {}", stats.out_of_area.join(", ")),
                Style::default().fg(Color::Red),
            )));
        } else if !herd.has_designated_area() {
            lines.push(Line::from(Span::styled(
                "  Sem área designada",
                Style::default().fg(Color::DarkGray).italic(),
            )));
        }
        lines.push(Line::default());
    }

    frame.render_widget(
        Paragraph::new(Text::from(lines)).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_animal_detail(app: &App, animal: &Animal, frame: &mut Frame, area: Rect) {
    let snapshot = app.snapshot();
    let color = status_color(animal.status);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(format!(" {} ({}) ", animal.name, animal.collar_id));

    let label = Style::default().fg(Color::DarkGray);
    let field = |name: &'static str, value: String| {
        Line::from(vec![Span::styled(format!("{:<13}", name), label), Span::raw(value)])
    };

    let herd = snapshot
        .herd(animal.herd_id)
        .map(|h| format!("{} ({})", h.short_name(), h.region))
        .unwrap_or_else(|| "Desconhecido".to_string());

    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{:<13}", "Status"), label),
        Span::styled(animal.status.label(), Style::default().fg(color).bold()),
    ])];

    if let Some(alert) = &animal.alert {
        lines.push(Line::from(Span::styled(
            format!("ALERTA: {}", alert),
            Style::default().fg(Color::Red).bold(),
        )));
    }

    lines.extend([
        field("Rebanho", herd),
        field("Tipo", format!("{} ({})", animal.kind, animal.breed)),
        field("Idade", format!("{} meses", animal.age)),
        field("Peso", format!("{:.0} kg", animal.weight)),
        field("Temperatura", format!("{:.1}°C", animal.temperature)),
        field("Passos", animal.steps.to_string()),
        field(
            "Localização",
            format!("{:.4}, {:.4}", animal.location.lat, animal.location.lng),
        ),
        field("Vídeo", app.video_url(animal.id)),
    ]);

    let history = animal.history();
    if !history.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled("Histórico da semana", Style::default().bold())));
        for record in history {
            lines.push(Line::from(vec![
                Span::raw(format!("  {}  ", record.date)),
                Span::styled(
                    format!("{:<9}", record.status.label()),
                    Style::default().fg(status_color(record.status)),
                ),
                Span::raw(format!(" {:.1}°C  {} passos", record.temperature, record.steps)),
            ]));
        }
    }

    frame.render_widget(
        Paragraph::new(Text::from(lines)).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_map(app: &App, frame: &mut Frame, area: Rect) {
    let snapshot = app.snapshot();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Mapa ");

    let Some((x_bounds, y_bounds)) = map_bounds(snapshot) else {
        frame.render_widget(
            Paragraph::new("Sem dados de localização.").style(Style::default().fg(Color::DarkGray)).block(block),
            area,
        );
        return;
    };

    let selected_id = app.session.selected_animal_id();

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| {
            for herd in snapshot.herds.iter().filter(|h| h.has_designated_area()) {
                let polygon = &herd.polygon;
                for (i, from) in polygon.iter().enumerate() {
                    let to = &polygon[(i + 1) % polygon.len()];
                    ctx.draw(&CanvasLine::new(from.lng, from.lat, to.lng, to.lat, Color::Blue));
                }
            }
            ctx.layer();

            for status in AnimalStatus::all() {
                let coords: Vec<(f64, f64)> = snapshot
                    .animals
                    .iter()
                    .filter(|a| a.status == status)
                    .map(|a| (a.location.lng, a.location.lat))
                    .collect();
                ctx.draw(&Points {
                    coords: &coords,
                    color: status_color(status),
                });
            }

            for herd in &snapshot.herds {
                ctx.print(
                    herd.location.lng,
                    herd.location.lat,
                    Span::styled(herd.short_name().to_string(), Style::default().fg(Color::Blue)),
                );
            }

            if let Some(animal) = selected_id.and_then(|id| snapshot.animal(id)) {
                ctx.print(
                    animal.location.lng,
                    animal.location.lat,
                    Span::styled(
                        format!("◉ {}", animal.name),
                        Style::default().fg(status_color(animal.status)).bold(),
                    ),
                );
            }
        });

    frame.render_widget(canvas, area);
}

fn render_animal_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Animals;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let selected_id = app.session.selected_animal_id();

    let snapshot = app.feed.snapshot.clone();
    let items: Vec<ListItem> = snapshot
        .animals
        .iter()
        .map(|animal| {
            let herd = snapshot
                .herd(animal.herd_id)
                .map(|h| h.short_name().to_string())
                .unwrap_or_default();
            let mut spans = vec![
                Span::styled("● ", Style::default().fg(status_color(animal.status))),
                Span::raw(format!("{:<14}", animal.name)),
                Span::styled(format!(" {:<8}", animal.collar_id), Style::default().fg(Color::DarkGray)),
                Span::raw(format!(" {}", herd)),
            ];
            if animal.is_out_of_area() {
                spans.push(Span::styled("  fora da área", Style::default().fg(Color::Red)));
            }
            let style = if Some(animal.id) == selected_id {
                Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(spans)).style(style)
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Animais ({}) ", snapshot.animals.len()));

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("> ");

    ensure_selected_visible(&mut app.animal_state, area.height.saturating_sub(2) as usize);
    frame.render_stateful_widget(list, area, &mut app.animal_state);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Inner size for scroll calculations
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let focused = app.focus == FocusPane::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let sending = app.session.chat.is_sending();

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Assistente: {} ", app.session.gemini().model.display_name()));

    let mut lines: Vec<Line> = Vec::new();
    for msg in app.session.chat.messages() {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "Você:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.text.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "Assistente:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.text.lines() {
                    lines.push(parse_markdown_line(line));
                }
                if !msg.sources.is_empty() {
                    lines.push(Line::from(Span::styled("Fontes:", Style::default().fg(Color::DarkGray))));
                    for source in &msg.sources {
                        lines.push(Line::from(vec![
                            Span::styled("  ↗ ", Style::default().fg(Color::Blue)),
                            Span::styled(source.display_title().to_string(), Style::default().fg(Color::Blue)),
                            Span::styled(format!(" {}", source.uri), Style::default().fg(Color::DarkGray)),
                        ]));
                    }
                }
            }
        }
        lines.push(Line::default());
    }

    if sending {
        lines.push(Line::from(Span::styled(
            "Assistente:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Pensando{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    let editing = app.input_mode == InputMode::Editing && app.tab == Tab::Monitoring;
    let input_color = if editing {
        Color::Yellow
    } else if sending {
        Color::DarkGray
    } else {
        border_color
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_color))
        .title(" Pergunta ");

    let input = if sending {
        Paragraph::new("Aguarde a resposta...").style(Style::default().fg(Color::DarkGray))
    } else if app.chat_input.is_empty() && !editing {
        Paragraph::new("Pergunte sobre o rebanho (i)").style(Style::default().fg(Color::DarkGray))
    } else {
        Paragraph::new(app.chat_input.as_str())
    };
    frame.render_widget(input.block(input_block), input_area);

    if editing {
        let max_x = input_area.width.saturating_sub(3);
        let cursor_x = (app.chat_cursor as u16).min(max_x);
        frame.set_cursor_position((input_area.x + 1 + cursor_x, input_area.y + 1));
    }
}

fn render_settings(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green))
        .title(" Configurações do assistente ");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let gemini = app.session.gemini();
    let editing_key = app.input_mode == InputMode::Editing;

    let marker = |field: SettingsField| {
        if app.settings_field == field {
            Span::styled("> ", Style::default().fg(Color::Cyan).bold())
        } else {
            Span::raw("  ")
        }
    };
    let label = |field: SettingsField, text: &'static str| {
        let style = if app.settings_field == field {
            Style::default().fg(Color::Cyan).bold()
        } else {
            Style::default().bold()
        };
        Span::styled(text, style)
    };

    let key_text = if app.show_api_key {
        app.api_key_input.clone()
    } else {
        mask(&app.api_key_input)
    };
    let key_status = if gemini.has_api_key() {
        Span::styled(
            format!("  Chave carregada ({})", gemini.redacted_key()),
            Style::default().fg(Color::Green),
        )
    } else {
        Span::styled("  Nenhuma chave carregada", Style::default().fg(Color::Yellow))
    };

    let filled = ((gemini.temperature / 2.0) * 20.0).round() as usize;
    let bar = format!("[{}{}]", "█".repeat(filled), "░".repeat(20usize.saturating_sub(filled)));

    let mut lines = vec![
        Line::from(vec![marker(SettingsField::ApiKey), label(SettingsField::ApiKey, "Chave da API do Gemini")]),
        Line::from(vec![
            Span::raw("    "),
            Span::styled(
                if key_text.is_empty() && !editing_key { "(vazia)".to_string() } else { key_text },
                Style::default().fg(if editing_key { Color::Yellow } else { Color::White }),
            ),
        ]),
        Line::from(key_status),
        Line::default(),
        Line::from(vec![marker(SettingsField::Model), label(SettingsField::Model, "Modelo")]),
        Line::from(vec![
            Span::raw("    < "),
            Span::styled(gemini.model.display_name(), Style::default().fg(Color::White)),
            Span::raw(" >"),
        ]),
        Line::default(),
        Line::from(vec![
            marker(SettingsField::Temperature),
            label(SettingsField::Temperature, "Temperatura"),
        ]),
        Line::from(vec![
            Span::raw(format!("    {:.1} ", gemini.temperature)),
            Span::styled(bar, Style::default().fg(Color::Green)),
        ]),
        Line::from(Span::styled(
            "    Valores baixos: respostas objetivas. Valores altos: respostas criativas.",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    if let Some(notice) = &app.settings_notice {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!("  {}", notice),
            Style::default().fg(Color::Green),
        )));
    }

    frame.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false }), inner);

    if editing_key {
        let cursor_x = if app.show_api_key {
            app.api_key_input.chars().count()
        } else {
            app.api_key_input.chars().count().min(40)
        } as u16;
        let max_x = inner.width.saturating_sub(5);
        frame.set_cursor_position((inner.x + 4 + cursor_x.min(max_x), inner.y + 1));
    }
}
