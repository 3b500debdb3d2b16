//! Rendering
//!
//! Draws the app state into ratatui widgets: transcript pane, structure
//! panel, design timeline, task input, status line, plus the toast and
//! configuration overlays. Everything here is a pure function of the app
//! state; the only writes back are the scroll bookkeeping fields.

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph};
use ratatui::Frame;
use textwrap::wrap;
use unicode_width::UnicodeWidthChar;

use discovery_core::{
    AgentTransport, ChatEvent, ChatEventKind, ChatRole, DesignSnapshot, RenderCommand,
    Representation, SessionState,
};

use crate::app::{App, ConfigModal, Focus, Toast};
use crate::theme;

/// Draw one frame.
pub fn draw<T: AgentTransport>(frame: &mut Frame, app: &mut App<T>) {
    let area = frame.area();
    app.size = (area.width, area.height);

    let [main_area, input_area, status_area] = Layout::vertical([
        Constraint::Min(5),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    let [transcript_area, side_area] =
        Layout::horizontal([Constraint::Percentage(58), Constraint::Percentage(42)])
            .areas(main_area);

    let [structure_area, timeline_area] =
        Layout::vertical([Constraint::Percentage(62), Constraint::Percentage(38)])
            .areas(side_area);

    draw_transcript(frame, app, transcript_area);
    draw_structure(frame, app, structure_area);
    draw_timeline(frame, app, timeline_area);
    draw_input(frame, app, input_area);
    draw_status(frame, app, status_area);

    if let Some(toast) = app.toast() {
        draw_toast(frame, toast, area);
    }
    if let Some(modal) = app.config_modal() {
        draw_modal(frame, modal, area);
    }
}

// ============================================================================
// Transcript
// ============================================================================

fn draw_transcript<T: AgentTransport>(frame: &mut Frame, app: &mut App<T>, area: Rect) {
    let block = pane_block(" Discovery ", app.focus == Focus::Chat);
    let inner = block.inner(area);

    let lines = transcript_lines(app.controller.history(), inner.width as usize);
    app.total_lines = lines.len();

    // Scroll is measured in lines from the bottom; clamp and window.
    let height = inner.height as usize;
    let max_scroll = lines.len().saturating_sub(height);
    app.scroll_offset = app.scroll_offset.min(max_scroll);
    let end = lines.len() - app.scroll_offset;
    let start = end.saturating_sub(height);
    let visible: Vec<Line> = lines[start..end].to_vec();

    frame.render_widget(Paragraph::new(visible).block(block), area);
}

/// Wrapped, styled transcript lines for the full history.
fn transcript_lines(events: &[ChatEvent], width: usize) -> Vec<Line<'static>> {
    let width = width.max(8);
    let mut lines = Vec::new();
    for event in events {
        let style = event_style(event);
        for text_line in event_display_lines(event) {
            if text_line.is_empty() {
                lines.push(Line::default());
                continue;
            }
            for wrapped in wrap(&text_line, width) {
                lines.push(Line::from(Span::styled(wrapped.to_string(), style)));
            }
        }
        lines.push(Line::default());
    }
    lines.pop();
    lines
}

/// Plain-text lines for one transcript entry, before wrapping and styling.
fn event_display_lines(event: &ChatEvent) -> Vec<String> {
    match event.kind {
        Some(ChatEventKind::IterationResults) if event.collapsed => {
            let payload = event.payload.as_ref();
            let count = payload.map_or(0, |p| p.results.len());
            let header = match payload.and_then(|p| p.iteration) {
                Some(i) => format!("[+] Iteration {i} results - {count} candidate(s)"),
                None => format!("[+] Iteration results - {count} candidate(s)"),
            };
            vec![header]
        }
        Some(ChatEventKind::DesignResults) => {
            let mut lines = vec![prefixed(event)];
            if let Some(payload) = &event.payload {
                if let Some(sequence) = &payload.sequence {
                    lines.push(format!("  sequence      {sequence}"));
                }
                if let Some(score) = payload.binding_score {
                    lines.push(format!("  binding score {score:.1}"));
                }
                if let Some(rationale) = &payload.rationale {
                    lines.push(format!("  rationale     {rationale}"));
                }
            }
            lines
        }
        _ => vec![prefixed(event)],
    }
}

fn prefixed(event: &ChatEvent) -> String {
    format!("{}{}", role_prefix(event.role), event.text)
}

fn role_prefix(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "You: ",
        ChatRole::Assistant => "Protogen: ",
        ChatRole::System | ChatRole::Error => "",
    }
}

fn event_style(event: &ChatEvent) -> Style {
    match (event.role, event.kind) {
        (ChatRole::Error, _) | (_, Some(ChatEventKind::Error)) => {
            Style::default().fg(theme::ERROR_RED)
        }
        (ChatRole::User, _) => Style::default().fg(theme::USER_GREEN),
        (_, Some(ChatEventKind::Iteration)) => Style::default().fg(theme::ITERATION_BLUE),
        (_, Some(ChatEventKind::DesignResults)) => Style::default().fg(theme::CANDIDATE_GOLD),
        (ChatRole::System, _) => Style::default().fg(theme::DIM_GRAY),
        (ChatRole::Assistant, _) => Style::default().fg(theme::AGENT_TEAL),
    }
}

// ============================================================================
// Structure Panel and Timeline
// ============================================================================

fn draw_structure<T: AgentTransport>(frame: &mut Frame, app: &App<T>, area: Rect) {
    let block = pane_block(" Structure ", app.focus == Focus::Structure);
    let inner_width = block.inner(area).width as usize;
    let mut lines: Vec<Line> = Vec::new();

    match app.history.selected() {
        Some(snapshot) => {
            let name = snapshot.metadata.name.clone().unwrap_or_default();
            lines.push(Line::from(Span::styled(
                name,
                Style::default()
                    .fg(theme::STRUCTURE_CYAN)
                    .add_modifier(Modifier::BOLD),
            )));
            if let Some(sequence) = &snapshot.metadata.sequence {
                lines.push(Line::from(format!(
                    "sequence    {}",
                    truncate(sequence, inner_width.saturating_sub(12))
                )));
            }
            if let Some(score) = snapshot.metadata.binding_score {
                lines.push(Line::from(vec![
                    Span::raw("binding     "),
                    Span::styled(format!("{score:.1}"), Style::default().fg(theme::SCORE_GREEN)),
                ]));
            }
            if let Some(confidence) = snapshot.metadata.confidence_score {
                lines.push(Line::from(format!("confidence  {confidence:.2}")));
            }
            if let Some(iteration) = snapshot.metadata.iteration {
                lines.push(Line::from(format!("iteration   {iteration}")));
            }
            lines.push(Line::from(Span::styled(
                format!("captured    {}", snapshot.captured_at.format("%H:%M:%S")),
                Style::default().fg(theme::DIM_GRAY),
            )));
        }
        None => lines.push(Line::from(Span::styled(
            "Demo structure - run a discovery to see designs",
            Style::default().fg(theme::DIM_GRAY),
        ))),
    }

    lines.push(Line::default());
    let loaded = app.view.structure().map_or(0, |s| s.lines().count());
    lines.push(Line::from(Span::styled(
        format!(
            "view {} · chain colors · {loaded} lines",
            app.view.style().as_str()
        ),
        Style::default().fg(theme::DIM_GRAY),
    )));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_timeline<T: AgentTransport>(frame: &mut Frame, app: &App<T>, area: Rect) {
    let block = pane_block(" Design History ", false);
    if app.history.is_empty() {
        let hint = Paragraph::new(Span::styled(
            "No designs yet.",
            Style::default().fg(theme::DIM_GRAY),
        ))
        .block(block);
        frame.render_widget(hint, area);
        return;
    }

    let selected = app.history.selected_id();
    let items: Vec<ListItem> = app
        .history
        .iter()
        .map(|snapshot| ListItem::new(timeline_entry(snapshot, selected == Some(snapshot.id))))
        .collect();
    frame.render_widget(List::new(items).block(block), area);
}

fn timeline_entry(snapshot: &DesignSnapshot, selected: bool) -> Line<'static> {
    let marker = if selected { "> " } else { "  " };
    let name = snapshot
        .metadata
        .name
        .clone()
        .unwrap_or_else(|| snapshot.id.to_string());
    let name_style = if selected {
        Style::default()
            .fg(theme::SELECTION_MAGENTA)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let mut spans = vec![Span::styled(format!("{marker}{name}"), name_style)];
    if let Some(score) = snapshot.metadata.binding_score {
        spans.push(Span::styled(
            format!("  {score:.1}"),
            Style::default().fg(theme::SCORE_GREEN),
        ));
    }
    Line::from(spans)
}

// ============================================================================
// Input and Status
// ============================================================================

fn draw_input<T: AgentTransport>(frame: &mut Frame, app: &App<T>, area: Rect) {
    let busy = app.controller.state().is_busy();
    let title = if busy {
        " Task (discovery in progress - ^X to stop) "
    } else {
        " Task "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(theme::BORDER_GRAY));
    let inner = block.inner(area);

    let text = visible_tail(app.input(), (inner.width as usize).saturating_sub(1));
    let style = if busy {
        Style::default().fg(theme::DIM_GRAY)
    } else {
        Style::default()
    };
    frame.render_widget(Paragraph::new(text.clone()).style(style).block(block), area);

    if !busy && app.config_modal().is_none() && app.focus == Focus::Chat {
        let cursor_x = inner.x + display_width(&text) as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }
}

fn draw_status<T: AgentTransport>(frame: &mut Frame, app: &App<T>, area: Rect) {
    let commands = app.render_log.snapshot();
    let text = status_text(
        app.controller.state(),
        app.controller.config().max_iterations,
        app.view.style(),
        app.history.len(),
        commands.last(),
    );
    frame.render_widget(
        Paragraph::new(Span::styled(text, Style::default().fg(theme::DIM_GRAY))),
        area,
    );
}

/// Assemble the one-line status summary.
fn status_text(
    state: SessionState,
    max_iterations: u8,
    style: Representation,
    designs: usize,
    last_command: Option<&RenderCommand>,
) -> String {
    let state_word = match state {
        SessionState::Idle => "idle",
        SessionState::Requesting => "requesting",
        SessionState::Streaming => "streaming",
        SessionState::Closed => "done",
        SessionState::Failed => "failed",
    };
    let render = match last_command {
        Some(RenderCommand::Load(bytes)) => format!(" | load {bytes}B"),
        Some(RenderCommand::Zoom(delta)) => format!(" | zoom {delta:+.1}"),
        Some(RenderCommand::SetRepresentation(s)) => format!(" | repr {}", s.as_str()),
        Some(RenderCommand::ResetView) => " | view reset".to_string(),
        Some(RenderCommand::Clear) | None => String::new(),
    };
    format!(
        " {state_word} | iters {max_iterations} | view {} | designs {designs}{render} \
         | ^G config  ^X stop  ^L clear  F2 focus  ^C quit",
        style.as_str()
    )
}

// ============================================================================
// Overlays
// ============================================================================

fn draw_toast(frame: &mut Frame, toast: &Toast, area: Rect) {
    if area.width < 16 || area.height < 6 {
        return;
    }
    let width = (toast.title.len().max(toast.detail.len()) as u16 + 4).min(area.width - 2);
    let rect = Rect::new(area.width.saturating_sub(width + 2), 1, width, 4);

    frame.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Candidate ")
        .border_style(Style::default().fg(theme::CANDIDATE_GOLD));
    let body = vec![
        Line::from(toast.title.clone()),
        Line::from(Span::styled(
            toast.detail.clone(),
            Style::default().fg(theme::SCORE_GREEN),
        )),
    ];
    frame.render_widget(Paragraph::new(body).block(block), rect);
}

fn draw_modal(frame: &mut Frame, modal: &ConfigModal, area: Rect) {
    let rect = centered(area, 46, 6);
    frame.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Agent Configuration ")
        .border_style(Style::default().fg(theme::STRUCTURE_CYAN));
    let body = vec![
        Line::default(),
        Line::from(vec![
            Span::raw("  Max iterations:  "),
            Span::styled(
                format!("< {} >", modal.value),
                Style::default()
                    .fg(theme::STRUCTURE_CYAN)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("   (1-10)", Style::default().fg(theme::DIM_GRAY)),
        ]),
        Line::from(Span::styled(
            "  Up/Down adjust   Enter save   Esc cancel",
            Style::default().fg(theme::DIM_GRAY),
        )),
    ];
    frame.render_widget(Paragraph::new(body).block(block), rect);
}

// ============================================================================
// Helpers
// ============================================================================

fn pane_block(title: &str, focused: bool) -> Block<'_> {
    let border = if focused {
        Style::default().fg(theme::STRUCTURE_CYAN)
    } else {
        Style::default().fg(theme::BORDER_GRAY)
    };
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border)
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

/// The widest suffix of the input that fits the given display width, so
/// the cursor end stays visible while typing long tasks.
fn visible_tail(input: &str, width: usize) -> String {
    let mut taken: Vec<char> = Vec::new();
    let mut used = 0;
    for ch in input.chars().rev() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        taken.push(ch);
    }
    taken.iter().rev().collect()
}

fn display_width(text: &str) -> usize {
    text.chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use discovery_core::{CandidateResult, EventPayload};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_role_prefixes() {
        assert_eq!(role_prefix(ChatRole::User), "You: ");
        assert_eq!(role_prefix(ChatRole::Assistant), "Protogen: ");
        assert_eq!(role_prefix(ChatRole::System), "");
    }

    #[test]
    fn test_collapsed_iteration_results_render_as_summary() {
        let event = ChatEvent::assistant("Completed iteration 2")
            .with_kind(ChatEventKind::IterationResults)
            .with_payload(EventPayload {
                iteration: Some(2),
                results: vec![CandidateResult::default(), CandidateResult::default()],
                ..EventPayload::default()
            });
        assert!(event.collapsed);
        let lines = event_display_lines(&event);
        assert_eq!(lines, vec!["[+] Iteration 2 results - 2 candidate(s)"]);
    }

    #[test]
    fn test_design_results_show_sequence_and_score() {
        let event = ChatEvent::assistant("=== DESIGN RESULTS ===")
            .with_kind(ChatEventKind::DesignResults)
            .with_payload(EventPayload {
                sequence: Some("MYKRLLP".into()),
                binding_score: Some(96.3),
                rationale: Some("stable core".into()),
                ..EventPayload::default()
            });
        let lines = event_display_lines(&event);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Protogen: "));
        assert!(lines[1].contains("MYKRLLP"));
        assert!(lines[2].contains("96.3"));
        assert!(lines[3].contains("stable core"));
    }

    #[test]
    fn test_plain_events_are_single_prefixed_lines() {
        let lines = event_display_lines(&ChatEvent::user("design a binder"));
        assert_eq!(lines, vec!["You: design a binder"]);
    }

    #[test]
    fn test_transcript_lines_wrap_to_width() {
        let events = vec![ChatEvent::assistant("a".repeat(30))];
        let lines = transcript_lines(&events, 20);
        assert!(lines.len() >= 2);
    }

    #[test]
    fn test_status_text_summarizes_state() {
        let text = status_text(
            SessionState::Streaming,
            5,
            Representation::Surface,
            2,
            Some(&RenderCommand::Load(1024)),
        );
        assert!(text.contains("streaming"));
        assert!(text.contains("iters 5"));
        assert!(text.contains("view surface"));
        assert!(text.contains("designs 2"));
        assert!(text.contains("load 1024B"));
        assert!(text.contains("^G config"));
    }

    #[test]
    fn test_visible_tail_keeps_the_end() {
        assert_eq!(visible_tail("hello world", 5), "world");
        assert_eq!(visible_tail("short", 10), "short");
        assert_eq!(visible_tail("", 10), "");
    }

    #[test]
    fn test_truncate_marks_cut_text() {
        assert_eq!(truncate("MYKRLLPSEQ", 20), "MYKRLLPSEQ");
        assert_eq!(truncate("MYKRLLPSEQ", 5), "MYKR…");
    }
}
