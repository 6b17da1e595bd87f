use itertools::Itertools;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use keypace::{CharStatus, SessionStatus};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

pub fn draw(app: &App, f: &mut Frame) {
    let area = f.area();
    match app.engine.status() {
        SessionStatus::Complete => draw_results(app, f, area),
        _ => draw_typing(app, f, area),
    }
}

fn draw_typing(app: &App, f: &mut Frame, area: Rect) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
    let red_bold_style = Style::default().patch(bold_style).fg(Color::Red);
    let dim_bold_style = Style::default()
        .patch(bold_style)
        .add_modifier(Modifier::DIM);
    let underlined_dim_bold_style = Style::default()
        .patch(dim_bold_style)
        .add_modifier(Modifier::UNDERLINED);

    let text = app.engine.session().target_text();
    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_lines = if text.width() <= max_chars_per_line as usize {
        1
    } else {
        ((text.width() as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16
    };
    let padding = area.height.saturating_sub(prompt_lines + 4) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(padding),
            Constraint::Length(1), // live stats
            Constraint::Length(1),
            Constraint::Length(prompt_lines),
            Constraint::Length(1),
            Constraint::Length(1), // finger hint
            Constraint::Min(0),
        ])
        .split(area);

    let spans = app
        .engine
        .characters()
        .into_iter()
        .map(|c| match c.status {
            CharStatus::Correct => Span::styled(c.ch.to_string(), green_bold_style),
            CharStatus::Incorrect => Span::styled(
                match c.ch {
                    ' ' => "·".to_owned(),
                    ch => ch.to_string(),
                },
                red_bold_style,
            ),
            CharStatus::Current => Span::styled(c.ch.to_string(), underlined_dim_bold_style),
            CharStatus::Pending => Span::styled(c.ch.to_string(), dim_bold_style),
        })
        .collect::<Vec<Span>>();

    let prompt = Paragraph::new(Line::from(spans))
        .alignment(if prompt_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true });
    f.render_widget(prompt, chunks[3]);

    let stats = app.engine.stats();
    let status = match app.engine.status() {
        SessionStatus::Paused => " (paused)",
        _ => "",
    };
    let live = Paragraph::new(Span::styled(
        format!(
            "{:.1}s  {} wpm  {}% acc{}",
            app.engine.elapsed().as_secs_f64(),
            stats.wpm,
            stats.accuracy,
            status
        ),
        dim_bold_style,
    ))
    .alignment(Alignment::Center);
    f.render_widget(live, chunks[1]);

    f.render_widget(
        Paragraph::new(hint_line(app)).alignment(Alignment::Center),
        chunks[5],
    );
}

fn hint_line(app: &App) -> Line<'static> {
    let dim = Style::default().add_modifier(Modifier::DIM);
    let mut spans = Vec::new();

    if let Some(detected) = app.engine.listener().last_mismatch {
        spans.push(Span::styled(
            format!("keyboard is set to {detected}, switch layouts  "),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }

    let session = app.engine.session();
    if let Some(hint) = app.highlight.hint(session.target(), session.cursor()) {
        let key = hint.physical_key.unwrap_or_else(|| "?".to_string());
        let finger = hint
            .finger
            .map(|f| f.to_string().replace('_', " "))
            .unwrap_or_else(|| "any finger".to_string());
        spans.push(Span::styled(format!("next: {key} ({finger})"), dim));
    }

    if let Some(key) = app.highlight.correct_flash() {
        spans.push(Span::styled(format!("  {key}"), Style::default().fg(Color::Green)));
    }
    if let Some(key) = app.highlight.wrong_flash() {
        spans.push(Span::styled(format!("  {key}"), Style::default().fg(Color::Red)));
    }

    if app.highlight.is_tracking() && !app.highlight.pressed_keys().is_empty() {
        spans.push(Span::styled(
            format!("  [{}]", app.highlight.pressed_keys().iter().join(" ")),
            dim,
        ));
    }

    Line::from(spans)
}

fn draw_results(app: &App, f: &mut Frame, area: Rect) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1), // stats
            Constraint::Length(1), // weak letters
            Constraint::Length(1),
            Constraint::Length(1), // legend
            Constraint::Min(1),
        ])
        .split(area);

    // the snapshot lands one turn after the last keystroke
    let Some(stats) = app.engine.listener().completed.as_ref() else {
        return;
    };

    let summary = Paragraph::new(Span::styled(
        format!(
            "{} wpm   {} net   {}% acc   {} errors   {:.2}s",
            stats.wpm,
            stats.net_wpm,
            stats.accuracy,
            stats.error_count,
            stats.elapsed().as_secs_f64()
        ),
        bold_style,
    ))
    .alignment(Alignment::Center);
    f.render_widget(summary, chunks[1]);

    let weakest = stats.letter_accuracy.weakest(5);
    if !weakest.is_empty() {
        let letters = weakest
            .iter()
            .map(|(c, tally)| format!("{c} {:.0}%", tally.accuracy()))
            .join("   ");
        f.render_widget(
            Paragraph::new(Span::styled(format!("weakest: {letters}"), italic_style))
                .alignment(Alignment::Center),
            chunks[2],
        );
    }

    let legend = Paragraph::new(Span::styled(
        "(enter) / (ctrl+r)etry / (esc)ape",
        italic_style,
    ))
    .alignment(Alignment::Center);
    f.render_widget(legend, chunks[4]);
}
