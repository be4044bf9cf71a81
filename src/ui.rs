use cubik::{
    scheduler::Scheduler,
    session::{Phase, Session, Standing},
    time::TimeSource,
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const TIMES_WIDTH: u16 = 22;

impl<T: TimeSource, S: Scheduler> Widget for &App<T, S> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let session = &self.session;
        // styles
        let bold_style = Style::default().add_modifier(Modifier::BOLD);

        let dim_bold_style = Style::default()
            .patch(bold_style)
            .add_modifier(Modifier::DIM);

        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(TIMES_WIDTH)])
            .split(area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(3), // scramble
                Constraint::Min(1),    // stopwatch face
                Constraint::Length(1), // summary
                Constraint::Length(1), // padding
                Constraint::Length(1), // legend
            ])
            .split(columns[0]);

        let scramble = Paragraph::new(Span::styled(
            session.scramble().to_string(),
            dim_bold_style,
        ))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

        scramble.render(chunks[0], buf);

        let face_style = match session.phase() {
            Phase::Idle => bold_style,
            Phase::Armed => Style::default().patch(bold_style).fg(Color::Yellow),
            Phase::Running => Style::default().patch(bold_style).fg(Color::Green),
        };

        let face = Paragraph::new(Span::styled(session.display().to_string(), face_style))
            .alignment(Alignment::Center);

        face.render(middle_line(chunks[1]), buf);

        if let Some(summary) = session.summary() {
            let stats = Paragraph::new(Span::styled(
                format!(
                    "{} runs   mean {}   {} trimmed   trimmed mean {}",
                    summary.runs, summary.mean, summary.trimmed_runs, summary.trimmed_mean
                ),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::ITALIC),
            ))
            .alignment(Alignment::Center);

            stats.render(chunks[2], buf);
        }

        let legend = Paragraph::new(Span::styled(
            "(space) start / stop   (n)ew scramble   (esc)ape",
            italic_style,
        ));

        legend.render(chunks[4], buf);

        render_times(session, columns[1], buf);
    }
}

/// One-line strip through the vertical middle of `area`
fn middle_line(area: Rect) -> Rect {
    Rect::new(
        area.x,
        area.y + area.height / 2,
        area.width,
        area.height.min(1),
    )
}

/// Result list, newest at the bottom; older runs scroll off the top
fn render_times<T: TimeSource, S: Scheduler>(
    session: &Session<T, S>,
    area: Rect,
    buf: &mut Buffer,
) {
    let block = Block::default().borders(Borders::LEFT).title("times");
    let inner = block.inner(area);
    block.render(area, buf);

    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let entries = session.entries();
    let skip = entries.len().saturating_sub(inner.height as usize);

    let lines: Vec<Line> = entries
        .iter()
        .enumerate()
        .skip(skip)
        .map(|(idx, entry)| {
            let style = match session.standing(entry) {
                Standing::Best => Style::default().fg(Color::Green),
                Standing::Worst => Style::default().fg(Color::Red),
                Standing::Plain => Style::default(),
            };
            Line::from(vec![
                Span::styled(format!("{:>3}. ", idx + 1), dim_style),
                Span::styled(entry.display.clone(), style),
                Span::styled(
                    format!(" {}", entry.finished_at.format("%H:%M")),
                    dim_style,
                ),
            ])
        })
        .collect();

    Paragraph::new(lines).render(inner, buf);
}
