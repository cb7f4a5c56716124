use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use linkwatch_core::{ConnectionStatus, ConnectivityMonitor, MonitorPhase, ProbeStats, RemoteServiceClient};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;

use crate::report::{format_checked, headline};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

struct ViewerState {
    frame: usize,
    status: ConnectionStatus,
    phase: MonitorPhase,
    stats: ProbeStats,
}

impl ViewerState {
    fn refresh<C: RemoteServiceClient + 'static>(&mut self, monitor: &ConnectivityMonitor<C>) {
        self.frame = self.frame.wrapping_add(1);
        self.status = monitor.status();
        self.phase = monitor.phase();
        self.stats = monitor.stats();
    }

    fn spinner(&self) -> &'static str {
        SPINNER[self.frame % SPINNER.len()]
    }
}

pub async fn run_viewer<C: RemoteServiceClient + 'static>(monitor: Arc<ConnectivityMonitor<C>>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    monitor.start();
    let mut state = ViewerState {
        frame: 0,
        status: monitor.status(),
        phase: monitor.phase(),
        stats: monitor.stats(),
    };

    let run_result = async {
        loop {
            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        KeyCode::Char('r') => {
                            let monitor = Arc::clone(&monitor);
                            tokio::spawn(async move {
                                monitor.retry().await;
                            });
                        }
                        _ => {}
                    }
                }
            }

            // Let spawned probes make progress between redraws.
            tokio::task::yield_now().await;
            state.refresh(&monitor);
            terminal.draw(|frame| draw_ui(frame.size(), frame, &state))?;
        }

        Ok::<(), anyhow::Error>(())
    }
    .await;

    monitor.stop();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}

fn draw_ui(area: Rect, frame: &mut ratatui::Frame<'_>, state: &ViewerState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    frame.render_widget(render_status(state), rows[0]);
    frame.render_widget(render_stats(&state.stats), rows[1]);
    frame.render_widget(
        Paragraph::new(Line::from("press 'r' to retry, 'q' to quit"))
            .style(Style::default().fg(Color::Gray)),
        rows[2],
    );
}

fn render_status(state: &ViewerState) -> Paragraph<'static> {
    let status = &state.status;
    let mut lines = Vec::new();

    match state.phase {
        MonitorPhase::Uninitialized | MonitorPhase::Loading => {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{} ", state.spinner()),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
                Span::raw(headline(status)),
            ]));
        }
        MonitorPhase::Connected => {
            lines.push(Line::from(Span::styled(
                "● Connected",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(format!(
                "Last checked: {}",
                format_checked(status.last_checked)
            )));
        }
        MonitorPhase::Disconnected => {
            lines.push(Line::from(Span::styled(
                "● Disconnected",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
            if let Some(error) = &status.error {
                lines.push(Line::from(Span::styled(
                    error.clone(),
                    Style::default().fg(Color::Red),
                )));
            }
            lines.push(Line::from(Span::styled(
                "[r] Retry",
                Style::default().add_modifier(Modifier::REVERSED),
            )));
        }
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Backend"))
}

fn render_stats(stats: &ProbeStats) -> Paragraph<'static> {
    let text = format!(
        "started={} ok={} failed={} rtt_ms={}",
        stats.probes_started,
        stats.probes_ok,
        stats.probes_failed,
        stats
            .last_rtt_ms
            .map(|ms| ms.to_string())
            .unwrap_or_else(|| "n/a".to_string()),
    );

    Paragraph::new(Line::from(text)).block(Block::default().borders(Borders::ALL).title("Probes"))
}
