use std::io::IsTerminal;

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
    Frame,
};

use crate::cli::report::text::Presentation;
use crate::cli::{Context, InputArgs};
use crate::error::{LadingError, Result};
use crate::fmt::compact;
use crate::reports::{aggregate, AggregateView, GroupKey};
use crate::tui::{run_report_view, ReportView, ViewAction, BAR_STYLE, FOOTER_STYLE, HEADER_STYLE, SELECTED_STYLE};

struct ChartTab {
    title: String,
    items: Vec<(String, f64)>,
}

impl ChartTab {
    fn from_view(view: &AggregateView, p: &Presentation) -> Self {
        let missing = p.missing_label(view.by);
        Self {
            title: format!("Value by {}", view.by.title()),
            items: view
                .groups
                .iter()
                .map(|g| (g.name.display(&missing), g.value))
                .collect(),
        }
    }
}

pub struct ChartView {
    tabs: Vec<ChartTab>,
    selected: usize,
    offset: usize,
    presentation: Presentation,
}

impl ChartView {
    fn new(tabs: Vec<ChartTab>, presentation: Presentation) -> Self {
        Self {
            tabs,
            selected: 0,
            offset: 0,
            presentation,
        }
    }

    /// Bar labels have little room, so values are abbreviated.
    fn bar_text(&self, value: f64) -> String {
        format!("{}{}", self.presentation.currency, compact(value))
    }
}

impl ReportView for ChartView {
    fn draw(&mut self, frame: &mut Frame) {
        let [header_area, chart_area, footer_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let mut spans = Vec::new();
        for (i, tab) in self.tabs.iter().enumerate() {
            let style = if i == self.selected { SELECTED_STYLE } else { HEADER_STYLE };
            spans.push(Span::styled(format!(" {} ", tab.title), style));
            spans.push(Span::raw("  "));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), header_area);

        let Some(tab) = self.tabs.get(self.selected) else {
            return;
        };
        let visible = chart_area.height.saturating_sub(2) as usize;
        let bars: Vec<Bar> = tab
            .items
            .iter()
            .skip(self.offset)
            .take(visible.max(1))
            .map(|(label, value)| {
                Bar::default()
                    .value(value.round().max(0.0) as u64)
                    .label(Line::from(label.clone()))
                    .text_value(self.bar_text(*value))
                    .style(BAR_STYLE)
            })
            .collect();

        let chart = BarChart::default()
            .block(Block::default().borders(Borders::ALL).title(tab.title.as_str()))
            .direction(Direction::Horizontal)
            .bar_width(1)
            .bar_gap(0)
            .data(BarGroup::default().bars(&bars));
        frame.render_widget(chart, chart_area);

        frame.render_widget(
            Paragraph::new(Span::styled(
                " Tab/\u{2190}\u{2192} switch chart  \u{2191}\u{2193} scroll  q quit",
                FOOTER_STYLE,
            )),
            footer_area,
        );
    }

    fn handle_key(&mut self, code: KeyCode) -> ViewAction {
        let n = self.tabs.len().max(1);
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Close,
            KeyCode::Tab | KeyCode::Right => {
                self.selected = (self.selected + 1) % n;
                self.offset = 0;
            }
            KeyCode::BackTab | KeyCode::Left => {
                self.selected = (self.selected + n - 1) % n;
                self.offset = 0;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.tabs.get(self.selected).map_or(0, |t| t.items.len());
                if self.offset + 1 < len {
                    self.offset += 1;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.offset = self.offset.saturating_sub(1);
            }
            _ => {}
        }
        ViewAction::Continue
    }
}

pub fn run(ctx: &Context, inputs: &InputArgs, top: Option<usize>) -> Result<()> {
    if !std::io::stdout().is_terminal() {
        return Err(LadingError::Other(
            "`view` needs an interactive terminal; use `report` or `summary --chart` instead".into(),
        ));
    }
    let out = ctx.run_pipeline(inputs)?;
    let p = Presentation::from_settings(&ctx.settings);
    let limit = |view: AggregateView| match top.or(ctx.settings.top_n) {
        Some(n) => view.top(n),
        None => view,
    };
    let tabs = vec![
        ChartTab::from_view(&limit(aggregate(&out.rows, GroupKey::Origin)), &p),
        ChartTab::from_view(&limit(aggregate(&out.rows, GroupKey::Classification)), &p),
    ];
    let mut view = ChartView::new(tabs, p);
    run_report_view(&mut view)
}
