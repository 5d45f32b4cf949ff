use std::io::BufWriter;

use printpdf::*;

use crate::cli::report::text::Presentation;
use crate::error::{LadingError, Result};
use crate::fmt::{pct, weight};
use crate::reports::{AggregateView, ImportReport, QualityStats};

// A4 dimensions (mm)
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_TOP: f32 = 20.0;
const MARGIN_BOTTOM: f32 = 20.0;
const MARGIN_LEFT: f32 = 18.0;
const MARGIN_RIGHT: f32 = 18.0;
const ROW_H: f32 = 5.0;
const FONT_SIZE: f32 = 9.0;
const TITLE_SIZE: f32 = 16.0;
const SECTION_SIZE: f32 = 12.0;
const SUBTITLE_SIZE: f32 = 10.0;
const BAR_H: f32 = 3.4;
const CHART_LABEL_W: f32 = 55.0;
const CHART_VALUE_W: f32 = 32.0;
const MAX_LABEL: usize = 34;

fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.18
}

fn fit(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
}

struct Col {
    width: f32,
    align: Align,
}

struct PdfWriter {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    current_page: PdfPageIndex,
    current_layer: PdfLayerIndex,
    y: f32,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| LadingError::Pdf(format!("{e:?}")))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| LadingError::Pdf(format!("{e:?}")))?;
        Ok(Self {
            doc,
            font,
            font_bold,
            current_page: page,
            current_layer: layer,
            y: MARGIN_TOP,
        })
    }

    fn layer(&self) -> PdfLayerReference {
        self.doc
            .get_page(self.current_page)
            .get_layer(self.current_layer)
    }

    fn pdf_y(&self) -> f32 {
        PAGE_H - self.y
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer");
        self.current_page = page;
        self.current_layer = layer;
        self.y = MARGIN_TOP;
    }

    fn ensure_space(&mut self, needed: f32) {
        if self.y + needed > PAGE_H - MARGIN_BOTTOM {
            self.new_page();
        }
    }

    fn text(&self, s: &str, x: f32, size: f32, bold: bool) {
        let font = if bold { &self.font_bold } else { &self.font };
        self.layer().use_text(s, size, Mm(x), Mm(self.pdf_y()), font);
    }

    fn text_right(&self, s: &str, right_edge: f32, size: f32, bold: bool) {
        let tw = approx_text_width(s, size);
        self.text(s, right_edge - tw, size, bold);
    }

    fn hline(&self, x1: f32, x2: f32) {
        let layer = self.layer();
        layer.set_outline_thickness(0.5);
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x1), Mm(self.pdf_y())), false),
                (Point::new(Mm(x2), Mm(self.pdf_y())), false),
            ],
            is_closed: false,
        });
    }

    /// Filled bar whose top edge sits at the current row baseline.
    fn bar(&self, x: f32, width: f32) {
        if width <= 0.0 {
            return;
        }
        let layer = self.layer();
        let top = self.pdf_y() + BAR_H - 0.8;
        layer.set_fill_color(rgb(0.25, 0.47, 0.71));
        layer.add_rect(Rect::new(Mm(x), Mm(top - BAR_H), Mm(x + width), Mm(top)));
        layer.set_fill_color(rgb(0.0, 0.0, 0.0));
    }

    fn header(&mut self, title: &str, subtitle: &str) {
        self.text(title, MARGIN_LEFT, TITLE_SIZE, true);
        self.y += 7.0;
        self.text(subtitle, MARGIN_LEFT, SUBTITLE_SIZE, false);
        self.y += 5.0;
        let ts = chrono::Local::now()
            .format("Generated %Y-%m-%d %H:%M")
            .to_string();
        self.text(&ts, MARGIN_LEFT, 8.0, false);
        self.y += 5.0;
        self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
        self.y += 6.0;
    }

    fn section_title(&mut self, title: &str) {
        self.ensure_space(ROW_H * 4.0);
        self.y += 3.0;
        self.text(title, MARGIN_LEFT, SECTION_SIZE, true);
        self.y += ROW_H + 1.0;
    }

    fn table_header(&mut self, cols: &[Col], headers: &[&str]) {
        self.ensure_space(ROW_H * 2.0);
        self.table_cells(cols, headers, true);
        self.y += ROW_H - 3.0;
        self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
        self.y += 3.0;
    }

    fn table_cells(&mut self, cols: &[Col], values: &[&str], bold: bool) {
        let mut x = MARGIN_LEFT;
        for (col, value) in cols.iter().zip(values) {
            match col.align {
                Align::Left => self.text(value, x, FONT_SIZE, bold),
                Align::Right => self.text_right(value, x + col.width, FONT_SIZE, bold),
            }
            x += col.width;
        }
    }

    fn table_row(&mut self, cols: &[Col], values: &[&str], bold: bool) {
        self.ensure_space(ROW_H);
        self.table_cells(cols, values, bold);
        self.y += ROW_H;
    }

    fn separator(&mut self) {
        self.hline(MARGIN_LEFT, PAGE_W - MARGIN_RIGHT);
        self.y += ROW_H - 1.0;
    }

    fn note(&mut self, s: &str) {
        self.ensure_space(ROW_H);
        self.text(s, MARGIN_LEFT, FONT_SIZE, false);
        self.y += ROW_H;
    }

    fn to_bytes(self) -> Result<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| LadingError::Pdf(format!("{e:?}")))?;
        buf.into_inner().map_err(|e| LadingError::Pdf(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

fn view_table(pdf: &mut PdfWriter, view: &AggregateView, p: &Presentation) {
    pdf.section_title(&view.title());
    if view.groups.is_empty() {
        pdf.note("No matching rows.");
        return;
    }

    let cols = &[
        Col { width: 62.0, align: Align::Left },
        Col { width: 32.0, align: Align::Right },
        Col { width: 17.0, align: Align::Right },
        Col { width: 30.0, align: Align::Right },
        Col { width: 17.0, align: Align::Right },
        Col { width: 16.0, align: Align::Right },
    ];
    pdf.table_header(cols, &[view.by.title(), "Value", "Value %", "Weight", "Weight %", "Rows"]);

    let missing = p.missing_label(view.by);
    for g in &view.groups {
        let name = fit(&g.name.display(&missing), MAX_LABEL);
        let value = p.money(g.value);
        let vshare = pct(g.value_share);
        let kg = weight(g.weight_kg);
        let wshare = pct(g.weight_share);
        let count = g.count.to_string();
        pdf.table_row(cols, &[&name, &value, &vshare, &kg, &wshare, &count], false);
    }
    pdf.separator();
    let value = p.money(view.total_value);
    let kg = weight(view.total_weight_kg);
    let count = view.total_count.to_string();
    pdf.table_row(cols, &["Total", &value, "", &kg, "", &count], true);
}

fn value_chart(pdf: &mut PdfWriter, view: &AggregateView, p: &Presentation) {
    if view.groups.is_empty() {
        return;
    }
    pdf.section_title(&format!("Value by {}", view.by.title()));

    let bar_x = MARGIN_LEFT + CHART_LABEL_W;
    let bar_max = PAGE_W - MARGIN_RIGHT - CHART_VALUE_W - bar_x;
    let max = view.groups.iter().map(|g| g.value).fold(0.0_f64, f64::max);
    let missing = p.missing_label(view.by);

    for g in &view.groups {
        pdf.ensure_space(ROW_H);
        let label = fit(&g.name.display(&missing), MAX_LABEL);
        pdf.text(&label, MARGIN_LEFT, FONT_SIZE, false);
        let fraction = if max > 0.0 { (g.value / max) as f32 } else { 0.0 };
        pdf.bar(bar_x, bar_max * fraction);
        pdf.text_right(&p.money(g.value), PAGE_W - MARGIN_RIGHT, FONT_SIZE, false);
        pdf.y += ROW_H;
    }
}

fn quality_section(pdf: &mut PdfWriter, q: &QualityStats, p: &Presentation) {
    pdf.section_title("Data Quality");
    let cols = &[
        Col { width: 80.0, align: Align::Left },
        Col { width: 30.0, align: Align::Right },
    ];
    pdf.table_header(cols, &["Check", "Rows"]);
    for (label, n) in [
        ("Transactions", q.rows),
        ("No lookup match", q.join_misses),
        ("No classification", q.unclassified),
        ("Code shorter than 4", q.short_codes),
    ] {
        let n = n.to_string();
        pdf.table_row(cols, &[label, &n], false);
    }
    if q.unclassified > 0 {
        pdf.y += 2.0;
        pdf.note(&format!(
            "{} of value ({} rows) is {}.",
            p.money(q.unclassified_value),
            q.unclassified,
            p.unclassified.to_lowercase()
        ));
    }
}

/// Render the full import report: tables, bar charts and data quality.
pub fn render_report(report: &ImportReport, p: &Presentation) -> Result<Vec<u8>> {
    let mut pdf = PdfWriter::new("Import Report")?;
    let origin = &report.by_origin;
    pdf.header(
        "Import Report",
        &format!(
            "{} rows, {} CIF, {}",
            origin.total_count,
            p.money(origin.total_value),
            weight(origin.total_weight_kg)
        ),
    );

    view_table(&mut pdf, origin, p);
    value_chart(&mut pdf, origin, p);
    view_table(&mut pdf, &report.by_classification, p);
    value_chart(&mut pdf, &report.by_classification, p);
    for breakdown in &report.breakdowns {
        view_table(&mut pdf, breakdown, p);
    }
    quality_section(&mut pdf, &report.quality, p);

    pdf.to_bytes()
}
