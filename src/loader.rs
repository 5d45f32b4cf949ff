use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{LadingError, Result};
use crate::models::{Lookup, Transaction};
use crate::settings::{ColumnMap, Settings};

/// Lookup keys are four-character code groups.
pub const LOOKUP_KEY_WIDTH: usize = 4;

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// All-digit codes exactly one digit shorter than this get their leading
    /// zero back (0 disables).
    pub code_width: usize,
    /// Field delimiter for delimited files; inferred from the extension when unset.
    pub delimiter: Option<u8>,
    /// Worksheet to read from a workbook; the first sheet when unset.
    pub sheet: Option<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            code_width: 8,
            delimiter: None,
            sheet: None,
        }
    }
}

impl LoaderOptions {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let delimiter = match settings.delimiter {
            Some(c) if c.is_ascii() => Some(c as u8),
            Some(c) => {
                return Err(LadingError::Settings(format!(
                    "delimiter '{c}' must be a single ASCII character"
                )))
            }
            None => None,
        };
        Ok(Self {
            code_width: settings.code_width,
            delimiter,
            sheet: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a numeric cell. Thousands separators, whitespace and a leading
/// currency marker ("$", "EC$", "XCD", "\u{20ac}") are ignored; a blank cell is zero.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '"') && !c.is_whitespace())
        .collect();
    if s.is_empty() {
        return Some(0.0);
    }
    let amount = s.trim_start_matches(|c: char| !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.')));
    if amount.is_empty() {
        return None;
    }
    amount.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Clean up a tariff code as it arrives from a spreadsheet or a
/// hand-keyed extract: "0201.10.00" -> "02011000", "2011000.0" -> "02011000".
pub fn normalize_code(raw: &str, width: usize) -> String {
    let trimmed = raw.trim();
    let trimmed = match trimmed.strip_suffix(".0") {
        Some(int_part) if !int_part.is_empty() && int_part.chars().all(|c| c.is_ascii_digit()) => {
            int_part
        }
        _ => trimmed,
    };
    let code: String = trimmed
        .chars()
        .filter(|c| *c != '.' && !c.is_whitespace())
        .collect();

    if width > 0 && code.len() + 1 == width && code.chars().all(|c| c.is_ascii_digit()) {
        format!("{code:0>width$}")
    } else {
        code
    }
}

/// First four characters of a code, or `None` when the code is shorter.
pub fn derive_code_group(code: &str) -> Option<String> {
    if code.chars().count() >= 4 {
        Some(code.chars().take(4).collect())
    } else {
        None
    }
}

/// Find the header matching a canonical column. Aliases are tried in order,
/// so the first alias present in the file wins.
pub fn resolve_column(
    headers: &[String],
    canonical: &str,
    aliases: &[String],
    file: &str,
) -> Result<usize> {
    let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    std::iter::once(canonical)
        .chain(aliases.iter().map(String::as_str))
        .find_map(|alias| {
            let alias = alias.trim().to_lowercase();
            normalized.iter().position(|h| *h == alias)
        })
        .ok_or_else(|| LadingError::MissingColumn {
            file: file.to_string(),
            column: canonical.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Raw table readers
// ---------------------------------------------------------------------------

/// Header row plus (line number, cells) for every non-blank data row.
struct RawTable {
    headers: Vec<String>,
    rows: Vec<(usize, Vec<String>)>,
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.as_str()).unwrap_or("")
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn read_table(path: &Path, opts: &LoaderOptions) -> Result<RawTable> {
    let ext = extension(path);
    if matches!(ext.as_str(), "xlsx" | "xlsm" | "xls" | "ods") {
        return read_workbook(path, opts);
    }
    if let Some(sheet) = &opts.sheet {
        warn!(file = %path.display(), sheet = %sheet, "sheet ignored for delimited input");
    }
    let default = if ext == "tsv" { b'\t' } else { b',' };
    read_delimited(path, opts.delimiter.unwrap_or(default))
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<RawTable> {
    let name = || path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| LadingError::ReadFile {
        file: name(),
        source,
    })?;
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|source| LadingError::ParseFile { file: name(), source })?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result.map_err(|source| LadingError::ParseFile { file: name(), source })?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(i + 2);
        let cells: Vec<String> = record.iter().map(|c| c.trim().to_string()).collect();
        if is_blank(&cells) {
            debug!(file = %path.display(), line, "skipping blank row");
            continue;
        }
        rows.push((line, cells));
    }
    Ok(RawTable { headers, rows })
}

#[cfg(feature = "xlsx")]
fn read_workbook(path: &Path, opts: &LoaderOptions) -> Result<RawTable> {
    use calamine::{Data, Reader};

    fn cell_text(value: &Data) -> String {
        match value {
            Data::Empty => String::new(),
            Data::String(s) => s.trim().to_string(),
            // Codes stored as numbers come back as floats
            Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
            Data::Float(f) => f.to_string(),
            Data::Int(i) => i.to_string(),
            other => other.to_string(),
        }
    }

    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| LadingError::Xlsx(format!("{}: {e}", path.display())))?;

    let range = match &opts.sheet {
        Some(name) => workbook
            .worksheet_range(name)
            .map_err(|e| LadingError::Xlsx(format!("{}: sheet '{name}': {e}", path.display())))?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| LadingError::Xlsx(format!("{}: workbook has no sheets", path.display())))?
            .map_err(|e| LadingError::Xlsx(format!("{}: {e}", path.display())))?,
    };

    let mut iter = range.rows();
    let headers: Vec<String> = iter
        .next()
        .map(|r| r.iter().map(cell_text).collect())
        .unwrap_or_default();

    let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
    let mut rows = Vec::new();
    for (i, row) in iter.enumerate() {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        if is_blank(&cells) {
            continue;
        }
        // Spreadsheet rows are 1-based and the header occupies the first one
        rows.push((first_row + i + 2, cells));
    }
    Ok(RawTable { headers, rows })
}

#[cfg(not(feature = "xlsx"))]
fn read_workbook(path: &Path, _opts: &LoaderOptions) -> Result<RawTable> {
    Err(LadingError::UnsupportedFormat(format!(
        "{} (spreadsheet input requires the 'xlsx' feature)",
        path.display()
    )))
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

fn parse_field(row: &[String], idx: usize, column: &str, line: usize, file: &str) -> Result<f64> {
    let raw = cell(row, idx);
    match parse_number(raw) {
        Some(v) if v >= 0.0 => Ok(v),
        _ => Err(LadingError::InvalidNumber {
            file: file.to_string(),
            line,
            column: column.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Load the transactions extract and derive `code_group` for every row.
/// Rows pass through unfiltered and in file order.
pub fn load_transactions(
    path: &Path,
    columns: &ColumnMap,
    opts: &LoaderOptions,
) -> Result<Vec<Transaction>> {
    let file = path.display().to_string();
    let table = read_table(path, opts)?;

    let idx_code = resolve_column(&table.headers, "code", &columns.code, &file)?;
    let idx_desc = resolve_column(&table.headers, "description", &columns.description, &file)?;
    let idx_origin = resolve_column(&table.headers, "origin", &columns.origin, &file)?;
    let idx_weight = resolve_column(&table.headers, "weight_kg", &columns.weight_kg, &file)?;
    let idx_value = resolve_column(&table.headers, "value", &columns.value, &file)?;

    let mut transactions = Vec::with_capacity(table.rows.len());
    for (line, row) in &table.rows {
        let code = normalize_code(cell(row, idx_code), opts.code_width);
        let code_group = derive_code_group(&code);
        if code_group.is_none() {
            warn!(file = %file, line, code = %code, "code shorter than 4 characters, no code group");
        }
        transactions.push(Transaction {
            line: *line,
            code,
            code_group,
            description: cell(row, idx_desc).to_string(),
            origin: cell(row, idx_origin).to_string(),
            weight_kg: parse_field(row, idx_weight, "weight_kg", *line, &file)?,
            value: parse_field(row, idx_value, "value", *line, &file)?,
        });
    }

    info!(file = %file, rows = transactions.len(), "loaded transactions");
    Ok(transactions)
}

/// Load the code-group lookup. Duplicate keys keep the last label seen.
pub fn load_lookup(path: &Path, columns: &ColumnMap, opts: &LoaderOptions) -> Result<Lookup> {
    let file = path.display().to_string();
    let table = read_table(path, opts)?;

    let idx_key = resolve_column(&table.headers, "code_group", &columns.lookup_key, &file)?;
    let idx_label = resolve_column(&table.headers, "category_label", &columns.lookup_label, &file)?;

    let mut lookup = Lookup::new();
    for (line, row) in &table.rows {
        let key = normalize_code(cell(row, idx_key), LOOKUP_KEY_WIDTH);
        let label = cell(row, idx_label);
        if key.is_empty() || label.is_empty() {
            warn!(file = %file, line, "lookup row without key or label, skipped");
            continue;
        }
        if let Some(previous) = lookup.insert(key.clone(), label.to_string()) {
            warn!(file = %file, line, key = %key, previous = %previous, "duplicate lookup key, last one wins");
        }
    }

    info!(file = %file, entries = lookup.len(), "loaded lookup");
    Ok(lookup)
}
