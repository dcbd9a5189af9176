use scout_core::{CellValue, TaskRecord};
use scout_logging::{poll_cycle, scout_debug, scout_warn};
use scraper::{ElementRef, Html, Selector};
use url::Url;

pub const DEFAULT_TABLE_ID: &str = "incident_task_table";

/// Leading columns that hold row controls (selection box, row number).
const CONTROL_COLUMNS: usize = 2;

/// Turns the task listing table into one [`TaskRecord`] per body row.
///
/// - column labels come from `thead th`, preferring a `name` attribute over text
/// - the first two cells of every row are skipped
/// - a cell holding `<a href>` becomes `{link, value}` with the link made absolute
/// - cells past the last header label are dropped; rows shorter than the header
///   simply lack the trailing columns
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    table_id: String,
}

impl Default for ListingExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE_ID)
    }
}

impl ListingExtractor {
    pub fn new(table_id: impl Into<String>) -> Self {
        Self {
            table_id: table_id.into(),
        }
    }

    pub fn extract(&self, html: &str, page_url: &str) -> Vec<TaskRecord> {
        let document = Html::parse_document(html);
        let (Some(table_sel), Some(header_sel), Some(row_sel), Some(link_sel)) = (
            Selector::parse("table").ok(),
            Selector::parse("thead th").ok(),
            Selector::parse("tbody tr").ok(),
            Selector::parse("a").ok(),
        ) else {
            return Vec::new();
        };

        let Some(table) = document
            .select(&table_sel)
            .find(|table| table.value().id() == Some(self.table_id.as_str()))
        else {
            scout_warn!("cycle={} table #{} not found", poll_cycle(), self.table_id);
            return Vec::new();
        };

        let labels: Vec<String> = table.select(&header_sel).map(column_label).collect();
        if labels.is_empty() {
            scout_warn!("cycle={} table #{} has no header cells", poll_cycle(), self.table_id);
        }

        let base = Url::parse(page_url).ok();
        let records: Vec<TaskRecord> = table
            .select(&row_sel)
            .map(|row| {
                let mut record = TaskRecord::new();
                for (index, cell) in data_cells(row).enumerate().skip(CONTROL_COLUMNS) {
                    let Some(label) = labels.get(index) else {
                        break;
                    };
                    record.insert(label.clone(), cell_value(cell, &link_sel, base.as_ref()));
                }
                record
            })
            .collect();

        scout_debug!("cycle={} extracted {} rows", poll_cycle(), records.len());
        records
    }
}

fn column_label(header: ElementRef<'_>) -> String {
    match header.value().attr("name").filter(|name| !name.is_empty()) {
        Some(name) => name.to_string(),
        None => trimmed_text(header),
    }
}

fn data_cells<'a>(row: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "td")
}

fn cell_value(cell: ElementRef<'_>, link_sel: &Selector, base: Option<&Url>) -> CellValue {
    let value = trimmed_text(cell);
    let href = cell
        .select(link_sel)
        .next()
        .and_then(|anchor| anchor.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty());

    match href {
        Some(href) => CellValue::link(resolve_link(href, base), value),
        None => CellValue::Text(value),
    }
}

/// Resolves `href` against the page URL. Unresolvable references are kept verbatim.
fn resolve_link(href: &str, base: Option<&Url>) -> String {
    if let Ok(url) = Url::parse(href) {
        return url.into();
    }
    base.and_then(|base| base.join(href).ok())
        .map(String::from)
        .unwrap_or_else(|| href.to_string())
}

fn trimmed_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
