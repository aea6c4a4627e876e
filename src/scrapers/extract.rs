//! Field extraction from phone status pages.
//!
//! Cisco phones render their configuration as loosely structured HTML tables,
//! one setting per row. Rows come in two shapes:
//!
//! ```text
//! <tr><td>Host Name</td><td>SEP001122334455</td></tr>
//! <tr><td><b>TFTP Server 1</b></td><td></td><td><b>10.0.0.5</b></td></tr>
//! ```
//!
//! Two cells are read as `(label, value)`. Three or more are read as
//! `(label, spacer, value)`; the spacer may sit on either side of the label,
//! so the first two cells are both tried as the label.

use crate::error::ExtractError;
use scraper::{ElementRef, Html, Node};
use tracing::trace;

const HOSTNAME_MARKER: &str = "host name";
const TFTP_MARKER: &str = "tftp server 1";
const CUCM_MARKER: &str = "unified cm 1";

/// The three values a status page can contribute. Empty means "not seen".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneFields {
    pub hostname: String,
    pub tftp_server: String,
    pub cucm_server: String,
}

impl PhoneFields {
    pub fn is_empty(&self) -> bool {
        self.hostname.is_empty() && self.tftp_server.is_empty() && self.cucm_server.is_empty()
    }

    fn slot(&mut self, field: Field) -> &mut String {
        match field {
            Field::Hostname => &mut self.hostname,
            Field::TftpServer => &mut self.tftp_server,
            Field::CucmServer => &mut self.cucm_server,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Hostname,
    TftpServer,
    CucmServer,
}

fn classify(label: &str) -> Option<Field> {
    let label = label.to_lowercase();
    if label.contains(HOSTNAME_MARKER) {
        Some(Field::Hostname)
    } else if label.contains(TFTP_MARKER) {
        Some(Field::TftpServer)
    } else if label.contains(CUCM_MARKER) {
        Some(Field::CucmServer)
    } else {
        None
    }
}

/// Extract the host name, TFTP server and Unified CM server from a raw page body.
///
/// The first row matching each marker wins. Fails with
/// [`ExtractError::NotFound`] when none of the three fields turned up.
pub fn extract_fields(body: &[u8]) -> Result<PhoneFields, ExtractError> {
    // Phones mix Latin-1 into otherwise ASCII pages; stray bytes become U+FFFD.
    let html = String::from_utf8_lossy(body);
    parse_fields(&html)
}

/// Same as [`extract_fields`] for an already-decoded document.
pub fn parse_fields(html: &str) -> Result<PhoneFields, ExtractError> {
    let document = Html::parse_document(html);
    let mut fields = PhoneFields::default();

    // `descendants` walks the tree depth-first in document order.
    for node in document.tree.root().descendants() {
        let Node::Element(element) = node.value() else {
            continue;
        };
        if element.name() != "tr" {
            continue;
        }
        let Some(row) = ElementRef::wrap(node) else {
            continue;
        };
        let Some((field, value)) = read_row(row) else {
            continue;
        };

        let slot = fields.slot(field);
        if slot.is_empty() {
            *slot = match field {
                Field::CucmServer => value.split_whitespace().next().unwrap_or_default().to_string(),
                _ => value,
            };
            trace!(?field, value = %slot, "matched row");
        }
    }

    if fields.is_empty() {
        return Err(ExtractError::NotFound);
    }
    Ok(fields)
}

fn read_row(row: ElementRef<'_>) -> Option<(Field, String)> {
    let mut cells: Vec<String> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| cell.value().name() == "td")
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .collect();

    match cells.len() {
        2 => {
            let field = classify(&cells[0])?;
            Some((field, cells.swap_remove(1)))
        }
        n if n >= 3 => {
            let field = classify(&cells[0]).or_else(|| classify(&cells[1]))?;
            Some((field, cells.swap_remove(2)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> String {
        let mut html = String::from("<html><body><table>");
        for row in rows {
            html.push_str("<tr>");
            for cell in *row {
                html.push_str(&format!("<td>{cell}</td>"));
            }
            html.push_str("</tr>");
        }
        html.push_str("</table></body></html>");
        html
    }

    #[test]
    fn test_extracts_all_three_fields() {
        let html = table(&[
            &["Host Name", "phone1"],
            &["TFTP Server 1", "10.0.0.5"],
            &["spacer", "Unified CM 1", "10.0.0.9 extra"],
        ]);

        let fields = parse_fields(&html).unwrap();
        assert_eq!(fields.hostname, "phone1");
        assert_eq!(fields.tftp_server, "10.0.0.5");
        assert_eq!(fields.cucm_server, "10.0.0.9");
    }

    #[test]
    fn test_three_cell_row_with_trailing_spacer() {
        let html = r#"<table>
            <tr><td><b>Host Name</b></td><td width="20"></td><td><b> SEP001122334455 </b></td></tr>
            <tr><td><b>Unified CM 1</b></td><td></td><td>cucm-pub.example.com  Active</td></tr>
        </table>"#;

        let fields = parse_fields(html).unwrap();
        assert_eq!(fields.hostname, "SEP001122334455");
        assert_eq!(fields.cucm_server, "cucm-pub.example.com");
        assert!(fields.tftp_server.is_empty());
    }

    #[test]
    fn test_first_match_wins() {
        let html = table(&[
            &["TFTP Server 1", "10.0.0.5"],
            &["TFTP Server 1", "10.0.0.6"],
        ]);

        let fields = parse_fields(&html).unwrap();
        assert_eq!(fields.tftp_server, "10.0.0.5");
    }

    #[test]
    fn test_labels_are_case_insensitive() {
        let html = table(&[&["HOST NAME:", "phone2"]]);
        assert_eq!(parse_fields(&html).unwrap().hostname, "phone2");
    }

    #[test]
    fn test_ignores_single_cell_rows() {
        let html = table(&[&["Host Name"], &["TFTP Server 2", "10.0.0.7"]]);
        assert!(matches!(parse_fields(&html), Err(ExtractError::NotFound)));
    }

    #[test]
    fn test_no_matching_rows_is_not_found() {
        let html = table(&[&["Model Number", "CP-8841"], &["Serial", "FCH1234"]]);
        assert!(matches!(parse_fields(&html), Err(ExtractError::NotFound)));
    }

    #[test]
    fn test_non_utf8_byte_keeps_other_rows() {
        let body = b"<table><tr><td>Host Name</td><td>SEP1</td></tr>\
<tr><td>Location</td><td>Caf\xe9</td></tr>\
<tr><td>TFTP Server 1</td><td>10.0.0.5</td></tr></table>";

        let fields = extract_fields(body).unwrap();
        assert_eq!(fields.hostname, "SEP1");
        assert_eq!(fields.tftp_server, "10.0.0.5");
    }

    #[test]
    fn test_nested_tables_are_visited() {
        let html = r#"<table><tr><td>
            <table><tr><td>TFTP Server 1</td><td>192.168.1.10</td></tr></table>
        </td></tr></table>"#;

        assert_eq!(parse_fields(html).unwrap().tftp_server, "192.168.1.10");
    }
}
