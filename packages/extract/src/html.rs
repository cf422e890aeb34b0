//! Tree helpers for the table-heavy Drinking Water Watch markup.
//!
//! The pages nest layout tables inside data tables, so "rows of a table"
//! always means the table's own rows (through an implicit `<tbody>`), and
//! "cells of a row" the row's own `<td>` children.

use scraper::{ElementRef, Html};

/// Non-breaking space.
pub const NBSP: char = '\u{00a0}';

/// Every element below `root`, `root` included, in document order.
pub fn elements<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    root.descendants().filter_map(ElementRef::wrap)
}

/// Elements with tag `name` below `root`, in document order.
pub fn elements_named<'a>(
    root: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    elements(root).filter(move |el| el.value().name() == name)
}

fn children_named<'a>(
    parent: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == name)
}

/// Rendered text with ASCII whitespace runs collapsed. Non-breaking spaces
/// are kept.
#[must_use]
pub fn text(el: ElementRef<'_>) -> String {
    let raw: String = el.text().collect();
    raw.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text used for label and title matching: non-breaking spaces count as
/// whitespace.
#[must_use]
pub fn match_text(el: ElementRef<'_>) -> String {
    let raw: String = el.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The table's own rows, in order.
#[must_use]
pub fn rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(children_named(child, "tr")),
            _ => {}
        }
    }
    rows
}

/// The row's own `<td>` cells.
#[must_use]
pub fn cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    children_named(row, "td").collect()
}

/// Cell texts of a row.
#[must_use]
pub fn cell_texts(row: ElementRef<'_>) -> Vec<String> {
    cells(row).into_iter().map(text).collect()
}

/// First table whose first row holds a `<th>` containing `title`.
#[must_use]
pub fn titled_table<'a>(document: &'a Html, title: &str) -> Option<ElementRef<'a>> {
    elements_named(document.root_element(), "table").find(|table| {
        rows(*table).first().is_some_and(|first| {
            children_named(*first, "th").any(|th| match_text(th).contains(title))
        })
    })
}

/// Nearest table enclosing the first `<th>` that contains `title`.
#[must_use]
pub fn table_around_heading<'a>(document: &'a Html, title: &str) -> Option<ElementRef<'a>> {
    let heading = elements_named(document.root_element(), "th")
        .find(|th| match_text(*th).contains(title))?;
    nearest_ancestor(heading, "table")
}

/// Nearest ancestor of `el` named `name`.
#[must_use]
pub fn nearest_ancestor<'a>(el: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == name)
}

/// The value cell next to a label.
///
/// The label is a `<font>` whose text contains `label`; the value is the
/// next `<td>` sibling of the label's nearest enclosing `<td>`. The first
/// label occurrence that has such a sibling wins.
#[must_use]
pub fn labeled_value_cell<'a>(document: &'a Html, label: &str) -> Option<ElementRef<'a>> {
    elements_named(document.root_element(), "font")
        .filter(|font| match_text(*font).contains(label))
        .find_map(|font| {
            nearest_ancestor(font, "td")?
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|sibling| sibling.value().name() == "td")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <table>
          <tr><td>
            <table>
              <tr><th>Water System Facilities</th></tr>
              <tr><td>Facility</td><td>Name</td><td>Type - Status</td></tr>
              <tr><td>G001</td><td>WELL 1</td><td>Well – Active</td></tr>
            </table>
          </td></tr>
          <tr><td><font>System&nbsp;Name:</font></td><td>  CITY   OF&nbsp;LAREDO </td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn rows_ignore_nested_tables() {
        let document = Html::parse_document(PAGE);
        let outer = elements_named(document.root_element(), "table").next().unwrap();

        assert_eq!(rows(outer).len(), 2);
    }

    #[test]
    fn finds_table_by_first_row_heading() {
        let document = Html::parse_document(PAGE);
        let table = titled_table(&document, "Water System Facilities").unwrap();
        let table_rows = rows(table);

        assert_eq!(table_rows.len(), 3);
        assert_eq!(cell_texts(table_rows[2])[0], "G001");
    }

    #[test]
    fn labeled_value_uses_nearest_enclosing_cell() {
        let document = Html::parse_document(PAGE);
        let cell = labeled_value_cell(&document, "System Name").unwrap();

        assert_eq!(text(cell), "CITY OF\u{a0}LAREDO");
        assert_eq!(match_text(cell), "CITY OF LAREDO");
    }

    #[test]
    fn missing_label_and_title_are_none() {
        let document = Html::parse_document(PAGE);

        assert!(labeled_value_cell(&document, "Federal Type").is_none());
        assert!(titled_table(&document, "Group Violations").is_none());
        assert!(table_around_heading(&document, "WS Flow Rates").is_none());
    }
}
