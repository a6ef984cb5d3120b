use crate::csv_processor::Record;

/// Everything a template needs to draw a result page.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    /// Columns to show, in order.
    pub fields: Vec<String>,
    pub record_count: usize,
    pub records: Vec<Record>,
}

/// Templating collaborator that turns a `View` into text.
pub trait Renderer {
    fn render(&self, view: &View) -> String;
}

/// Fixed-width plain-text table.
///
/// # Example Output
/// ```text
/// SC_CODE  SC_NAME  CLOSE
/// 1        FOO BAR  11
/// 2        BAZ      5
/// (2 records)
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn render(&self, view: &View) -> String {
        let cell = |record: &Record, field: &str| record.get(field).map(String::as_str).unwrap_or("").to_string();

        let mut widths: Vec<usize> = view.fields.iter().map(|f| f.chars().count()).collect();
        for record in &view.records {
            for (i, field) in view.fields.iter().enumerate() {
                widths[i] = widths[i].max(cell(record, field).chars().count());
            }
        }

        let line = |cells: Vec<String>| {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<width$}", c, width = *w))
                .collect();
            padded.join("  ").trim_end().to_string()
        };

        let mut out = String::new();
        out.push_str(&line(view.fields.clone()));
        out.push('\n');
        for record in &view.records {
            out.push_str(&line(view.fields.iter().map(|f| cell(record, f)).collect()));
            out.push('\n');
        }
        let noun = if view.record_count == 1 { "record" } else { "records" };
        out.push_str(&format!("({} {})\n", view.record_count, noun));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn renders_aligned_columns() {
        let view = View {
            fields: vec!["SC_CODE".into(), "SC_NAME".into(), "CLOSE".into()],
            record_count: 2,
            records: vec![
                record(&[("SC_CODE", "1"), ("SC_NAME", "FOO BAR"), ("CLOSE", "11")]),
                record(&[("SC_CODE", "2"), ("SC_NAME", "BAZ"), ("CLOSE", "5")]),
            ],
        };
        let text = TextRenderer.render(&view);
        assert_eq!(
            text,
            "SC_CODE  SC_NAME  CLOSE\n1        FOO BAR  11\n2        BAZ      5\n(2 records)\n"
        );
    }

    #[test]
    fn missing_fields_render_blank() {
        let view = View {
            fields: vec!["A".into(), "B".into()],
            record_count: 1,
            records: vec![record(&[("A", "x")])],
        };
        assert_eq!(TextRenderer.render(&view), "A  B\nx\n(1 record)\n");
    }
}
