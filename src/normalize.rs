use rayon::prelude::*;

use crate::csv_processor::Record;

/// Strips trailing whitespace from `field` in every record.
///
/// The source pads names to a fixed width, so `"FOO BAR  "` and
/// `"FOO BAR"` would otherwise be different keys. Leading whitespace and
/// all other fields are left untouched; records without `field` pass
/// through unchanged. Runs on the current rayon pool.
pub fn normalize(records: Vec<Record>, field: &str) -> Vec<Record> {
    records
        .into_par_iter()
        .map(|mut record| {
            if let Some(value) = record.get_mut(field) {
                let trimmed = value.trim_end().len();
                value.truncate(trimmed);
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn trims_only_trailing_whitespace_of_id_field() {
        let input = vec![record(&[("SC_NAME", "  FOO BAR \t "), ("OPEN", "10  ")])];
        let out = normalize(input, "SC_NAME");
        assert_eq!(out[0]["SC_NAME"], "  FOO BAR");
        assert_eq!(out[0]["OPEN"], "10  ");
    }

    #[test]
    fn preserves_order_and_missing_fields() {
        let input = vec![
            record(&[("SC_NAME", "B  ")]),
            record(&[("OTHER", "x ")]),
            record(&[("SC_NAME", "A")]),
        ];
        let out = normalize(input.clone(), "SC_NAME");
        assert_eq!(out[0]["SC_NAME"], "B");
        assert_eq!(out[1], input[1]);
        assert_eq!(out[2]["SC_NAME"], "A");
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(names in prop::collection::vec("[ A-Z\t]{0,12}", 0..30)) {
            let records: Vec<Record> = names
                .iter()
                .map(|n| record(&[("SC_NAME", n.as_str()), ("CLOSE", "1 ")]))
                .collect();
            let once = normalize(records, "SC_NAME");
            let twice = normalize(once.clone(), "SC_NAME");
            prop_assert_eq!(once, twice);
        }
    }
}
