use crate::error::{BhavError, Result};

/// Filename shape of the daily artifact for one month.
///
/// The published name is `<prefix><DD><MM><YY><suffix>`, e.g.
/// `EQ121218_CSV.ZIP`. Month and year are fixed by the period; the day is
/// matched as a leading digit in `0..=3` followed by any digit.
#[derive(Debug, Clone)]
pub struct ArtifactPattern {
    regex: regex::Regex,
}

impl ArtifactPattern {
    /// Compiles an arbitrary, unanchored pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = regex::Regex::new(pattern)
            .map_err(|e| BhavError::Config(format!("invalid artifact pattern: {}", e)))?;
        Ok(ArtifactPattern { regex })
    }

    /// Builds the pattern for the month and year of `date`.
    ///
    /// # Arguments
    /// * `prefix` - Literal text before the day digits (e.g. "EQ").
    /// * `suffix` - Literal text after the year digits (e.g. "_CSV.ZIP").
    /// * `date` - Any day of the wanted period.
    pub fn for_period(prefix: &str, suffix: &str, date: chrono::NaiveDate) -> Result<Self> {
        let pattern = format!(
            "{}[0-3][0-9]{}{}",
            regex::escape(prefix),
            date.format("%m%y"),
            regex::escape(suffix),
        );
        Self::new(&pattern)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, target: &str) -> bool {
        self.regex.is_match(target)
    }
}

/// Collects every `<a href>` target of a document, in document order.
pub fn extract_links(html: &str) -> Result<Vec<String>> {
    let document = scraper::Html::parse_document(html);
    let selector = scraper::Selector::parse("a[href]")
        .map_err(|e| BhavError::Config(format!("link selector: {:?}", e)))?;

    let links = document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .collect();
    Ok(links)
}

/// True for `http`/`https` URLs that carry a host.
pub fn is_absolute(href: &str) -> bool {
    match reqwest::Url::parse(href) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

/// Picks the artifact link out of a listing page's hyperlinks.
///
/// Only absolute targets are considered. When several targets match, the
/// last one in document order wins.
///
/// # Errors
/// * `BhavError::NotFound` - no absolute target matches `pattern`.
pub fn locate(links: &[String], pattern: &ArtifactPattern) -> Result<String> {
    let mut found = None;
    for href in links {
        if !is_absolute(href) {
            tracing::debug!(href = %href, "skipping relative link");
            continue;
        }
        if pattern.is_match(href) {
            tracing::debug!(href = %href, "candidate artifact link");
            found = Some(href);
        }
    }

    found.cloned().ok_or_else(|| BhavError::NotFound {
        pattern: pattern.as_str().to_string(),
    })
}

/// `extract_links` followed by `locate`.
pub fn locate_in_html(html: &str, pattern: &ArtifactPattern) -> Result<String> {
    let links = extract_links(html)?;
    locate(&links, pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn december_2018() -> ArtifactPattern {
        let date = chrono::NaiveDate::from_ymd_opt(2018, 12, 12).unwrap();
        ArtifactPattern::for_period("EQ", "_CSV.ZIP", date).unwrap()
    }

    fn links(hrefs: &[&str]) -> Vec<String> {
        hrefs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn period_pattern_fixes_month_and_year() {
        let pattern = december_2018();
        assert!(pattern.is_match("EQ121218_CSV.ZIP"));
        assert!(pattern.is_match("EQ311218_CSV.ZIP"));
        assert!(!pattern.is_match("EQ411218_CSV.ZIP"));
        assert!(!pattern.is_match("EQ121118_CSV.ZIP"));
        assert!(!pattern.is_match("EQ121219_CSV.ZIP"));
        // suffix dot is literal
        assert!(!pattern.is_match("EQ121218_CSVXZIP"));
    }

    #[test]
    fn single_match_is_returned() {
        let hrefs = links(&[
            "https://example.com/about",
            "https://example.com/download/EQ121218_CSV.ZIP",
            "https://example.com/download/EQ121218_XLS.ZIP",
        ]);
        let url = locate(&hrefs, &december_2018()).unwrap();
        assert_eq!(url, "https://example.com/download/EQ121218_CSV.ZIP");
    }

    #[test]
    fn last_match_wins() {
        let hrefs = links(&[
            "https://example.com/EQ101218_CSV.ZIP",
            "https://example.com/EQ111218_CSV.ZIP",
            "https://example.com/EQ121218_CSV.ZIP",
            "https://example.com/contact",
        ]);
        let url = locate(&hrefs, &december_2018()).unwrap();
        assert_eq!(url, "https://example.com/EQ121218_CSV.ZIP");
    }

    #[test]
    fn relative_links_are_ignored() {
        let hrefs = links(&["/download/EQ121218_CSV.ZIP", "EQ121218_CSV.ZIP"]);
        let err = locate(&hrefs, &december_2018()).unwrap_err();
        assert!(matches!(err, BhavError::NotFound { .. }));
    }

    #[test]
    fn no_match_is_not_found() {
        let err = locate(&[], &december_2018()).unwrap_err();
        assert!(matches!(err, BhavError::NotFound { .. }));
    }

    #[test]
    fn extracts_links_from_html() {
        let html = r#"
            <html><body>
              <a href="https://example.com/a">A</a>
              <a name="anchor">no target</a>
              <p><a href=" https://example.com/EQ051218_CSV.ZIP ">zip</a></p>
            </body></html>
        "#;
        let found = extract_links(html).unwrap();
        assert_eq!(found, vec!["https://example.com/a", "https://example.com/EQ051218_CSV.ZIP"]);

        let url = locate_in_html(html, &december_2018()).unwrap();
        assert_eq!(url, "https://example.com/EQ051218_CSV.ZIP");
    }

    #[test]
    fn absolute_requires_http_scheme() {
        assert!(is_absolute("https://example.com/x.zip"));
        assert!(is_absolute("http://example.com/x.zip"));
        assert!(!is_absolute("ftp://example.com/x.zip"));
        assert!(!is_absolute("mailto:[email protected]"));
        assert!(!is_absolute("/x.zip"));
    }
}
