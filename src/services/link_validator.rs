use crate::config::LinkSettings;
use crate::models::{LinkIssue, Severity};
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Which attribute a reference came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Href,
    Src,
}

/// A reference pulled out of markup, with its 1-based line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub line: usize,
    pub kind: LinkKind,
    pub value: String,
}

/// Classifies `href`/`src` references against route and domain whitelists.
#[derive(Debug, Clone)]
pub struct LinkValidator {
    internal_routes: HashSet<String>,
    admin_prefix: String,
    external_domains: HashSet<String>,
    href_pattern: Regex,
    src_pattern: Regex,
}

impl LinkValidator {
    pub fn from_settings(settings: &LinkSettings) -> Self {
        Self {
            internal_routes: settings.internal_routes.iter().cloned().collect(),
            admin_prefix: settings.admin_prefix.clone(),
            external_domains: settings
                .external_domains
                .iter()
                .map(|d| d.to_ascii_lowercase())
                .collect(),
            href_pattern: Regex::new(r#"\bhref=["']([^"']*)["']"#).expect("Invalid href regex"),
            src_pattern: Regex::new(r#"\bsrc=["']([^"']*)["']"#).expect("Invalid src regex"),
        }
    }

    /// Pull every quoted `href` and `src` value out of `content`.
    pub fn extract(&self, content: &str) -> Vec<ExtractedLink> {
        let mut links = Vec::new();

        for (index, line) in content.lines().enumerate() {
            for (pattern, kind) in [
                (&self.href_pattern, LinkKind::Href),
                (&self.src_pattern, LinkKind::Src),
            ] {
                for caps in pattern.captures_iter(line) {
                    links.push(ExtractedLink {
                        line: index + 1,
                        kind,
                        value: caps[1].to_string(),
                    });
                }
            }
        }

        links
    }

    /// Classify one reference. `None` means the reference is fine or ignored.
    pub fn classify(&self, kind: LinkKind, link: &str) -> Option<(Severity, String)> {
        if link.starts_with("data:") || link.starts_with("mailto:") {
            return None;
        }

        if link.is_empty() || link == "#" {
            return Some((Severity::Warning, "Empty or placeholder link".to_string()));
        }

        // Protocol-relative URLs point off-site
        if let Some(rest) = link.strip_prefix("//") {
            return self.classify_absolute(kind, &format!("https://{}", rest));
        }

        if link.starts_with('/') {
            // `src="/logo.png"` is a public asset, not a route
            if kind == LinkKind::Src {
                return None;
            }
            let route = route_path(link);
            if self.internal_routes.contains(route) || link.starts_with(&self.admin_prefix) {
                return None;
            }
            return Some((
                Severity::Error,
                format!("Internal route not found: {}", route),
            ));
        }

        self.classify_absolute(kind, link)
    }

    fn classify_absolute(&self, kind: LinkKind, link: &str) -> Option<(Severity, String)> {
        let url = match Url::parse(link) {
            Ok(url) => url,
            Err(_) => return Some((Severity::Error, "Invalid URL format".to_string())),
        };

        if url.scheme() != "http" && url.scheme() != "https" {
            return None;
        }

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if self.external_domains.contains(&host) {
            return None;
        }

        let label = match kind {
            LinkKind::Href => "External domain",
            LinkKind::Src => "External image source domain",
        };
        Some((
            Severity::Warning,
            format!("{} not in whitelist: {}", label, host),
        ))
    }

    /// Extract and classify every reference in `content`.
    pub fn validate(&self, file: &str, content: &str) -> Vec<LinkIssue> {
        self.extract(content)
            .into_iter()
            .filter_map(|link| {
                self.classify(link.kind, &link.value)
                    .map(|(severity, issue)| LinkIssue {
                        file: file.to_string(),
                        line: link.line,
                        link: link.value,
                        issue,
                        severity,
                    })
            })
            .collect()
    }
}

/// Path part of an internal link, without query, fragment or trailing slash.
fn route_path(link: &str) -> &str {
    let end = link.find(['?', '#']).unwrap_or(link.len());
    let path = &link[..end];
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}
