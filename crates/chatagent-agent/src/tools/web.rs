//! Web tools — page fetch with text extraction, and DuckDuckGo search.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Value};
use tracing::{debug, warn};

use chatagent_core::utils::truncate_string;

use super::base::{optional_bool, optional_i64, require_string, Tool};

/// User-Agent header.
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_2) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Per-request timeout for both tools.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default DuckDuckGo HTML endpoint.
const DEFAULT_SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

const TRUNCATION_NOTICE: &str = "\n\n[Content truncated...]";

fn build_client() -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

// ─────────────────────────────────────────────
// WebFetchTool
// ─────────────────────────────────────────────

/// Fetches a URL and returns its status and (optionally extracted) text.
pub struct WebFetchTool {
    client: Client,
    max_chars: usize,
}

impl WebFetchTool {
    pub fn new(max_chars: usize) -> Self {
        Self {
            client: build_client(),
            max_chars,
        }
    }
}

#[async_trait]
impl Tool for WebFetchTool {
    fn name(&self) -> &str {
        "web_fetch"
    }

    fn description(&self) -> &str {
        "Fetch content from a URL. Can extract text from HTML pages."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch content from"
                },
                "extract_text": {
                    "type": "boolean",
                    "description": "Whether to extract text from HTML (default: true)",
                    "default": true
                }
            },
            "required": ["url"]
        })
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let url = require_string(&params, "url")?;
        let extract_text = optional_bool(&params, "extract_text", true);

        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("Invalid URL: must start with http:// or https://");
        }

        debug!(url = %url, "fetching web page");

        let resp = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                warn!(url = %url, "fetch timed out");
                return Ok(format!("Error: Request timed out for {url}"));
            }
            Err(e) => return Ok(format!("Error fetching URL {url}: {e}")),
        };

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return Ok(format!("Error: Request timed out for {url}")),
            Err(e) => return Ok(format!("Error fetching URL {url}: {e}")),
        };

        let looks_html = content_type.contains("html") || body.trim_start().starts_with('<');
        let text = if extract_text && looks_html {
            strip_html_tags(&body)
        } else {
            body
        };
        let text = truncate_string(&text, self.max_chars, TRUNCATION_NOTICE);

        Ok(format!("URL: {url}\nStatus: {status}\n\n{text}"))
    }
}

// ─────────────────────────────────────────────
// WebSearchTool (DuckDuckGo HTML)
// ─────────────────────────────────────────────

/// Searches the web by scraping DuckDuckGo's HTML results page.
pub struct WebSearchTool {
    client: Client,
    base_url: String,
    max_results: usize,
}

/// One parsed search hit.
#[derive(Debug, Clone, PartialEq)]
struct SearchHit {
    title: String,
    url: String,
    snippet: String,
}

impl WebSearchTool {
    pub fn new(max_results: usize) -> Self {
        Self {
            client: build_client(),
            base_url: DEFAULT_SEARCH_URL.to_string(),
            max_results,
        }
    }

    /// Point the tool at a different results endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// DuckDuckGo wraps result links in a redirect; pull out the real target.
fn unwrap_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    Url::parse(&absolute)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or(absolute)
}

/// Collapse runs of whitespace in an element's text.
fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a DuckDuckGo HTML results page. Title and snippet are taken from
/// the same `.result` container; sponsored entries are skipped.
fn parse_results(html: &str, limit: usize) -> Vec<SearchHit> {
    let (Ok(result_sel), Ok(title_sel), Ok(snippet_sel)) = (
        Selector::parse(".result"),
        Selector::parse(".result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut hits = Vec::new();

    for result in document.select(&result_sel) {
        if hits.len() >= limit {
            break;
        }
        if result
            .value()
            .attr("class")
            .is_some_and(|class| class.contains("result--ad"))
        {
            continue;
        }
        let Some(link) = result.select(&title_sel).next() else {
            continue;
        };
        let title = element_text(&link);
        let url = unwrap_redirect(link.value().attr("href").unwrap_or_default());
        if title.is_empty() || url.is_empty() {
            continue;
        }
        let snippet = result
            .select(&snippet_sel)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default();
        hits.push(SearchHit {
            title,
            url,
            snippet,
        });
    }

    if hits.is_empty() {
        debug!(bytes = html.len(), "no search results parsed");
    }
    hits
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "google_web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information. Returns a list of search results with titles, URLs, and snippets."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results to return (default: 5)",
                    "default": self.max_results
                }
            },
            "required": ["query"]
        })
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let query = require_string(&params, "query")?;
        let limit = optional_i64(&params, "num_results")
            .filter(|n| *n > 0)
            .map(|n| n as usize)
            .unwrap_or(self.max_results);

        debug!(query = %query, limit, "searching web");

        let resp = match self
            .client
            .get(&self.base_url)
            .query(&[("q", &query)])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => return Ok(format!("Error: Search timed out for: {query}")),
            Err(e) => return Ok(format!("Error performing search: {e}")),
        };

        if !resp.status().is_success() {
            return Ok(format!(
                "Error performing search: HTTP {}",
                resp.status().as_u16()
            ));
        }

        let html = resp
            .text()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read search response: {e}"))?;

        let hits = parse_results(&html, limit);
        if hits.is_empty() {
            return Ok(format!("No search results found for: {query}"));
        }

        let mut out = format!("Search results for: {query}\n\n");
        for (i, hit) in hits.iter().enumerate() {
            out.push_str(&format!("{}. {}\n   URL: {}\n", i + 1, hit.title, hit.url));
            if !hit.snippet.is_empty() {
                out.push_str(&format!("   {}\n", hit.snippet));
            }
            out.push('\n');
        }
        Ok(out.trim_end().to_string())
    }
}

// ─────────────────────────────────────────────
// HTML helpers
// ─────────────────────────────────────────────

/// Elements whose whole content is dropped.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer"];

/// Remove HTML tags and the script/style/nav/footer blocks, then collapse whitespace.
fn strip_html_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut skipping: Option<String> = None;
    let mut tag_name = String::new();
    let mut collecting_tag_name = false;

    for ch in html.chars() {
        if ch == '<' {
            in_tag = true;
            collecting_tag_name = true;
            tag_name.clear();
            continue;
        }
        if ch == '>' && in_tag {
            in_tag = false;
            collecting_tag_name = false;
            let lower = tag_name.to_lowercase();
            match &skipping {
                Some(open) => {
                    if lower.strip_prefix('/') == Some(open.as_str()) {
                        skipping = None;
                    }
                }
                None if SKIPPED_ELEMENTS.contains(&lower.as_str()) => {
                    skipping = Some(lower);
                }
                None => {
                    if matches!(
                        lower.as_str(),
                        "br" | "br/" | "p" | "/p" | "div" | "/div" | "li" | "/li" | "tr"
                            | "h1" | "h2" | "h3" | "/h1" | "/h2" | "/h3"
                    ) {
                        result.push('\n');
                    }
                }
            }
            continue;
        }
        if in_tag {
            if collecting_tag_name && (ch.is_alphanumeric() || ch == '/') {
                tag_name.push(ch);
            } else {
                collecting_tag_name = false;
            }
            continue;
        }
        if skipping.is_some() {
            continue;
        }
        result.push(ch);
    }

    let result = result
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ");

    // Collapse whitespace runs, then blank-line runs.
    let mut lines: Vec<String> = Vec::new();
    for line in result.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if !collapsed.is_empty() {
            lines.push(collapsed);
        }
    }
    lines.join("\n")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_strip_html_basic() {
        let html = "<html><body><h1>Title</h1><p>Hello <b>world</b></p></body></html>";
        let text = strip_html_tags(html);
        assert!(text.contains("Title"));
        assert!(text.contains("Hello world"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_strip_html_drops_script_style_nav_footer() {
        let html = "<nav><a href='/'>Home</a></nav><style>body { color: red; }</style>\
                    <p>Before</p><script>alert('xss');</script><p>After</p>\
                    <footer>Copyright</footer>";
        let text = strip_html_tags(html);
        assert_eq!(text, "Before\nAfter");
    }

    #[test]
    fn test_strip_html_entities_and_breaks() {
        assert_eq!(strip_html_tags("<p>A &amp; B &lt; C &gt; D</p>"), "A & B < C > D");
        assert_eq!(strip_html_tags("Line1<br>Line2<br/>Line3"), "Line1\nLine2\nLine3");
    }

    #[test]
    fn test_unwrap_redirect() {
        assert_eq!(
            unwrap_redirect("//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&rut=abc"),
            "https://www.rust-lang.org/"
        );
        assert_eq!(unwrap_redirect("https://example.com/x"), "https://example.com/x");
    }

    // ── WebFetchTool ──

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let result = WebFetchTool::new(1000)
            .execute(params(&[("url", json!("not-a-url"))]))
            .await;
        assert!(result.unwrap_err().to_string().contains("Invalid URL"));
    }

    #[tokio::test]
    async fn test_fetch_extracts_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html><nav>Menu</nav><p>Main content</p><footer>Foot</footer></html>"),
            )
            .mount(&server)
            .await;

        let url = format!("{}/page", server.uri());
        let result = WebFetchTool::new(1000)
            .execute(params(&[("url", json!(url))]))
            .await
            .unwrap();
        assert_eq!(result, format!("URL: {url}\nStatus: 200\n\nMain content"));
    }

    #[tokio::test]
    async fn test_fetch_raw_and_truncated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(format!("<p>{}</p>", "x".repeat(50))),
            )
            .mount(&server)
            .await;

        let url = format!("{}/big", server.uri());
        let result = WebFetchTool::new(10)
            .execute(params(&[("url", json!(url)), ("extract_text", json!(false))]))
            .await
            .unwrap();
        assert!(result.ends_with("<p>xxxxxxx\n\n[Content truncated...]"));
    }

    #[tokio::test]
    async fn test_fetch_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let result = WebFetchTool::new(1000)
            .execute(params(&[("url", json!(format!("{}/gone", server.uri())))]))
            .await
            .unwrap();
        assert!(result.contains("Status: 404"));
        assert!(result.ends_with("missing"));
    }

    // ── WebSearchTool ──

    const RESULTS_PAGE: &str = r#"
        <div class="result">
          <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F">The <b>Rust</b> Language</a>
          <a class="result__snippet" href="x">A language empowering everyone.</a>
        </div>
        <div class="result">
          <a rel="nofollow" class="result__a" href="https://doc.rust-lang.org/book/">The Book</a>
          <a class="result__snippet" href="y">Learn Rust &amp; more.</a>
        </div>
    "#;

    #[test]
    fn test_parse_results() {
        let hits = parse_results(RESULTS_PAGE, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "The Rust Language");
        assert_eq!(hits[0].url, "https://www.rust-lang.org/");
        assert_eq!(hits[1].snippet, "Learn Rust & more.");
        assert_eq!(parse_results(RESULTS_PAGE, 1).len(), 1);
    }

    #[test]
    fn test_parse_results_keeps_snippet_with_its_result() {
        let page = r#"
            <div class="result">
              <a class="result__a" href="https://one.example/">One</a>
            </div>
            <div class="result">
              <a class="result__a" href="https://two.example/">Two</a>
              <a class="result__snippet" href="y">About   two</a>
            </div>
        "#;
        let hits = parse_results(page, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "One");
        assert_eq!(hits[0].snippet, "");
        assert_eq!(hits[1].title, "Two");
        assert_eq!(hits[1].snippet, "About two");
    }

    #[test]
    fn test_parse_results_skips_ads() {
        let page = r#"
            <div class="result result--ad">
              <a class="result__a" href="https://ad.example/">Sponsored</a>
              <a class="result__snippet" href="x">Buy now</a>
            </div>
            <div class="result results_links">
              <a class="result__a" href="https://real.example/">Real</a>
              <a class="result__snippet" href="y">Organic hit</a>
            </div>
        "#;
        let hits = parse_results(page, 5);
        assert_eq!(
            hits,
            vec![SearchHit {
                title: "Real".into(),
                url: "https://real.example/".into(),
                snippet: "Organic hit".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_search_formats_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "rust lang"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
            .mount(&server)
            .await;

        let tool = WebSearchTool::new(5).with_base_url(format!("{}/html/", server.uri()));
        let result = tool
            .execute(params(&[("query", json!("rust lang"))]))
            .await
            .unwrap();
        assert!(result.starts_with("Search results for: rust lang\n\n1. The Rust Language\n   URL: https://www.rust-lang.org/\n   A language empowering everyone."));
        assert!(result.contains("2. The Book"));
    }

    #[tokio::test]
    async fn test_search_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let tool = WebSearchTool::new(5).with_base_url(server.uri());
        let result = tool
            .execute(params(&[("query", json!("zzzz"))]))
            .await
            .unwrap();
        assert_eq!(result, "No search results found for: zzzz");
    }

    #[test]
    fn test_both_require_confirmation() {
        assert!(WebFetchTool::new(10).requires_confirmation());
        let search = WebSearchTool::new(3);
        assert!(search.requires_confirmation());
        assert_eq!(search.to_definition().function.name, "google_web_search");
    }
}
