//! Market Identity Extractor (§4.3): parses canonical market URLs into
//! `"EXCHANGE:SYMBOL"` market keys, rejecting anything else as stale or
//! malformed rather than erroring.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// The two publication hosts whose market URLs carry identity. Any other
/// host (including slug-form company pages on either publication) is
/// ignored for market identity purposes.
const RECOGNIZED_HOSTS: &[&str] = &["zerodha.com", "thechatter.zerodha.com"];

static SYMBOL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z0-9._&-]+$").expect("static pattern"));

/// Extract `"EXCHANGE:SYMBOL"` from a market URL, or `None` if the URL is
/// not a recognized, well-formed market-stock URL.
pub fn market_key_from_url(url: Option<&str>) -> Option<String> {
    let url = url?.trim();
    if url.is_empty() {
        return None;
    }
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if !RECOGNIZED_HOSTS.contains(&host) {
        return None;
    }

    let segments: Vec<&str> = parsed.path().split('/').filter(|s| !s.is_empty()).collect();
    let [markets, stocks, exchange, symbol] = segments.as_slice() else {
        return None;
    };
    if !markets.eq_ignore_ascii_case("markets") || !stocks.eq_ignore_ascii_case("stocks") {
        return None;
    }

    let exchange = exchange.to_uppercase();
    if exchange != "NSE" && exchange != "BSE" {
        return None;
    }

    let symbol = symbol.to_uppercase();
    if !SYMBOL_RE.is_match(&symbol) {
        return None;
    }

    Some(format!("{exchange}:{symbol}"))
}
