//! Embedded dashboard page. It talks to the JSON endpoints and renders charts
//! client-side with Plotly.

pub const DASHBOARD_HTML: &str = include_str!("../assets/dashboard.html");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_calls_every_api_endpoint() {
        for endpoint in ["/api/resolve", "/api/snapshot", "/api/news", "/api/report"] {
            assert!(DASHBOARD_HTML.contains(endpoint), "missing {endpoint}");
        }
    }

    #[test]
    fn charts_are_drawn_before_headlines_are_requested() {
        let charts = DASHBOARD_HTML.find("renderCharts(market.tickers)").expect("charts rendered");
        let news = DASHBOARD_HTML.find("/api/news?").expect("news requested");
        assert!(charts < news);
    }

    #[test]
    fn comparison_charts_are_present() {
        for id in ["normalized-chart", "performance-chart", "correlation-pairs"] {
            assert!(DASHBOARD_HTML.contains(&format!("id=\"{id}\"")), "missing {id}");
        }
    }
}
