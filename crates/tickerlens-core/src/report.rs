//! Markdown report assembly.
//!
//! Output depends only on the inputs and the generation date, so the same
//! inputs always render byte-identical documents. Sections are always
//! present; whatever is missing renders as [`NOT_AVAILABLE`].

use serde::Serialize;
use tracing::info;

use crate::analysis::{
    correlation_matrix, fundamental_score, headline_sentiment, is_high_volatility,
    CorrelationMatrix, HIGH_VOLATILITY_PERCENT,
};
use crate::{FetchError, FundamentalMetric, NewsDigest, StockSnapshot, Ticker, UtcDateTime};

/// Placeholder rendered wherever upstream data is missing.
pub const NOT_AVAILABLE: &str = "_Data not available._";
pub const NO_NEWS: &str = "No recent news headlines were found for this stock.";
/// Headlines listed per ticker.
pub const MAX_REPORT_HEADLINES: usize = 8;
const RECENT_CLOSES: usize = 5;

const DISCLAIMER: &str = "*This report was generated from Yahoo Finance market data and public \
news sources. Data accuracy depends on market conditions and source reliability. It is for \
informational purposes only and is not investment advice; consult a qualified financial advisor \
before making investment decisions.*";

const SCENARIOS: [&str; 14] = [
    "### Future Scenarios",
    "",
    "**Bull market:**",
    "- Stocks with strong fundamentals and positive news sentiment may outperform",
    "- Dividend-paying stocks may attract income-focused investors",
    "",
    "**Bear market:**",
    "- High P/E stocks may face pressure",
    "- Highly correlated stocks may decline together",
    "",
    "**Neutral market:**",
    "- Stock selection based on company fundamentals becomes more important",
    "- Dividend yields become more attractive relative to other investments",
    "",
];

/// Everything known about one ticker when a report is requested.
#[derive(Debug, Clone)]
pub struct ReportInput {
    pub ticker: Ticker,
    pub snapshot: Result<StockSnapshot, FetchError>,
    pub news: NewsDigest,
}

impl ReportInput {
    pub fn new(ticker: Ticker, snapshot: Result<StockSnapshot, FetchError>, news: NewsDigest) -> Self {
        Self {
            ticker,
            snapshot,
            news,
        }
    }

    fn snapshot(&self) -> Option<&StockSnapshot> {
        self.snapshot.as_ref().ok()
    }

    /// Symbol actually fetched, which differs from the requested one after
    /// listing fallback.
    fn symbol(&self) -> &str {
        self.snapshot()
            .map_or(self.ticker.symbol(), |snapshot| snapshot.ticker.symbol())
    }

    fn company_name(&self) -> &str {
        self.snapshot()
            .map_or(self.ticker.base_symbol(), |snapshot| snapshot.company_name.as_str())
    }
}

/// A rendered report and the filename it should be saved under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub filename: String,
    pub markdown: String,
}

pub fn report_filename(ticker: &Ticker, date: UtcDateTime) -> String {
    format!("{}_report_{}.md", ticker.symbol(), date.format_date())
}

pub fn comparison_filename(date: UtcDateTime) -> String {
    format!("comparison_report_{}.md", date.format_date())
}

/// Renders single-ticker and comparison reports.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    max_headlines: usize,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            max_headlines: MAX_REPORT_HEADLINES,
        }
    }
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_headlines(mut self, max_headlines: usize) -> Self {
        self.max_headlines = max_headlines.max(1);
        self
    }

    /// Single-ticker report for one input, comparison report otherwise.
    pub fn generate(&self, inputs: &[ReportInput], generated: UtcDateTime) -> Report {
        match inputs {
            [single] => self.single(single, generated),
            _ => self.comparison(inputs, generated),
        }
    }

    pub fn single(&self, input: &ReportInput, generated: UtcDateTime) -> Report {
        let mut doc = Doc::default();
        let snapshot = input.snapshot();

        doc.line(format!("# Financial Analysis Report: {}", input.symbol()));
        doc.line(format!("**Generated on:** {}", generated.format_date()));
        doc.blank();

        doc.heading("## Summary");
        self.summary_section(&mut doc, input);

        doc.heading("## Price Chart");
        match snapshot {
            Some(snapshot) if !snapshot.series.is_empty() => price_section(&mut doc, snapshot),
            _ => doc.paragraph(NOT_AVAILABLE),
        }

        doc.heading("## Fundamentals");
        match snapshot {
            Some(snapshot) if snapshot.fundamentals.has_ratios() => {
                doc.line("| Metric | Value |");
                doc.line("|--------|-------|");
                for metric in FundamentalMetric::RATIOS {
                    doc.line(format!(
                        "| {} | {} |",
                        metric.label(),
                        format_fundamental(metric, snapshot.fundamentals.get(metric))
                    ));
                }
                doc.blank();
            }
            _ => doc.paragraph(NOT_AVAILABLE),
        }
        doc.heading("### Ratio Descriptions");
        ratio_descriptions(&mut doc);

        doc.heading("## News");
        self.news_list(&mut doc, &input.news);

        doc.heading("## Risk Assessment");
        match snapshot {
            Some(snapshot) if snapshot.series.len() >= 2 => {
                let change = snapshot.change_percent();
                if is_high_volatility(change) {
                    doc.line(format!(
                        "- **High volatility:** {:.1}% change over the period exceeds the {:.0}% threshold.",
                        change.abs(),
                        HIGH_VOLATILITY_PERCENT
                    ));
                } else {
                    doc.line(format!(
                        "- **Volatility:** {:.1}% change over the period is within the {:.0}% threshold.",
                        change.abs(),
                        HIGH_VOLATILITY_PERCENT
                    ));
                }
                if let Some(pe) = snapshot
                    .fundamentals
                    .get(FundamentalMetric::PeRatio)
                    .filter(|pe| *pe > 25.0)
                {
                    doc.line(format!(
                        "- **Valuation:** a P/E of {pe:.2} may face pressure in a falling market."
                    ));
                }
                doc.blank();
            }
            _ => doc.paragraph(NOT_AVAILABLE),
        }
        doc.lines(&SCENARIOS);

        doc.heading("## Conclusion");
        match snapshot {
            Some(snapshot) => {
                let score = fundamental_score(snapshot);
                let verdict = if score >= 2 {
                    "shows favorable fundamentals"
                } else {
                    "does not currently meet the favorable-fundamentals bar"
                };
                doc.line(format!(
                    "- **{}** {verdict} (score {score}/3: P/E under 25, ROE over 10%, positive period change).",
                    snapshot.ticker.symbol()
                ));
                doc.line("- Regular monitoring of news and fundamental changes is recommended.");
                doc.blank();
            }
            None => doc.paragraph(NOT_AVAILABLE),
        }

        doc.line("---");
        doc.line(DISCLAIMER);

        let filename = report_filename(&input.ticker, generated);
        info!(filename = %filename, "generated single-ticker report");
        Report {
            filename,
            markdown: doc.finish(),
        }
    }

    pub fn comparison(&self, inputs: &[ReportInput], generated: UtcDateTime) -> Report {
        let mut doc = Doc::default();
        let symbols: Vec<&str> = inputs.iter().map(ReportInput::symbol).collect();
        let available: Vec<(&ReportInput, &StockSnapshot)> = inputs
            .iter()
            .filter_map(|input| input.snapshot().map(|snapshot| (input, snapshot)))
            .collect();
        let snapshots: Vec<&StockSnapshot> = available.iter().map(|(_, snapshot)| *snapshot).collect();
        let correlation = correlation_matrix(&snapshots);

        doc.line("# Financial Analysis Report");
        doc.line(format!("**Generated on:** {}", generated.format_date()));
        doc.blank();

        doc.heading("## Summary");
        if symbols.is_empty() {
            doc.paragraph(NOT_AVAILABLE);
        } else {
            doc.paragraph(format!(
                "This report compares {}: current prices, period performance, fundamental ratios, \
                 price correlation and recent news headlines.",
                symbols.join(", ")
            ));
        }

        doc.heading("## Stock Overview");
        if inputs.is_empty() {
            doc.paragraph(NOT_AVAILABLE);
        }
        for input in inputs {
            doc.heading(format!("### {} - {}", input.symbol(), input.company_name()));
            self.overview_list(&mut doc, input);
        }

        doc.heading("## Performance");
        performance_section(&mut doc, &available);

        doc.heading("## Fundamentals");
        if available.iter().any(|(_, snapshot)| snapshot.fundamentals.has_ratios()) {
            let labels: Vec<&str> = FundamentalMetric::RATIOS.iter().map(|metric| metric.label()).collect();
            doc.line(format!("| Stock | {} |", labels.join(" | ")));
            doc.line(format!("|-------|{}", "------|".repeat(labels.len())));
            for (_, snapshot) in &available {
                let cells: Vec<String> = FundamentalMetric::RATIOS
                    .iter()
                    .map(|metric| format_fundamental(*metric, snapshot.fundamentals.get(*metric)))
                    .collect();
                doc.line(format!("| {} | {} |", snapshot.ticker.symbol(), cells.join(" | ")));
            }
            doc.blank();
        } else {
            doc.paragraph(NOT_AVAILABLE);
        }
        doc.heading("### Ratio Descriptions");
        ratio_descriptions(&mut doc);

        doc.heading("## Correlation Analysis");
        correlation_section(&mut doc, correlation.as_ref());

        doc.heading("## News");
        if inputs.is_empty() {
            doc.paragraph(NOT_AVAILABLE);
        }
        for input in inputs {
            doc.heading(format!("### {} - {}", input.symbol(), input.company_name()));
            self.news_list(&mut doc, &input.news);
        }

        doc.heading("## Risk Assessment");
        risk_factors(&mut doc, &available, correlation.as_ref());
        doc.lines(&SCENARIOS);

        doc.heading("## Conclusion");
        let strong: Vec<&str> = available
            .iter()
            .filter(|(_, snapshot)| fundamental_score(snapshot) >= 2)
            .map(|(_, snapshot)| snapshot.ticker.symbol())
            .collect();
        if available.is_empty() {
            doc.paragraph(NOT_AVAILABLE);
        } else {
            if strong.is_empty() {
                doc.line("- No analyzed stock meets the favorable-fundamentals bar.");
            } else {
                doc.line(format!(
                    "- **Fundamentally strong stocks:** {} show favorable metrics.",
                    strong.join(", ")
                ));
            }
            doc.line("- Diversification across the analyzed stocks may help mitigate company-specific risk.");
            doc.line("- Consider correlation effects when building a portfolio from these stocks.");
            doc.blank();
        }

        doc.line("---");
        doc.line(DISCLAIMER);

        let filename = comparison_filename(generated);
        info!(filename = %filename, stocks = inputs.len(), "generated comparison report");
        Report {
            filename,
            markdown: doc.finish(),
        }
    }

    fn summary_section(&self, doc: &mut Doc, input: &ReportInput) {
        match &input.snapshot {
            Ok(snapshot) => {
                let exchange = snapshot
                    .quote
                    .exchange
                    .as_deref()
                    .unwrap_or(snapshot.ticker.market().as_str());
                doc.line(format!(
                    "**{}** ({}, {exchange})",
                    snapshot.company_name,
                    snapshot.ticker.symbol()
                ));
                doc.blank();
                self.overview_list(doc, input);
            }
            Err(error) => {
                doc.line(NOT_AVAILABLE);
                doc.blank();
                doc.paragraph(format!("> {error}"));
            }
        }
    }

    fn overview_list(&self, doc: &mut Doc, input: &ReportInput) {
        let Some(snapshot) = input.snapshot() else {
            doc.paragraph(NOT_AVAILABLE);
            return;
        };
        let currency = snapshot.currency_symbol();
        let change = if snapshot.series.len() >= 2 {
            format_percent(snapshot.change_percent())
        } else {
            "N/A".to_owned()
        };

        doc.line(format!(
            "- **Current Price:** {currency}{:.2}",
            snapshot.quote.price
        ));
        doc.line(format!("- **Period Performance:** {change}"));
        doc.line(format!(
            "- **Market Cap:** {}",
            snapshot
                .fundamentals
                .get(FundamentalMetric::MarketCap)
                .map_or_else(|| "N/A".to_owned(), |value| format!("{currency}{}", format_large_number(value)))
        ));
        doc.line(format!(
            "- **Trading Volume:** {}",
            snapshot
                .fundamentals
                .get(FundamentalMetric::Volume)
                .map_or_else(|| "N/A".to_owned(), format_large_number)
        ));
        doc.blank();
    }

    fn news_list(&self, doc: &mut Doc, news: &NewsDigest) {
        if news.is_empty() {
            doc.line(NOT_AVAILABLE);
            doc.blank();
            doc.paragraph(NO_NEWS);
            return;
        }

        doc.line(format!("**Recent Headlines ({} found):**", news.items.len()));
        doc.blank();
        for (index, item) in news.items.iter().take(self.max_headlines).enumerate() {
            let headline = escape_markdown(&item.headline);
            if item.url.is_empty() {
                doc.line(format!("{}. {headline} ({})", index + 1, item.source));
            } else {
                doc.line(format!("{}. [{headline}]({}) ({})", index + 1, item.url, item.source));
            }
        }
        doc.blank();
        doc.paragraph(format!(
            "**News Sentiment:** The recent news coverage appears {}.",
            headline_sentiment(&news.items).describe()
        ));
    }
}

fn price_section(doc: &mut Doc, snapshot: &StockSnapshot) {
    let series = &snapshot.series;
    let currency = snapshot.currency_symbol();
    let money = |value: Option<f64>| value.map_or_else(|| "N/A".to_owned(), |v| format!("{currency}{v:.2}"));
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        doc.paragraph(NOT_AVAILABLE);
        return;
    };

    doc.line("| Metric | Value |");
    doc.line("|--------|-------|");
    doc.line(format!(
        "| Period | {} to {} |",
        first.ts.format_date(),
        last.ts.format_date()
    ));
    doc.line(format!("| Trading Days | {} |", series.len()));
    doc.line(format!("| First Close | {} |", money(Some(first.close))));
    doc.line(format!("| Last Close | {} |", money(Some(last.close))));
    doc.line(format!("| Period High | {} |", money(series.high())));
    doc.line(format!("| Period Low | {} |", money(series.low())));
    doc.line(format!("| Change | {} |", format_percent(snapshot.change_percent())));
    doc.blank();

    doc.line("**Recent Closes:**");
    doc.blank();
    doc.line("| Date | Close |");
    doc.line("|------|-------|");
    let skip = series.len().saturating_sub(RECENT_CLOSES);
    for bar in series.bars().iter().skip(skip) {
        doc.line(format!("| {} | {} |", bar.ts.format_date(), money(Some(bar.close))));
    }
    doc.blank();
}

fn ratio_descriptions(doc: &mut Doc) {
    for metric in FundamentalMetric::RATIOS {
        doc.line(format!("- **{}:** {}", metric.label(), metric.description()));
    }
    doc.blank();
}

fn performance_section(doc: &mut Doc, available: &[(&ReportInput, &StockSnapshot)]) {
    let priced: Vec<&StockSnapshot> = available
        .iter()
        .map(|(_, snapshot)| *snapshot)
        .filter(|snapshot| snapshot.series.len() >= 2)
        .collect();
    // Ties keep the earliest stock for both best and worst.
    let best = priced.iter().copied().reduce(|best, next| {
        if next.change_percent() > best.change_percent() {
            next
        } else {
            best
        }
    });
    let worst = priced.iter().copied().reduce(|worst, next| {
        if next.change_percent() < worst.change_percent() {
            next
        } else {
            worst
        }
    });
    let (Some(best), Some(worst)) = (best, worst) else {
        doc.paragraph(NOT_AVAILABLE);
        return;
    };

    for (label, snapshot) in [("Best Performer", best), ("Worst Performer", worst)] {
        doc.line(format!(
            "- **{label}:** {} ({}) with {} change",
            snapshot.ticker.symbol(),
            snapshot.company_name,
            format_percent(snapshot.change_percent())
        ));
    }
    doc.blank();
    for snapshot in &priced {
        let change = snapshot.change_percent();
        let trend = if change > 0.0 {
            "📈"
        } else if change < 0.0 {
            "📉"
        } else {
            "➡️"
        };
        doc.line(format!(
            "- {trend} **{}:** {}",
            snapshot.ticker.symbol(),
            format_percent(change)
        ));
    }
    doc.blank();
}

fn correlation_section(doc: &mut Doc, correlation: Option<&CorrelationMatrix>) {
    let pairs = correlation.map(CorrelationMatrix::pairs).unwrap_or_default();
    if pairs.is_empty() {
        doc.paragraph(NOT_AVAILABLE);
        return;
    }
    for pair in pairs {
        doc.line(format!(
            "- **{} vs {}:** {:.3} ({})",
            pair.first,
            pair.second,
            pair.value,
            pair.label()
        ));
    }
    doc.blank();
}

fn risk_factors(
    doc: &mut Doc,
    available: &[(&ReportInput, &StockSnapshot)],
    correlation: Option<&CorrelationMatrix>,
) {
    let volatile: Vec<String> = available
        .iter()
        .filter(|(_, snapshot)| snapshot.series.len() >= 2 && is_high_volatility(snapshot.change_percent()))
        .map(|(_, snapshot)| {
            format!(
                "{} ({:.1}% change)",
                snapshot.ticker.symbol(),
                snapshot.change_percent().abs()
            )
        })
        .collect();
    let correlated: Vec<String> = correlation
        .map(CorrelationMatrix::high_correlation_pairs)
        .unwrap_or_default()
        .iter()
        .map(|pair| format!("{}-{} ({:.2})", pair.first, pair.second, pair.value))
        .collect();

    if available.is_empty() {
        doc.paragraph(NOT_AVAILABLE);
        return;
    }
    if volatile.is_empty() && correlated.is_empty() {
        doc.paragraph("- No stock exceeds the volatility or correlation thresholds.");
        return;
    }
    if !volatile.is_empty() {
        doc.line(format!("- **High Volatility Stocks:** {}", volatile.join(", ")));
    }
    if !correlated.is_empty() {
        doc.line(format!(
            "- **High Correlation Risk:** {} may lead to similar price movements.",
            correlated.join(", ")
        ));
    }
    doc.blank();
}

fn format_fundamental(metric: FundamentalMetric, value: Option<f64>) -> String {
    match value {
        Some(value) if metric.is_percent() => format_percent(value),
        Some(value) => format!("{value:.2}"),
        None => "N/A".to_owned(),
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{value:.2}%")
}

/// `1.23T`, `4.56B`, `7.89M`, or the whole number with thousands separators.
pub fn format_large_number(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1e12 {
        format!("{:.2}T", value / 1e12)
    } else if magnitude >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if magnitude >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else {
        group_thousands(value.round())
    }
}

fn group_thousands(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0.0 {
        grouped.insert(0, '-');
    }
    grouped
}

fn escape_markdown(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}

/// Line-oriented markdown buffer.
#[derive(Default)]
struct Doc {
    out: String,
}

impl Doc {
    fn line(&mut self, text: impl AsRef<str>) {
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn lines(&mut self, lines: &[&str]) {
        for line in lines {
            self.line(line);
        }
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn heading(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.blank();
    }

    fn paragraph(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.blank();
    }

    fn finish(self) -> String {
        self.out
    }
}
