use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use happiness_explorer::{
    bottom_n, complete_cases, correlate, correlate_all, histogram, scatter, top_n, Cell,
    CorrelationMatrix, Direction, Explorer, FilterSpec, Indicator, LoadReport, RankingResult,
};

const USAGE: &str = "usage: happiness-explorer <file.csv|.tsv|.json> \
[--page top-bottom|gdp|social-support|distribution|correlation|pairwise] \
[--region <label>]... [--top <n>] [--json]";

/// Indicators shown on the pairwise-relationships page.
const PAIRWISE: [Indicator; 5] = [
    Indicator::HappinessScore,
    Indicator::GdpPerCapita,
    Indicator::SocialSupport,
    Indicator::LifeExpectancy,
    Indicator::Freedom,
];

const HISTOGRAM_BINS: usize = 12;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    TopBottom,
    Gdp,
    SocialSupport,
    Distribution,
    Correlation,
    Pairwise,
}

impl FromStr for Page {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "top-bottom" => Page::TopBottom,
            "gdp" => Page::Gdp,
            "social-support" => Page::SocialSupport,
            "distribution" => Page::Distribution,
            "correlation" => Page::Correlation,
            "pairwise" => Page::Pairwise,
            other => bail!("unknown page '{other}'\n{USAGE}"),
        })
    }
}

struct Args {
    path: PathBuf,
    page: Page,
    regions: Vec<String>,
    top: usize,
    json: bool,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut path = None;
        let mut page = Page::TopBottom;
        let mut regions = Vec::new();
        let mut top = 10;
        let mut json = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--page" => page = args.next().context("--page needs a value")?.parse()?,
                "--region" => regions.push(args.next().context("--region needs a value")?),
                "--top" => {
                    let n = args.next().context("--top needs a value")?;
                    top = n.parse().with_context(|| format!("--top: '{n}' is not a number"))?;
                }
                "--json" => json = true,
                "-h" | "--help" => bail!("{USAGE}"),
                flag if flag.starts_with("--") => bail!("unknown flag '{flag}'\n{USAGE}"),
                _ if path.is_none() => path = Some(PathBuf::from(&arg)),
                _ => bail!("unexpected argument '{arg}'\n{USAGE}"),
            }
        }

        Ok(Args {
            path: path.context(USAGE)?,
            page,
            regions,
            top,
            json,
        })
    }

    fn filter_spec(&self) -> FilterSpec {
        if self.regions.is_empty() {
            FilterSpec::new()
        } else {
            FilterSpec::new().with_categories("region", self.regions.iter().cloned())
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce()) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value).context("encoding JSON")?);
    } else {
        text();
    }
    Ok(())
}

fn print_diagnostics(report: &LoadReport) {
    for (indicator, count) in &report.unparsable {
        eprintln!("warning: {count} unparsable value(s) in {indicator} stored as null");
    }
    if !report.duplicate_countries.is_empty() {
        eprintln!(
            "warning: {} duplicate country row(s) replaced: {}",
            report.duplicate_countries.len(),
            report.duplicate_countries.join(", ")
        );
    }
    if report.skipped_rows > 0 {
        eprintln!("warning: {} row(s) without a country skipped", report.skipped_rows);
    }
}

fn print_ranking(title: &str, ranking: &RankingResult<'_>) {
    println!("{title}");
    for entry in &ranking.entries {
        println!("{:>3}. {:<28} {:>8.3}", entry.rank, entry.row.country, entry.value);
    }
    println!();
}

fn print_matrix(matrix: &CorrelationMatrix) {
    print!("{:<22}", "");
    for col in matrix.columns() {
        print!("{:>10.9}", col.name());
    }
    println!();
    for &a in matrix.columns() {
        print!("{:<22}", a.name());
        for cell in matrix.row(a).unwrap_or_default() {
            match cell {
                Cell::Defined { r, .. } => print!("{r:>10.2}"),
                Cell::Undefined { .. } => print!("{:>10}", "undefined"),
            }
        }
        println!();
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse(std::env::args().skip(1))?;
    let mut explorer = Explorer::open(&args.path)
        .with_context(|| format!("loading {}", args.path.display()))?;
    print_diagnostics(explorer.report());

    let spec = args.filter_spec();
    let view = explorer.view(&spec).context("applying filter")?;
    let happiness = Indicator::HappinessScore.name();

    match args.page {
        Page::TopBottom => {
            let top = top_n(&view, happiness, args.top, Direction::Descending)?;
            let bottom = bottom_n(&view, happiness, args.top)?;
            emit(args.json, &[&top, &bottom], || {
                print_ranking(&format!("Top {} happiest countries", args.top), &top);
                print_ranking(&format!("Bottom {} countries", args.top), &bottom);
            })?;
        }
        Page::Gdp | Page::SocialSupport => {
            let x = if args.page == Page::Gdp {
                Indicator::GdpPerCapita
            } else {
                Indicator::SocialSupport
            };
            let points = scatter(&view, x.name(), happiness)?;
            emit(args.json, &points, || {
                println!("{:<28} {:<36} {:>8} {:>8}", "country", "region", x.name(), "score");
                for p in &points {
                    println!("{:<28} {:<36} {:>8.3} {:>8.3}", p.country, p.region, p.x, p.y);
                }
            })?;
        }
        Page::Distribution => {
            let hist = histogram(&view, happiness, HISTOGRAM_BINS)?;
            emit(args.json, &hist, || {
                for bin in &hist.bins {
                    println!(
                        "{:>6.2} – {:<6.2} {:>4} {}",
                        bin.lower,
                        bin.upper,
                        bin.count,
                        "#".repeat(bin.count)
                    );
                }
            })?;
        }
        Page::Correlation => {
            let matrix = correlate_all(&view);
            emit(args.json, &matrix, || print_matrix(&matrix))?;
        }
        Page::Pairwise => {
            let complete = complete_cases(&view, &PAIRWISE);
            let names: Vec<&str> = PAIRWISE.iter().map(|i| i.name()).collect();
            let matrix = correlate(&complete, &names)?;
            emit(args.json, &matrix, || {
                println!("{} complete rows of {}", complete.len(), view.len());
                print_matrix(&matrix);
            })?;
        }
    }
    Ok(())
}
