//! Verdant CLI - vegetation-loss change detection

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use verdant_algorithms::decision::{LossModel, PolicyKind};
use verdant_cloud::{DirectoryHost, RenderHost, StacCatalog, StacClient, StacClientOptions, StacSearchParams};
use verdant_core::{
    BoundingBox, DateWindow, Granule, GranuleQuery, MetricsRecord, RasterSource, RenderHandle,
    RenderRequest,
};
use verdant_pipeline::{
    AnalysisPipeline, AnalysisRequest, ConfigOverrides, InMemoryRasterSource, PipelineConfig,
    SceneArchive,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "verdant")]
#[command(author, version, about = "Vegetation-loss change detection", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a before/after analysis over a scene archive
    Analyze {
        /// Scene archive (JSON) holding the granules to analyse
        #[arg(long)]
        scenes: PathBuf,
        /// Region as west,south,east,north; defaults to the archive extent
        #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
        bbox: Option<BoundingBox>,
        /// Before date (YYYY-MM-DD)
        #[arg(long)]
        before: NaiveDate,
        /// After date (YYYY-MM-DD)
        #[arg(long)]
        after: NaiveDate,
        /// Location label stored in the metrics record
        #[arg(long, default_value = "unnamed")]
        label: String,
        /// Write renders as PAM files into this directory
        #[arg(long)]
        renders: Option<PathBuf>,
        /// Write the outcome JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Apply the decision policy to a metrics record
    Decide {
        /// Metrics record JSON, `-` for stdin
        metrics: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// List Sentinel-2 granules a STAC catalog has for a region and date
    Search {
        /// Catalog: pc, es, or a STAC API URL
        #[arg(long, default_value = "es")]
        catalog: String,
        /// Region as west,south,east,north
        #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
        bbox: BoundingBox,
        /// Center date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Months either side of the center date
        #[arg(long, default_value = "1")]
        offset_months: u32,
        /// Only scenes strictly below this cloud percentage
        #[arg(long, default_value = "50")]
        max_cloud: f64,
        /// Maximum number of items
        #[arg(long, default_value = "50")]
        limit: usize,
    },
}

/// Pipeline configuration file plus per-field overrides.
#[derive(Args)]
struct ConfigArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Decision policy: weighted or hard-rule
    #[arg(long)]
    policy: Option<PolicyKind>,
    /// Months either side of each date
    #[arg(long)]
    offset_months: Option<u32>,
    /// Scenes must be strictly below this cloud percentage
    #[arg(long)]
    max_cloud: Option<f64>,
    /// Historical years in the baseline
    #[arg(long)]
    lookback: Option<u32>,
    /// Index drop that marks a loss candidate
    #[arg(long, allow_hyphen_values = true)]
    loss_threshold: Option<f64>,
    /// Z-score that marks an anomaly
    #[arg(long, allow_hyphen_values = true)]
    z_threshold: Option<f64>,
    /// Area coarsening factor
    #[arg(long)]
    coarsening: Option<usize>,
}

impl ConfigArgs {
    fn load(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        config.apply_overrides(&ConfigOverrides {
            policy: self.policy,
            offset_months: self.offset_months,
            max_cloud_cover: self.max_cloud,
            lookback_years: self.lookback,
            loss_threshold: self.loss_threshold,
            z_score_threshold: self.z_threshold,
            coarsening: self.coarsening,
        });
        Ok(config)
    }
}

// ─── Scene archive source ───────────────────────────────────────────────

/// Granules from an archive; renders optionally written to disk.
struct ArchiveSource {
    scenes: InMemoryRasterSource,
    host: Option<DirectoryHost>,
}

#[async_trait]
impl RasterSource for ArchiveSource {
    async fn granules(&self, query: &GranuleQuery) -> verdant_core::Result<Vec<Granule>> {
        self.scenes.granules(query).await
    }

    async fn render(&self, request: RenderRequest) -> verdant_core::Result<RenderHandle> {
        match &self.host {
            Some(host) => Ok(host.host(&request).await?),
            None => self.scenes.render(request).await,
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn parse_bbox(s: &str) -> Result<BoundingBox, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| format!("invalid coordinate in '{s}': {e}"))?;
    match parts.as_slice() {
        [w, s, e, n] => BoundingBox::new(*w, *s, *e, *n).map_err(|e| e.to_string()),
        _ => Err(format!("expected west,south,east,north, got {} values", parts.len())),
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn write_output(json: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            println!("Outcome saved to: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}

// ─── Commands ───────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
async fn analyze(
    scenes: &Path,
    bbox: Option<BoundingBox>,
    before: NaiveDate,
    after: NaiveDate,
    label: String,
    renders: Option<PathBuf>,
    output: Option<PathBuf>,
    config: &ConfigArgs,
) -> Result<ExitCode> {
    let config = config.load()?;
    let archive = SceneArchive::load(scenes)?;
    let geometry = bbox.unwrap_or(archive.geometry);
    let request = AnalysisRequest::new(geometry, before, after, label)?;

    let source = ArchiveSource {
        scenes: InMemoryRasterSource::from_archive(&archive)?,
        host: renders.map(|dir| {
            let prefix = format!("{}_{}_", before, after);
            DirectoryHost::new(dir).with_prefix(prefix)
        }),
    };
    info!(granules = source.scenes.granule_count(), "scene archive loaded");
    let pipeline = AnalysisPipeline::new(Arc::new(source), config)?;

    let start = Instant::now();
    let pb = spinner("Analysing...");
    let result = pipeline.run(&request).await;
    pb.finish_and_clear();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) if err.is_not_found() => {
            eprintln!("No imagery: {}", err.source);
            return Ok(ExitCode::from(2));
        }
        Err(err) => return Err(err).context("analysis failed"),
    };

    let m = &outcome.metrics;
    eprintln!("Location: {}", m.location_label);
    eprintln!("  Mean NDVI change: {}", fmt_opt(m.mean_ndvi_change));
    eprintln!("  Mean EVI change:  {}", fmt_opt(m.mean_evi_change));
    eprintln!("  Mean Z-score:     {}", fmt_opt(m.mean_z_score));
    eprintln!("  Area of loss:     {:.1} m²", m.area_of_loss_m2);
    eprintln!(
        "  Decision ({}): confidence {:.3}, loss detected: {}",
        outcome.decision.policy, outcome.decision.confidence_score, outcome.decision.loss_detected
    );
    eprintln!("  Processing time: {:.2?}", start.elapsed());

    let json = serde_json::to_string_pretty(&outcome)?;
    write_output(&json, output.as_deref())?;
    Ok(ExitCode::SUCCESS)
}

fn decide(metrics: &Path, config: &ConfigArgs) -> Result<()> {
    let config = config.load()?;
    let policy = config
        .policy
        .context("no decision policy: pass --policy or set [policy] in the config file")?;
    let record: MetricsRecord =
        serde_json::from_str(&read_input(metrics)?).context("parsing metrics record")?;
    debug!(policy = %policy.kind(), "deciding");
    let decision = policy.decide(&record);
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

async fn search(
    catalog: &str,
    bbox: BoundingBox,
    date: NaiveDate,
    offset_months: u32,
    max_cloud: f64,
    limit: usize,
) -> Result<()> {
    let window = DateWindow::new(date, offset_months)?;
    let options = StacClientOptions {
        max_items: limit,
        ..StacClientOptions::default()
    };
    let collection = options.collection.clone();
    let client = StacClient::new(StacCatalog::resolve(catalog), options)?;
    let params = StacSearchParams::new()
        .bbox(&bbox)
        .window(&window)
        .collections(&[collection.as_str()])
        .max_cloud_cover(max_cloud)
        .sort_by_datetime()
        .limit(limit.min(100) as u32);

    let pb = spinner("Searching...");
    let items = client.search_all(&params).await;
    pb.finish_and_clear();
    let items = items.context("STAC search failed")?;

    println!("{} items in {}", items.len(), window);
    for item in &items {
        println!(
            "  {}  {}  cloud {}{}",
            item.acquired().map_or_else(|| "----------".to_string(), |d| d.to_string()),
            item.id,
            item.cloud_cover()
                .map_or_else(|| "n/a".to_string(), |c| format!("{c:.1}%")),
            if item.scl_asset().is_some() { "" } else { "  (no SCL)" },
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Analyze {
            scenes,
            bbox,
            before,
            after,
            label,
            renders,
            output,
            config,
        } => analyze(&scenes, bbox, before, after, label, renders, output, &config).await,
        Commands::Decide { metrics, config } => {
            decide(&metrics, &config)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Search {
            catalog,
            bbox,
            date,
            offset_months,
            max_cloud,
            limit,
        } => {
            if limit == 0 {
                bail!("--limit must be at least 1");
            }
            search(&catalog, bbox, date, offset_months, max_cloud, limit).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_parses_four_values() {
        let bbox = parse_bbox("72.95, 22.55, 72.97, 22.56").unwrap();
        assert_eq!(bbox.to_array(), [72.95, 22.55, 72.97, 22.56]);
        assert!(parse_bbox("1,2,3").is_err());
        assert!(parse_bbox("a,b,c,d").is_err());
        assert!(parse_bbox("3,0,1,1").is_err());
    }

    #[test]
    fn analyze_arguments_parse() {
        let cli = Cli::try_parse_from([
            "verdant",
            "-v",
            "analyze",
            "--scenes",
            "scenes.json",
            "--bbox",
            "-3.75,40.38,-3.65,40.45",
            "--before",
            "2024-01-15",
            "--after",
            "2024-06-15",
            "--policy",
            "hard-rule",
            "--z-threshold",
            "-1.5",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Analyze { bbox, config, .. } => {
                assert_eq!(bbox.unwrap().west(), -3.75);
                assert_eq!(config.policy, Some(PolicyKind::HardRule));
                assert_eq!(config.z_threshold, Some(-1.5));
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn overrides_reach_the_config() {
        let cli = Cli::try_parse_from(["verdant", "decide", "m.json", "--policy", "weighted", "--lookback", "4"]).unwrap();
        let Commands::Decide { config, .. } = cli.command else {
            panic!("expected decide");
        };
        let loaded = config.load().unwrap();
        assert_eq!(loaded.baseline.lookback_years, 4);
        assert_eq!(loaded.policy.map(|p| p.kind()), Some(PolicyKind::Weighted));
    }
}
