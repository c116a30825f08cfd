use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use hgt_rs::analyze_genome;
use hgt_rs::config::{AnalyzeConfig, BandwidthMethod, OutlierMethod};
use hgt_rs::error::Result;
use hgt_rs::render::{NoopRenderer, Renderer, TsvRenderer};
use hgt_rs::search::read_hit_table;
use hgt_rs::taxdb::{parse_taxdb, Rank, TaxonomyTree};

#[derive(Parser)]
#[command(name = "hgt-rs")]
#[command(about = "Predict horizontally transferred genes from taxonomy-annotated homology hits")]
#[command(version)]
struct Cli {
    /// Taxonomy table: taxid, parent, name, rank (tab-separated, optionally gzipped)
    taxdb: PathBuf,

    /// Directory of per-genome hit tables (*.tsv or *.tsv.gz)
    hits_dir: PathBuf,

    output: PathBuf,

    /// Comma-separated self taxa
    #[arg(long)]
    self_tax: Option<String>,

    /// Comma-separated close taxa
    #[arg(long)]
    close_tax: Option<String>,

    #[arg(long)]
    self_rank: Option<Rank>,

    #[arg(long)]
    close_size: Option<usize>,

    #[arg(long, default_value_t = 0.9)]
    match_th: f64,

    #[arg(long, default_value_t = 50.0)]
    coverage: f64,

    /// Count hits instead of summing normalized bit scores
    #[arg(long)]
    unweighted: bool,

    #[arg(long)]
    ignore_self: bool,

    #[arg(long, value_delimiter = ',')]
    ignore_taxa: Vec<String>,

    #[arg(long)]
    self_low: bool,

    #[arg(long)]
    keep_orphans: bool,

    /// none, zscore or boxplot
    #[arg(long, default_value = "zscore")]
    outliers: OutlierMethod,

    #[arg(long, default_value_t = 3.0)]
    zscore_cutoff: f64,

    /// Whisker length of the boxplot filter, in IQRs
    #[arg(long, default_value_t = 1.5)]
    iqr_factor: f64,

    /// auto, grid, silverman or a fixed value
    #[arg(long, default_value = "auto")]
    bandwidth: BandwidthMethod,

    #[arg(long, default_value_t = 20)]
    bw_steps: usize,

    /// Smallest grid bandwidth, as a fraction of the score range
    #[arg(long, default_value_t = 0.005)]
    grid_low: f64,

    /// Largest grid bandwidth, as a fraction of the score range
    #[arg(long, default_value_t = 0.25)]
    grid_high: f64,

    #[arg(long, default_value_t = 100)]
    density_points: usize,

    #[arg(long, default_value_t = 50.0)]
    noise: f64,

    #[arg(long, default_value_t = 75.0)]
    low_part: f64,

    /// Values used by the smart-KDE grid search
    #[arg(long, default_value_t = 1000)]
    smart_subsample: usize,

    #[arg(long, default_value_t = 0.5)]
    silhouette: f64,

    #[arg(long)]
    no_refine: bool,

    #[arg(long)]
    donor_rank: Option<Rank>,

    /// Keep at most this many hits per gene
    #[arg(long)]
    max_hits: Option<usize>,

    /// Do not write plot data
    #[arg(long)]
    no_plots: bool,
}

impl Cli {
    fn analyze_config(&self) -> AnalyzeConfig {
        AnalyzeConfig {
            self_tax: self.self_tax.clone(),
            close_tax: self.close_tax.clone(),
            self_rank: self.self_rank,
            close_size: self.close_size,
            match_threshold: self.match_th,
            genome_coverage: self.coverage,
            weighted: !self.unweighted,
            ignore_self: self.ignore_self,
            ignore_taxa: self.ignore_taxa.clone(),
            self_low: self.self_low,
            keep_orphans: self.keep_orphans,
            outliers: self.outliers,
            zscore_cutoff: self.zscore_cutoff,
            iqr_factor: self.iqr_factor,
            bandwidth: self.bandwidth,
            bw_steps: self.bw_steps,
            grid_low: self.grid_low,
            grid_high: self.grid_high,
            density_points: self.density_points,
            noise: self.noise,
            low_part: self.low_part,
            smart_subsample: self.smart_subsample,
            silhouette: if self.no_refine { None } else { Some(self.silhouette) },
            donor_rank: self.donor_rank,
        }
    }
}

fn spinner(color: &str, message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template(&format!("{{spinner:.{color}}} {{msg}}"))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Genome name of a hit table: the file name without `.tsv` / `.tsv.gz`.
fn genome_name(path: &Path) -> String {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    name.strip_suffix(".tsv").unwrap_or(name).to_string()
}

fn run_genome(path: &Path, tree: &TaxonomyTree, config: &AnalyzeConfig, cli: &Cli) -> Result<usize> {
    let name = genome_name(path);
    let genes = read_hit_table(path, cli.max_hits)?;

    let tsv;
    let renderer: &dyn Renderer = if cli.no_plots {
        &NoopRenderer
    } else {
        tsv = TsvRenderer::new(cli.output.join("plots"), name.as_str());
        &tsv
    };
    let results = analyze_genome(&genes, tree, config, renderer)?;

    fs::write(cli.output.join(format!("{name}.scores.tsv")), results.get_scores_output())?;
    fs::write(cli.output.join(format!("{name}.hgts.tsv")), results.get_hgt_list())?;
    Ok(results.hgt_count())
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.analyze_config();
    config.validate()?;
    fs::create_dir_all(&cli.output)?;

    // 1. Taxonomy, shared read-only by every genome
    let sp = spinner("blue", "Loading taxonomy...");
    let tree = parse_taxdb(&cli.taxdb)?;
    sp.finish_with_message(format!("Loaded {} taxa.", tree.len()));

    // 2. Hit tables
    let mut files: Vec<PathBuf> = fs::read_dir(&cli.hits_dir)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let filename = path.file_name()?.to_string_lossy().to_lowercase();
            if filename.ends_with(".tsv") || filename.ends_with(".tsv.gz") {
                Some(path)
            } else {
                None
            }
        })
        .collect();
    files.sort();
    log::info!("Found {} hit table(s) in {}", files.len(), cli.hits_dir.display());

    // 3. Genomes in parallel; a failed genome does not stop the others
    let sp = spinner("green", "Analyzing genomes...");
    let outcomes: Vec<(String, Result<usize>)> = files
        .par_iter()
        .map(|path| {
            let outcome = run_genome(path, &tree, &config, cli);
            sp.inc(1);
            (genome_name(path), outcome)
        })
        .collect();

    let mut failed = 0;
    for (name, outcome) in &outcomes {
        match outcome {
            Ok(n) => log::info!("{name}: {n} HGT genes"),
            Err(e) => {
                failed += 1;
                log::error!("{name}: {e}");
            }
        }
    }
    sp.finish_with_message(format!(
        "Analyzed {} genome(s), {} failed.",
        outcomes.len(),
        failed
    ));
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        log::error!("{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
