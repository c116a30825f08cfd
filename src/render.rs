//src/render.rs
//
// Plot data sinks. Labels never depend on them: callers go through
// `render_or_warn`, which logs a failure and carries on.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use crate::types::{DensityCurve, KdeOutcome, Ring, ScoreRow};

pub trait Renderer {
    /// Raw values of one ring, for a histogram.
    fn plot_hist(&self, name: &str, data: &[f64]) -> io::Result<()>;

    /// A fitted density curve with its peak, valley and threshold.
    fn plot_density(&self, name: &str, curve: &DensityCurve, outcome: &KdeOutcome) -> io::Result<()>;

    /// The labeled score table, for a scatter plot of HGT vs. the rest.
    fn plot_hgts(&self, name: &str, rows: &[ScoreRow], rings: &[Ring]) -> io::Result<()>;
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRenderer;

impl Renderer for NoopRenderer {
    fn plot_hist(&self, _name: &str, _data: &[f64]) -> io::Result<()> {
        Ok(())
    }

    fn plot_density(&self, _name: &str, _curve: &DensityCurve, _outcome: &KdeOutcome) -> io::Result<()> {
        Ok(())
    }

    fn plot_hgts(&self, _name: &str, _rows: &[ScoreRow], _rings: &[Ring]) -> io::Result<()> {
        Ok(())
    }
}

/// Writes plot data as `<dir>/<prefix>.<name>.tsv` for external plotting.
#[derive(Debug, Clone)]
pub struct TsvRenderer {
    dir: PathBuf,
    prefix: String,
}

impl TsvRenderer {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}.tsv", self.prefix, name))
    }

    fn create(&self, name: &str) -> io::Result<BufWriter<File>> {
        fs::create_dir_all(&self.dir)?;
        Ok(BufWriter::new(File::create(self.path_for(name))?))
    }
}

impl Renderer for TsvRenderer {
    fn plot_hist(&self, name: &str, data: &[f64]) -> io::Result<()> {
        let mut out = self.create(&format!("{name}.hist"))?;
        writeln!(out, "value")?;
        for v in data {
            writeln!(out, "{v}")?;
        }
        out.flush()
    }

    fn plot_density(&self, name: &str, curve: &DensityCurve, outcome: &KdeOutcome) -> io::Result<()> {
        let mut out = self.create(&format!("{name}.kde"))?;
        writeln!(
            out,
            "# bandwidth={}\tpeak={}\tvalley={}\tthreshold={}",
            outcome.bandwidth, outcome.peak, outcome.valley, outcome.threshold
        )?;
        writeln!(out, "x\tdensity")?;
        for (x, y) in curve.x.iter().zip(&curve.y) {
            writeln!(out, "{x}\t{y}")?;
        }
        out.flush()
    }

    fn plot_hgts(&self, name: &str, rows: &[ScoreRow], rings: &[Ring]) -> io::Result<()> {
        let mut out = self.create(&format!("{name}.scatter"))?;
        write!(out, "gene")?;
        for ring in rings {
            write!(out, "\t{ring}")?;
        }
        writeln!(out, "\thgt")?;
        for row in rows {
            write!(out, "{}", row.gene)?;
            for &ring in rings {
                write!(out, "\t{}", row.score(ring))?;
            }
            writeln!(out, "\t{}", u8::from(row.hgt))?;
        }
        out.flush()
    }
}

/// Log a rendering failure instead of propagating it.
pub fn render_or_warn(result: io::Result<()>, what: &str) {
    if let Err(e) = result {
        log::warn!("Could not render {what}: {e}");
    }
}
