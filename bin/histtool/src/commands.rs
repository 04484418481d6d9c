use std::{
    collections::VecDeque,
    io::{self, BufRead, Write},
};

use anyhow::Context as _;
use circllhist::{Histogram, HistogramConfig};
use tracing::{debug, error, warn};

use crate::config::OutputFormat;

/// Returns the histograms given on the command line, or the non-empty lines of `reader` if there are none.
pub fn collect_inputs<R: BufRead>(histograms: Vec<String>, reader: R) -> io::Result<Vec<String>> {
    if !histograms.is_empty() {
        return Ok(histograms);
    }

    let mut inputs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            inputs.push(line.to_string());
        }
    }
    Ok(inputs)
}

/// Decodes every input and prints its buckets. Invalid inputs are logged and skipped.
pub fn decode<W: Write>(inputs: &[String], format: OutputFormat, out: &mut W) -> anyhow::Result<()> {
    for histogram in decode_all(inputs) {
        print_histogram(&histogram, format, out)?;
    }
    Ok(())
}

/// Decodes every input and prints its summary statistics. Invalid inputs are logged and skipped.
pub fn stats<W: Write>(inputs: &[String], quantiles: &[f64], out: &mut W) -> anyhow::Result<()> {
    for histogram in decode_all(inputs) {
        let values = histogram.quantiles(quantiles).context("Failed to compute quantiles.")?;

        writeln!(out, "count: {}", histogram.sample_count())?;
        writeln!(out, "buckets: {}", histogram.bucket_count())?;
        writeln!(out, "mean: {}", histogram.mean())?;
        writeln!(out, "sum: {}", histogram.sum())?;
        writeln!(out, "stddev: {}", histogram.stddev())?;
        for (q, value) in quantiles.iter().zip(values) {
            writeln!(out, "q({}): {}", q, value)?;
        }
    }
    Ok(())
}

/// Runs an interactive build session, reading commands and values from `input` until it ends or `q` is read.
pub fn build<R: BufRead, W: Write>(config: &HistogramConfig, input: R, out: &mut W) -> anyhow::Result<()> {
    let mut histogram = Histogram::with_config(config);
    let mut tokens = Tokens::new(input);

    while let Some(token) = tokens.next_token()? {
        match token.as_str() {
            "p" => print_histogram(&histogram, OutputFormat::Text, out)?,
            "j" => print_histogram(&histogram, OutputFormat::Json, out)?,
            "b" => writeln!(out, "{}", histogram.bucket_count())?,
            "s" => writeln!(out, "{}", histogram.to_text())?,
            "q" => break,
            "x" => match tokens.next_token()? {
                Some(arg) => match arg.parse::<i8>() {
                    Ok(min_exponent) => histogram = histogram.compress_mbe(min_exponent),
                    Err(_) => warn!(value = %arg, "Invalid minimum bucket exponent."),
                },
                None => warn!("Missing minimum bucket exponent."),
            },
            other => match other.parse::<f64>() {
                Ok(value) => {
                    if let Err(e) = histogram.insert(value) {
                        warn!(error = %e, "Failed to insert value.");
                    }
                }
                Err(_) => warn!(command = other, "Unknown command."),
            },
        }
    }

    debug!(
        buckets = histogram.bucket_count(),
        samples = histogram.sample_count(),
        "Build session finished."
    );
    Ok(())
}

fn decode_all(inputs: &[String]) -> impl Iterator<Item = Histogram> + '_ {
    inputs
        .iter()
        .filter_map(|input| match Histogram::from_text(input) {
            Ok(histogram) => Some(histogram),
            Err(e) => {
                error!(error = %e, input = input.as_str(), "Invalid histogram.");
                None
            }
        })
}

fn print_histogram<W: Write>(histogram: &Histogram, format: OutputFormat, out: &mut W) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            for (key, count) in histogram {
                writeln!(out, "H[{}]->{}", key, count)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, histogram)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Whitespace-separated tokens read lazily, line by line.
struct Tokens<R> {
    reader: R,
    pending: VecDeque<String>,
}

impl<R: BufRead> Tokens<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
        }
    }

    fn next_token(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        while self.pending.is_empty() {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.pending.extend(line.split_whitespace().map(str::to_string));
        }
        Ok(self.pending.pop_front())
    }
}
