use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use crate::chunking::WindowBoundary;
use crate::features::{FamilyKind, LexiconScorer, SentimentScorer};
use crate::ingest::load_chat_log;
use crate::pipeline::{run_pipeline, run_pipeline_concurrent, PipelineReport, PipelineRequest};
use crate::settings::{PipelineSettings, SettingsStore};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Rank the windows of a Twitch chat log by engagement statistics.
#[derive(Debug, Parser)]
#[command(name = "chatpulse", version, about)]
pub struct Cli {
    /// Twitch chat log (JSON array of comment records)
    pub chat_log: PathBuf,

    /// Fine window length in minutes
    #[arg(long, env = "CHATPULSE_WINDOW_MINUTES")]
    pub window_minutes: Option<f64>,

    /// Coarse partition length in minutes
    #[arg(long, env = "CHATPULSE_COARSE_MINUTES")]
    pub coarse_minutes: Option<f64>,

    /// Close windows strictly before `anchor + D` instead of at it
    #[arg(long)]
    pub half_open: bool,

    /// Statistic family to compute; repeatable. Defaults to the families of --rank-by
    #[arg(long = "family")]
    pub families: Vec<FamilyKind>,

    /// Column to rank by; repeat for tie-breakers (or for --consensus)
    #[arg(long = "rank-by", required = true)]
    pub rank_by: Vec<String>,

    /// Keep only the best N windows
    #[arg(long)]
    pub limit: Option<usize>,

    /// Rank each --rank-by column separately and keep windows at least N agree on
    #[arg(long)]
    pub consensus: Option<usize>,

    /// Settings file (camelCase JSON)
    #[arg(long, env = "CHATPULSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Save the effective settings back to --config
    #[arg(long, requires = "config")]
    pub write_config: bool,

    /// Write clips here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// VADER-format sentiment lexicon
    #[arg(long)]
    pub lexicon: Option<PathBuf>,

    /// Compute families in parallel
    #[arg(long)]
    pub concurrent: bool,
}

impl Cli {
    /// Settings from the config file (if any) with command-line overrides.
    pub fn settings(&self) -> Result<(PipelineSettings, Option<SettingsStore>)> {
        let store = self
            .config
            .as_ref()
            .map(|path| SettingsStore::new(path.clone()))
            .transpose()?;
        let mut settings = store
            .as_ref()
            .map(SettingsStore::settings)
            .unwrap_or_default();

        if let Some(minutes) = self.window_minutes {
            settings.chunking.window_minutes = minutes;
        }
        if let Some(minutes) = self.coarse_minutes {
            settings.chunking.coarse_minutes = minutes;
        }
        if self.half_open {
            settings.chunking.boundary = WindowBoundary::HalfOpen;
        }
        if let Some(lexicon) = &self.lexicon {
            settings.lexicon_path = Some(lexicon.clone());
        }
        Ok((settings, store))
    }

    pub fn request(&self) -> PipelineRequest {
        PipelineRequest {
            families: self.families.clone(),
            rank_by: self.rank_by.clone(),
            limit: self.limit,
            consensus: self.consensus,
        }
    }
}

pub fn execute(cli: &Cli) -> Result<()> {
    let (settings, store) = cli.settings()?;
    if cli.write_config {
        match &store {
            Some(store) => store.update(settings.clone())?,
            None => bail!("--write-config needs --config"),
        }
    }

    let scorer: Arc<dyn SentimentScorer> = match &settings.lexicon_path {
        Some(path) => Arc::new(LexiconScorer::load(path)?),
        None => Arc::new(LexiconScorer::builtin()),
    };

    let log = load_chat_log(&cli.chat_log)?;
    let request = cli.request();

    let report = if cli.concurrent {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;
        runtime.block_on(run_pipeline_concurrent(
            &log.stream_id,
            log.events,
            &request,
            &settings,
            scorer,
        ))?
    } else {
        run_pipeline(&log.stream_id, log.events, &request, &settings, scorer)?
    };

    summarize(&report);

    let json = serde_json::to_string_pretty(&report.clips)?;
    match &cli.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write clips to {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn summarize(report: &PipelineReport) {
    let metrics = &report.metrics;
    log_info!(
        "{} events, {} coarse partitions, {} windows ({} single-event), {} merged rows",
        metrics.events,
        metrics.coarse_partitions,
        metrics.windows,
        metrics.degenerate_windows,
        metrics.merged_rows
    );
    for family in &metrics.families {
        log_info!(
            "  {}: {} rows, {} filtered, {} skipped, {} ms",
            family.family,
            family.rows,
            family.filtered_windows,
            family.skipped_windows,
            family.elapsed_ms
        );
    }
    for skipped in &report.skipped_windows {
        log_warn!("skipped {} window {}: {}", skipped.family, skipped.key, skipped.reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let cli = Cli::try_parse_from([
            "chatpulse",
            "vod.json",
            "--window-minutes",
            "0.5",
            "--half-open",
            "--family",
            "chat_rate",
            "--rank-by",
            "chat_rate",
            "--rank-by",
            "mean_chat_rate",
            "--limit",
            "5",
        ])
        .unwrap();

        let (settings, store) = cli.settings().unwrap();
        assert!(store.is_none());
        assert_eq!(settings.chunking.window_minutes, 0.5);
        assert_eq!(settings.chunking.coarse_minutes, 60.0);
        assert_eq!(settings.chunking.boundary, WindowBoundary::HalfOpen);

        let request = cli.request();
        assert_eq!(request.families, vec![FamilyKind::ChatRate]);
        assert_eq!(request.rank_by, vec!["chat_rate", "mean_chat_rate"]);
        assert_eq!(request.limit, Some(5));
    }

    #[test]
    fn unknown_family_is_a_parse_error() {
        assert!(Cli::try_parse_from(["chatpulse", "vod.json", "--family", "hype", "--rank-by", "chat_rate"]).is_err());
    }

    #[test]
    fn rank_column_is_required() {
        assert!(Cli::try_parse_from(["chatpulse", "vod.json", "--family", "chat_rate"]).is_err());
        assert!(Cli::try_parse_from(["chatpulse", "vod.json", "--rank-by", "chat_rate"]).is_ok());
    }

    #[test]
    fn write_config_requires_config() {
        assert!(Cli::try_parse_from(["chatpulse", "vod.json", "--rank-by", "chat_rate", "--write-config"]).is_err());
    }
}
