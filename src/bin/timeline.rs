//! Render a facial animation timeline for a line of text.
//!
//! Prints JSON to stdout. Diagnostics go to stderr.
//!
//! ```text
//! visage-timeline [--synthesize] [--rate <r>] <text...>
//! ```
//!
//! Without `--synthesize` the timeline length is estimated from the word
//! count. With it, the configured TTS backend is called and the output is
//! the full `{"blendData", "filename"}` payload.

use std::path::PathBuf;
use visage::{DurationSource, SpeechAnimator, TimelineGenerator, VisageConfig};

struct Args {
    synthesize: bool,
    rate: Option<f64>,
    text: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("visage=info")),
        )
        .init();

    let Some(args) = parse_args(std::env::args().skip(1))? else {
        print_usage();
        return Ok(());
    };

    let config = load_config()?;

    let json = if args.synthesize {
        let animator = SpeechAnimator::from_config(&config);
        let result = animator
            .synthesize_and_animate(&args.text)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "synthesis failed");
                anyhow::anyhow!("visage-timeline failed: {e}")
            })?;
        serde_json::to_string(&result)?
    } else {
        let speaking_rate = args.rate.unwrap_or(config.tts.speaking_rate);
        let timeline = TimelineGenerator::new(config.animation.clone())
            .generate(&args.text, DurationSource::Estimate { speaking_rate });
        tracing::info!(
            frames = timeline.len(),
            "estimated {:.2}s timeline",
            timeline.duration_secs()
        );
        timeline.to_json()?
    };

    println!("{json}");
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Option<Args>> {
    let mut synthesize = false;
    let mut rate = None;
    let mut words = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--synthesize" => synthesize = true,
            "--rate" => {
                let raw = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--rate requires a value"))?;
                rate = Some(raw.parse::<f64>()?);
            }
            "help" | "--help" | "-h" => return Ok(None),
            _ => words.push(arg),
        }
    }

    if words.is_empty() {
        return Ok(None);
    }
    Ok(Some(Args {
        synthesize,
        rate,
        text: words.join(" "),
    }))
}

/// `VISAGE_CONFIG`, then the default path if present, then built-in defaults.
fn load_config() -> anyhow::Result<VisageConfig> {
    let path = std::env::var_os("VISAGE_CONFIG")
        .map(PathBuf::from)
        .or_else(|| Some(VisageConfig::default_config_path()).filter(|p| p.is_file()));

    let mut config = match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            VisageConfig::from_file(&path)?
        }
        None => VisageConfig::default(),
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn print_usage() {
    println!("usage: visage-timeline [--synthesize] [--rate <r>] <text...>");
}
