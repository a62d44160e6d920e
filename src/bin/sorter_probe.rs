//! sorter_probe - run detection and classification on still images
//!
//! Prints the candidate, per-signature scores and label for each image so
//! thresholds and palette ranges can be tuned offline. No debouncing, no
//! serial output.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};

use belt_sorter::classify::{ClassificationScore, ColorClassifier};
use belt_sorter::ingest::images::list_images;
use belt_sorter::{DetectionOutcome, Frame, Material, ObjectDetector, SorterConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "SORTER_CONFIG")]
    config: Option<PathBuf>,
    /// Print one JSON object per image instead of text.
    #[arg(long)]
    json: bool,
    /// Save the belt mask of the first image as a grayscale PNG.
    #[arg(long)]
    save_mask: Option<PathBuf>,
    /// Image files or directories of images.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Serialize)]
struct ProbeRecord<'a> {
    image: &'a Path,
    detection: DetectionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    scores: Option<ClassificationScore>,
    label: Option<Material>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let config = SorterConfig::load_from(args.config.as_deref())?;
    let settings = &config.pipeline;
    let detector = ObjectDetector::new(settings.detector);
    let classifier = ColorClassifier::new(settings.palette.clone(), settings.classifier);

    let mut images = Vec::new();
    for input in &args.inputs {
        if input.is_dir() {
            images.extend(list_images(input)?);
        } else {
            images.push(input.clone());
        }
    }
    if images.is_empty() {
        return Err(anyhow!("no images to probe"));
    }

    for (index, path) in images.iter().enumerate() {
        let image = image::open(path)
            .with_context(|| format!("decode image {}", path.display()))?
            .to_rgb8();
        let frame = Frame::new(image, index as u64 + 1);
        let mask = settings.belt.build_mask(frame.width(), frame.height());
        let belt_only = frame.masked(&mask)?;
        if index == 0 {
            if let Some(out) = &args.save_mask {
                mask.to_gray_image()
                    .save(out)
                    .with_context(|| format!("save belt mask {}", out.display()))?;
            }
        }

        let detection = detector.detect(&belt_only);
        let classification = detection
            .candidate()
            .map(|candidate| classifier.classify(&belt_only, candidate));
        let record = ProbeRecord {
            image: path,
            detection,
            scores: classification.as_ref().map(|c| c.scores),
            label: classification.as_ref().and_then(|c| c.label),
        };

        if args.json {
            println!("{}", serde_json::to_string(&record)?);
        } else {
            print_text(&record);
        }
    }
    Ok(())
}

fn print_text(record: &ProbeRecord<'_>) {
    match &record.detection {
        DetectionOutcome::Candidate(candidate) => println!(
            "{}: candidate ({}, {}) r={} area={}",
            record.image.display(),
            candidate.center_x,
            candidate.center_y,
            candidate.radius,
            candidate.area
        ),
        DetectionOutcome::Rejected(rejection) => {
            println!("{}: no candidate ({:?})", record.image.display(), rejection)
        }
    }
    if let Some(scores) = &record.scores {
        let line = Material::ALL
            .into_iter()
            .map(|m| format!("{}={}", m.name(), scores.get(m)))
            .collect::<Vec<_>>()
            .join(" ");
        println!("  scores: {}", line);
    }
    let label = record.label.map(|m| m.name()).unwrap_or("none");
    println!("  label: {}", label);
}
