use std::fmt::Display;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use silhouette_core::quiz::{Category, Question, QuizSession, BODY_SHAPE_QUIZ, SKIN_TONE_QUIZ};
use silhouette_core::{ClassificationResult, Landmark};
use silhouette_engine::{
    spawn_session, Advisory, EngineConfig, FrameOutcome, SkinToneAnalyzer, ToneAnalysis,
};
use silhouette_imaging::PixelFrame;

#[derive(Parser)]
#[command(name = "silhouette", about = "Body shape and skin tone classification CLI")]
struct Cli {
    /// TOML configuration file (SILHOUETTE_* variables still apply on top)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify body shape from recorded pose landmarks
    Body {
        /// JSON Lines file with one landmark array per frame
        #[arg(short, long)]
        landmarks: PathBuf,
    },
    /// Classify skin tone from an image
    Skin {
        /// Image file (any format the image crate decodes)
        #[arg(short, long)]
        image: PathBuf,
        /// Face mesh landmarks (JSON array, normalized) for point sampling
        #[arg(long, conflicts_with_all = ["x", "y", "fast"])]
        face: Option<PathBuf>,
        /// Region centre x in pixels (defaults to the image centre column)
        #[arg(long, requires = "y")]
        x: Option<f32>,
        /// Region centre y in pixels (defaults to one third down)
        #[arg(long, requires = "x")]
        y: Option<f32>,
        /// Only average pixels that pass the YCbCr skin test
        #[arg(long)]
        mask: bool,
        /// Apply contrast enhancement before sampling
        #[arg(long)]
        enhance: bool,
        /// Coarse brightness/warmth bucketing instead of palette matching
        #[arg(long)]
        fast: bool,
    },
    /// Score the fallback questionnaire; lists the questions when no answers are given
    Quiz {
        #[arg(value_enum)]
        kind: QuizKind,
        /// Answer as QUESTION=OPTION, e.g. q1=A (repeatable)
        #[arg(short, long = "answer", value_parser = parse_answer)]
        answers: Vec<(String, String)>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum QuizKind {
    Body,
    Tone,
}

fn parse_answer(s: &str) -> Result<(String, String), String> {
    let (q, o) = s
        .split_once('=')
        .ok_or_else(|| format!("expected QUESTION=OPTION, got '{s}'"))?;
    let (q, o) = (q.trim(), o.trim());
    if q.is_empty() || o.is_empty() {
        return Err(format!("expected QUESTION=OPTION, got '{s}'"));
    }
    Ok((q.to_string(), o.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::from_env()?,
    };

    match cli.command {
        Commands::Body { landmarks } => run_body(config, &landmarks, cli.json).await?,
        Commands::Skin {
            image,
            face,
            x,
            y,
            mask,
            enhance,
            fast,
        } => {
            let mut config = config;
            config.skin.apply_skin_mask |= mask;
            config.skin.enhance_contrast |= enhance;
            let centre = x.zip(y);
            run_skin(config, &image, face.as_deref(), centre, fast, cli.json)?;
        }
        Commands::Quiz { kind, answers } => match kind {
            QuizKind::Body => run_quiz(&BODY_SHAPE_QUIZ, &answers, cli.json)?,
            QuizKind::Tone => run_quiz(&SKIN_TONE_QUIZ, &answers, cli.json)?,
        },
    }

    Ok(())
}

async fn run_body(config: EngineConfig, path: &Path, json: bool) -> Result<()> {
    let file =
        std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let handle = spawn_session(config)?;
    tracing::info!(session = %handle.id(), path = %path.display(), "replaying landmark frames");

    let mut latest: Option<ClassificationResult<_>> = None;
    let mut frames = 0usize;

    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: Vec<Landmark> = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid landmark frame", path.display(), n + 1))?;
        frames += 1;

        let outcome = handle.submit(frame).await?;
        if let FrameOutcome::Skipped { reason } = outcome {
            tracing::debug!(frame = frames, ?reason, "frame skipped");
            continue;
        }

        if json {
            println!(
                "{}",
                serde_json::json!({ "frame": frames, "outcome": outcome })
            );
        } else {
            if let Some(result) = outcome.result() {
                println!(
                    "frame {frames}: {} (confidence {:.2})",
                    result.category, result.confidence
                );
            }
            if let Some(advisory) = outcome.advisory() {
                println!("frame {frames}: {advisory}");
            }
        }

        if let Some(result) = outcome.result() {
            latest = Some(result);
        }
    }

    if !json {
        match latest {
            Some(result) => println!(
                "Body shape: {} (confidence {:.2}, {frames} frames)",
                result.category, result.confidence
            ),
            None => println!("No body shape classified from {frames} frames; try the quiz"),
        }
    }
    Ok(())
}

fn load_image(path: &Path) -> Result<PixelFrame> {
    let img = image::open(path)
        .with_context(|| format!("failed to decode {}", path.display()))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    Ok(PixelFrame::from_rgba(img.into_raw(), width, height)?)
}

fn run_skin(
    config: EngineConfig,
    image: &Path,
    face: Option<&Path>,
    centre: Option<(f32, f32)>,
    fast: bool,
    json: bool,
) -> Result<()> {
    let frame = load_image(image)?;
    tracing::info!(width = frame.width, height = frame.height, "image loaded");
    let analyzer = SkinToneAnalyzer::new(&config);

    if fast {
        let (cx, cy) =
            centre.unwrap_or((frame.width as f32 / 2.0, frame.height as f32 / 3.0));
        let tone = analyzer.quick_tone(&frame, cx, cy)?;
        if json {
            println!("{}", serde_json::json!({ "tone": tone }));
        } else {
            println!("Skin tone (quick): {tone}");
        }
        return Ok(());
    }

    let analysis = match (face, centre) {
        (Some(face), _) => {
            let text = std::fs::read_to_string(face)
                .with_context(|| format!("failed to read {}", face.display()))?;
            let landmarks: Vec<Landmark> = serde_json::from_str(&text)
                .with_context(|| format!("{}: invalid landmark array", face.display()))?;
            analyzer.analyze_face(&frame, &landmarks)
        }
        (None, Some((cx, cy))) => analyzer.analyze_region(&frame, cx, cy),
        (None, None) => analyzer.analyze_upload(&frame),
    };

    match analysis {
        Ok(analysis) => print_tone(&analysis, json),
        Err(e) => match e.advisory() {
            Some(advisory) => print_advisory(advisory, json),
            None => return Err(e.into()),
        },
    }
    Ok(())
}

fn print_tone(analysis: &ToneAnalysis, json: bool) {
    if json {
        println!("{}", serde_json::json!(analysis));
        return;
    }
    let tone = analysis.matched.tone;
    println!("Sampled colour: {}", analysis.color.to_hex());
    match analysis.verdict.result() {
        Some(result) => println!(
            "Skin tone: {} ({:?} undertone, reference {}), confidence {:.2}",
            tone,
            tone.undertone(),
            tone.reference_color().to_hex(),
            result.confidence
        ),
        None => println!("Skin tone: withheld (nearest was {tone})"),
    }
    if let Some(advisory) = analysis.verdict.advisory() {
        println!("{advisory}");
    }
}

fn print_advisory(advisory: Advisory, json: bool) {
    if json {
        println!("{}", serde_json::json!({ "advisory": advisory }));
    } else {
        println!("{advisory}");
    }
}

fn run_quiz<C>(
    questions: &'static [Question<C>],
    answers: &[(String, String)],
    json: bool,
) -> Result<()>
where
    C: Category + Display + Serialize,
{
    if answers.is_empty() {
        for q in questions {
            println!("{}: {}", q.id, q.prompt);
            for o in q.options {
                println!("  {}) {}", o.id, o.label);
            }
        }
        return Ok(());
    }

    let mut session = QuizSession::new(questions);
    for (question, option) in answers {
        session.answer(question, option)?;
    }
    if !session.is_complete() {
        tracing::warn!(
            answered = session.answers().len(),
            total = questions.len(),
            "quiz incomplete; scoring the answers given"
        );
    }

    let scores = session.scores();
    let result = session.result();

    if json {
        let scores: Vec<_> = scores
            .entries()
            .iter()
            .map(|(c, points)| serde_json::json!({ "category": c, "points": points }))
            .collect();
        println!("{}", serde_json::json!({ "result": result, "scores": scores }));
        return Ok(());
    }

    for (category, points) in scores.entries() {
        println!("  {category}: {points}");
    }
    match result {
        Some(result) => println!("Result: {}", result.category),
        None => println!("No result"),
    }
    Ok(())
}
