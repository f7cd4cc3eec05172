//! Inspect a dlib shape predictor model and optionally run it on an image.
//!
//! Usage:
//!   sp-inspect <model>                                  # Model summary
//!   sp-inspect <model> --image face.jpg                 # Landmarks in the whole image
//!   sp-inspect <model> --image face.jpg --rect 10,20,200,210 --json
//!   sp-inspect <model> --image face.jpg -o landmarks.json

use clap::Parser;
use serde::Serialize;
use shape_predictor_bridge::{
    Array2D, FullObjectDetection, ImagePoint, Rectangle, RgbPixel, ShapePredictor,
};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "sp-inspect")]
#[command(author, version, about = "Inspect and run dlib shape predictor models", long_about = None)]
struct Args {
    /// Model file (.dat or .dat.bz2)
    #[arg(required = true)]
    model: PathBuf,

    /// Image to predict landmarks on
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Detection rectangle as left,top,right,bottom (default: whole image)
    #[arg(short, long, value_parser = parse_rect)]
    rect: Option<Rectangle>,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Serialize)]
struct Output {
    model: String,
    num_parts: usize,
    num_features: usize,
    cascade_stages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    prediction: Option<PredictionOutput>,
}

#[derive(Serialize)]
struct PredictionOutput {
    image: String,
    width: u32,
    height: u32,
    detection: FullObjectDetection,
}

fn parse_rect(s: &str) -> Result<Rectangle, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<i64>().map_err(|e| format!("{}: {}", v, e)))
        .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
        [left, top, right, bottom] => Ok(Rectangle::new(*left, *top, *right, *bottom)),
        _ => Err(format!("expected left,top,right,bottom, got {} values", values.len())),
    }
}

fn main() {
    let args = Args::parse();

    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Loading model {}", args.model.display());
    let model = ShapePredictor::load(&args.model)?;
    tracing::debug!(
        parts = model.num_parts(),
        features = model.num_features(),
        stages = model.num_cascade_stages(),
        "Model loaded"
    );

    let prediction = match &args.image {
        Some(path) => Some(predict_image(&model, path, args.rect)?),
        None => None,
    };

    let output = Output {
        model: args.model.display().to_string(),
        num_parts: model.num_parts(),
        num_features: model.num_features(),
        cascade_stages: model.num_cascade_stages(),
        prediction,
    };

    let output_str = if args.json {
        serde_json::to_string_pretty(&output)?
    } else {
        format_human_readable(&output)
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &output_str)?;
        tracing::info!("Output written to {}", path.display());
    } else {
        println!("{}", output_str);
    }

    Ok(())
}

fn predict_image(
    model: &ShapePredictor,
    path: &Path,
    rect: Option<Rectangle>,
) -> Result<PredictionOutput, Box<dyn std::error::Error>> {
    tracing::info!("Loading image {}", path.display());
    let rgb = image::open(path)?.to_rgb8();
    let (width, height) = rgb.dimensions();

    let pixels = rgb
        .pixels()
        .map(|p| RgbPixel::new(p[0], p[1], p[2]))
        .collect();
    let grid = Array2D::from_vec(pixels, height as usize, width as usize)?;

    let rect = rect.unwrap_or_else(|| Rectangle::from_size(width as usize, height as usize));
    tracing::debug!(?rect, "Predicting");
    let detection = model.predict(&grid, &rect);

    Ok(PredictionOutput {
        image: path.display().to_string(),
        width,
        height,
        detection,
    })
}

fn format_human_readable(output: &Output) -> String {
    let mut s = String::new();

    s.push_str(&format!("Model: {}\n", output.model));
    s.push_str(&format!("Parts: {}\n", output.num_parts));
    s.push_str(&format!("Features: {}\n", output.num_features));
    s.push_str(&format!("Cascade stages: {}\n", output.cascade_stages));

    if let Some(prediction) = &output.prediction {
        let rect = prediction.detection.rect();
        s.push_str(&format!(
            "\nImage: {} ({}x{})\n",
            prediction.image, prediction.width, prediction.height
        ));
        s.push_str(&format!(
            "Rectangle: ({}, {}) - ({}, {})\n",
            rect.left, rect.top, rect.right, rect.bottom
        ));
        s.push_str("Landmarks:\n");
        for (i, ImagePoint { x, y }) in prediction.detection.parts().iter().enumerate() {
            s.push_str(&format!("  {:3}: ({}, {})\n", i, x, y));
        }
    }

    s
}
