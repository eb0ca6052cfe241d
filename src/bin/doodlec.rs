use std::{
    fs,
    io::{self, Read},
    path::Path,
    process::ExitCode,
};

use doodle_classifier::{
    Classifier, ClassifyResponse, ResponseShape, cli::DoodlecArgs, encoder::strip_layout,
    pipeline::load_labels,
};
use ortho_config::OrthoConfig;
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doodle_classifier=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "doodlec failed");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Precedence: CLI flags, then DOODLEC_* variables, then the config file.
    let args = DoodlecArgs::load()?;
    let config = args.classifier_config().validate()?;

    if args.list_labels {
        let labels = load_labels(&config)?;
        println!("{}", serde_json::to_string(&labels.public_labels())?);
        return Ok(());
    }

    let classifier = Classifier::open(&config)?;
    let bitmap = strip_layout(&read_bitmap(args.bitmap_path.as_deref())?);
    let result = classifier.classify_default(&bitmap)?;
    let response = ClassifyResponse::from_result(&result, ResponseShape::Full);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn read_bitmap(path: Option<&Path>) -> io::Result<String> {
    match path {
        Some(path) if path != Path::new("-") => fs::read_to_string(path),
        _ => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}
