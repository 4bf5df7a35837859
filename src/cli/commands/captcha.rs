//! `dhc captcha`: run the configured solver over a saved image.

use std::path::{Path, PathBuf};

use console::style;

use dhc_case_status::ocr::{build_preprocessor, encode_png, CaptchaSolver};
use dhc_case_status::Config;

pub async fn cmd_captcha(config: &Config, image: &Path, save: Option<PathBuf>) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(image).await?;
    let settings = &config.captcha;

    if let Some(out) = save {
        let preprocessor = build_preprocessor(
            settings.preprocessor,
            settings.threshold,
            settings.preprocess_settings(),
        );
        let binary = preprocessor.preprocess(&bytes)?;
        tokio::fs::write(&out, encode_png(&binary)?).await?;
        println!(
            "{} Preprocessed image saved to {}",
            style("✓").green(),
            out.display()
        );
    }

    let solver = settings.build_solver();
    if !solver.backend().is_available() {
        anyhow::bail!("{}", solver.backend().availability_hint());
    }

    let name = solver.name();
    let answer = tokio::task::spawn_blocking(move || solver.solve(&bytes)).await?;
    match answer {
        Ok(text) => println!("{} {} ({})", style("✓").green(), style(text).bold(), name),
        Err(e) => {
            println!("{} {}", style("✗").red(), e);
            std::process::exit(1);
        }
    }
    Ok(())
}
