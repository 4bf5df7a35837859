//! `dhc ping`.

use console::style;

use dhc_case_status::ocr::{check_binary, OcrBackend, TesseractBackend};
use dhc_case_status::{Config, LiveScraper};

use crate::cli::helpers::spinner;

pub async fn cmd_ping(config: &Config) -> anyhow::Result<()> {
    let scraper = LiveScraper::from_config(config)?;

    let pb = spinner(format!("Contacting {}", config.site.base_url));
    let result = scraper.check_connection().await;
    pb.finish_and_clear();

    let mut healthy = true;
    match result {
        Ok(status) if status < 500 => {
            println!("{} Portal reachable (HTTP {})", style("✓").green(), status)
        }
        Ok(status) => {
            healthy = false;
            println!("{} Portal returned HTTP {}", style("✗").red(), status);
        }
        Err(e) => {
            healthy = false;
            println!("{} Portal unreachable: {}", style("✗").red(), e);
        }
    }

    let tesseract = TesseractBackend::with_config(config.captcha.ocr_config());
    if tesseract.is_available() {
        println!("{} Tesseract available", style("✓").green());
    } else {
        healthy = false;
        println!(
            "{} Tesseract missing: {}",
            style("✗").red(),
            tesseract.availability_hint()
        );
    }

    if config.browser.remote_url.is_some() {
        println!("{} Using remote browser", style("→").cyan());
    } else if config.browser.chrome_path.is_some()
        || ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"]
            .iter()
            .any(|name| check_binary(name))
    {
        println!("{} Chrome available", style("✓").green());
    } else {
        println!(
            "{} Chrome not found in PATH (common install locations are still tried)",
            style("!").yellow()
        );
    }

    if !healthy {
        std::process::exit(1);
    }
    Ok(())
}
