//! `dhc search`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use console::style;

use dhc_case_status::models::PdfLink;
use dhc_case_status::service::search_outcome;
use dhc_case_status::{Config, SearchOutcome, SearchResponse};

use crate::cli::helpers::{pdf_file_name, print_record, spinner};

pub struct SearchArgs {
    pub case_type: String,
    pub case_number: String,
    pub filing_year: String,
    pub json: bool,
    pub download: Option<PathBuf>,
}

pub async fn cmd_search(config: &Config, args: SearchArgs) -> anyhow::Result<()> {
    let provider = config.build_provider()?;

    let pb = spinner(format!(
        "Searching {} {}/{} ({})",
        args.case_type,
        args.case_number,
        args.filing_year,
        provider.name()
    ));
    let outcome = search_outcome(
        provider.as_ref(),
        &args.case_type,
        &args.case_number,
        &args.filing_year,
    )
    .await;
    pb.finish_and_clear();

    if args.json {
        let response = SearchResponse::from(outcome.clone());
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_outcome(&outcome);
    }

    if let (Some(dir), Some(record)) = (&args.download, outcome.record()) {
        download_orders(&record.pdf_links, dir, config.timeouts.page_load()).await?;
    }

    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_outcome(outcome: &SearchOutcome) {
    match outcome {
        SearchOutcome::Success(record) => print_record(record),
        SearchOutcome::NotFound { .. } => {
            println!("{} {}", style("!").yellow(), outcome.error_message())
        }
        SearchOutcome::TransientFailure { .. } | SearchOutcome::FatalFailure { .. } => {
            println!("{} {}", style("✗").red(), outcome.error_message())
        }
    }
}

async fn download_orders(links: &[PdfLink], dir: &Path, timeout: Duration) -> anyhow::Result<()> {
    if links.is_empty() {
        println!("{} No documents to download", style("!").yellow());
        return Ok(());
    }

    tokio::fs::create_dir_all(dir).await?;
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    let mut saved = 0;
    for (index, link) in links.iter().enumerate() {
        let path = dir.join(pdf_file_name(&link.url, index));
        let result = async {
            let bytes = client
                .get(&link.url)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            tokio::fs::write(&path, &bytes).await?;
            anyhow::Ok(bytes.len())
        }
        .await;

        match result {
            Ok(size) => {
                saved += 1;
                println!(
                    "  {} {} ({} bytes)",
                    style("✓").green(),
                    path.display(),
                    size
                );
            }
            Err(e) => println!("  {} {}: {}", style("✗").red(), link.url, e),
        }
    }

    println!(
        "{} Downloaded {}/{} documents to {}",
        style("→").cyan(),
        saved,
        links.len(),
        dir.display()
    );
    Ok(())
}
