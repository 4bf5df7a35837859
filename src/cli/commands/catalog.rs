//! `dhc case-types`.

use console::style;
use serde_json::json;

use dhc_case_status::CaseType;

pub fn cmd_case_types(as_json: bool) -> anyhow::Result<()> {
    if as_json {
        let types: Vec<_> = CaseType::ALL
            .iter()
            .map(|t| {
                json!({
                    "code": t.code(),
                    "label": t.site_label(),
                    "description": t.description(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&types)?);
        return Ok(());
    }

    println!("\n{}", style("Case Types").bold());
    for case_type in CaseType::ALL {
        println!(
            "  {:<14} {}",
            style(case_type.site_label()).cyan(),
            case_type.description()
        );
    }
    Ok(())
}
