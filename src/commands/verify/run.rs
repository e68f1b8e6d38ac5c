use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use tracing::info;

use super::checks::{Verdict, verify_all};
use super::report::render_markdown;
use crate::cli::VerifyArgs;
use crate::relation::MIGRATION_ORDER;
use crate::store::{self, AccessMode};
use crate::util::{write_json_pretty, write_text};

pub fn run(args: VerifyArgs) -> Result<()> {
    info!(
        source = %args.source.redacted(),
        destination = %args.destination.redacted(),
        "starting verification"
    );

    let mut source = store::open(&args.source, AccessMode::ReadOnly, args.connect_retries)
        .context("cannot connect to verification source")?;
    let mut destination =
        store::open(&args.destination, AccessMode::ReadOnly, args.connect_retries)
            .context("cannot connect to verification destination")?;

    info!(
        source_engine = %source.kind(),
        destination_engine = %destination.kind(),
        "engines connected"
    );

    let report = verify_all(source.as_mut(), destination.as_mut(), &MIGRATION_ORDER);
    let markdown = render_markdown(&report);

    write_text(&args.report_path, &markdown)?;
    info!(path = %args.report_path.display(), "wrote verification report");

    if let Some(path) = &args.json_report_path {
        write_json_pretty(path, &report)?;
        info!(path = %path.display(), "wrote json verification report");
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "{markdown}")?;
    output.flush()?;

    if report.verdict == Verdict::Fail {
        let failed = report
            .relations
            .iter()
            .filter(|relation| !relation.passed())
            .map(|relation| relation.relation.as_str())
            .collect::<Vec<_>>();
        bail!("verification failed for: {}", failed.join(", "));
    }
    Ok(())
}
