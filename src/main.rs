use std::io::Write;

use anyhow::Context;

fn is_robot_mode_args() -> bool {
    std::env::args().any(|arg| arg == "--json")
}

/// Print `err` where it belongs: help and version on stdout, errors on
/// stderr (JSON in robot mode).
fn report(err: &production_dynamics::CliError) -> anyhow::Result<()> {
    if err.code == production_dynamics::EXIT_OK {
        let mut out = std::io::stdout().lock();
        out.write_all(err.message.as_bytes())
            .and_then(|()| out.flush())
            .context("writing help to stdout")?;
    } else if is_robot_mode_args() {
        writeln!(std::io::stderr().lock(), "{}", err.to_json())
            .context("writing error to stderr")?;
    } else {
        writeln!(std::io::stderr().lock(), "{err}").context("writing error to stderr")?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Load .env early; ignore if missing.
    dotenvy::dotenv().ok();

    let raw_args: Vec<String> = std::env::args().collect();
    let outcome =
        production_dynamics::parse_cli(raw_args).and_then(production_dynamics::run_with_parsed);

    if let Err(err) = outcome {
        report(&err)?;
        std::process::exit(err.code);
    }
    Ok(())
}
