use core::error::Error;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use shake::{cfg::RunConfig, cipher::CipherSuite, cmd::Cmd, engine::Engine, report::Report};

pub fn main() {
    let cmd = Cmd::parse();
    if let Err(err) = shake::logging::init(cmd.verbose) {
        eprintln!("ERROR: failed to initialize logging: {err}");
    }

    if let Err(err) = run(cmd) {
        eprintln!("ERROR: {err}");
        eprintln!();
        eprintln!("{}", Cmd::command().render_help());
        eprintln!("Supported cipher suites:");
        for suite in CipherSuite::ALL {
            eprintln!("  {suite}");
        }
        std::process::exit(1);
    }
}

fn run(cmd: Cmd) -> Result<(), Box<dyn Error>> {
    let json = cmd.json;
    let cfg = Arc::new(RunConfig::try_from(cmd)?);

    let summary = Engine::new(cfg.clone()).run()?;

    let report = Report::new(&cfg, &summary);
    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{report}");
    }

    Ok(())
}
