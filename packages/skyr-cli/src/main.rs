mod cli;

use clap::Parser;
use cli::SkyrArgs;
use std::process::exit;

fn main() {
  if let Err(report) = color_eyre::install() {
    eprintln!("[skyr] ERROR: {report}");
    exit(2);
  }

  let args = match SkyrArgs::try_parse() {
    Ok(args) => args,
    Err(err) => {
      // clap renders its own message, including --help and --version output
      err.print().ok();
      let code = if err.use_stderr() { 1 } else { 0 };
      exit(code);
    }
  };

  cli::setup_logger(&args);

  if let Err(report) = cli::run(args) {
    eprintln!("[skyr] ERROR: {report}");
    exit(2);
  }
}
