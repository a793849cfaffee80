use clap::Parser;
use nu_ansi_term::Color;
use std::process::ExitCode;
use stk::{cli::Cli, errors::StError};

#[tokio::main]
async fn main() -> ExitCode {
    match Cli::parse().run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<StError>() {
                Some(err) if err.is_conflict() => {
                    eprintln!("{} {}", Color::Yellow.bold().paint("paused:"), err)
                }
                Some(err) => eprintln!("{} {}", Color::Red.bold().paint("error:"), err),
                None => eprintln!("{} {:#}", Color::Red.bold().paint("error:"), e),
            }
            ExitCode::FAILURE
        }
    }
}
