use colored::Colorize;
use std::process;

fn main() {
    match rds::cli::run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}
