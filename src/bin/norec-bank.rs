//! Bank-account benchmark over the NOrec engine.
//!
//! Usage: `norec-bank <threads> [--disjoint]` where `threads` is 1, 2 or 4.

use std::env;
use std::process;

use norec::bank::{self, ALLOWED_THREADS, BankConfig};
use norec::{Norec, NorecConfig};

fn usage() -> ! {
    println!("Usage: norec-bank <# of threads -> 1, 2, or 4> [--disjoint]");
    process::exit(0);
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let threads = match args.first().map(|a| a.parse::<usize>()) {
        Some(Ok(n)) if ALLOWED_THREADS.contains(&n) => n,
        _ => usage(),
    };
    let disjoint = match args.get(1).map(String::as_str) {
        None => false,
        Some("--disjoint") => true,
        Some(_) => usage(),
    };

    let config = BankConfig {
        threads,
        disjoint,
        accounts: if disjoint { 1000 } else { 1_000_000 },
        ..Default::default()
    };
    println!("Number of threads: {}", threads);

    let engine_config = NorecConfig::default();
    let stm = match Norec::with_config(config.accounts, config.initial_balance, engine_config) {
        Ok(stm) => stm,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    match bank::run_bank(&stm, &config) {
        Ok(report) => {
            println!();
            println!("Total time = {} ns", report.elapsed.as_nanos());
            println!("Total Money Before: ${}", report.total_before);
            println!("Total Money After:  ${}", report.total_after);
            println!(
                "Commits: {}  Read-only: {}  Aborts: {}",
                report.commits, report.read_only_commits, report.aborts
            );
            if !report.is_conserved() {
                eprintln!("Conservation check failed");
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}
