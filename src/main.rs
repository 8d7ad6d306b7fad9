//! concierge CLI binary.
//!
//! All logic is in the library; main only invokes cli::run() and maps its
//! result to a process exit code.

fn main() {
    if let Err(code) = concierge::cli::run() {
        std::process::exit(code);
    }
}
