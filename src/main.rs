use std::process;

fn main() {
    if let Err(e) = bootkit::cli::run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
