//! # Sari POS Terminal Entry Point
//!
//! ```bash
//! sari sell CANTON:2 KOPIKO --cash 100
//! sari refund 5f0c... CANTON --pin 1234
//! sari --json report monthly --pin 1234
//! sari cart park "Aling Nena"
//! ```
//!
//! All setup lives in `lib.rs` so it can be tested.

#[tokio::main]
async fn main() {
    let code = sari_terminal::run(std::env::args_os()).await;
    std::process::exit(code);
}
