/// pulsescan - coroutine-style async network reconnaissance CLI.
use std::process;

#[tokio::main]
async fn main() {
    let code = pulsescan::app::run(std::env::args().collect()).await;
    process::exit(code);
}
