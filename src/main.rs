fn main() {
    if let Err(err) = finlens::run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
