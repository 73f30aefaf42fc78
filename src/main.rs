fn main() {
    if let Err(err) = athlete_insights::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
