fn main() {
    if let Err(e) = taskuser::run_cli() {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}
