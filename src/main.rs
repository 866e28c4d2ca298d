fn main() {
    if let Err(code) = toolrun::cli::run() {
        std::process::exit(code.as_i32());
    }
}
