fn main() {
    std::process::exit(au_cli::run_cli_from_args(std::env::args_os()));
}
