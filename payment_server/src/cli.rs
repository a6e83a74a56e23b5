/// Handles the (very small) command line surface: `--version` and `--help` print and exit, anything else
/// is rejected. The real configuration comes from environment variables.
pub fn handle_command_line_args() {
    let mut args = std::env::args().skip(1);
    if let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("payment_server v{}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            },
            "--help" | "-h" => {
                println!(
                    "payment_server v{}\n\nUsage: payment_server\n\nThe server is configured via LPS_* environment \
                     variables (see the project README).",
                    env!("CARGO_PKG_VERSION")
                );
                std::process::exit(0);
            },
            other => {
                eprintln!("Unknown argument: {other}");
                std::process::exit(1);
            },
        }
    }
}
