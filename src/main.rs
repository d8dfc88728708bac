fn main() {
    use clap::Parser;
    use std::error::Error;
    let args = storyscrape::cli::Args::parse();
    if let Err(e) = storyscrape::logging::init(args.verbose, args.quiet) {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
    let cancel = storyscrape::CancelToken::new();
    if let Err(e) = storyscrape::cli::install_interrupt_handler(cancel.clone()) {
        tracing::warn!("Ctrl-C handler not installed: {}", e);
    }
    if let Err(e) = storyscrape::cli::run(&args, cancel) {
        eprintln!("{}", e);
        if args.verbose > 0 {
            let mut source = e.source();
            while let Some(s) = source {
                eprintln!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
