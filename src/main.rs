use std::io::IsTerminal;

use swagger_cli::{petstore, program};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swagger_cli=info,swagger=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();

    let code = match petstore::registry() {
        Ok(registry) => program::run_main(&registry),
        Err(err) => {
            log::error!("{}", err);
            err.exit_code()
        }
    };
    std::process::exit(code);
}
