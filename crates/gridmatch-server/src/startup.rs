//! Server startup utilities.

use tracing::info;

/// Prints the startup banner.
pub fn print_banner() {
    info!(r#"
    _____       _     _ __  __       _       _
   / ____|     (_)   | |  \/  |     | |     | |
  | |  __ _ __  _  __| | \  / | __ _| |_ ___| |__
  | | |_ | '__|| |/ _` | |\/| |/ _` | __/ __| '_ \
  | |__| | |   | | (_| | |  | | (_| | || (__| | | |
   \_____|_|   |_|\__,_|_|  |_|\__,_|\__\___|_| |_|

                         Rust Edition
    "#);
}

/// Prints server startup information.
pub fn print_startup_info(rest_port: u16, grpc_port: u16) {
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("REST API:  http://0.0.0.0:{}", rest_port);
    info!("gRPC API:  http://0.0.0.0:{}", grpc_port);
    info!("Health:    http://0.0.0.0:{}/healthz", rest_port);
    info!("API Docs:  http://0.0.0.0:{}/swagger-ui", rest_port);
    info!("{}", separator);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_banner_does_not_panic() {
        // Initialize subscriber for testing
        let _ = tracing_subscriber::fmt::try_init();
        print_banner();
    }

    #[test]
    fn test_print_startup_info_does_not_panic() {
        let _ = tracing_subscriber::fmt::try_init();
        print_startup_info(8080, 9090);
    }

    #[test]
    fn test_print_startup_info_custom_ports() {
        let _ = tracing_subscriber::fmt::try_init();
        print_startup_info(3000, 50051);
    }
}
