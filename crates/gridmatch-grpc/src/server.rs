//! gRPC server setup.

use crate::proto::health::health_server::HealthServer;
use crate::proto::matcher::matcher_service_server::MatcherServiceServer;
use crate::services::{HealthServiceImpl, MatcherGrpcService};
use gridmatch_config::ServerConfig;
use gridmatch_core::error::MatcherError;
use gridmatch_matcher::di::MatcherServiceInterface;
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::transport::Server;
use tracing::info;

/// gRPC server exposing `MatcherService` and the standard health check.
pub struct MatcherGrpcServer {
    addr: SocketAddr,
    matcher: Arc<dyn MatcherServiceInterface>,
}

impl MatcherGrpcServer {
    /// Creates a new gRPC server bound to `config`'s gRPC address.
    pub fn new(config: &ServerConfig, matcher: Arc<dyn MatcherServiceInterface>) -> Result<Self, MatcherError> {
        let addr = config
            .grpc_addr()
            .parse()
            .map_err(|e| MatcherError::Configuration(format!("invalid gRPC address: {e}")))?;

        Ok(Self { addr, matcher })
    }

    /// Starts the gRPC server and serves until the process is terminated.
    pub async fn serve(self) -> Result<(), MatcherError> {
        info!("Starting gRPC server on {}", self.addr);

        let health_service = HealthServiceImpl::new();
        let matcher_service = MatcherGrpcService::new(self.matcher);

        Server::builder()
            .add_service(HealthServer::new(health_service))
            .add_service(MatcherServiceServer::new(matcher_service))
            .serve(self.addr)
            .await
            .map_err(|e| MatcherError::internal(format!("gRPC server error: {e}")))?;

        Ok(())
    }

    /// Starts the gRPC server, shutting down gracefully when `shutdown`
    /// resolves.
    pub async fn serve_with_shutdown(
        self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), MatcherError> {
        info!("Starting gRPC server on {} (graceful shutdown enabled)", self.addr);

        let health_service = HealthServiceImpl::new();
        let matcher_service = MatcherGrpcService::new(self.matcher);

        Server::builder()
            .add_service(HealthServer::new(health_service))
            .add_service(MatcherServiceServer::new(matcher_service))
            .serve_with_shutdown(self.addr, shutdown)
            .await
            .map_err(|e| MatcherError::internal(format!("gRPC server error: {e}")))?;

        Ok(())
    }
}
