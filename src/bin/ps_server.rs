use tensor_ps::config::ServerConfig;
use tensor_ps::optim::new_optimizer;
use tensor_ps::server::pb::parameter_server_server::ParameterServerServer;
use tensor_ps::server::ParameterServerImpl;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_env();
    info!(addr = %config.listen_addr, optimizer = %config.optimizer_kind, "starting parameter server");

    let optimizer = new_optimizer(
        &config.optimizer_kind,
        config.learning_rate,
        config.beta1,
        config.beta2,
        config.epsilon,
        config.amsgrad,
    )?;
    let service = ParameterServerImpl::new(optimizer);

    let addr = config.listen_addr.parse()?;
    tonic::transport::Server::builder()
        .add_service(ParameterServerServer::new(service))
        .serve_with_shutdown(addr, async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
