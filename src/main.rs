use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};

use axum::{Router, extract::Request, middleware, routing::any};
use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use portico::{
    adapters::{
        DispatchPipeline, Forwarder, HttpClientAdapter, IdentityClient,
        request_id_middleware, request_timing_middleware,
    },
    config::{GatewayConfigValidator, models::GatewayConfig},
    core::{BackendUrl, RouteTable},
    metrics,
    ports::{http_client::HttpClient, identity::IdentityVerifier},
    tracing_setup,
    utils::GracefulShutdown,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Start the gateway server (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "config.yaml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    // Determine the command to run
    let (command, config_path) = match args.command {
        Some(Commands::Validate { config }) => ("validate", config),
        Some(Commands::Init { config }) => ("init", config),
        Some(Commands::Serve { config }) => ("serve", config),
        None => ("serve", args.config), // Default to serve with config from args
    };

    match command {
        "validate" => {
            return validate_config_command(&config_path);
        }
        "init" => {
            return init_config_command(&config_path).await;
        }
        "serve" => {
            // Continue with normal server startup
        }
        _ => unreachable!(),
    }

    tracing_setup::init_tracing().map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    // The handle renders the /metrics scrape endpoint; it is created once
    // here and handed to the dispatch pipeline explicitly.
    let metrics_handle =
        metrics::install_recorder().map_err(|e| eyre!("Failed to initialize metrics: {}", e))?;

    tracing::info!("Loading configuration from {config_path}");

    let config = portico::config::load_config(&config_path)
        .with_context(|| format!("Failed to load config from {config_path}"))?;

    GatewayConfigValidator::validate(&config)
        .map_err(|e| eyre!("Invalid configuration: {e}"))?;

    let routes = Arc::new(RouteTable::from_config(&config.routes)?);

    let upstream_client: Arc<dyn HttpClient> = Arc::new(
        HttpClientAdapter::new(Duration::from_secs(config.upstream.timeout_secs))
            .context("Failed to create backend HTTP client")?,
    );
    let identity_http: Arc<dyn HttpClient> = Arc::new(
        HttpClientAdapter::new(Duration::from_secs(config.identity.timeout_secs))
            .context("Failed to create identity HTTP client")?,
    );
    let identity: Arc<dyn IdentityVerifier> = Arc::new(IdentityClient::new(
        identity_http,
        BackendUrl::new(&config.identity.base_url)?,
    ));

    let pipeline = Arc::new(DispatchPipeline::new(
        routes.clone(),
        identity,
        Forwarder::new(upstream_client),
        metrics_handle,
        config.service_name.clone(),
    ));

    for route in routes.iter() {
        tracing::info!(
            "Configured route: {} -> {} (auth: {:?})",
            route.pattern().as_str(),
            route.target(),
            route.auth()
        );
    }

    let make_request_route = |pipeline: Arc<DispatchPipeline>| {
        any(move |req: Request| {
            let pipeline = pipeline.clone();
            async move { pipeline.handle_request(req).await }
        })
    };

    let app = Router::new()
        .route("/{*path}", make_request_route(pipeline.clone()))
        .route("/", make_request_route(pipeline))
        .layer(middleware::from_fn(request_timing_middleware))
        .layer(middleware::from_fn(request_id_middleware));

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .context("Failed to parse listen address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!(
        "Portico gateway listening on {} ({} routes, identity at {})",
        addr,
        routes.len(),
        config.identity.base_url
    );

    // Graceful shutdown on SIGINT/SIGTERM
    let graceful_shutdown = Arc::new(GracefulShutdown::new());
    let signal_handler_shutdown = graceful_shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal_handler_shutdown.run_signal_handler().await {
            tracing::error!("Signal handler error: {}", e);
        }
    });

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("Server error")?;
        },
        shutdown_reason = graceful_shutdown.wait_for_shutdown_signal() => {
            tracing::info!("Shutdown signal received: {:?}", shutdown_reason);
        }
    }

    tracing::info!("Portico gateway stopped");

    Ok(())
}

/// Validate configuration file and exit
fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config: GatewayConfig = match portico::config::load_config(config_path) {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    match GatewayConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr);
            println!("   • Service Name: {}", config.service_name);
            println!("   • Identity Service: {}", config.identity.base_url);
            println!("   • Routes: {}", config.routes.len());
            for route in &config.routes {
                println!(
                    "       {} -> {} (auth: {:?})",
                    route.prefix, route.target, route.auth
                );
            }
            println!();
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Ensure all target URLs start with http:// or https://");
            println!("   • Verify listen address format (e.g., '0.0.0.0:8000')");
            println!("   • Place specific routes before wildcard catch-alls");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# Portico gateway configuration

# The address to listen on
listen_addr: "0.0.0.0:8000"

# Service identifier stamped on trace spans
service_name: "apigateway-service"

# Identity service consulted for protected routes
# (/validate and /is-admin are appended to base_url)
identity:
  base_url: "http://userservice-app:8080/user"
  timeout_secs: 5

# Deadline for forwarded backend calls
upstream:
  timeout_secs: 30

# Ordered routes: first match wins, so specific routes come first
routes:
  - prefix: "/auth/*"
    target: "http://userservice-app:8080"

  - prefix: "/user/validate-token"
    methods: ["GET"]
    target: "http://userservice-app:8080"

  - prefix: "/user/is-admin"
    methods: ["GET"]
    target: "http://userservice-app:8080"

  - prefix: "/loan/borrow"
    target: "http://loanservice-app:8082"
    auth: valid

  - prefix: "/admin/*"
    target: "http://bookservice-app:8081"
    auth: admin
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'portico serve --config {config_path}' to start the gateway");
    Ok(())
}
